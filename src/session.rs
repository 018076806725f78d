use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Registering,
    LoggingIn,
    Dashboard,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("cannot {action} from {from:?}")]
    InvalidTransition { from: View, action: &'static str },
}

/// Selects which screen is shown. Starts on registration.
#[derive(Debug, Clone)]
pub struct ScreenRouter {
    view: View,
}

impl Default for ScreenRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenRouter {
    pub fn new() -> Self {
        Self {
            view: View::Registering,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn is_dashboard(&self) -> bool {
        self.view == View::Dashboard
    }

    /// Flips between registering and logging in; ignored on the dashboard.
    pub fn toggle(&mut self) -> View {
        self.view = match self.view {
            View::Registering => View::LoggingIn,
            View::LoggingIn => View::Registering,
            View::Dashboard => View::Dashboard,
        };
        self.view
    }

    pub fn login_succeeded(&mut self) -> Result<View, RouterError> {
        match self.view {
            View::LoggingIn => {
                self.view = View::Dashboard;
                Ok(self.view)
            }
            from => Err(RouterError::InvalidTransition {
                from,
                action: "enter the dashboard",
            }),
        }
    }

    pub fn logout(&mut self) -> Result<View, RouterError> {
        match self.view {
            View::Dashboard => {
                self.view = View::LoggingIn;
                Ok(self.view)
            }
            from => Err(RouterError::InvalidTransition {
                from,
                action: "log out",
            }),
        }
    }
}
