//! Client for the external identity service (`/register`, `/login`).

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub phone_number: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub phone: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterReply {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginReply {
    pub message: String,
    #[serde(default)]
    pub otp: Option<String>,
}

impl LoginReply {
    pub fn banner(&self) -> String {
        match &self.otp {
            Some(otp) => format!("Success: {}. OTP: {}", self.message, otp),
            None => format!("Success: {}.", self.message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity service unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("identity service rejected the request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("unexpected identity service response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl IdentityError {
    /// Text shown inline on the form.
    pub fn user_message(&self) -> String {
        match self {
            IdentityError::Rejected { message, .. } => format!("Error: {message}"),
            IdentityError::Transport(_) | IdentityError::Decode(_) => {
                "Server error. Please try again.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
}

impl IdentityClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn register(
        &self,
        username: &str,
        phone_number: &str,
    ) -> Result<RegisterReply, IdentityError> {
        let body = RegisterRequest {
            username,
            phone_number,
        };
        self.post("register", &body, "Error during registration")
            .await
    }

    pub async fn login(&self, username: &str, phone: &str) -> Result<LoginReply, IdentityError> {
        let body = LoginRequest { username, phone };
        self.post("login", &body, "Invalid response").await
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<R, IdentityError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(IdentityError::Transport)?;

        let status = response.status();
        if status.is_success() {
            return response.json::<R>().await.map_err(IdentityError::Decode);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| fallback.to_string());
        Err(IdentityError::Rejected { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_includes_otp_when_present() {
        let reply = LoginReply {
            message: "Welcome back, ana!".into(),
            otp: Some("4821".into()),
        };
        assert_eq!(reply.banner(), "Success: Welcome back, ana!. OTP: 4821");
    }

    #[test]
    fn rejected_message_is_prefixed() {
        let err = IdentityError::Rejected {
            status: StatusCode::UNAUTHORIZED,
            message: "Invalid credentials".into(),
        };
        assert_eq!(err.user_message(), "Error: Invalid credentials");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = IdentityClient::new("http://127.0.0.1:5001/");
        assert_eq!(client.base_url(), "http://127.0.0.1:5001");
    }
}
