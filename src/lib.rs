pub mod config;
pub mod dashboard;
pub mod geo;
pub mod identity;
pub mod logging;
pub mod map;
pub mod risk;
pub mod session;
pub mod store;
pub mod tracker;
pub mod web;

pub use config::AppConfig;
pub use dashboard::{Dashboard, DashboardFrame};
pub use geo::{FishermanState, FishermanUpdate, RiskZone};
pub use risk::RiskLevel;
