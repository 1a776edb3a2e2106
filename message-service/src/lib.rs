pub mod app;
pub mod config;
pub mod message_handlers;
pub mod metrics;
pub mod passwords;
pub mod store;
pub mod user_handlers;
pub mod validation;

pub use app::{build_router, AppState};
