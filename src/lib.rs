//! ATS Checker
//!
//! Scores a résumé against a job description: the résumé's text is extracted,
//! both texts are sent to a chat-completion model, and the model's JSON verdict
//! is validated and returned.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use handlers::create_router;
pub use state::AppState;
