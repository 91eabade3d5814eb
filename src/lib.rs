pub mod cache;
pub mod clock;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod queue;
pub mod rate_window;
pub mod redis;
pub mod response;
pub mod server;
pub mod state;
pub mod upstream;
pub mod validation;

pub use config::Config;
pub use error::{ProxyError, Result, UpstreamError};
pub use queue::{QueueConfig, QueueError, RequestQueue};
pub use response::ApiEnvelope;
pub use server::create_app;
pub use state::AppState;
