// Web server modules for the image upscaler

pub mod config;
pub mod discovery;
pub mod error;
pub mod filename;
pub mod housekeeping;
pub mod logger;
pub mod models;
pub mod presenter;
pub mod request_parsing;
pub mod response;
pub mod router;
pub mod routes;
pub mod session;
pub mod state;
pub mod templates;
pub mod upscale_queue;
pub mod upscaler;

// Re-export commonly used types
pub use config::{Args, CleanupPolicy, Config};
pub use error::AppError;
pub use router::handle_request;
pub use state::{AppState, SharedAppState};
