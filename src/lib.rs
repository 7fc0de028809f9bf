pub mod backend;
pub mod config;
pub mod error;
pub mod prompt;
pub mod relay;
pub mod server;
pub mod translate;

pub use backend::BackendKind;
pub use config::AppConfig;
pub use error::{RelayError, Result};
pub use server::{build_router, AppState};
