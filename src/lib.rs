pub mod admission;
pub mod config;
pub mod domains;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod server;

pub use admission::{AdmissionController, AdmissionSettings};
pub use config::Config;
pub use error::{ApiError, Result, SearchError};
pub use handlers::AppState;
pub use server::{build_state, create_app, Server};
