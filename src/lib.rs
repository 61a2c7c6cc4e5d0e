pub mod config;
pub mod dashboard;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod notify;
pub mod reconciler;
pub mod state;
pub mod stats;
pub mod storage;
pub mod system;

pub use config::ClientConfig;
pub use errors::{GatewayError, Outcome};
pub use gateway::Gateway;
pub use state::AppState;
pub use storage::CacheStore;
pub use system::TrackingSystem;
