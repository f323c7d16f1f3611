pub mod auth;
pub mod error;
pub mod models;
pub mod search;
pub mod services;
pub mod storage;

pub use error::{ResourceKind, ServiceError, ServiceResult};
pub use services::Services;
pub use storage::{SharedStore, Store};
