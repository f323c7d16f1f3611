//! Client for the algodeck HTTP API and the session-local cache that
//! mirrors one user's folders, notes and questions.

pub mod api;
pub mod cache;
pub mod error;
pub mod session;

pub use api::ApiClient;
pub use cache::{ActivityItem, ActivityKind, DataCache, LocalStats};
pub use error::ClientError;
pub use session::Session;
