pub mod app;
pub mod auth;
pub mod codec;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod resolver;
pub mod retry;
pub mod session;
pub mod state;
pub mod store;

pub use app::router;
pub use errors::{SessionError, StoreError};
pub use models::{JournalDocument, LineId, VersionToken};
pub use resolver::{merge_documents, resolve_conflict};
pub use session::JournalSession;
pub use state::AppState;
pub use store::{RemoteStore, Snapshot};
