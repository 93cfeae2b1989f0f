use crate::auth::AccessGate;
use crate::session::JournalSession;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<JournalSession>>,
    pub gate: Arc<dyn AccessGate>,
}

impl AppState {
    pub fn new(session: JournalSession, gate: Arc<dyn AccessGate>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            gate,
        }
    }
}
