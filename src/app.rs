use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post, put}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        .route("/api/credential", put(handlers::put_credential))
        .route("/api/entry", get(handlers::get_entry).post(handlers::save_entry))
        .route("/api/sync", post(handlers::sync))
        .route("/api/calendar", get(handlers::calendar))
        .with_state(state)
}
