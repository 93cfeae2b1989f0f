use journal_sync::{
    auth::FixedCredentialGate, config::Config, credentials::CredentialStore, retry::RetryPolicy,
    router, AppState, JournalSession, RemoteStore,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;

    let credentials = CredentialStore::open(&config.credential_path).await;
    if let Some(token) = &config.seed_token {
        credentials.set(token).await?;
    }

    let store = RemoteStore::new(config.store.clone(), credentials)?
        .with_retry(RetryPolicy::with_backoff(config.retry_backoff))
        .with_cache_ttl(config.cache_ttl);
    info!(
        repo = %config.store.repo_url(),
        file = %config.store.path,
        branch = %config.store.branch,
        "journal store configured"
    );

    let gate = Arc::new(FixedCredentialGate::new(&config.login, &config.password));
    let state = AppState::new(JournalSession::new(store), gate);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
