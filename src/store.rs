use crate::codec::{decode_document, encode_document};
use crate::config::StoreConfig;
use crate::credentials::CredentialStore;
use crate::errors::StoreError;
use crate::models::{JournalDocument, VersionToken};
use crate::retry::{RetryFailure, RetryPolicy};
use chrono::Local;
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// `hidden` marks a guest read the repository refused: the document is empty
// because its contents are unknown, not because the file is missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub document: JournalDocument,
    pub token: Option<VersionToken>,
    pub hidden: bool,
}

enum RemoteFile {
    Missing,
    Hidden,
    Present(ContentsResponse),
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: String,
    content: &'a str,
    branch: &'a str,
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: WrittenContent,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: String,
}

struct CachedSnapshot {
    snapshot: Snapshot,
    fetched_at: Instant,
}

pub struct RemoteStore {
    http: Client,
    config: StoreConfig,
    credentials: CredentialStore,
    retry: RetryPolicy,
    cache_ttl: Duration,
    cache: Mutex<Option<CachedSnapshot>>,
}

impl RemoteStore {
    pub fn new(config: StoreConfig, credentials: CredentialStore) -> Result<Self, StoreError> {
        let http = Client::builder()
            .user_agent(concat!("journal_sync/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            config,
            credentials,
            retry: RetryPolicy::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Mutex::new(None),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    pub async fn has_credential(&self) -> bool {
        self.credentials.has().await
    }

    pub async fn set_credential(&self, token: &str) -> Result<(), StoreError> {
        self.credentials.set(token).await?;
        self.invalidate_cache().await;
        Ok(())
    }

    pub async fn clear_credential(&self) -> Result<(), StoreError> {
        self.credentials.clear().await?;
        self.invalidate_cache().await;
        Ok(())
    }

    pub async fn invalidate_cache(&self) {
        *self.cache.lock().await = None;
    }

    pub async fn test_connection(&self) -> Result<bool, StoreError> {
        let (request, authenticated) = self.request(Method::GET, &self.config.repo_url()).await;
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            info!(owner = %self.config.owner, repo = %self.config.repo, "repository reachable");
            return Ok(true);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(format!(
                "repository {}/{}",
                self.config.owner, self.config.repo
            )));
        }
        if is_auth_failure(status) {
            if authenticated {
                return Err(self.reject_credential(status).await);
            }
            info!(%status, "anonymous repository access denied, continuing as guest");
            return Ok(true);
        }

        Err(StoreError::Connectivity(format!("repository check returned {status}")))
    }

    pub async fn load(&self) -> Result<Snapshot, StoreError> {
        if let Some(snapshot) = self.cached().await {
            debug!("serving journal from cache");
            return Ok(snapshot);
        }
        self.load_fresh().await
    }

    pub async fn load_fresh(&self) -> Result<Snapshot, StoreError> {
        let snapshot = self
            .retry
            .run(
                |_| self.fetch_snapshot(),
                |err| matches!(err, StoreError::Connectivity(_) | StoreError::Load { .. }),
            )
            .await
            .map_err(RetryFailure::into_inner)?;

        info!(
            dates = snapshot.document.date_count(),
            token = snapshot.token.as_deref().unwrap_or("-"),
            hidden = snapshot.hidden,
            "journal loaded"
        );
        if !snapshot.hidden {
            *self.cache.lock().await = Some(CachedSnapshot {
                snapshot: snapshot.clone(),
                fetched_at: Instant::now(),
            });
        }
        Ok(snapshot)
    }

    /// Writes the whole document. Without `expected`, every attempt first
    /// reads the current token from the remote, bypassing the cache. A
    /// supplied token cannot get fresher between attempts, so a conflict on it
    /// is returned after the first write.
    pub async fn save(
        &self,
        doc: &JournalDocument,
        expected: Option<&str>,
    ) -> Result<VersionToken, StoreError> {
        if !self.has_credential().await {
            return Err(StoreError::CredentialRequired);
        }
        let content = encode_document(doc)?;
        if let Some(token) = expected {
            return self.put(&content, Some(token)).await;
        }

        let result = self
            .retry
            .run(
                |_| {
                    let content = content.as_str();
                    async move {
                        let token = match self.fetch_raw().await? {
                            RemoteFile::Present(file) => Some(file.sha),
                            RemoteFile::Missing => None,
                            RemoteFile::Hidden => return Err(StoreError::CredentialRequired),
                        };
                        self.put(content, token.as_deref()).await
                    }
                },
                |err| matches!(err, StoreError::Conflict),
            )
            .await;

        match result {
            Ok(token) => Ok(token),
            Err(RetryFailure::Exhausted { attempts, .. }) => {
                warn!(attempts, "giving up on conflicting save");
                Err(StoreError::ConflictExhausted { attempts })
            }
            Err(RetryFailure::Terminal(err)) => Err(err),
        }
    }

    /// One conditional write with exactly the given token. `None` only creates
    /// the file and reports `Conflict` when it already exists.
    pub async fn write_once(
        &self,
        doc: &JournalDocument,
        token: Option<&str>,
    ) -> Result<VersionToken, StoreError> {
        if !self.has_credential().await {
            return Err(StoreError::CredentialRequired);
        }
        let content = encode_document(doc)?;
        self.put(&content, token).await
    }

    async fn cached(&self) -> Option<Snapshot> {
        let cache = self.cache.lock().await;
        cache
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.cache_ttl)
            .map(|cached| cached.snapshot.clone())
    }

    async fn request(&self, method: Method, url: &str) -> (RequestBuilder, bool) {
        let mut request = self
            .http
            .request(method, url)
            .header(header::ACCEPT, "application/vnd.github.v3+json");
        let token = self.credentials.get().await;
        if let Some(token) = &token {
            request = request.header(header::AUTHORIZATION, format!("token {token}"));
        }
        (request, token.is_some())
    }

    async fn reject_credential(&self, status: StatusCode) -> StoreError {
        warn!(%status, "credential rejected by repository, clearing it");
        if let Err(err) = self.clear_credential().await {
            error!("failed to clear rejected credential: {err}");
        }
        StoreError::Auth {
            status: status.as_u16(),
        }
    }

    async fn fetch_raw(&self) -> Result<RemoteFile, StoreError> {
        let (request, authenticated) = self.request(Method::GET, &self.config.contents_url()).await;
        let response = request
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!(path = %self.config.path, "journal file does not exist yet");
            return Ok(RemoteFile::Missing);
        }
        if is_auth_failure(status) {
            if authenticated {
                return Err(self.reject_credential(status).await);
            }
            info!(%status, "anonymous read denied, guest sees an empty journal");
            return Ok(RemoteFile::Hidden);
        }
        if !status.is_success() {
            return Err(StoreError::Load {
                status: status.as_u16(),
            });
        }

        let file = response
            .json::<ContentsResponse>()
            .await
            .map_err(|err| StoreError::Encoding(err.to_string()))?;
        Ok(RemoteFile::Present(file))
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, StoreError> {
        match self.fetch_raw().await? {
            RemoteFile::Present(file) => Ok(Snapshot {
                document: decode_document(&file.content)?,
                token: Some(file.sha),
                hidden: false,
            }),
            RemoteFile::Missing => Ok(Snapshot::default()),
            RemoteFile::Hidden => Ok(Snapshot {
                hidden: true,
                ..Snapshot::default()
            }),
        }
    }

    async fn put(&self, content: &str, token: Option<&str>) -> Result<VersionToken, StoreError> {
        let body = PutContentsRequest {
            message: commit_message(),
            content,
            branch: &self.config.branch,
            sha: token,
        };
        let (request, _) = self.request(Method::PUT, &self.config.contents_url()).await;
        let response = request.json(&body).send().await?;
        let status = response.status();

        if status == StatusCode::CONFLICT || status == StatusCode::PRECONDITION_FAILED {
            warn!(token = token.unwrap_or("-"), "version token is stale");
            return Err(StoreError::Conflict);
        }
        // GitHub answers a create over an existing file with 422 "sha wasn't supplied".
        if status == StatusCode::UNPROCESSABLE_ENTITY && token.is_none() {
            warn!("journal file appeared before it could be created");
            return Err(StoreError::Conflict);
        }
        if is_auth_failure(status) {
            return Err(self.reject_credential(status).await);
        }
        if !status.is_success() {
            return Err(StoreError::Save {
                status: status.as_u16(),
            });
        }

        let written = response
            .json::<PutContentsResponse>()
            .await
            .map_err(|err| StoreError::Encoding(err.to_string()))?;
        self.invalidate_cache().await;
        info!(token = %written.content.sha, "journal saved");
        Ok(written.content.sha)
    }
}

fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

fn commit_message() -> String {
    format!("📊 Journal update: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))
}
