#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use journal_sync::{
    codec::{decode_document, encode_document},
    config::StoreConfig,
    credentials::CredentialStore,
    models::{DateEntry, JournalDocument, LineId},
    retry::RetryPolicy,
    RemoteStore,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const GOOD_TOKEN: &str = "good-token";
pub const OWNER: &str = "alex";
pub const REPO: &str = "journal";
pub const FILE: &str = "journal-data.json";

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub content: String,
    pub sha: String,
}

/// State of the fake repository plus knobs for injecting failures.
#[derive(Debug, Default)]
pub struct FakeRepo {
    pub file: Option<StoredFile>,
    pub version: u64,
    pub allow_anonymous_read: bool,
    pub missing_repo: bool,
    pub forced_conflicts: u32,
    pub failed_preconditions: u32,
    pub failing_gets: u32,
    pub gets: u32,
    pub puts: u32,
    pub last_message: Option<String>,
}

impl FakeRepo {
    fn write(&mut self, content: String) -> String {
        self.version += 1;
        let sha = format!("sha-{}", self.version);
        self.file = Some(StoredFile {
            content,
            sha: sha.clone(),
        });
        sha
    }
}

/// In-process stand-in for the GitHub Contents API.
#[derive(Clone)]
pub struct FakeGithub {
    pub base_url: String,
    repo: Arc<Mutex<FakeRepo>>,
}

enum Caller {
    Anonymous,
    Valid,
    Invalid,
}

fn caller(headers: &HeaderMap) -> Caller {
    match headers.get(header::AUTHORIZATION).and_then(|value| value.to_str().ok()) {
        None => Caller::Anonymous,
        Some(value) if value == format!("token {GOOD_TOKEN}") => Caller::Valid,
        Some(_) => Caller::Invalid,
    }
}

fn reply(status: StatusCode, body: Value) -> (StatusCode, Json<Value>) {
    (status, Json(body))
}

async fn repo_info(
    State(repo): State<Arc<Mutex<FakeRepo>>>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let repo = repo.lock().unwrap();
    if repo.missing_repo {
        return reply(StatusCode::NOT_FOUND, json!({ "message": "Not Found" }));
    }
    match caller(&headers) {
        Caller::Invalid => reply(StatusCode::UNAUTHORIZED, json!({ "message": "Bad credentials" })),
        Caller::Anonymous if !repo.allow_anonymous_read => {
            reply(StatusCode::FORBIDDEN, json!({ "message": "Forbidden" }))
        }
        _ => reply(StatusCode::OK, json!({ "full_name": format!("{owner}/{name}") })),
    }
}

async fn get_contents(
    State(repo): State<Arc<Mutex<FakeRepo>>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let mut repo = repo.lock().unwrap();
    repo.gets += 1;
    if repo.failing_gets > 0 {
        repo.failing_gets -= 1;
        return reply(StatusCode::SERVICE_UNAVAILABLE, json!({ "message": "try again" }));
    }
    match caller(&headers) {
        Caller::Invalid => {
            return reply(StatusCode::UNAUTHORIZED, json!({ "message": "Bad credentials" }));
        }
        Caller::Anonymous if !repo.allow_anonymous_read => {
            return reply(StatusCode::FORBIDDEN, json!({ "message": "Forbidden" }));
        }
        _ => {}
    }
    match &repo.file {
        None => reply(StatusCode::NOT_FOUND, json!({ "message": "Not Found" })),
        Some(file) => {
            let wrapped = file
                .content
                .as_bytes()
                .chunks(60)
                .map(|chunk| format!("{}\n", String::from_utf8_lossy(chunk)))
                .collect::<String>();
            reply(
                StatusCode::OK,
                json!({ "content": wrapped, "encoding": "base64", "sha": file.sha }),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct PutBody {
    message: String,
    content: String,
    branch: String,
    sha: Option<String>,
}

async fn put_contents(
    State(repo): State<Arc<Mutex<FakeRepo>>>,
    Path((_, _, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<PutBody>,
) -> (StatusCode, Json<Value>) {
    let mut repo = repo.lock().unwrap();
    repo.puts += 1;
    if !matches!(caller(&headers), Caller::Valid) {
        return reply(StatusCode::UNAUTHORIZED, json!({ "message": "Bad credentials" }));
    }
    if body.branch != "main" {
        return reply(StatusCode::NOT_FOUND, json!({ "message": "No such branch" }));
    }
    if repo.forced_conflicts > 0 {
        repo.forced_conflicts -= 1;
        return reply(StatusCode::CONFLICT, json!({ "message": "is at another sha" }));
    }
    if repo.failed_preconditions > 0 {
        repo.failed_preconditions -= 1;
        return reply(StatusCode::PRECONDITION_FAILED, json!({ "message": "precondition failed" }));
    }
    let current = repo.file.as_ref().map(|file| file.sha.clone());
    match (current, body.sha.as_deref()) {
        (Some(current), Some(expected)) if current == expected => {}
        (None, None) => {}
        (Some(_), None) => {
            return reply(
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "message": "sha wasn't supplied" }),
            );
        }
        _ => return reply(StatusCode::CONFLICT, json!({ "message": "does not match" })),
    }

    repo.last_message = Some(body.message.clone());
    let sha = repo.write(body.content);
    reply(
        StatusCode::OK,
        json!({ "content": { "path": path, "sha": sha }, "commit": { "message": body.message } }),
    )
}

impl FakeGithub {
    pub async fn start() -> Self {
        let repo = Arc::new(Mutex::new(FakeRepo::default()));
        let app = Router::new()
            .route("/repos/:owner/:repo", get(repo_info))
            .route(
                "/repos/:owner/:repo/contents/*path",
                get(get_contents).put(put_contents),
            )
            .with_state(Arc::clone(&repo));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake github");
        let addr = listener.local_addr().expect("fake github addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake github server");
        });

        Self {
            base_url: format!("http://{addr}"),
            repo,
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeRepo) -> R) -> R {
        f(&mut self.repo.lock().unwrap())
    }

    /// Writes as another client would, bypassing version checks.
    pub fn put_document(&self, doc: &JournalDocument) -> String {
        let content = encode_document(doc).unwrap();
        self.with(|repo| repo.write(content))
    }

    pub fn put_raw(&self, content: &str) -> String {
        let content = STANDARD.encode(content);
        self.with(|repo| repo.write(content))
    }

    pub fn document(&self) -> Option<JournalDocument> {
        let content = self.with(|repo| repo.file.as_ref().map(|file| file.content.clone()))?;
        Some(decode_document(&content).unwrap())
    }

    pub fn sha(&self) -> Option<String> {
        self.with(|repo| repo.file.as_ref().map(|file| file.sha.clone()))
    }

    pub fn store_config(&self) -> StoreConfig {
        store_config_at(&self.base_url)
    }

    pub async fn store(&self, token: Option<&str>) -> RemoteStore {
        let credentials = CredentialStore::in_memory();
        if let Some(token) = token {
            credentials.set(token).await.unwrap();
        }
        RemoteStore::new(self.store_config(), credentials)
            .unwrap()
            .with_retry(RetryPolicy::with_backoff(Duration::from_millis(5)))
    }
}

pub fn store_config_at(api_base: &str) -> StoreConfig {
    StoreConfig {
        api_base: api_base.to_string(),
        owner: OWNER.to_string(),
        repo: REPO.to_string(),
        branch: "main".to_string(),
        path: FILE.to_string(),
    }
}

/// Base URL of a local port nothing listens on.
pub async fn closed_api_base() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind spare port");
    let addr = listener.local_addr().expect("spare addr");
    drop(listener);
    format!("http://{addr}")
}

pub fn entry(fields: &[(&str, &str)]) -> DateEntry {
    fields
        .iter()
        .map(|(field, value)| (field.to_string(), (*value).into()))
        .collect()
}

pub fn document<'a>(items: impl IntoIterator<Item = (LineId, &'a str, DateEntry)>) -> JournalDocument {
    let mut doc = JournalDocument::default();
    for (line, date, entry) in items {
        doc.line_mut(line).insert(date.to_string(), entry);
    }
    doc
}
