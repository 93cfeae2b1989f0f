use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{fs, sync::RwLock};
use tracing::{error, info};

pub const CREDENTIAL_KEY: &str = "github_token";

#[derive(Clone, Debug, Default)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl CredentialStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub async fn open(path: &Path) -> Self {
        let entries = match fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(err) => {
                    error!("failed to parse credential file: {err}");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                error!("failed to read credential file: {err}");
                BTreeMap::new()
            }
        };

        Self {
            path: Some(path.to_path_buf()),
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub async fn get(&self) -> Option<String> {
        self.entries.read().await.get(CREDENTIAL_KEY).cloned()
    }

    pub async fn has(&self) -> bool {
        self.entries.read().await.contains_key(CREDENTIAL_KEY)
    }

    pub async fn set(&self, token: &str) -> Result<(), std::io::Error> {
        let mut entries = self.entries.write().await;
        entries.insert(CREDENTIAL_KEY.to_string(), token.trim().to_string());
        self.persist(&entries).await?;
        info!("write credential stored");
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), std::io::Error> {
        let mut entries = self.entries.write().await;
        if entries.remove(CREDENTIAL_KEY).is_some() {
            self.persist(&entries).await?;
            info!("write credential cleared");
        }
        Ok(())
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), std::io::Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(entries)?;
        fs::write(path, payload).await
    }
}
