//! JSON-file account directory
//!
//! Maps chat participant ids to LeetCode usernames. The whole map is kept
//! in memory and rewritten on every link; writes go to a sibling temp file
//! first and are renamed into place.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use arena::{AccountDirectory, Handle, ParticipantId};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// File-backed `{participantId: handle}` store.
pub struct JsonAccountDirectory {
    path: PathBuf,
    links: RwLock<BTreeMap<String, String>>,
}

impl JsonAccountDirectory {
    /// Load the directory at `path`, starting empty if the file is missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let links = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse accounts file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No accounts file yet, starting empty");
                BTreeMap::new()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read accounts file {}", path.display()))
            }
        };
        debug!(path = %path.display(), count = links.len(), "Accounts loaded");
        Ok(Self {
            path,
            links: RwLock::new(links),
        })
    }

    /// Link `participant` to `handle`, replacing any previous link, and persist.
    pub async fn link(&self, participant: &ParticipantId, handle: &Handle) -> Result<()> {
        let mut links = self.links.write().await;
        let previous = links.insert(participant.to_string(), handle.to_string());
        if let Err(e) = self.persist(&links).await {
            match previous {
                Some(old) => links.insert(participant.to_string(), old),
                None => links.remove(participant.as_str()),
            };
            return Err(e);
        }
        info!(%participant, %handle, "Account linked");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.links.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.links.read().await.is_empty()
    }

    async fn persist(&self, links: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(links).context("Failed to encode accounts")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for JsonAccountDirectory {
    async fn resolve_handle(&self, participant: &ParticipantId) -> Option<Handle> {
        self.links
            .read()
            .await
            .get(participant.as_str())
            .map(|h| Handle::new(h.clone()))
    }
}
