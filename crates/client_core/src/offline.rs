//! Static asset precache: filled once from a manifest, read before the network.
//!
//! Network responses are never written back, so entries only change when a
//! new cache version is installed and the old one is pruned by `activate`.

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use futures::future::try_join_all;
use reqwest::header::CONTENT_TYPE;
use shared::error::ErrorKind;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::request::ActionClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    pub path: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Cache,
    Network,
}

type NamedCache = HashMap<String, CachedAsset>;

/// Named caches, shared by every `OfflineCache` in the process.
#[derive(Default)]
pub struct CacheStorage {
    caches: RwLock<HashMap<String, NamedCache>>,
}

impl CacheStorage {
    pub fn global() -> Arc<CacheStorage> {
        static STORAGE: OnceLock<Arc<CacheStorage>> = OnceLock::new();
        Arc::clone(STORAGE.get_or_init(|| Arc::new(CacheStorage::default())))
    }

    pub async fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn has_cache(&self, name: &str) -> bool {
        self.caches.read().await.contains_key(name)
    }

    async fn lookup(&self, path: &str) -> Option<CachedAsset> {
        let caches = self.caches.read().await;
        let mut names: Vec<&String> = caches.keys().collect();
        names.sort();
        names
            .into_iter()
            .find_map(|name| caches.get(name).and_then(|cache| cache.get(path)).cloned())
    }
}

pub struct OfflineCache {
    name: String,
    manifest: Vec<String>,
    storage: Arc<CacheStorage>,
    client: ActionClient,
}

impl OfflineCache {
    pub fn new(
        name: impl Into<String>,
        manifest: Vec<String>,
        storage: Arc<CacheStorage>,
        client: ActionClient,
    ) -> Self {
        Self {
            name: name.into(),
            manifest,
            storage,
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn is_ready(&self) -> bool {
        self.storage.has_cache(&self.name).await
    }

    /// Fetches every manifest entry; stores the cache only if all succeed.
    pub async fn install(&self) -> Result<usize, ErrorKind> {
        info!(cache = %self.name, entries = self.manifest.len(), "installing offline cache");
        let assets = try_join_all(self.manifest.iter().map(|path| self.fetch_network(path)))
            .await
            .map_err(|err| {
                warn!(cache = %self.name, error = %err, "offline cache install failed");
                err
            })?;

        for asset in &assets {
            if !(200..300).contains(&asset.status) {
                warn!(cache = %self.name, path = %asset.path, status = asset.status, "manifest entry not cacheable");
                return Err(ErrorKind::Transport {
                    status: asset.status,
                });
            }
        }

        let count = assets.len();
        let cache: NamedCache = assets
            .into_iter()
            .map(|asset| (asset.path.clone(), asset))
            .collect();
        self.storage
            .caches
            .write()
            .await
            .insert(self.name.clone(), cache);
        info!(cache = %self.name, count, "offline cache installed");
        Ok(count)
    }

    /// Drops every cache whose name differs from this one.
    pub async fn activate(&self) -> Vec<String> {
        let mut caches = self.storage.caches.write().await;
        let stale: Vec<String> = caches
            .keys()
            .filter(|name| **name != self.name)
            .cloned()
            .collect();
        for name in &stale {
            caches.remove(name);
            info!(cache = %name, "pruned stale offline cache");
        }
        stale
    }

    /// Cached copy if any cache holds `path`, otherwise the network response.
    pub async fn fetch(&self, path: &str) -> Result<(AssetSource, CachedAsset), ErrorKind> {
        if let Some(asset) = self.storage.lookup(path).await {
            debug!(path, "served from offline cache");
            return Ok((AssetSource::Cache, asset));
        }
        let asset = self.fetch_network(path).await?;
        Ok((AssetSource::Network, asset))
    }

    async fn fetch_network(&self, path: &str) -> Result<CachedAsset, ErrorKind> {
        let url = self.client.url_for(path)?;
        let response = self
            .client
            .http()
            .get(url)
            .send()
            .await
            .map_err(|err| ErrorKind::Network(err.to_string()))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|err| ErrorKind::Network(err.to_string()))?
            .to_vec();
        Ok(CachedAsset {
            path: path.to_string(),
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
#[path = "tests/offline_tests.rs"]
mod tests;
