//! HTTP client for the presentation controller.
//!
//! The controller exposes a small JSON API: a root status endpoint,
//! playlist listing, per-playlist item list (GET) and whole-array item
//! replace (PUT), and per-library item listing. Writes are accepted or
//! rejected wholesale; on rejection the response body is surfaced
//! verbatim because the controller's generic messages are the only
//! diagnostics it offers.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

use crate::config::{PoolsConfig, RemoteConfig};
use crate::errors::RemoteError;
use crate::models::{CandidatePresentation, PlaylistItem, PlaylistSummary, PoolKey};

use super::PresentationApi;

#[derive(Debug, Deserialize)]
struct StatusResponse {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibraryEntry {
    id: String,
    name: String,
}

pub struct RemoteClient {
    client: reqwest::Client,
    base_url: Url,
    pools: PoolsConfig,
}

impl RemoteClient {
    pub fn new(config: &RemoteConfig, pools: PoolsConfig) -> Result<Self, RemoteError> {
        let base_url = Url::parse(&format!("http://{}:{}/", config.host, config.port))
            .map_err(|e| RemoteError::InvalidResponse {
                endpoint: "base url".to_string(),
                message: e.to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            pools,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteError::InvalidResponse {
                endpoint: path.to_string(),
                message: e.to_string(),
            })
    }

    fn pool_library(&self, pool: PoolKey) -> &str {
        match pool {
            PoolKey::Worship => &self.pools.worship,
            PoolKey::Kids => &self.pools.kids,
            PoolKey::ServiceContent => &self.pools.service_content,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout {
                    url: url.to_string(),
                }
            } else {
                error!("GET {} failed: {}", url, e);
                RemoteError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<T>().await.map_err(|e| {
            error!("GET {} returned unparseable body: {}", url, e);
            RemoteError::InvalidResponse {
                endpoint: path.to_string(),
                message: e.to_string(),
            }
        })
    }
}

#[async_trait]
impl PresentationApi for RemoteClient {
    async fn check_connection(&self) -> Result<String, RemoteError> {
        let status: StatusResponse = self.get_json("v1/status").await?;
        let label = match status.version {
            Some(version) => format!("{} {}", status.name, version),
            None => status.name,
        };
        info!("Connected to presentation controller: {}", label);
        Ok(label)
    }

    async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>, RemoteError> {
        self.get_json("v1/playlists").await
    }

    async fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, RemoteError> {
        self.get_json(&format!("v1/playlist/{}/items", playlist_id))
            .await
    }

    async fn put_playlist_items(
        &self,
        playlist_id: &str,
        items: &[PlaylistItem],
    ) -> Result<(), RemoteError> {
        let url = self.endpoint(&format!("v1/playlist/{}/items", playlist_id))?;
        info!("PUT {} ({} items)", url, items.len());

        let response = self
            .client
            .put(url.clone())
            .json(items)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    error!("PUT {} failed: {}", url, e);
                    RemoteError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Playlist write rejected: {} - {}", status, body);
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    async fn library_items(
        &self,
        pool: PoolKey,
    ) -> Result<Vec<CandidatePresentation>, RemoteError> {
        let library = self.pool_library(pool);
        let entries: Vec<LibraryEntry> = self
            .get_json(&format!("v1/library/{}/items", urlencoding::encode(library)))
            .await?;

        debug!("Fetched {} entries from {} pool '{}'", entries.len(), pool, library);

        Ok(entries
            .into_iter()
            .map(|e| CandidatePresentation {
                id: e.id,
                display_name: e.name,
                pool_id: pool,
            })
            .collect())
    }
}
