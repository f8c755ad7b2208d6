pub mod client;

use async_trait::async_trait;

use crate::errors::RemoteError;
use crate::models::{CandidatePresentation, PlaylistItem, PlaylistSummary, PoolKey};

pub use client::RemoteClient;

/// Seam between the pipeline and the presentation controller. The
/// concrete client talks HTTP; tests substitute an in-memory fake.
#[async_trait]
pub trait PresentationApi: Send + Sync {
    /// Reachability/version probe against the controller root endpoint.
    async fn check_connection(&self) -> Result<String, RemoteError>;

    async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>, RemoteError>;

    async fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, RemoteError>;

    /// Whole-array replace. Applied or rejected wholesale by the remote.
    async fn put_playlist_items(
        &self,
        playlist_id: &str,
        items: &[PlaylistItem],
    ) -> Result<(), RemoteError>;

    /// Read-only listing of one content pool.
    async fn library_items(&self, pool: PoolKey)
        -> Result<Vec<CandidatePresentation>, RemoteError>;
}
