//! In-process event bus for server-side updates.
//!
//! Provides a lightweight broadcast channel for UI subscriptions.

use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;

use crate::artifacts::ArtifactKind;

/// Server event payloads published by the catalog core.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GalleryEvent {
    /// A video was added, removed or renamed under the media root.
    CatalogChanged { total: usize },
    /// The shuffle epoch was replaced.
    Reshuffled { generation: u64 },
    /// A derived artifact was written.
    ArtifactReady {
        artifact: ArtifactKind,
        file_name: String,
    },
}

impl GalleryEvent {
    /// SSE event name for this payload.
    pub fn name(&self) -> &'static str {
        match self {
            GalleryEvent::CatalogChanged { .. } => "catalog_changed",
            GalleryEvent::Reshuffled { .. } => "reshuffled",
            GalleryEvent::ArtifactReady { .. } => "artifact_ready",
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GalleryEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a new event bus with a bounded broadcast channel.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<GalleryEvent> {
        self.sender.subscribe()
    }

    pub fn catalog_changed(&self, total: usize) {
        let _ = self.sender.send(GalleryEvent::CatalogChanged { total });
    }

    pub fn reshuffled(&self, generation: u64) {
        let _ = self.sender.send(GalleryEvent::Reshuffled { generation });
    }

    pub fn artifact_ready(&self, artifact: ArtifactKind, file_name: String) {
        let _ = self
            .sender
            .send(GalleryEvent::ArtifactReady { artifact, file_name });
    }
}
