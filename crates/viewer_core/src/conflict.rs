//! Interactive conflict resolution
//!
//! A bulk move that hits a name collision under the "ask" strategy
//! parks here until the UI answers. At most one question is outstanding
//! at a time; later conflicts queue on the slot.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{oneshot, watch, Mutex as AsyncMutex};
use viewer_fs::MoveStrategy;

/// Concrete answer to a single conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Overwrite,
    Skip,
    Rename,
}

impl From<Resolution> for MoveStrategy {
    fn from(r: Resolution) -> Self {
        match r {
            Resolution::Overwrite => MoveStrategy::Overwrite,
            Resolution::Skip => MoveStrategy::Skip,
            Resolution::Rename => MoveStrategy::Rename,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictDecision {
    pub resolution: Resolution,
    /// Reuse this resolution for the rest of the batch.
    pub apply_to_all: bool,
}

/// What the UI needs to render the conflict prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRequest {
    /// Name of the item being moved.
    pub item: String,
    pub dest_dir: String,
    /// Name already occupying the destination.
    pub existing_name: String,
}

struct PendingConflict {
    request: ConflictRequest,
    tx: oneshot::Sender<ConflictDecision>,
}

pub struct ConflictResolver {
    /// Serializes questions; held for the full ask/answer round trip.
    slot: AsyncMutex<()>,
    pending: Mutex<Option<PendingConflict>>,
    changed: watch::Sender<u64>,
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConflictResolver {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            slot: AsyncMutex::new(()),
            pending: Mutex::new(None),
            changed,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    /// The currently outstanding question, if any.
    pub fn pending(&self) -> Option<ConflictRequest> {
        self.pending.lock().as_ref().map(|p| p.request.clone())
    }

    /// Publish a conflict and wait for the answer. A dropped prompt
    /// (e.g. the UI tearing down) resolves as skip.
    pub async fn ask(self: &Arc<Self>, request: ConflictRequest) -> ConflictDecision {
        let _guard = self.slot.lock().await;
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            debug_assert!(pending.is_none());
            *pending = Some(PendingConflict { request, tx });
        }
        self.changed.send_modify(|v| *v += 1);

        let decision = rx.await.unwrap_or(ConflictDecision {
            resolution: Resolution::Skip,
            apply_to_all: false,
        });
        self.changed.send_modify(|v| *v += 1);
        decision
    }

    /// Answer the outstanding question. Returns false if nothing was
    /// pending.
    pub fn resolve(&self, decision: ConflictDecision) -> bool {
        let taken = self.pending.lock().take();
        match taken {
            Some(p) => {
                // A closed receiver means the asking task is gone; the
                // answer is simply dropped.
                let _ = p.tx.send(decision);
                true
            }
            None => false,
        }
    }

    /// Abandon the outstanding question, resolving it as skip.
    pub fn dismiss(&self) -> bool {
        self.resolve(ConflictDecision {
            resolution: Resolution::Skip,
            apply_to_all: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request(item: &str) -> ConflictRequest {
        ConflictRequest {
            item: item.to_string(),
            dest_dir: "dest".to_string(),
            existing_name: item.to_string(),
        }
    }

    #[tokio::test]
    async fn test_ask_blocks_until_resolved() {
        let resolver = Arc::new(ConflictResolver::new());

        let r = resolver.clone();
        let asking = tokio::spawn(async move { r.ask(request("a.jpg")).await });

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(resolver.pending().unwrap().item, "a.jpg");

        assert!(resolver.resolve(ConflictDecision {
            resolution: Resolution::Rename,
            apply_to_all: true,
        }));
        let decision = asking.await.unwrap();
        assert_eq!(decision.resolution, Resolution::Rename);
        assert!(decision.apply_to_all);
        assert!(resolver.pending().is_none());
    }

    #[tokio::test]
    async fn test_questions_are_serialized() {
        let resolver = Arc::new(ConflictResolver::new());

        let r1 = resolver.clone();
        let first = tokio::spawn(async move { r1.ask(request("a.jpg")).await });
        tokio::time::sleep(Duration::from_millis(5)).await;
        let r2 = resolver.clone();
        let second = tokio::spawn(async move { r2.ask(request("b.jpg")).await });
        tokio::time::sleep(Duration::from_millis(5)).await;

        // Only the first question is visible until it is answered.
        assert_eq!(resolver.pending().unwrap().item, "a.jpg");
        resolver.resolve(ConflictDecision {
            resolution: Resolution::Skip,
            apply_to_all: false,
        });
        first.await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(resolver.pending().unwrap().item, "b.jpg");
        resolver.resolve(ConflictDecision {
            resolution: Resolution::Overwrite,
            apply_to_all: false,
        });
        assert_eq!(second.await.unwrap().resolution, Resolution::Overwrite);
    }

    #[tokio::test]
    async fn test_resolve_without_pending_is_noop() {
        let resolver = ConflictResolver::new();
        assert!(!resolver.resolve(ConflictDecision {
            resolution: Resolution::Skip,
            apply_to_all: false,
        }));
        assert!(!resolver.dismiss());
    }

    #[tokio::test]
    async fn test_dismiss_resolves_as_skip() {
        let resolver = Arc::new(ConflictResolver::new());
        let r = resolver.clone();
        let asking = tokio::spawn(async move { r.ask(request("a.jpg")).await });
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(resolver.dismiss());
        let decision = asking.await.unwrap();
        assert_eq!(decision.resolution, Resolution::Skip);
        assert!(!decision.apply_to_all);
    }
}
