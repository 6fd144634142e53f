//! Ephemeral selected-tag filter set.
//!
//! UI-local and never persisted; intersected against the association cache
//! when deriving the filtered view. Deleting a tag removes it from here so a
//! dangling id cannot filter everything out.

use std::collections::HashSet;

use tokio::sync::RwLock;
use uuid::Uuid;

/// Shared set of tag ids the history view is currently filtered by.
#[derive(Default)]
pub struct Selection {
    inner: RwLock<HashSet<Uuid>>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the id when absent, remove it when present. Returns whether the
    /// id is selected afterwards.
    pub async fn toggle(&self, tag_id: Uuid) -> bool {
        let mut set = self.inner.write().await;
        if set.remove(&tag_id) {
            false
        } else {
            set.insert(tag_id);
            true
        }
    }

    pub async fn is_selected(&self, tag_id: Uuid) -> bool {
        self.inner.read().await.contains(&tag_id)
    }

    pub async fn selected(&self) -> HashSet<Uuid> {
        self.inner.read().await.clone()
    }

    pub async fn remove_ids(&self, ids: &HashSet<Uuid>) {
        let mut set = self.inner.write().await;
        set.retain(|id| !ids.contains(id));
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let selection = Selection::new();
        let id = Uuid::new_v4();

        assert!(selection.toggle(id).await);
        assert!(selection.is_selected(id).await);
        assert!(!selection.toggle(id).await);
        assert!(selection.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_ids() {
        let selection = Selection::new();
        let keep = Uuid::new_v4();
        let drop = Uuid::new_v4();
        selection.toggle(keep).await;
        selection.toggle(drop).await;

        selection.remove_ids(&[drop].into_iter().collect()).await;
        assert!(selection.is_selected(keep).await);
        assert!(!selection.is_selected(drop).await);
    }
}
