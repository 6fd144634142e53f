//! Mutation workflows: attach/detach reconciliation, tag create/rename, and
//! bulk delete.
//!
//! Every workflow sequences store calls and then reconciles the shared caches
//! from what the store actually confirmed. Partial failure never commits the
//! requested target: the association cache is patched to the confirmed set
//! only, and cascade-bearing failures fall back to forced revalidation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use futures::future;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tagfeed_core::{Error, Result, Tag, TagStore};

use crate::association_cache::AssociationCache;
use crate::catalog_cache::TagCatalogCache;
use crate::selection::Selection;

// =============================================================================
// PER-CHAT MUTUAL EXCLUSION
// =============================================================================

/// Per-chat-id async locks. Two concurrent edits of the same chat's tag set
/// serialize; edits of distinct chats proceed independently.
#[derive(Default)]
struct ChatLocks {
    inner: StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    fn acquire(&self, chat_id: Uuid) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().expect("chat lock map poisoned");
        Arc::clone(map.entry(chat_id).or_default())
    }
}

// =============================================================================
// OUTCOME TYPES
// =============================================================================

/// Which direction an association edit went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOp {
    Attach,
    Detach,
}

/// A single attach/detach call the store rejected.
#[derive(Debug)]
pub struct FailedTagOp {
    pub tag_id: Uuid,
    pub op: TagOp,
    pub error: Error,
}

/// Result of a chat tag edit: the confirmed tag set now in the cache, plus
/// every rejected call.
#[derive(Debug)]
pub struct ChatTagOutcome {
    /// The chat's tag list after reconciliation, exactly what the
    /// association cache now shows.
    pub applied: Vec<Tag>,
    pub failed: Vec<FailedTagOp>,
}

impl ChatTagOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Aggregate error for surfacing, when anything failed.
    pub fn error(&self) -> Option<Error> {
        self.failed.first().map(|first| Error::Partial {
            succeeded: self.applied.len(),
            failed: self.failed.len(),
            first_error: first.error.to_string(),
        })
    }
}

/// Result of a bulk tag delete.
#[derive(Debug)]
pub struct DeleteTagsOutcome {
    /// Snapshots of the tags the store confirmed deleted.
    pub deleted: Vec<Tag>,
    pub failed: Vec<(Uuid, Error)>,
}

impl DeleteTagsOutcome {
    pub fn deleted_ids(&self) -> HashSet<Uuid> {
        self.deleted.iter().map(|t| t.id).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn error(&self) -> Option<Error> {
        self.failed.first().map(|(_, first)| Error::Partial {
            succeeded: self.deleted.len(),
            failed: self.failed.len(),
            first_error: first.to_string(),
        })
    }
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// Sequences store mutations and reconciles the shared caches afterwards.
pub struct MutationOrchestrator {
    store: Arc<dyn TagStore>,
    associations: Arc<AssociationCache>,
    catalog: Arc<TagCatalogCache>,
    selection: Arc<Selection>,
    user_id: String,
    locks: ChatLocks,
}

impl MutationOrchestrator {
    pub fn new(
        store: Arc<dyn TagStore>,
        associations: Arc<AssociationCache>,
        catalog: Arc<TagCatalogCache>,
        selection: Arc<Selection>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            associations,
            catalog,
            selection,
            user_id: user_id.into(),
            locks: ChatLocks::default(),
        }
    }

    /// Edit a chat's tag set toward `target`.
    ///
    /// Computes the id-wise differences against the cache's current list,
    /// issues one independent store call per changed pair (attaches and
    /// detaches may interleave), waits for all of them to settle, then
    /// patches the association cache to the confirmed set: current plus
    /// confirmed attaches minus confirmed detaches. Rejected pairs stay
    /// exactly as the store left them.
    pub async fn set_chat_tags(&self, chat_id: Uuid, target: Vec<Tag>) -> Result<ChatTagOutcome> {
        let lock = self.locks.acquire(chat_id);
        let _guard = lock.lock().await;

        let current = self.associations.get(chat_id).await;
        let current_ids: HashSet<Uuid> = current.iter().map(|t| t.id).collect();
        let target_ids: HashSet<Uuid> = target.iter().map(|t| t.id).collect();

        let ops: Vec<(Tag, TagOp)> = target
            .iter()
            .filter(|t| !current_ids.contains(&t.id))
            .map(|t| (t.clone(), TagOp::Attach))
            .chain(
                current
                    .iter()
                    .filter(|t| !target_ids.contains(&t.id))
                    .map(|t| (t.clone(), TagOp::Detach)),
            )
            .collect();

        if ops.is_empty() {
            debug!(
                subsystem = "session",
                op = "set_chat_tags",
                chat_id = %chat_id,
                "target matches current, nothing to do"
            );
            return Ok(ChatTagOutcome {
                applied: current,
                failed: Vec::new(),
            });
        }

        // All calls settle before the cache is patched.
        let results = future::join_all(ops.into_iter().map(|(tag, op)| {
            let store = Arc::clone(&self.store);
            async move {
                let result = match op {
                    TagOp::Attach => store.attach(chat_id, tag.id).await.map(|_| ()),
                    TagOp::Detach => store.detach(chat_id, tag.id).await,
                };
                (tag, op, result)
            }
        }))
        .await;

        let mut confirmed_adds: Vec<Tag> = Vec::new();
        let mut confirmed_removes: HashSet<Uuid> = HashSet::new();
        let mut failed: Vec<FailedTagOp> = Vec::new();

        for (tag, op, result) in results {
            match (op, result) {
                (TagOp::Attach, Ok(())) => confirmed_adds.push(tag),
                (TagOp::Detach, Ok(())) => {
                    confirmed_removes.insert(tag.id);
                }
                (op, Err(error)) => failed.push(FailedTagOp {
                    tag_id: tag.id,
                    op,
                    error,
                }),
            }
        }

        let mut applied: Vec<Tag> = current
            .into_iter()
            .filter(|t| !confirmed_removes.contains(&t.id))
            .chain(confirmed_adds)
            .collect();
        applied.sort_by(|a, b| a.name.cmp(&b.name));

        self.associations.patch(chat_id, applied.clone()).await;

        if failed.is_empty() {
            info!(
                subsystem = "session",
                op = "set_chat_tags",
                chat_id = %chat_id,
                applied_count = applied.len(),
                "chat tags reconciled"
            );
        } else {
            warn!(
                subsystem = "session",
                op = "set_chat_tags",
                chat_id = %chat_id,
                applied_count = applied.len(),
                failed_count = failed.len(),
                "chat tag edit partially failed, cache holds confirmed set"
            );
        }

        Ok(ChatTagOutcome { applied, failed })
    }

    /// Create a tag and insert it into the catalog once confirmed. No
    /// optimistic insert happens before the store answers, so a failure
    /// leaves the catalog untouched.
    pub async fn create_tag(&self, name: &str) -> Result<Tag> {
        let tag = self.store.create_tag(name, &self.user_id).await?;
        info!(
            subsystem = "session",
            op = "create_tag",
            tag_id = %tag.id,
            tag_name = %tag.name,
            "tag created"
        );
        self.catalog.insert_local(tag.clone()).await;
        Ok(tag)
    }

    /// Rename a tag. Creator-only: a non-creator fails fast with `Forbidden`
    /// before any store mutation.
    pub async fn rename_tag(&self, id: Uuid, name: &str) -> Result<Tag> {
        let existing = self.store.get_tag(id).await?;
        if existing.created_by != self.user_id {
            return Err(Error::Forbidden(format!(
                "tag {} belongs to another user",
                id
            )));
        }

        match self.store.update_tag(id, name).await {
            Ok(tag) => {
                self.catalog.replace_local(tag.clone()).await;
                Ok(tag)
            }
            Err(err) => {
                // Discard whatever local state the failed rename invalidated.
                if let Err(refresh_err) = self.catalog.refresh().await {
                    warn!(
                        subsystem = "session",
                        op = "rename_tag",
                        error = %refresh_err,
                        "catalog refresh after failed rename also failed"
                    );
                }
                Err(err)
            }
        }
    }

    /// Delete a set of tags.
    ///
    /// Each tag is authorization-checked first (creator-only; a mismatch
    /// fails that id with `Forbidden` without contacting the store), then the
    /// authorized deletes are issued independently. Succeeded ids leave the
    /// catalog and the selected-tag set. Any success busts the association
    /// cache (the cascade silently dropped associations everywhere) and any
    /// failure additionally forces a full catalog refresh.
    pub async fn delete_tags(&self, ids: &[Uuid]) -> Result<DeleteTagsOutcome> {
        let mut authorized: Vec<Uuid> = Vec::new();
        let mut failed: Vec<(Uuid, Error)> = Vec::new();

        for &id in ids {
            match self.store.get_tag(id).await {
                Ok(tag) if tag.created_by == self.user_id => authorized.push(id),
                Ok(_) => failed.push((
                    id,
                    Error::Forbidden(format!("tag {} belongs to another user", id)),
                )),
                Err(err) => failed.push((id, err)),
            }
        }

        let results = future::join_all(authorized.into_iter().map(|id| {
            let store = Arc::clone(&self.store);
            async move { (id, store.delete_tag(id).await) }
        }))
        .await;

        let mut deleted: Vec<Tag> = Vec::new();
        for (id, result) in results {
            match result {
                Ok(tag) => deleted.push(tag),
                Err(err) => failed.push((id, err)),
            }
        }

        let outcome = DeleteTagsOutcome { deleted, failed };
        let deleted_ids = outcome.deleted_ids();

        if !deleted_ids.is_empty() {
            self.catalog.remove_local(&deleted_ids).await;
            self.selection.remove_ids(&deleted_ids).await;
            // The cascade removed associations the client cannot enumerate.
            self.associations.bust().await;
        }

        if !outcome.is_complete() {
            warn!(
                subsystem = "session",
                op = "delete_tags",
                applied_count = outcome.deleted.len(),
                failed_count = outcome.failed.len(),
                "bulk tag delete partially failed, discarding local optimism"
            );
            if let Err(refresh_err) = self.catalog.refresh().await {
                warn!(
                    subsystem = "session",
                    op = "delete_tags",
                    error = %refresh_err,
                    "catalog refresh after failed delete also failed"
                );
            }
            self.associations.bust().await;
        } else {
            info!(
                subsystem = "session",
                op = "delete_tags",
                applied_count = outcome.deleted.len(),
                "tags deleted"
            );
        }

        Ok(outcome)
    }
}
