//! Writes currently running against the backend, shared by all requests.
//!
//! A view lives for one request, so its per-node "submitting" flag cannot see
//! a second request for the same node. This registry can.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use spiral_core::domain::ReactionKind;
use spiral_core::types::{PostId, ReplyId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Reply under a node, or under the post itself.
    Submit(Option<ReplyId>),
    React(ReplyId, ReactionKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InflightKey {
    pub user_id: UserId,
    pub post_id: PostId,
    pub operation: Operation,
}

#[derive(Debug, Default)]
pub struct InflightRegistry {
    running: Mutex<HashSet<InflightKey>>,
}

impl InflightRegistry {
    /// `None` when the same write is already running.
    pub fn try_begin(self: &Arc<Self>, key: InflightKey) -> Option<InflightGuard> {
        if !self.lock().insert(key.clone()) {
            return None;
        }
        Some(InflightGuard {
            registry: Arc::clone(self),
            key,
        })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<InflightKey>> {
        // The set stays consistent even if a holder panicked.
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the key when dropped.
#[derive(Debug)]
pub struct InflightGuard {
    registry: Arc<InflightRegistry>,
    key: InflightKey,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}
