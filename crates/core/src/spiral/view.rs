use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{normalize_content, NewReply, Post, ReactionKind, Reply};
use crate::ports::{Notice, Notifier, ReplyStore, StoreError};
use crate::spiral::config::SpiralConfig;
use crate::spiral::error::SpiralError;
use crate::spiral::index::SpiralIndex;
use crate::spiral::node::{Composer, NodeState, Viewer};
use crate::spiral::render::{self, reaction_display, ComposerView, ReactionDisplay, RenderNode};
use crate::types::{PostId, ReplyId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PostStatus {
    /// Nothing loaded yet.
    Unknown,
    Missing,
    Scheduled { release_at: DateTime<Utc> },
    Open,
}

/// An optimistic reaction flip waiting for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionChange {
    pub reply_id: ReplyId,
    pub user_id: UserId,
    pub kind: ReactionKind,
    pub active: bool,
}

/// The spiral of one post as seen by one viewer.
///
/// Holds the reply collection and every node's local state. Writes are split
/// into `begin_*`/`finish_*` so a caller can release the view while the
/// backend call runs; `submit_reply` and `toggle_reaction` chain the steps.
#[derive(Debug, Clone)]
pub struct SpiralView {
    post_id: PostId,
    viewer: Viewer,
    config: SpiralConfig,
    post: Option<Post>,
    status: PostStatus,
    index: SpiralIndex,
    nodes: HashMap<ReplyId, NodeState>,
    root_composer: Composer,
}

impl SpiralView {
    pub fn new(post_id: PostId, viewer: Viewer, config: SpiralConfig) -> Self {
        Self {
            post_id,
            viewer,
            config,
            post: None,
            status: PostStatus::Unknown,
            index: SpiralIndex::default(),
            nodes: HashMap::new(),
            root_composer: Composer::default(),
        }
    }

    pub fn post_id(&self) -> &PostId {
        &self.post_id
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn config(&self) -> &SpiralConfig {
        &self.config
    }

    pub fn post(&self) -> Option<&Post> {
        self.post.as_ref()
    }

    pub fn status(&self) -> PostStatus {
        self.status
    }

    pub fn index(&self) -> &SpiralIndex {
        &self.index
    }

    /// Loads the post, then its replies. A missing or scheduled post leaves
    /// the spiral empty.
    pub async fn load<S, N>(&mut self, store: &S, notifier: &N) -> Result<(), SpiralError>
    where
        S: ReplyStore,
        N: Notifier,
    {
        let post = match store.fetch_post(&self.post_id).await {
            Ok(post) => post,
            Err(err) => return Err(report(notifier, err.into())),
        };
        self.status = match post.as_ref() {
            None => PostStatus::Missing,
            Some(post) if !post.is_released(Utc::now()) => PostStatus::Scheduled {
                release_at: post.release_at.unwrap_or_else(Utc::now),
            },
            Some(_) => PostStatus::Open,
        };
        self.post = post;
        if self.status != PostStatus::Open {
            self.index = SpiralIndex::default();
            self.nodes.clear();
            return Ok(());
        }
        self.refresh(store, notifier).await
    }

    /// Re-fetches the whole reply collection and swaps it in. On failure the
    /// previous collection stays visible.
    pub async fn refresh<S, N>(&mut self, store: &S, notifier: &N) -> Result<(), SpiralError>
    where
        S: ReplyStore,
        N: Notifier,
    {
        let replies = match store.fetch_replies(&self.post_id).await {
            Ok(replies) => replies,
            Err(err) => return Err(report(notifier, err.into())),
        };
        let active = match self.viewer.user_id() {
            Some(user_id) => match store.fetch_viewer_reactions(&self.post_id, user_id).await {
                Ok(active) => Some(active),
                Err(err) => return Err(report(notifier, err.into())),
            },
            None => None,
        };

        self.index = SpiralIndex::build(&self.post_id, replies);
        self.nodes.retain(|id, _| self.index.contains(id));
        if let Some(active) = active {
            for state in self.nodes.values_mut() {
                state.active_reactions.clear();
            }
            for (reply_id, kind) in active {
                if self.index.contains(&reply_id) {
                    self.nodes
                        .entry(reply_id)
                        .or_default()
                        .active_reactions
                        .insert(kind);
                }
            }
        }
        Ok(())
    }

    pub fn render(&self) -> Vec<RenderNode> {
        render::render(&self.index, &self.nodes, &self.config)
    }

    /// `None` when the reply is not part of the spiral.
    pub fn is_expanded(&self, id: &ReplyId) -> Option<bool> {
        let depth = self.index.depth(id)?;
        Some(match self.nodes.get(id) {
            Some(state) => state.is_expanded(depth, &self.config),
            None => depth < self.config.auto_expand_depth,
        })
    }

    pub fn set_expanded(&mut self, id: &ReplyId, expanded: bool) -> Result<(), SpiralError> {
        self.node_mut(id)?.expanded = Some(expanded);
        Ok(())
    }

    pub fn toggle_expanded(&mut self, id: &ReplyId) -> Result<bool, SpiralError> {
        let next = !self
            .is_expanded(id)
            .ok_or_else(|| SpiralError::ReplyNotFound(id.clone()))?;
        self.set_expanded(id, next)?;
        Ok(next)
    }

    /// Composer of a reply node, or of the post itself when `target` is `None`.
    pub fn composer(&self, target: Option<&ReplyId>) -> Option<ComposerView> {
        match target {
            None => Some(ComposerView::from(&self.root_composer)),
            Some(id) if self.index.contains(id) => Some(
                self.nodes
                    .get(id)
                    .map(|state| ComposerView::from(&state.composer))
                    .unwrap_or_default(),
            ),
            Some(_) => None,
        }
    }

    pub fn toggle_composer(&mut self, target: Option<&ReplyId>) -> Result<bool, SpiralError> {
        Ok(self.composer_mut(target)?.toggle())
    }

    /// Replaces the draft and makes the composer visible.
    pub fn write_draft(&mut self, target: Option<&ReplyId>, draft: &str) -> Result<(), SpiralError> {
        self.composer_mut(target)?.write(draft);
        Ok(())
    }

    pub fn reaction_display(&self, id: &ReplyId) -> Option<ReactionDisplay> {
        let reply = self.index.get(id)?;
        let display = match self.nodes.get(id) {
            Some(state) => reaction_display(&reply.reactions, &state.active_reactions),
            None => reaction_display(&reply.reactions, &Default::default()),
        };
        Some(display)
    }

    /// Validates the composer's draft and marks it as submitting.
    pub fn begin_submit<N: Notifier>(
        &mut self,
        target: Option<&ReplyId>,
        notifier: &N,
    ) -> Result<NewReply, SpiralError> {
        self.prepare_submit(target)
            .map_err(|err| report(notifier, err))
    }

    pub fn finish_submit<N: Notifier>(
        &mut self,
        target: Option<&ReplyId>,
        result: Result<Reply, StoreError>,
        notifier: &N,
    ) -> Result<Reply, SpiralError> {
        let composer = self.composer_entry(target);
        composer.submitting = false;
        match result {
            Ok(reply) => {
                composer.close();
                notifier.notify(Notice::success("Added to the spiral"));
                Ok(reply)
            }
            Err(err) => Err(report(notifier, err.into())),
        }
    }

    /// Writes the composer's draft as a new reply, then reloads the spiral.
    pub async fn submit_reply<S, N>(
        &mut self,
        target: Option<&ReplyId>,
        store: &S,
        notifier: &N,
    ) -> Result<Reply, SpiralError>
    where
        S: ReplyStore,
        N: Notifier,
    {
        let new_reply = self.begin_submit(target, notifier)?;
        let result = store.create_reply(&new_reply).await;
        let reply = self.finish_submit(target, result, notifier)?;
        // The reply is stored either way; a failed reload was already reported.
        let _ = self.refresh(store, notifier).await;
        Ok(reply)
    }

    /// Flips the viewer's reaction locally and returns the change to persist.
    pub fn begin_reaction<N: Notifier>(
        &mut self,
        reply_id: &ReplyId,
        kind: ReactionKind,
        notifier: &N,
    ) -> Result<ReactionChange, SpiralError> {
        self.prepare_reaction(reply_id, kind)
            .map_err(|err| report(notifier, err))
    }

    /// Settles a reaction change; a failed write reverts the local flip.
    pub fn finish_reaction<N: Notifier>(
        &mut self,
        change: &ReactionChange,
        result: Result<(), StoreError>,
        notifier: &N,
    ) -> Result<(), SpiralError> {
        if let Some(state) = self.nodes.get_mut(&change.reply_id) {
            state.pending_reactions.remove(&change.kind);
        }
        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                if let (Some(reply), Some(state)) = (
                    self.index.get_mut(&change.reply_id),
                    self.nodes.get_mut(&change.reply_id),
                ) {
                    flip_reaction(reply, state, change.kind, !change.active);
                }
                Err(report(notifier, err.into()))
            }
        }
    }

    /// Returns whether the reaction is active afterwards.
    pub async fn toggle_reaction<S, N>(
        &mut self,
        reply_id: &ReplyId,
        kind: ReactionKind,
        store: &S,
        notifier: &N,
    ) -> Result<bool, SpiralError>
    where
        S: ReplyStore,
        N: Notifier,
    {
        let change = self.begin_reaction(reply_id, kind, notifier)?;
        let result = store
            .set_reaction(&change.reply_id, &change.user_id, change.kind, change.active)
            .await;
        self.finish_reaction(&change, result, notifier)?;
        Ok(change.active)
    }

    fn prepare_submit(&mut self, target: Option<&ReplyId>) -> Result<NewReply, SpiralError> {
        self.ensure_writable()?;
        let author_id = self
            .viewer
            .user_id()
            .cloned()
            .ok_or(SpiralError::AuthenticationRequired)?;
        let max_content_len = self.config.max_content_len;
        let post_id = self.post_id.clone();
        let composer = self.composer_mut(target)?;
        if composer.submitting {
            return Err(SpiralError::AlreadySubmitting);
        }
        let content = normalize_content(&composer.draft, max_content_len)?;
        composer.submitting = true;
        Ok(NewReply {
            post_id,
            author_id,
            parent_reply_id: target.cloned(),
            content,
        })
    }

    fn prepare_reaction(
        &mut self,
        reply_id: &ReplyId,
        kind: ReactionKind,
    ) -> Result<ReactionChange, SpiralError> {
        self.ensure_writable()?;
        let user_id = self
            .viewer
            .user_id()
            .cloned()
            .ok_or(SpiralError::AuthenticationRequired)?;
        let reply = self
            .index
            .get_mut(reply_id)
            .ok_or_else(|| SpiralError::ReplyNotFound(reply_id.clone()))?;
        let state = self.nodes.entry(reply_id.clone()).or_default();
        if !state.pending_reactions.insert(kind) {
            return Err(SpiralError::ReactionPending);
        }
        let active = !state.active_reactions.contains(&kind);
        flip_reaction(reply, state, kind, active);
        Ok(ReactionChange {
            reply_id: reply_id.clone(),
            user_id,
            kind,
            active,
        })
    }

    fn ensure_writable(&self) -> Result<(), SpiralError> {
        match self.status {
            PostStatus::Missing => Err(SpiralError::PostNotFound),
            PostStatus::Scheduled { .. } => Err(SpiralError::NotReleased),
            PostStatus::Unknown | PostStatus::Open => Ok(()),
        }
    }

    fn node_mut(&mut self, id: &ReplyId) -> Result<&mut NodeState, SpiralError> {
        if !self.index.contains(id) {
            return Err(SpiralError::ReplyNotFound(id.clone()));
        }
        Ok(self.nodes.entry(id.clone()).or_default())
    }

    fn composer_mut(&mut self, target: Option<&ReplyId>) -> Result<&mut Composer, SpiralError> {
        match target {
            None => Ok(&mut self.root_composer),
            Some(id) => Ok(&mut self.node_mut(id)?.composer),
        }
    }

    fn composer_entry(&mut self, target: Option<&ReplyId>) -> &mut Composer {
        match target {
            None => &mut self.root_composer,
            Some(id) => &mut self.nodes.entry(id.clone()).or_default().composer,
        }
    }
}

fn flip_reaction(reply: &mut Reply, state: &mut NodeState, kind: ReactionKind, active: bool) {
    if active {
        if state.active_reactions.insert(kind) {
            reply.reactions.increment(kind);
        }
    } else if state.active_reactions.remove(&kind) {
        reply.reactions.decrement(kind);
    }
}

fn report<N: Notifier>(notifier: &N, err: SpiralError) -> SpiralError {
    notifier.notify(Notice::error(err.user_message()));
    err
}
