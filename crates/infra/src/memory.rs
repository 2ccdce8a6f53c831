//! Process-local store used for development and tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use spiral_core::domain::{NewReply, Post, ReactionCounts, ReactionKind, Reply};
use spiral_core::ports::{ReplyStore, StoreError};
use spiral_core::types::{PostId, ReplyId, UserId};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct MemoryReplyStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    posts: HashMap<PostId, Post>,
    replies: Vec<Reply>,
    reactions: HashSet<(ReplyId, UserId, ReactionKind)>,
}

impl MemoryState {
    fn reply(&self, id: &ReplyId) -> Option<&Reply> {
        self.replies.iter().find(|reply| &reply.id == id)
    }

    fn counts_for(&self, id: &ReplyId) -> ReactionCounts {
        self.reactions
            .iter()
            .filter(|(reply_id, _, _)| reply_id == id)
            .map(|(_, _, kind)| (*kind, 1))
            .collect()
    }
}

impl MemoryReplyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_post(&self, post: Post) {
        let mut state = self.state.write().await;
        state.posts.insert(post.id.clone(), post);
    }

    /// Stores a reply as given, keeping its id and timestamp. Stored reaction
    /// counts are ignored; counts always come from recorded reactions.
    pub async fn insert_reply(&self, mut reply: Reply) {
        reply.reactions = ReactionCounts::default();
        let mut state = self.state.write().await;
        state.replies.retain(|existing| existing.id != reply.id);
        state.replies.push(reply);
    }

    pub async fn reply_count(&self, post_id: &PostId) -> usize {
        let state = self.state.read().await;
        state
            .replies
            .iter()
            .filter(|reply| &reply.post_id == post_id)
            .count()
    }
}

impl ReplyStore for MemoryReplyStore {
    async fn fetch_post(&self, post_id: &PostId) -> Result<Option<Post>, StoreError> {
        let state = self.state.read().await;
        Ok(state.posts.get(post_id).cloned())
    }

    async fn fetch_replies(&self, post_id: &PostId) -> Result<Vec<Reply>, StoreError> {
        let state = self.state.read().await;
        let mut replies: Vec<Reply> = state
            .replies
            .iter()
            .filter(|reply| &reply.post_id == post_id)
            .map(|reply| Reply {
                reactions: state.counts_for(&reply.id),
                ..reply.clone()
            })
            .collect();
        replies.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(replies)
    }

    async fn fetch_viewer_reactions(
        &self,
        post_id: &PostId,
        user_id: &UserId,
    ) -> Result<Vec<(ReplyId, ReactionKind)>, StoreError> {
        let state = self.state.read().await;
        let mut reactions: Vec<(ReplyId, ReactionKind)> = state
            .reactions
            .iter()
            .filter(|(reply_id, user, _)| {
                user == user_id
                    && state
                        .reply(reply_id)
                        .is_some_and(|reply| &reply.post_id == post_id)
            })
            .map(|(reply_id, _, kind)| (reply_id.clone(), *kind))
            .collect();
        reactions.sort();
        Ok(reactions)
    }

    async fn create_reply(&self, reply: &NewReply) -> Result<Reply, StoreError> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&reply.post_id) {
            return Err(StoreError::Rejected(format!(
                "unknown post {}",
                reply.post_id
            )));
        }
        if let Some(parent) = &reply.parent_reply_id {
            let same_post = state
                .reply(parent)
                .is_some_and(|existing| existing.post_id == reply.post_id);
            if !same_post {
                return Err(StoreError::Rejected(format!(
                    "parent {parent} is not a reply of post {}",
                    reply.post_id
                )));
            }
        }

        // Keep creation times strictly increasing so ordering stays stable
        // when several replies land within one clock tick.
        let mut created_at = Utc::now();
        if let Some(latest) = state.replies.iter().map(|existing| existing.created_at).max() {
            if created_at <= latest {
                created_at = latest + Duration::microseconds(1);
            }
        }
        let stored = Reply {
            id: ReplyId::try_from(Uuid::new_v4().to_string())
                .map_err(|err| StoreError::InvalidData(err.to_string()))?,
            post_id: reply.post_id.clone(),
            author_id: reply.author_id.clone(),
            parent_reply_id: reply.parent_reply_id.clone(),
            content: reply.content.clone(),
            created_at,
            reactions: ReactionCounts::default(),
        };
        state.replies.push(stored.clone());
        Ok(stored)
    }

    async fn set_reaction(
        &self,
        reply_id: &ReplyId,
        user_id: &UserId,
        kind: ReactionKind,
        active: bool,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.reply(reply_id).is_none() {
            return Err(StoreError::Rejected(format!("unknown reply {reply_id}")));
        }
        let key = (reply_id.clone(), user_id.clone(), kind);
        if active {
            state.reactions.insert(key);
        } else {
            state.reactions.remove(&key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use spiral_core::domain::{NewReply, Post, ReactionCounts, ReactionKind, Reply};
    use spiral_core::ports::{ReplyStore, StoreError};
    use spiral_core::types::{PostId, ReplyId, UserId};

    use super::MemoryReplyStore;

    fn post(id: &str) -> Post {
        Post {
            id: PostId::try_from(id).unwrap(),
            author_id: UserId::try_from("author").unwrap(),
            title: "a thought".to_string(),
            content: "spirals all the way down".to_string(),
            tags: Vec::new(),
            reactions: ReactionCounts::default(),
            media: None,
            release_at: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn new_reply(post: &str, parent: Option<&ReplyId>, content: &str) -> NewReply {
        NewReply {
            post_id: PostId::try_from(post).unwrap(),
            author_id: UserId::try_from("u1").unwrap(),
            parent_reply_id: parent.cloned(),
            content: content.to_string(),
        }
    }

    async fn seeded() -> MemoryReplyStore {
        let store = MemoryReplyStore::new();
        store.insert_post(post("p1")).await;
        store.insert_post(post("p2")).await;
        store
    }

    #[tokio::test]
    async fn created_replies_come_back_in_creation_order() {
        let store = seeded().await;
        let first = store.create_reply(&new_reply("p1", None, "one")).await.unwrap();
        let second = store
            .create_reply(&new_reply("p1", Some(&first.id), "two"))
            .await
            .unwrap();
        assert!(second.created_at > first.created_at);

        let replies = store.fetch_replies(&PostId::try_from("p1").unwrap()).await.unwrap();
        let ids: Vec<&ReplyId> = replies.iter().map(|reply| &reply.id).collect();
        assert_eq!(ids, vec![&first.id, &second.id]);
        assert_eq!(replies[1].parent_reply_id.as_ref(), Some(&first.id));
    }

    #[tokio::test]
    async fn parents_must_belong_to_the_same_post() {
        let store = seeded().await;
        let elsewhere = store.create_reply(&new_reply("p2", None, "hi")).await.unwrap();
        let err = store
            .create_reply(&new_reply("p1", Some(&elsewhere.id), "crossing over"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        assert_eq!(store.reply_count(&PostId::try_from("p1").unwrap()).await, 0);
    }

    #[tokio::test]
    async fn replies_to_unknown_posts_are_rejected() {
        let store = seeded().await;
        let err = store.create_reply(&new_reply("nope", None, "hello")).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[tokio::test]
    async fn reactions_are_idempotent_and_counted() {
        let store = seeded().await;
        let reply = store.create_reply(&new_reply("p1", None, "one")).await.unwrap();
        let alice = UserId::try_from("alice").unwrap();
        let bob = UserId::try_from("bob").unwrap();
        for _ in 0..2 {
            store
                .set_reaction(&reply.id, &alice, ReactionKind::MindBlown, true)
                .await
                .unwrap();
        }
        store
            .set_reaction(&reply.id, &bob, ReactionKind::MindBlown, true)
            .await
            .unwrap();
        store
            .set_reaction(&reply.id, &bob, ReactionKind::FeltThat, false)
            .await
            .unwrap();

        let post_id = PostId::try_from("p1").unwrap();
        let replies = store.fetch_replies(&post_id).await.unwrap();
        assert_eq!(replies[0].reactions.get(ReactionKind::MindBlown), 2);
        assert_eq!(replies[0].reactions.total(), 2);
        assert_eq!(
            store.fetch_viewer_reactions(&post_id, &alice).await.unwrap(),
            vec![(reply.id.clone(), ReactionKind::MindBlown)]
        );

        store
            .set_reaction(&reply.id, &alice, ReactionKind::MindBlown, false)
            .await
            .unwrap();
        assert!(store
            .fetch_viewer_reactions(&post_id, &alice)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn seeded_replies_keep_their_ids() {
        let store = seeded().await;
        let seeded = Reply {
            id: ReplyId::try_from("r-seed").unwrap(),
            post_id: PostId::try_from("p1").unwrap(),
            author_id: UserId::try_from("u1").unwrap(),
            parent_reply_id: None,
            content: "first!".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            reactions: [(ReactionKind::FeltThat, 7)].into_iter().collect(),
        };
        store.insert_reply(seeded).await;
        let replies = store.fetch_replies(&PostId::try_from("p1").unwrap()).await.unwrap();
        assert_eq!(replies[0].id.as_str(), "r-seed");
        assert!(replies[0].reactions.is_empty());
    }
}
