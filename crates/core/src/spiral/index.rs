use std::collections::{HashMap, VecDeque};

use crate::domain::Reply;
use crate::types::{PostId, ReplyId};

/// Grouping key for sibling lists. `Root` collects the top-level replies of the post.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParentKey {
    Root,
    Reply(ReplyId),
}

/// The flat reply collection of one post, partitioned by parent.
///
/// Sibling lists keep `created_at` ascending order (ties by id). Replies are
/// sorted into four buckets while building:
/// - attached: reachable from the root, these are what gets rendered;
/// - promoted: the parent is unknown, so the reply is attached at the root;
/// - detached: the parent chain loops back on itself, the reply is dropped;
/// - foreign: the reply belongs to another post and is dropped.
#[derive(Debug, Clone, Default)]
pub struct SpiralIndex {
    replies: HashMap<ReplyId, Reply>,
    children: HashMap<ParentKey, Vec<ReplyId>>,
    depths: HashMap<ReplyId, usize>,
    order: Vec<ReplyId>,
    promoted: Vec<ReplyId>,
    detached: Vec<ReplyId>,
    foreign: Vec<ReplyId>,
}

impl SpiralIndex {
    pub fn build(post_id: &PostId, mut replies: Vec<Reply>) -> Self {
        replies.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut index = SpiralIndex::default();
        let mut candidates = Vec::with_capacity(replies.len());
        for reply in replies {
            if &reply.post_id != post_id {
                index.foreign.push(reply.id);
                continue;
            }
            if index.replies.contains_key(&reply.id) {
                continue;
            }
            candidates.push(reply.id.clone());
            index.replies.insert(reply.id.clone(), reply);
        }

        let mut grouped: HashMap<ParentKey, Vec<ReplyId>> = HashMap::new();
        for id in &candidates {
            let Some(reply) = index.replies.get(id) else {
                continue;
            };
            let key = match reply.parent_reply_id.as_ref() {
                Some(parent) if index.replies.contains_key(parent) => {
                    ParentKey::Reply(parent.clone())
                }
                Some(_) => {
                    index.promoted.push(id.clone());
                    ParentKey::Root
                }
                None => ParentKey::Root,
            };
            grouped.entry(key).or_default().push(id.clone());
        }

        let mut queue: VecDeque<(ReplyId, usize)> = grouped
            .get(&ParentKey::Root)
            .into_iter()
            .flatten()
            .map(|id| (id.clone(), 0))
            .collect();
        while let Some((id, depth)) = queue.pop_front() {
            if index.depths.insert(id.clone(), depth).is_some() {
                continue;
            }
            if let Some(kids) = grouped.get(&ParentKey::Reply(id)) {
                queue.extend(kids.iter().map(|kid| (kid.clone(), depth + 1)));
            }
        }

        // Anything the walk from the root never reached sits on a parent cycle.
        for id in candidates {
            if index.depths.contains_key(&id) {
                index.order.push(id);
            } else {
                index.replies.remove(&id);
                index.detached.push(id);
            }
        }
        for (key, kids) in grouped {
            let reachable = match &key {
                ParentKey::Root => true,
                ParentKey::Reply(parent) => index.depths.contains_key(parent),
            };
            if reachable {
                index.children.insert(key, kids);
            }
        }
        index
    }

    pub fn roots(&self) -> &[ReplyId] {
        self.children(&ParentKey::Root)
    }

    pub fn children(&self, key: &ParentKey) -> &[ReplyId] {
        self.children.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children_of(&self, id: &ReplyId) -> &[ReplyId] {
        self.children(&ParentKey::Reply(id.clone()))
    }

    pub fn get(&self, id: &ReplyId) -> Option<&Reply> {
        self.replies.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &ReplyId) -> Option<&mut Reply> {
        self.replies.get_mut(id)
    }

    pub fn contains(&self, id: &ReplyId) -> bool {
        self.replies.contains_key(id)
    }

    pub fn depth(&self, id: &ReplyId) -> Option<usize> {
        self.depths.get(id).copied()
    }

    /// Attached replies, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Reply> + '_ {
        self.order.iter().filter_map(|id| self.replies.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn promoted(&self) -> &[ReplyId] {
        &self.promoted
    }

    pub fn detached(&self) -> &[ReplyId] {
        &self.detached
    }

    pub fn foreign(&self) -> &[ReplyId] {
        &self.foreign
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{Duration, TimeZone, Utc};

    use super::{ParentKey, SpiralIndex};
    use crate::domain::{ReactionCounts, Reply};
    use crate::types::{PostId, ReplyId, UserId};

    fn reply(id: &str, parent: Option<&str>, minute: i64) -> Reply {
        reply_on("p1", id, parent, minute)
    }

    fn reply_on(post: &str, id: &str, parent: Option<&str>, minute: i64) -> Reply {
        Reply {
            id: ReplyId::try_from(id).unwrap(),
            post_id: PostId::try_from(post).unwrap(),
            author_id: UserId::try_from("u1").unwrap(),
            parent_reply_id: parent.map(|p| ReplyId::try_from(p).unwrap()),
            content: format!("reply {id}"),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minute),
            reactions: ReactionCounts::default(),
        }
    }

    fn post() -> PostId {
        PostId::try_from("p1").unwrap()
    }

    fn ids(list: &[ReplyId]) -> Vec<&str> {
        list.iter().map(ReplyId::as_str).collect()
    }

    #[test]
    fn partition_covers_every_reply_exactly_once() {
        let replies = vec![
            reply("a", None, 0),
            reply("b", Some("a"), 1),
            reply("c", Some("a"), 2),
            reply("d", Some("c"), 3),
            reply("e", None, 4),
            reply("f", Some("e"), 5),
        ];
        let expected: HashSet<String> = replies.iter().map(|r| r.id.to_string()).collect();
        let index = SpiralIndex::build(&post(), replies.clone());

        let mut seen = Vec::new();
        seen.extend(index.roots().iter().cloned());
        for reply in &replies {
            seen.extend(index.children_of(&reply.id).iter().cloned());
        }
        let unique: HashSet<String> = seen.iter().map(ToString::to_string).collect();
        assert_eq!(seen.len(), replies.len());
        assert_eq!(unique, expected);
        for reply in &replies {
            if let Some(parent) = &reply.parent_reply_id {
                assert!(index.children_of(parent).contains(&reply.id));
            }
        }
    }

    #[test]
    fn siblings_are_ordered_by_creation_time() {
        let index = SpiralIndex::build(
            &post(),
            vec![
                reply("late", Some("root"), 9),
                reply("root", None, 0),
                reply("early", Some("root"), 2),
                reply("tie-b", Some("root"), 5),
                reply("tie-a", Some("root"), 5),
            ],
        );
        let root = ReplyId::try_from("root").unwrap();
        assert_eq!(
            ids(index.children_of(&root)),
            vec!["early", "tie-a", "tie-b", "late"]
        );
        assert_eq!(index.depth(&root), Some(0));
        assert_eq!(index.depth(&ReplyId::try_from("late").unwrap()), Some(1));
    }

    #[test]
    fn orphans_are_promoted_to_the_root() {
        let index = SpiralIndex::build(
            &post(),
            vec![reply("a", None, 0), reply("lost", Some("gone"), 1)],
        );
        assert_eq!(ids(index.roots()), vec!["a", "lost"]);
        assert_eq!(ids(index.promoted()), vec!["lost"]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn replies_from_other_posts_are_dropped() {
        let index = SpiralIndex::build(
            &post(),
            vec![reply("a", None, 0), reply_on("p2", "x", Some("a"), 1)],
        );
        assert_eq!(ids(index.foreign()), vec!["x"]);
        assert!(index.children_of(&ReplyId::try_from("a").unwrap()).is_empty());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn parent_cycles_are_detached_instead_of_looping() {
        let index = SpiralIndex::build(
            &post(),
            vec![
                reply("a", None, 0),
                reply("x", Some("y"), 1),
                reply("y", Some("x"), 2),
                reply("z", Some("y"), 3),
                reply("self", Some("self"), 4),
            ],
        );
        assert_eq!(ids(index.roots()), vec!["a"]);
        assert_eq!(ids(index.detached()), vec!["x", "y", "z", "self"]);
        assert!(index.get(&ReplyId::try_from("x").unwrap()).is_none());
        assert!(index.children(&ParentKey::Reply(ReplyId::try_from("y").unwrap())).is_empty());
        assert_eq!(index.iter().count(), 1);
    }

    #[test]
    fn duplicate_ids_keep_the_oldest_copy() {
        let mut newer = reply("a", None, 5);
        newer.content = "newer".to_string();
        let index = SpiralIndex::build(&post(), vec![newer, reply("a", None, 0)]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&ReplyId::try_from("a").unwrap()).unwrap().content, "reply a");
    }
}
