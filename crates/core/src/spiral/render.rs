use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{ReactionCounts, ReactionKind, QUICK_REACTIONS};
use crate::spiral::config::SpiralConfig;
use crate::spiral::index::SpiralIndex;
use crate::spiral::node::{Composer, NodeState};
use crate::types::{ReplyId, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct RenderNode {
    pub id: ReplyId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub depth: usize,
    pub expanded: bool,
    pub child_count: usize,
    pub affordance: Affordance,
    pub reactions: ReactionDisplay,
    pub composer: ComposerView,
    pub children: Vec<RenderNode>,
}

/// What the node offers below its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Affordance {
    /// Leaf node.
    None,
    /// Expanded node; children are rendered.
    Collapse { count: usize },
    /// Collapsed node: "continue spiral (N)".
    ContinueSpiral { count: usize },
    /// Depth limit reached: "Spiral continues →". Children stay inert.
    SpiralContinues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReactionChip {
    pub kind: ReactionKind,
    pub count: u32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "chips", rename_all = "snake_case")]
pub enum ReactionDisplay {
    Counts(Vec<ReactionChip>),
    QuickReact(Vec<ReactionChip>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComposerView {
    pub visible: bool,
    pub draft: String,
    pub submitting: bool,
}

impl From<&Composer> for ComposerView {
    fn from(composer: &Composer) -> Self {
        Self {
            visible: composer.visible,
            draft: composer.draft.clone(),
            submitting: composer.submitting,
        }
    }
}

pub fn reaction_display(
    counts: &ReactionCounts,
    active: &BTreeSet<ReactionKind>,
) -> ReactionDisplay {
    if counts.is_empty() {
        return ReactionDisplay::QuickReact(
            QUICK_REACTIONS
                .into_iter()
                .map(|kind| ReactionChip {
                    kind,
                    count: 0,
                    active: active.contains(&kind),
                })
                .collect(),
        );
    }
    ReactionDisplay::Counts(
        counts
            .nonzero()
            .map(|(kind, count)| ReactionChip {
                kind,
                count,
                active: active.contains(&kind),
            })
            .collect(),
    )
}

/// Renders the spiral from the top-level replies down.
pub fn render(
    index: &SpiralIndex,
    nodes: &HashMap<ReplyId, NodeState>,
    config: &SpiralConfig,
) -> Vec<RenderNode> {
    let ctx = RenderContext {
        index,
        nodes,
        config,
        blank: NodeState::default(),
    };
    index
        .roots()
        .iter()
        .filter_map(|id| ctx.node(id, 0))
        .collect()
}

struct RenderContext<'a> {
    index: &'a SpiralIndex,
    nodes: &'a HashMap<ReplyId, NodeState>,
    config: &'a SpiralConfig,
    blank: NodeState,
}

impl RenderContext<'_> {
    fn node(&self, id: &ReplyId, depth: usize) -> Option<RenderNode> {
        let reply = self.index.get(id)?;
        let state = self.nodes.get(id).unwrap_or(&self.blank);
        let kids = self.index.children_of(id);
        let expanded = state.is_expanded(depth, self.config);

        let (affordance, children) = if kids.is_empty() {
            (Affordance::None, Vec::new())
        } else if depth >= self.config.max_level {
            (Affordance::SpiralContinues, Vec::new())
        } else if expanded {
            let children = kids
                .iter()
                .filter_map(|kid| self.node(kid, depth + 1))
                .collect();
            (Affordance::Collapse { count: kids.len() }, children)
        } else {
            (Affordance::ContinueSpiral { count: kids.len() }, Vec::new())
        };

        Some(RenderNode {
            id: reply.id.clone(),
            author_id: reply.author_id.clone(),
            content: reply.content.clone(),
            created_at: reply.created_at,
            depth,
            expanded,
            child_count: kids.len(),
            affordance,
            reactions: reaction_display(&reply.reactions, &state.active_reactions),
            composer: ComposerView::from(&state.composer),
            children,
        })
    }
}
