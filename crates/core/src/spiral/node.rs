use std::collections::BTreeSet;

use crate::domain::ReactionKind;
use crate::spiral::config::SpiralConfig;
use crate::types::UserId;

/// Who is looking at the spiral. Passed in explicitly, never looked up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    user_id: Option<UserId>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn signed_in(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }
}

/// The "continue spiral" form attached to a node (or to the post itself).
#[derive(Debug, Clone, Default)]
pub struct Composer {
    pub(crate) visible: bool,
    pub(crate) draft: String,
    pub(crate) submitting: bool,
}

impl Composer {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub(crate) fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    pub(crate) fn write(&mut self, draft: &str) {
        self.visible = true;
        self.draft = draft.to_string();
    }

    pub(crate) fn close(&mut self) {
        self.visible = false;
        self.draft.clear();
    }
}

/// Local UI state of one reply node.
///
/// Expand/collapse and the composer are separate machines: one decides
/// whether children are drawn, the other owns a side-effecting form.
#[derive(Debug, Clone, Default)]
pub struct NodeState {
    /// `None` until the user toggles; the initial value depends on depth.
    pub(crate) expanded: Option<bool>,
    pub(crate) composer: Composer,
    pub(crate) active_reactions: BTreeSet<ReactionKind>,
    pub(crate) pending_reactions: BTreeSet<ReactionKind>,
}

impl NodeState {
    pub fn is_expanded(&self, depth: usize, config: &SpiralConfig) -> bool {
        self.expanded.unwrap_or(depth < config.auto_expand_depth)
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn is_active(&self, kind: ReactionKind) -> bool {
        self.active_reactions.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::{Composer, NodeState};
    use crate::spiral::config::SpiralConfig;

    #[test]
    fn initial_expand_state_follows_depth() {
        let config = SpiralConfig::default();
        let state = NodeState::default();
        assert!(state.is_expanded(0, &config));
        assert!(state.is_expanded(2, &config));
        assert!(!state.is_expanded(3, &config));
    }

    #[test]
    fn explicit_choice_wins_over_depth() {
        let config = SpiralConfig::default();
        let state = NodeState {
            expanded: Some(true),
            ..NodeState::default()
        };
        assert!(state.is_expanded(4, &config));
    }

    #[test]
    fn closing_the_composer_clears_the_draft() {
        let mut composer = Composer::default();
        composer.write("half a thought");
        assert!(composer.is_visible());
        composer.close();
        assert!(!composer.is_visible());
        assert_eq!(composer.draft(), "");
    }
}
