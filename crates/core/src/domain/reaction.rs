use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The fixed set of sentiments a thought or reply can collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    FeltThat,
    MindBlown,
    MadeMeThink,
    SameSpiral,
    SendingWarmth,
}

/// Offered on nodes that have no reactions yet.
pub const QUICK_REACTIONS: [ReactionKind; 3] = [
    ReactionKind::FeltThat,
    ReactionKind::MindBlown,
    ReactionKind::MadeMeThink,
];

impl ReactionKind {
    pub const ALL: [ReactionKind; 5] = [
        ReactionKind::FeltThat,
        ReactionKind::MindBlown,
        ReactionKind::MadeMeThink,
        ReactionKind::SameSpiral,
        ReactionKind::SendingWarmth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReactionKind::FeltThat => "felt_that",
            ReactionKind::MindBlown => "mind_blown",
            ReactionKind::MadeMeThink => "made_me_think",
            ReactionKind::SameSpiral => "same_spiral",
            ReactionKind::SendingWarmth => "sending_warmth",
        }
    }
}

impl FromStr for ReactionKind {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        ReactionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == trimmed)
            .ok_or_else(|| CoreError::UnknownReaction(trimmed.to_string()))
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind counters. Kinds without an entry count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionCounts(BTreeMap<ReactionKind, u32>);

impl ReactionCounts {
    pub fn get(&self, kind: ReactionKind) -> u32 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn set(&mut self, kind: ReactionKind, count: u32) {
        if count == 0 {
            self.0.remove(&kind);
        } else {
            self.0.insert(kind, count);
        }
    }

    pub fn increment(&mut self, kind: ReactionKind) {
        let next = self.get(kind).saturating_add(1);
        self.set(kind, next);
    }

    pub fn decrement(&mut self, kind: ReactionKind) {
        let next = self.get(kind).saturating_sub(1);
        self.set(kind, next);
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|count| *count == 0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().map(|count| u64::from(*count)).sum()
    }

    /// Kinds with a positive count, in declaration order.
    pub fn nonzero(&self) -> impl Iterator<Item = (ReactionKind, u32)> + '_ {
        self.0
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(kind, count)| (*kind, *count))
    }
}

impl FromIterator<(ReactionKind, u32)> for ReactionCounts {
    fn from_iter<I: IntoIterator<Item = (ReactionKind, u32)>>(iter: I) -> Self {
        let mut counts = ReactionCounts::default();
        for (kind, count) in iter {
            let merged = counts.get(kind).saturating_add(count);
            counts.set(kind, merged);
        }
        counts
    }
}
