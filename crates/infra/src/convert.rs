//! Shared mapping from backend rows to domain values.

use spiral_core::domain::{ReactionCounts, ReactionKind};
use spiral_core::error::CoreError;
use spiral_core::ports::StoreError;
use spiral_core::types::ReplyId;
use tracing::warn;

pub(crate) fn parse_id<T>(value: String) -> Result<T, StoreError>
where
    T: TryFrom<String, Error = CoreError>,
{
    T::try_from(value).map_err(|err| StoreError::InvalidData(err.to_string()))
}

/// Folds `(kind, count)` rows into counters. Kinds this build does not know
/// about are skipped rather than failing the whole spiral.
pub(crate) fn reaction_counts<I>(rows: I) -> ReactionCounts
where
    I: IntoIterator<Item = (String, i64)>,
{
    rows.into_iter()
        .filter_map(|(kind, count)| match kind.parse::<ReactionKind>() {
            Ok(kind) => Some((kind, u32::try_from(count.max(0)).unwrap_or(u32::MAX))),
            Err(_) => {
                warn!(kind = %kind, "ignoring unknown reaction kind");
                None
            }
        })
        .collect()
}

/// `(reply id, kind)` rows of one viewer. Unknown kinds are logged and skipped.
pub(crate) fn viewer_reactions<I>(rows: I) -> Result<Vec<(ReplyId, ReactionKind)>, StoreError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut reactions = Vec::new();
    for (reply_id, kind) in rows {
        match kind.parse::<ReactionKind>() {
            Ok(kind) => reactions.push((parse_id(reply_id)?, kind)),
            Err(_) => warn!(kind = %kind, "ignoring unknown viewer reaction"),
        }
    }
    Ok(reactions)
}

#[cfg(test)]
mod tests {
    use spiral_core::domain::ReactionKind;
    use spiral_core::types::ReplyId;

    use super::{parse_id, reaction_counts, viewer_reactions};

    #[test]
    fn unknown_kinds_and_negative_counts_are_ignored() {
        let counts = reaction_counts(vec![
            ("felt_that".to_string(), 2),
            ("sparkles".to_string(), 9),
            ("mind_blown".to_string(), -4),
        ]);
        assert_eq!(counts.get(ReactionKind::FeltThat), 2);
        assert_eq!(counts.get(ReactionKind::MindBlown), 0);
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn parse_id_reports_invalid_data() {
        assert!(parse_id::<ReplyId>("r1".to_string()).is_ok());
        assert!(parse_id::<ReplyId>(String::new()).is_err());
    }

    #[test]
    fn viewer_reactions_skip_unknown_kinds() {
        let reactions = viewer_reactions(vec![
            ("r1".to_string(), "felt_that".to_string()),
            ("r1".to_string(), "confetti".to_string()),
            ("r2".to_string(), "same_spiral".to_string()),
        ])
        .unwrap();
        assert_eq!(
            reactions,
            vec![
                (ReplyId::try_from("r1").unwrap(), ReactionKind::FeltThat),
                (ReplyId::try_from("r2").unwrap(), ReactionKind::SameSpiral),
            ]
        );
        assert!(viewer_reactions(vec![(" ".to_string(), "felt_that".to_string())]).is_err());
    }
}
