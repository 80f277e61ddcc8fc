//! Selector Context
//!
//! Structural facts about the analysis design. These are stated by the
//! caller (or read off explicit columns), never guessed from data shape.

use serde::{Deserialize, Serialize};
use testwise_stats::GroupedSample;

/// Design description the method selector decides against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectorContext {
    /// A subject/entity identifier column is present
    pub hierarchical: bool,
    /// Observations are paired (repeated measures without an identifier)
    pub paired: bool,
    /// Number of independent groups; `None` when not stated
    pub group_count: Option<usize>,
}

impl SelectorContext {
    /// Independent groups with a stated group count
    pub fn independent(group_count: usize) -> Self {
        Self {
            group_count: Some(group_count),
            ..Self::default()
        }
    }

    /// Set the pairing flag
    pub fn with_paired(mut self, paired: bool) -> Self {
        self.paired = paired;
        self
    }

    /// Set the hierarchy flag
    pub fn with_hierarchical(mut self, hierarchical: bool) -> Self {
        self.hierarchical = hierarchical;
        self
    }

    /// Set the group count
    pub fn with_group_count(mut self, group_count: Option<usize>) -> Self {
        self.group_count = group_count;
        self
    }

    /// Read the design off a grouped sample.
    ///
    /// The group count is always stated: the number of groups, or 1 when no
    /// group column was configured (the whole sample is one group).
    pub fn from_grouped(grouped: &GroupedSample) -> Self {
        Self {
            hierarchical: grouped.is_hierarchical(),
            paired: grouped.is_paired(),
            group_count: Some(grouped.group_count().unwrap_or(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testwise_stats::Table;

    #[test]
    fn test_builders() {
        let ctx = SelectorContext::independent(2)
            .with_paired(true)
            .with_hierarchical(true);
        assert!(ctx.paired);
        assert!(ctx.hierarchical);
        assert_eq!(ctx.group_count, Some(2));
        assert_eq!(SelectorContext::default().group_count, None);
    }

    #[test]
    fn test_from_grouped() {
        let table = Table::new()
            .with_numeric("y", vec![1.0, 2.0, 3.0, 4.0])
            .unwrap()
            .with_text("g", ["a", "b", "a", "b"])
            .unwrap()
            .with_text("id", ["s1", "s1", "s2", "s2"])
            .unwrap();

        let grouped = GroupedSample::new(&table, "y", Some("g"), None)
            .unwrap()
            .with_pairing(true);
        let ctx = SelectorContext::from_grouped(&grouped);
        assert_eq!(ctx, SelectorContext::independent(2).with_paired(true));

        let nested = GroupedSample::new(&table, "y", Some("g"), Some("id")).unwrap();
        assert!(SelectorContext::from_grouped(&nested).hierarchical);

        let single = GroupedSample::new(&table, "y", None, None).unwrap();
        assert_eq!(SelectorContext::from_grouped(&single).group_count, Some(1));
    }
}
