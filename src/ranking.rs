use crate::error::{IncomeReportError, Result};
use crate::format::format_thousands;
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label of the synthetic long-tail bucket.
pub const OTHER_LABEL: &str = "Other";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RankedBucket {
    pub label: String,
    pub amount: f64,
    /// 1-based position in the ranking.
    pub rank: usize,
    /// True only for the folded "Other" bucket.
    pub is_other: bool,
}

impl RankedBucket {
    /// Chart-legend form of the amount, in whole thousands.
    pub fn thousands_label(&self) -> String {
        format_thousands(self.amount)
    }
}

/// Orders groups descending by amount and folds every group below
/// `percent_threshold` percent of the total into one trailing "Other" bucket.
///
/// "Other" is appended last even when it outweighs shown buckets. It is only
/// emitted when something was folded, except for a zero total, where nothing
/// is folded and "Other" is emitted with a zero amount.
///
/// Groups with a non-finite amount are left out of the ranking so they
/// cannot poison the total.
pub fn rank<I, S>(groups: I, percent_threshold: f64) -> Result<Vec<RankedBucket>>
where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
{
    if !percent_threshold.is_finite() || !(0.0..=100.0).contains(&percent_threshold) {
        return Err(IncomeReportError::InvalidThreshold(percent_threshold));
    }

    let (sorted, skipped): (Vec<_>, Vec<_>) = sort_descending(groups)
        .into_iter()
        .partition(|(_, amount)| amount.is_finite());
    for (label, amount) in &skipped {
        warn!("Leaving '{}' out of the ranking: amount {} is not finite", label, amount);
    }
    let total: f64 = sorted.iter().map(|(_, amount)| amount).sum();

    if total == 0.0 {
        let mut buckets = number(sorted);
        buckets.push(other_bucket(0.0, buckets.len() + 1));
        return Ok(buckets);
    }

    let limit = total / 100.0 * percent_threshold;
    let (shown, hidden): (Vec<_>, Vec<_>) =
        sorted.into_iter().partition(|(_, amount)| *amount >= limit);

    let mut buckets = number(shown);
    if !hidden.is_empty() {
        let hidden_sum: f64 = hidden.iter().map(|(_, amount)| amount).sum();
        buckets.push(other_bucket(hidden_sum, buckets.len() + 1));
    }

    Ok(buckets)
}

/// Plain descending ranking without any folding.
pub fn rank_descending<I, S>(groups: I) -> Vec<RankedBucket>
where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
{
    number(sort_descending(groups))
}

fn sort_descending<I, S>(groups: I) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
{
    let mut sorted: Vec<(String, f64)> = groups
        .into_iter()
        .map(|(label, amount)| (label.into(), amount))
        .collect();
    // stable, so ties keep their input order
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
    sorted
}

fn number(groups: Vec<(String, f64)>) -> Vec<RankedBucket> {
    groups
        .into_iter()
        .enumerate()
        .map(|(i, (label, amount))| RankedBucket {
            label,
            amount,
            rank: i + 1,
            is_other: false,
        })
        .collect()
}

fn other_bucket(amount: f64, rank: usize) -> RankedBucket {
    RankedBucket {
        label: OTHER_LABEL.to_string(),
        amount,
        rank,
        is_other: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amounts(buckets: &[RankedBucket]) -> Vec<f64> {
        buckets.iter().map(|b| b.amount).collect()
    }

    #[test]
    fn test_small_groups_fold_into_other() {
        let groups = vec![("e", 5.0), ("b", 50.0), ("a", 100.0), ("d", 5.0), ("c", 30.0)];
        let buckets = rank(groups, 10.0).unwrap();

        assert_eq!(amounts(&buckets), vec![100.0, 50.0, 30.0, 10.0]);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "c", OTHER_LABEL]);
        assert!(buckets[3].is_other);
        assert_eq!(buckets[3].rank, 4);
        assert_eq!(buckets.iter().filter(|b| b.is_other).count(), 1);
    }

    #[test]
    fn test_other_is_not_resorted() {
        let groups = vec![("a", 100.0), ("b", 9.0), ("c", 9.0), ("d", 9.0), ("e", 9.0)];
        let buckets = rank(groups, 10.0).unwrap();
        assert_eq!(amounts(&buckets), vec![100.0, 36.0]);
        assert!(buckets.last().unwrap().is_other);
    }

    #[test]
    fn test_no_other_when_everything_passes() {
        let buckets = rank(vec![("a", 60.0), ("b", 40.0)], 5.0).unwrap();
        assert_eq!(buckets.len(), 2);
        assert!(buckets.iter().all(|b| !b.is_other));
    }

    #[test]
    fn test_threshold_boundary_is_kept() {
        // exactly 10% of 100 stays listed
        let buckets = rank(vec![("a", 90.0), ("b", 10.0)], 10.0).unwrap();
        assert_eq!(buckets.len(), 2);
    }

    #[test]
    fn test_zero_total_emits_all_unfolded() {
        let buckets = rank(vec![("a", 0.0), ("b", 0.0)], 10.0).unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].label, "a");
        assert_eq!(buckets[1].label, "b");
        assert!(buckets[2].is_other);
        assert_eq!(buckets[2].amount, 0.0);
    }

    #[test]
    fn test_non_finite_groups_are_left_out() {
        let groups = vec![("a", 1000.0), ("nan", f64::NAN), ("b", 500.0), ("inf", f64::INFINITY)];
        let buckets = rank(groups, 5.0).unwrap();

        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b"]);
        assert_eq!(amounts(&buckets), vec![1000.0, 500.0]);
        assert!(buckets.iter().all(|b| b.amount.is_finite()));
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(matches!(
            rank(vec![("a", 1.0)], 120.0),
            Err(IncomeReportError::InvalidThreshold(_))
        ));
        assert!(rank(vec![("a", 1.0)], f64::NAN).is_err());
    }

    #[test]
    fn test_rank_descending_keeps_ties_in_order() {
        let buckets = rank_descending(vec![("x", 1.0), ("y", 3.0), ("z", 1.0)]);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["y", "x", "z"]);
        assert_eq!(buckets[2].rank, 3);
        assert_eq!(buckets[0].thousands_label(), "0");
    }
}
