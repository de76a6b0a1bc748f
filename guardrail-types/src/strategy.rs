use serde::{Deserialize, Serialize};

use crate::validate::WorkerResult;

/// Aggregation policy mapping per-worker verdicts to a single flagged bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    #[default]
    AnyFlag,
    AllFlag,
    Majority,
    Threshold,
}

impl Strategy {
    /// Decide the final verdict from the set of results that actually
    /// returned (failed workers are absent, not scored as zero).
    ///
    /// Pure function of `results`: re-running it over the same slice always
    /// yields the same verdict.
    pub fn decide(self, results: &[&WorkerResult]) -> bool {
        if results.is_empty() {
            return false;
        }
        match self {
            Strategy::AnyFlag => results.iter().any(|r| r.flagged),
            Strategy::AllFlag => results.iter().all(|r| r.flagged),
            Strategy::Majority => {
                let flagged = results.iter().filter(|r| r.flagged).count();
                flagged > results.len() / 2
            }
            Strategy::Threshold => {
                let mean: f64 = results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64;
                mean > 0.5
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(flagged: bool, score: f64) -> WorkerResult {
        WorkerResult { flagged, score, details: vec![], latency_ms: 10 }
    }

    #[test]
    fn any_flag_true_if_one_flagged() {
        let a = result(false, 0.1);
        let b = result(true, 0.9);
        assert!(Strategy::AnyFlag.decide(&[&a, &b]));
    }

    #[test]
    fn all_flag_requires_every_result() {
        let a = result(true, 0.9);
        let b = result(false, 0.1);
        assert!(!Strategy::AllFlag.decide(&[&a, &b]));
        assert!(Strategy::AllFlag.decide(&[&a, &a]));
    }

    #[test]
    fn all_flag_empty_is_false() {
        assert!(!Strategy::AllFlag.decide(&[]));
    }

    #[test]
    fn majority_requires_strict_majority() {
        let flagged = result(true, 0.9);
        let clear = result(false, 0.1);
        // exactly half flagged (2 of 4) is not a majority
        assert!(!Strategy::Majority.decide(&[&flagged, &flagged, &clear, &clear]));
        assert!(Strategy::Majority.decide(&[&flagged, &flagged, &flagged, &clear]));
    }

    #[test]
    fn threshold_uses_mean_of_successful_scores() {
        let a = result(false, 0.9);
        let b = result(false, 0.9);
        let c = result(false, 0.1);
        // mean = 0.633... > 0.5
        assert!(Strategy::Threshold.decide(&[&a, &b, &c]));
    }

    #[test]
    fn empty_results_never_flag_under_any_strategy() {
        for s in [Strategy::AnyFlag, Strategy::AllFlag, Strategy::Majority, Strategy::Threshold] {
            assert!(!s.decide(&[]), "{s:?} should not flag with zero results");
        }
    }

    #[test]
    fn decide_is_idempotent() {
        let a = result(true, 0.9);
        let b = result(false, 0.2);
        let inputs = [&a, &b];
        assert_eq!(Strategy::Majority.decide(&inputs), Strategy::Majority.decide(&inputs));
    }
}
