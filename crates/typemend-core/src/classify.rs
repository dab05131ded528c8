//! Disposition rules for diagnostics the planner did not fix.

use crate::plan::Disposition;
use crate::scoring::Risk;

/// Decide the disposition for one residual diagnostic.
///
/// `generated` is the number of candidates produced for it (native plus
/// synthetic); `qualifying` holds the risk of every candidate whose
/// verification fixed the target with a positive score and positive resolved
/// weight. Budget exhaustion is handled by the caller, which labels
/// everything `NeedsJudgment` with a zero count without generating at all.
pub(crate) fn decide(generated: usize, qualifying: &[Risk]) -> (Disposition, usize) {
    if generated == 0 {
        return (Disposition::NoGeneratedCandidate, 0);
    }
    match qualifying {
        [] => (Disposition::NoVerifiedCandidate, 0),
        [risk] => {
            let disposition = match risk {
                Risk::Low | Risk::Medium => Disposition::AutoFixable,
                Risk::High => Disposition::AutoFixableHighRisk,
            };
            (disposition, 1)
        }
        several => (Disposition::NeedsJudgment, several.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_generated_candidate() {
        assert_eq!(decide(0, &[]), (Disposition::NoGeneratedCandidate, 0));
    }

    #[test]
    fn test_no_verified_candidate() {
        assert_eq!(decide(3, &[]), (Disposition::NoVerifiedCandidate, 0));
    }

    #[test]
    fn test_single_low_or_medium_is_auto_fixable() {
        assert_eq!(decide(2, &[Risk::Low]), (Disposition::AutoFixable, 1));
        assert_eq!(decide(2, &[Risk::Medium]), (Disposition::AutoFixable, 1));
    }

    #[test]
    fn test_single_high_is_auto_fixable_high_risk() {
        assert_eq!(
            decide(1, &[Risk::High]),
            (Disposition::AutoFixableHighRisk, 1)
        );
    }

    #[test]
    fn test_several_need_judgment() {
        assert_eq!(
            decide(4, &[Risk::Low, Risk::High]),
            (Disposition::NeedsJudgment, 2)
        );
    }
}
