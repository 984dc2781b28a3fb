use serde::Serialize;

use crate::snapshot::{
    Metrics, ACTIVE_STUDENTS, ACTIVE_STUDENTS_PREV, CHILDREN_ENROLLED, CHILDREN_ENROLLED_PREV_TERM_END,
    CHILDREN_ENROLLED_TERM_START, LF_MEMBERS, LF_TRIALS, RETURNING_STUDENTS,
};

/// Change of a count against a baseline. `ratio` is unrounded and absent when the
/// baseline is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Delta {
    pub current: f64,
    pub baseline: f64,
    pub absolute: f64,
    pub ratio: Option<f64>,
}

impl Delta {
    pub fn between(current: f64, baseline: f64) -> Self {
        Delta {
            current,
            baseline,
            absolute: current - baseline,
            ratio: (baseline != 0.0).then(|| (current - baseline) / baseline),
        }
    }
}

/// Every value computed rather than read from the snapshot. `None` means a
/// required input was missing or non-numeric; it is never folded into zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    /// members / (members + trials)
    pub trial_conversion: Option<f64>,
    /// active students against the previous term
    pub term_delta: Option<Delta>,
    /// returning / previous term
    pub retention: Option<f64>,
    /// previous term - returning
    pub churn: Option<f64>,
    pub enrolled_vs_term_start: Option<Delta>,
    pub enrolled_vs_prev_term_end: Option<Delta>,
}

pub fn derive(metrics: &Metrics) -> DerivedMetrics {
    let members = metrics.number(LF_MEMBERS);
    let trials = metrics.number(LF_TRIALS);
    let active = metrics.number(ACTIVE_STUDENTS);
    let active_prev = metrics.number(ACTIVE_STUDENTS_PREV);
    let returning = metrics.number(RETURNING_STUDENTS);
    let enrolled = metrics.number(CHILDREN_ENROLLED);

    DerivedMetrics {
        trial_conversion: both(members, trials).and_then(|(m, t)| conversion_rate(m, t)),
        term_delta: both(active, active_prev).map(|(c, p)| Delta::between(c, p)),
        retention: both(returning, active_prev).and_then(|(r, p)| (p != 0.0).then(|| r / p)),
        churn: both(returning, active_prev).map(|(r, p)| p - r),
        enrolled_vs_term_start: both(enrolled, metrics.number(CHILDREN_ENROLLED_TERM_START))
            .map(|(c, b)| Delta::between(c, b)),
        enrolled_vs_prev_term_end: both(enrolled, metrics.number(CHILDREN_ENROLLED_PREV_TERM_END))
            .map(|(c, b)| Delta::between(c, b)),
    }
}

/// Undefined, not zero, when there is nobody to convert.
pub fn conversion_rate(members: f64, trials: f64) -> Option<f64> {
    let denom = members + trials;
    (denom != 0.0).then(|| members / denom)
}

fn both(a: Option<f64>, b: Option<f64>) -> Option<(f64, f64)> {
    Some((a?, b?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{format_percent, round_half_up};
    use serde_json::json;

    fn metrics(v: serde_json::Value) -> Metrics {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn conversion_rate_matches_rounded_share() {
        for (m, t) in [(3.0, 1.0), (1.0, 2.0), (7.0, 0.0), (0.0, 5.0), (41.0, 17.0)] {
            let rate = conversion_rate(m, t).unwrap();
            assert_eq!(round_half_up(rate * 100.0), round_half_up(100.0 * m / (m + t)));
        }
        assert_eq!(format_percent(conversion_rate(3.0, 1.0).unwrap()), "75%");
    }

    #[test]
    fn conversion_rate_unavailable_without_denominator() {
        assert_eq!(conversion_rate(0.0, 0.0), None);
        let d = derive(&metrics(json!({"lf_members": 0, "lf_trials": 0})));
        assert_eq!(d.trial_conversion, None);
    }

    #[test]
    fn term_delta_and_retention() {
        let d = derive(&metrics(json!({
            "active_students": 110,
            "active_students_prev": 100,
            "returning_students": 85
        })));
        let delta = d.term_delta.unwrap();
        assert_eq!(delta.absolute, 10.0);
        assert_eq!(delta.ratio, Some(0.1));
        assert_eq!(d.retention, Some(0.85));
        assert_eq!(d.churn, Some(15.0));
    }

    #[test]
    fn zero_churn_is_a_value_not_a_gap() {
        let d = derive(&metrics(json!({"active_students_prev": 40, "returning_students": 40})));
        assert_eq!(d.churn, Some(0.0));
        assert_eq!(d.retention, Some(1.0));
    }

    #[test]
    fn missing_previous_count_marks_dependents_unavailable() {
        let d = derive(&metrics(json!({
            "active_students": 110,
            "returning_students": 85,
            "lf_members": 3,
            "lf_trials": 1
        })));
        assert_eq!(d.term_delta, None);
        assert_eq!(d.retention, None);
        assert_eq!(d.churn, None);
        assert_eq!(d.trial_conversion, Some(0.75));
    }

    #[test]
    fn non_numeric_inputs_are_gaps() {
        let d = derive(&metrics(json!({"lf_members": "3", "lf_trials": 1, "active_students": 5, "active_students_prev": "n/a"})));
        assert_eq!(d.trial_conversion, None);
        assert_eq!(d.term_delta, None);
    }

    #[test]
    fn zero_baseline_keeps_absolute_delta() {
        let d = derive(&metrics(json!({
            "children_enrolled": 12,
            "children_enrolled_term_start": 0,
            "children_enrolled_prev_term_end": 15
        })));
        let start = d.enrolled_vs_term_start.unwrap();
        assert_eq!(start.absolute, 12.0);
        assert_eq!(start.ratio, None);
        let prev = d.enrolled_vs_prev_term_end.unwrap();
        assert_eq!(prev.absolute, -3.0);
        assert_eq!(prev.ratio, Some(-0.2));
    }
}
