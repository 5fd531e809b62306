//! Condition list maintenance
//!
//! [`set_status_condition`] is the only place transition timestamps are
//! assigned. A condition's `last_transition_time` moves if and only if its
//! `status` changes; reason, message and observed generation are refreshed on
//! every upsert.

use chrono::{DateTime, Utc};

use crate::crd::{Condition, ConditionStatus};

/// Upsert `new` into `conditions`, stamping transitions with the current time.
///
/// Returns `true` if the list changed.
pub fn set_status_condition(conditions: &mut Vec<Condition>, new: Condition) -> bool {
    set_status_condition_at(conditions, new, Utc::now())
}

/// Upsert `new` into `conditions`, stamping transitions with `now`.
///
/// - No condition of that type: append it with `last_transition_time = now`.
///   Whatever timestamp `new` carries is ignored.
/// - Same status: update reason, message and observed generation in place,
///   keep the existing transition time.
/// - Different status: replace every field and set the transition time to `now`.
///
/// Returns `true` if the list changed.
pub fn set_status_condition_at(
    conditions: &mut Vec<Condition>,
    mut new: Condition,
    now: DateTime<Utc>,
) -> bool {
    let Some(existing) = conditions.iter_mut().find(|c| c.type_ == new.type_) else {
        new.last_transition_time = now;
        conditions.push(new);
        return true;
    };

    let mut changed = false;

    if existing.status != new.status {
        existing.status = new.status;
        existing.last_transition_time = now;
        changed = true;
    }
    if existing.reason != new.reason {
        existing.reason = new.reason;
        changed = true;
    }
    if existing.message != new.message {
        existing.message = new.message;
        changed = true;
    }
    if existing.observed_generation != new.observed_generation {
        existing.observed_generation = new.observed_generation;
        changed = true;
    }

    changed
}

/// Find the condition of the given type
pub fn find_status_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Whether the condition of the given type exists and is `True`
pub fn is_status_condition_true(conditions: &[Condition], type_: &str) -> bool {
    find_status_condition(conditions, type_).is_some_and(|c| c.status == ConditionStatus::True)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn available(status: ConditionStatus, reason: &str) -> Condition {
        Condition::new("Available", status, reason, format!("{} message", reason))
    }

    /// Story: A new condition type is appended and stamped with the merge time
    #[test]
    fn story_new_condition_is_appended_with_current_time() {
        let mut conditions = vec![Condition::new("ServiceCreated", ConditionStatus::True, "r", "m")];
        let mut incoming = available(ConditionStatus::True, "MinimumReplicasAvailable");
        incoming.last_transition_time = t(-9999);

        assert!(set_status_condition_at(&mut conditions, incoming, t(0)));

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[1].type_, "Available");
        assert_eq!(conditions[1].last_transition_time, t(0));
    }

    /// Story: Re-reporting the same status keeps the transition history
    #[test]
    fn story_unchanged_status_keeps_transition_time() {
        let mut conditions = Vec::new();
        set_status_condition_at(
            &mut conditions,
            available(ConditionStatus::True, "MinimumReplicasAvailable").with_observed_generation(1),
            t(0),
        );

        let changed = set_status_condition_at(
            &mut conditions,
            available(ConditionStatus::True, "NewReplicaSetAvailable").with_observed_generation(2),
            t(60),
        );

        assert!(changed);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].last_transition_time, t(0));
        assert_eq!(conditions[0].reason, "NewReplicaSetAvailable");
        assert_eq!(conditions[0].message, "NewReplicaSetAvailable message");
        assert_eq!(conditions[0].observed_generation, 2);
    }

    /// Story: A status flip moves the transition time forward
    #[test]
    fn story_status_change_advances_transition_time() {
        let mut conditions = Vec::new();
        set_status_condition_at(&mut conditions, available(ConditionStatus::True, "Up"), t(0));

        set_status_condition_at(
            &mut conditions,
            available(ConditionStatus::False, "Down"),
            t(0) + Duration::seconds(30),
        );

        assert_eq!(conditions[0].status, ConditionStatus::False);
        assert_eq!(conditions[0].reason, "Down");
        assert!(conditions[0].last_transition_time > t(0));
    }

    #[test]
    fn identical_upsert_reports_no_change() {
        let mut conditions = Vec::new();
        set_status_condition_at(&mut conditions, available(ConditionStatus::True, "Up"), t(0));
        let snapshot = conditions.clone();

        assert!(!set_status_condition_at(
            &mut conditions,
            available(ConditionStatus::True, "Up"),
            t(120)
        ));
        assert_eq!(conditions, snapshot);
    }

    #[test]
    fn existing_types_update_in_place_preserving_order() {
        let mut conditions = Vec::new();
        for type_ in ["A", "B", "C"] {
            set_status_condition_at(
                &mut conditions,
                Condition::new(type_, ConditionStatus::True, "r", "m"),
                t(0),
            );
        }

        set_status_condition_at(
            &mut conditions,
            Condition::new("B", ConditionStatus::False, "r", "m"),
            t(10),
        );

        let types: Vec<_> = conditions.iter().map(|c| c.type_.as_str()).collect();
        assert_eq!(types, ["A", "B", "C"]);
        assert_eq!(conditions[1].status, ConditionStatus::False);
    }

    #[test]
    fn upserts_never_duplicate_a_type() {
        let mut conditions = Vec::new();
        let statuses = [
            ConditionStatus::True,
            ConditionStatus::False,
            ConditionStatus::Unknown,
            ConditionStatus::True,
        ];
        for (i, status) in statuses.into_iter().enumerate() {
            set_status_condition_at(&mut conditions, available(status, "r"), t(i as i64));
            set_status_condition_at(
                &mut conditions,
                Condition::new("Progressing", status, "r", "m"),
                t(i as i64),
            );
        }

        assert_eq!(conditions.len(), 2);
    }

    #[test]
    fn wall_clock_variant_stamps_new_conditions() {
        let before = Utc::now();
        let mut conditions = Vec::new();
        set_status_condition(&mut conditions, available(ConditionStatus::True, "Up"));
        assert!(conditions[0].last_transition_time >= before);
    }

    #[test]
    fn lookup_helpers() {
        let mut conditions = Vec::new();
        set_status_condition_at(&mut conditions, available(ConditionStatus::True, "Up"), t(0));
        set_status_condition_at(
            &mut conditions,
            Condition::new("RouteCreated", ConditionStatus::False, "r", "m"),
            t(0),
        );

        assert!(is_status_condition_true(&conditions, "Available"));
        assert!(!is_status_condition_true(&conditions, "RouteCreated"));
        assert!(!is_status_condition_true(&conditions, "Missing"));
        assert_eq!(
            find_status_condition(&conditions, "RouteCreated").map(|c| c.status),
            Some(ConditionStatus::False)
        );
    }
}
