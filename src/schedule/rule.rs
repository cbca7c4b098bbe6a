//! Weekly recurrence rules for one medication.
//!
//! A rule pairs a wall-clock time with the ISO weekdays it applies to, and
//! may carry a dose override for that time of day. A rule set answers
//! "which doses are due on date D" without ever looking at a calendar wider
//! than one week.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// One recurrence entry: `time` is the local wall-clock time the dose is
/// due, `weekdays` the ISO weekday numbers (1 = Monday .. 7 = Sunday) it
/// recurs on. `dose`/`dose_unit`, when present, take precedence over the
/// owning medication's default dose for this time of day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRule {
    pub time: NaiveTime,
    pub weekdays: BTreeSet<u8>,
    #[serde(default)]
    pub dose: Option<f64>,
    #[serde(default)]
    pub dose_unit: Option<String>,
    #[serde(default)]
    pub require_photo: bool,
}

impl ScheduleRule {
    /// A rule recurring every day of the week.
    pub fn daily(time: NaiveTime) -> Self {
        Self::on_days(time, 1..=7)
    }

    /// A rule recurring on the given ISO weekdays.
    pub fn on_days(time: NaiveTime, weekdays: impl IntoIterator<Item = u8>) -> Self {
        Self {
            time,
            weekdays: weekdays.into_iter().collect(),
            dose: None,
            dose_unit: None,
            require_photo: false,
        }
    }

    /// Whether this rule produces a dose on `date`.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.weekdays
            .contains(&(date.weekday().number_from_monday() as u8))
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.weekdays.is_empty() {
            return Err(ValidationError::EmptyWeekdays);
        }
        for &day in &self.weekdays {
            if !(1..=7).contains(&day) {
                return Err(ValidationError::InvalidWeekday { value: day });
            }
        }
        Ok(())
    }
}

/// The full set of recurrence rules for one medication.
///
/// Two rules may share a time only if their weekday sets are disjoint;
/// `add_rule` rejects overlapping duplicates up front so the stored data
/// never carries them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRuleSet {
    rules: Vec<ScheduleRule>,
}

impl ScheduleRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule set from pre-existing rules, validating each one and
    /// the pairwise overlap constraint.
    pub fn from_rules(rules: Vec<ScheduleRule>) -> Result<Self, ValidationError> {
        let mut set = Self::new();
        for rule in rules {
            set.add_rule(rule)?;
        }
        Ok(set)
    }

    pub fn rules(&self) -> &[ScheduleRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Add a rule. Atomic: on any validation failure the set is unchanged.
    pub fn add_rule(&mut self, rule: ScheduleRule) -> Result<(), ValidationError> {
        rule.validate()?;
        for existing in &self.rules {
            if existing.time == rule.time {
                if let Some(&day) = existing.weekdays.intersection(&rule.weekdays).next() {
                    return Err(ValidationError::OverlappingRule {
                        time: rule.time,
                        weekday: day,
                    });
                }
            }
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Remove every rule at `time`. Returns how many were removed.
    pub fn remove_rules_at(&mut self, time: NaiveTime) -> usize {
        let before = self.rules.len();
        self.rules.retain(|r| r.time != time);
        before - self.rules.len()
    }

    /// Every distinct time due on `date`, ascending. Times produced by more
    /// than one rule appear once.
    pub fn due_on(&self, date: NaiveDate) -> Vec<NaiveTime> {
        let mut times: Vec<NaiveTime> = self
            .rules
            .iter()
            .filter(|r| r.applies_on(date))
            .map(|r| r.time)
            .collect();
        times.sort_unstable();
        times.dedup();
        times
    }

    /// The rules due on `date`, ascending by time, one per distinct time
    /// (first matching rule wins). Used where the per-rule dose override
    /// matters, not just the time.
    pub fn rules_due_on(&self, date: NaiveDate) -> Vec<&ScheduleRule> {
        let mut due: Vec<&ScheduleRule> = self
            .rules
            .iter()
            .filter(|r| r.applies_on(date))
            .collect();
        due.sort_by_key(|r| r.time);
        due.dedup_by_key(|r| r.time);
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::parse_clock_time;

    fn t(s: &str) -> NaiveTime {
        parse_clock_time(s).unwrap()
    }

    // 2025-03-05 is a Wednesday, 2025-03-08 a Saturday.
    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()
    }

    fn saturday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 8).unwrap()
    }

    #[test]
    fn daily_rule_due_every_day() {
        let mut set = ScheduleRuleSet::new();
        set.add_rule(ScheduleRule::daily(t("08:00"))).unwrap();

        assert_eq!(set.due_on(wednesday()), vec![t("08:00")]);
        assert_eq!(set.due_on(saturday()), vec![t("08:00")]);
    }

    #[test]
    fn weekday_rule_skips_weekend() {
        let mut set = ScheduleRuleSet::new();
        set.add_rule(ScheduleRule::on_days(t("08:00"), 1..=5)).unwrap();
        set.add_rule(ScheduleRule::on_days(t("09:00"), [6, 7])).unwrap();

        assert_eq!(set.due_on(wednesday()), vec![t("08:00")]);
        assert_eq!(set.due_on(saturday()), vec![t("09:00")]);
    }

    #[test]
    fn due_times_sorted_and_deduplicated() {
        let mut set = ScheduleRuleSet::new();
        set.add_rule(ScheduleRule::on_days(t("21:00"), 1..=7)).unwrap();
        set.add_rule(ScheduleRule::on_days(t("08:00"), [1, 2, 3])).unwrap();
        // Same time as the first rule, disjoint days: legal, but the time
        // must still appear once.
        set.add_rule(ScheduleRule::on_days(t("08:00"), [4, 5])).unwrap();

        assert_eq!(set.due_on(wednesday()), vec![t("08:00"), t("21:00")]);
        let thursday = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();
        assert_eq!(set.due_on(thursday), vec![t("08:00"), t("21:00")]);
    }

    #[test]
    fn due_on_is_idempotent() {
        let mut set = ScheduleRuleSet::new();
        set.add_rule(ScheduleRule::on_days(t("08:00"), [1, 3, 5])).unwrap();
        set.add_rule(ScheduleRule::daily(t("20:00"))).unwrap();

        let first = set.due_on(wednesday());
        let second = set.due_on(wednesday());
        assert_eq!(first, second);
    }

    #[test]
    fn empty_weekdays_rejected() {
        let mut set = ScheduleRuleSet::new();
        let err = set
            .add_rule(ScheduleRule::on_days(t("08:00"), []))
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyWeekdays);
        assert!(set.is_empty());
    }

    #[test]
    fn out_of_range_weekday_rejected() {
        let mut set = ScheduleRuleSet::new();
        let err = set
            .add_rule(ScheduleRule::on_days(t("08:00"), [1, 8]))
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidWeekday { value: 8 });
        assert!(set.is_empty());
    }

    #[test]
    fn overlapping_same_time_rule_rejected() {
        let mut set = ScheduleRuleSet::new();
        set.add_rule(ScheduleRule::on_days(t("08:00"), [1, 2, 3])).unwrap();

        let err = set
            .add_rule(ScheduleRule::on_days(t("08:00"), [3, 4]))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::OverlappingRule {
                time: t("08:00"),
                weekday: 3,
            }
        );
        // Atomic: the failed add left the set unchanged.
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn disjoint_same_time_rules_coexist() {
        let mut set = ScheduleRuleSet::new();
        set.add_rule(ScheduleRule::on_days(t("08:00"), [1, 2])).unwrap();
        set.add_rule(ScheduleRule::on_days(t("08:00"), [6, 7])).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_rules_at_time() {
        let mut set = ScheduleRuleSet::new();
        set.add_rule(ScheduleRule::on_days(t("08:00"), [1, 2])).unwrap();
        set.add_rule(ScheduleRule::on_days(t("08:00"), [6, 7])).unwrap();
        set.add_rule(ScheduleRule::daily(t("20:00"))).unwrap();

        assert_eq!(set.remove_rules_at(t("08:00")), 2);
        assert_eq!(set.len(), 1);
        assert_eq!(set.remove_rules_at(t("08:00")), 0);
    }

    #[test]
    fn empty_rule_set_never_due() {
        let set = ScheduleRuleSet::new();
        assert!(set.due_on(wednesday()).is_empty());
        assert!(set.due_on(saturday()).is_empty());
    }

    #[test]
    fn rules_due_on_prefers_first_rule_per_time() {
        let mut set = ScheduleRuleSet::new();
        let mut morning = ScheduleRule::on_days(t("08:00"), [1, 2, 3]);
        morning.dose = Some(2.0);
        set.add_rule(morning).unwrap();
        set.add_rule(ScheduleRule::on_days(t("08:00"), [4, 5])).unwrap();

        let due = set.rules_due_on(wednesday());
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].dose, Some(2.0));
    }

    #[test]
    fn from_rules_validates_everything() {
        let rules = vec![
            ScheduleRule::on_days(t("08:00"), [1, 2]),
            ScheduleRule::on_days(t("08:00"), [2, 3]),
        ];
        assert!(matches!(
            ScheduleRuleSet::from_rules(rules),
            Err(ValidationError::OverlappingRule { .. })
        ));
    }
}
