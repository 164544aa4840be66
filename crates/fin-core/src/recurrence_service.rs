//! Turns the passage of time into concrete postings for recurring rules.

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use fin_domain::{Displayable, NewTransaction, RecurringRule};

use crate::{storage::FinanceStore, CoreError};

/// A single due instance of a rule, materialized as one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub transaction: NewTransaction,
}

/// Outcome of generating occurrences for one rule.
///
/// `occurrences` holds every occurrence whose transaction and marker update were both
/// committed. When `error` is set the rule was abandoned after those.
#[derive(Debug)]
pub struct RuleRun {
    pub rule_id: Uuid,
    pub occurrences: Vec<Occurrence>,
    pub error: Option<CoreError>,
}

impl RuleRun {
    pub fn generated(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
pub struct RuleFailure {
    pub rule_id: Uuid,
    pub error: CoreError,
}

/// Summary of a due check across all of a user's rules.
#[derive(Debug, Default)]
pub struct DueCheckReport {
    pub rules_checked: usize,
    pub generated: usize,
    pub runs: Vec<RuleRun>,
    /// Rules that could not be parsed and were skipped entirely.
    pub skipped: Vec<RuleFailure>,
}

impl DueCheckReport {
    pub fn has_failures(&self) -> bool {
        !self.skipped.is_empty() || self.runs.iter().any(|run| run.error.is_some())
    }

    pub fn failed_rule_ids(&self) -> Vec<Uuid> {
        self.skipped
            .iter()
            .map(|failure| failure.rule_id)
            .chain(
                self.runs
                    .iter()
                    .filter(|run| run.error.is_some())
                    .map(|run| run.rule_id),
            )
            .collect()
    }
}

pub struct RecurrenceEngine;

impl RecurrenceEngine {
    /// Plans the occurrences due for `rule` on `today` without touching storage.
    ///
    /// Dates are strictly increasing, all later than the rule's marker and none later
    /// than `today`.
    pub fn preview(rule: &RecurringRule, today: NaiveDate) -> Vec<Occurrence> {
        let mut planned = Vec::new();
        let mut cursor = rule.last_generated_date;
        while cursor < today {
            let Some(next) = rule.next_date_after(cursor) else {
                warn!(rule_id = %rule.id, %cursor, "recurrence stepped outside the calendar range");
                break;
            };
            if next > today {
                break;
            }
            planned.push(Occurrence {
                date: next,
                transaction: rule.materialize(next),
            });
            cursor = next;
        }
        planned
    }

    /// Materializes every due occurrence of `rule`, advancing its marker after each one.
    ///
    /// Each occurrence is one transaction insert followed by one marker update. A failed
    /// write stops the rule for this pass; the marker stays on the last committed date.
    pub fn generate_due_occurrences(
        store: &dyn FinanceStore,
        user_id: &str,
        rule: &mut RecurringRule,
        today: NaiveDate,
    ) -> RuleRun {
        let mut run = RuleRun {
            rule_id: rule.id,
            occurrences: Vec::new(),
            error: None,
        };
        for occurrence in Self::preview(rule, today) {
            if let Err(err) = store.insert_transaction(user_id, occurrence.transaction.clone()) {
                error!(rule_id = %rule.id, date = %occurrence.date, error = %err, "failed to insert recurring transaction");
                run.error = Some(err);
                break;
            }
            if let Err(err) =
                store.update_rule_last_generated_date(user_id, rule.id, occurrence.date)
            {
                error!(rule_id = %rule.id, date = %occurrence.date, error = %err, "failed to advance recurrence marker");
                run.error = Some(err);
                break;
            }
            rule.last_generated_date = occurrence.date;
            debug!(rule_id = %rule.id, date = %occurrence.date, "recurring occurrence generated");
            run.occurrences.push(occurrence);
        }
        run
    }

    /// Checks every rule owned by `user_id` and generates whatever is due on `today`.
    ///
    /// Malformed rules are skipped and recorded; they never block the remaining rules.
    /// Only a failure to list the rules at all is returned as an error.
    pub fn run_due_check(
        store: &dyn FinanceStore,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<DueCheckReport, CoreError> {
        let records = store.recurring_rules(user_id)?;
        let mut report = DueCheckReport {
            rules_checked: records.len(),
            ..DueCheckReport::default()
        };

        for record in &records {
            let mut rule = match RecurringRule::try_from(record) {
                Ok(rule) => rule,
                Err(reason) => {
                    warn!(user = user_id, rule_id = %record.id, %reason, "skipping malformed recurring rule");
                    report.skipped.push(RuleFailure {
                        rule_id: record.id,
                        error: CoreError::MalformedRule {
                            rule_id: record.id,
                            reason,
                        },
                    });
                    continue;
                }
            };
            let run = Self::generate_due_occurrences(store, user_id, &mut rule, today);
            if run.generated() > 0 {
                info!(user = user_id, rule = %rule.display_label(), generated = run.generated(), "recurring rule caught up");
            }
            report.generated += run.generated();
            report.runs.push(run);
        }

        info!(
            user = user_id,
            %today,
            rules = report.rules_checked,
            generated = report.generated,
            failed = report.failed_rule_ids().len(),
            "recurring due check finished"
        );
        Ok(report)
    }
}
