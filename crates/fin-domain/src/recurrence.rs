//! Recurring-transaction templates and their calendar stepping rules.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    common::*,
    transaction::{NewTransaction, TransactionType},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
/// Cadence at which a recurring rule produces occurrences.
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Yearly => "Yearly",
        }
    }

    /// Steps one interval past `from`.
    ///
    /// Monthly and yearly steps land on `anchor_day`, clamped to the last day of the
    /// target month. Returns `None` only when the result leaves chrono's date range.
    pub fn advance(self, from: NaiveDate, anchor_day: u32) -> Option<NaiveDate> {
        match self {
            Frequency::Daily => from.checked_add_signed(Duration::days(1)),
            Frequency::Weekly => from.checked_add_signed(Duration::weeks(1)),
            Frequency::Monthly => shift_month(from, 1, anchor_day),
            Frequency::Yearly => shift_year(from, 1, anchor_day),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = RuleDataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(RuleDataError::UnknownFrequency(value.to_string())),
        }
    }
}

/// A recurring rule exactly as the persistence layer holds it.
///
/// Dates, type and frequency stay textual here; [`RecurringRule::try_from`] is the
/// single place they are validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecurringRuleRecord {
    pub id: Uuid,
    pub transaction_type: String,
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    pub start_date: String,
    pub frequency: String,
    pub last_generated_date: String,
}

/// A validated recurring-transaction template.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringRule {
    pub id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub category: Option<String>,
    pub description: String,
    pub start_date: NaiveDate,
    pub frequency: Frequency,
    pub last_generated_date: NaiveDate,
}

impl RecurringRule {
    /// Creates a rule whose start date counts as already accounted for; the first
    /// generated occurrence is one interval after `start_date`.
    pub fn new(
        transaction_type: TransactionType,
        amount: f64,
        category: Option<String>,
        description: impl Into<String>,
        start_date: NaiveDate,
        frequency: Frequency,
    ) -> Result<Self, RuleDataError> {
        validate_amount(amount)?;
        Ok(Self {
            id: Uuid::new_v4(),
            transaction_type,
            amount,
            category,
            description: description.into(),
            start_date,
            frequency,
            last_generated_date: start_date,
        })
    }

    /// Day-of-month every monthly/yearly occurrence aims for.
    pub fn anchor_day(&self) -> u32 {
        self.start_date.day()
    }

    /// The next candidate date strictly after `cursor`.
    pub fn next_date_after(&self, cursor: NaiveDate) -> Option<NaiveDate> {
        self.frequency.advance(cursor, self.anchor_day())
    }

    /// The next date this rule will come due, regardless of today.
    pub fn next_due_date(&self) -> Option<NaiveDate> {
        self.next_date_after(self.last_generated_date)
    }

    /// Builds the concrete transaction posted for an occurrence on `date`.
    pub fn materialize(&self, date: NaiveDate) -> NewTransaction {
        NewTransaction {
            transaction_type: self.transaction_type,
            amount: self.amount,
            category: self.category.clone(),
            description: self.description.clone(),
            date,
            rule_id: Some(self.id),
        }
    }

    pub fn to_record(&self) -> RecurringRuleRecord {
        RecurringRuleRecord {
            id: self.id,
            transaction_type: self.transaction_type.as_str().to_string(),
            amount: self.amount,
            category: self.category.clone(),
            description: self.description.clone(),
            start_date: format_date(self.start_date),
            frequency: self.frequency.as_str().to_string(),
            last_generated_date: format_date(self.last_generated_date),
        }
    }
}

impl TryFrom<&RecurringRuleRecord> for RecurringRule {
    type Error = RuleDataError;

    fn try_from(record: &RecurringRuleRecord) -> Result<Self, Self::Error> {
        let transaction_type = record
            .transaction_type
            .parse::<TransactionType>()
            .map_err(RuleDataError::UnknownTransactionType)?;
        validate_amount(record.amount)?;
        let start_date = parse_field("start_date", &record.start_date)?;
        let last_generated_date = parse_field("last_generated_date", &record.last_generated_date)?;
        if last_generated_date < start_date {
            return Err(RuleDataError::MarkerBeforeStart {
                start: start_date,
                marker: last_generated_date,
            });
        }
        let frequency = record.frequency.parse::<Frequency>()?;
        Ok(Self {
            id: record.id,
            transaction_type,
            amount: record.amount,
            category: record.category.clone(),
            description: record.description.clone(),
            start_date,
            frequency,
            last_generated_date,
        })
    }
}

impl Displayable for RecurringRule {
    fn display_label(&self) -> String {
        format!(
            "{} {} {:.2} {} since {}",
            self.frequency,
            self.transaction_type,
            self.amount,
            self.category.as_deref().unwrap_or("uncategorized"),
            format_date(self.start_date)
        )
    }
}

fn parse_field(field: &'static str, raw: &str) -> Result<NaiveDate, RuleDataError> {
    parse_date(raw).ok_or_else(|| RuleDataError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

fn validate_amount(amount: f64) -> Result<(), RuleDataError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(RuleDataError::InvalidAmount(amount))
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Reasons a persisted rule row cannot be turned into a [`RecurringRule`].
pub enum RuleDataError {
    InvalidDate { field: &'static str, value: String },
    UnknownFrequency(String),
    UnknownTransactionType(String),
    InvalidAmount(f64),
    MarkerBeforeStart { start: NaiveDate, marker: NaiveDate },
}

impl fmt::Display for RuleDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleDataError::InvalidDate { field, value } => {
                write!(f, "invalid {field} `{value}`")
            }
            RuleDataError::UnknownFrequency(value) => write!(f, "unknown frequency `{value}`"),
            RuleDataError::UnknownTransactionType(value) => {
                write!(f, "unknown transaction type `{value}`")
            }
            RuleDataError::InvalidAmount(amount) => {
                write!(f, "amount must be positive, got {amount}")
            }
            RuleDataError::MarkerBeforeStart { start, marker } => write!(
                f,
                "last generated date {marker} precedes start date {start}"
            ),
        }
    }
}

impl std::error::Error for RuleDataError {}
