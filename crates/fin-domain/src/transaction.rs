//! Domain models for posted income and expense transactions.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{common::*, training::TrainingExample};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
/// Direction of money flow for a transaction or recurring rule.
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Income => "Income",
            TransactionType::Expense => "Expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    /// Set when the transaction was materialized from a recurring rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<Uuid>,
}

impl Transaction {
    pub fn new(
        transaction_type: TransactionType,
        amount: f64,
        category: Option<String>,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_type,
            amount,
            category,
            description: description.into(),
            date,
            rule_id: None,
        }
    }

    /// Returns the labeled pair used for classifier training, if this row qualifies.
    pub fn training_example(&self) -> Option<TrainingExample> {
        let category = self.category.as_deref()?;
        TrainingExample::new(self.description.as_str(), category)
    }
}

impl Displayable for Transaction {
    fn display_label(&self) -> String {
        format!(
            "{} {} {:.2} [{}]",
            format_date(self.date),
            self.transaction_type,
            self.amount,
            self.category.as_deref().unwrap_or("uncategorized")
        )
    }
}

/// Insert request handed to the persistence layer; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub category: Option<String>,
    pub description: String,
    pub date: NaiveDate,
    pub rule_id: Option<Uuid>,
}

impl NewTransaction {
    pub fn into_transaction(self) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            transaction_type: self.transaction_type,
            amount: self.amount,
            category: self.category,
            description: self.description,
            date: self.date,
            rule_id: self.rule_id,
        }
    }
}

impl From<Transaction> for NewTransaction {
    fn from(txn: Transaction) -> Self {
        Self {
            transaction_type: txn.transaction_type,
            amount: txn.amount,
            category: txn.category,
            description: txn.description,
            date: txn.date,
            rule_id: txn.rule_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_parses_case_insensitively() {
        assert_eq!("income".parse::<TransactionType>(), Ok(TransactionType::Income));
        assert_eq!(" Expense ".parse::<TransactionType>(), Ok(TransactionType::Expense));
        assert!("transfer".parse::<TransactionType>().is_err());
    }

    #[test]
    fn training_example_requires_category_and_description() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let labeled = Transaction::new(
            TransactionType::Expense,
            12.5,
            Some("Food".into()),
            "Corner bakery",
            date,
        );
        let unlabeled = Transaction::new(TransactionType::Expense, 3.0, None, "Parking", date);
        let blank = Transaction::new(
            TransactionType::Expense,
            3.0,
            Some("Transport".into()),
            "   ",
            date,
        );

        let example = labeled.training_example().expect("labeled row qualifies");
        assert_eq!(example.description, "Corner bakery");
        assert_eq!(example.category, "Food");
        assert!(unlabeled.training_example().is_none());
        assert!(blank.training_example().is_none());
    }

    #[test]
    fn transaction_serializes_without_optional_fields() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let txn = Transaction::new(TransactionType::Income, 900.0, None, "Invoice 12", date);
        let json = serde_json::to_string(&txn).unwrap();
        assert!(!json.contains("rule_id"));
        assert!(json.contains("\"2024-05-01\""));
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, txn);
    }
}
