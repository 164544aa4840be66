use std::{fs, path::PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use fin_core::{storage::FinanceStore, CoreError};
use fin_domain::{
    format_date, NewTransaction, RecurringRule, RecurringRuleRecord, TrainingExample, Transaction,
};

use crate::fs_util::{canonical_name, write_atomic};

const BOOK_EXTENSION: &str = "json";

/// Everything persisted for one user: recurring rules as raw rows plus posted transactions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserBook {
    #[serde(default)]
    pub rules: Vec<RecurringRuleRecord>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// One JSON document per user, rewritten atomically on every mutation.
#[derive(Debug, Clone)]
pub struct JsonFinanceStore {
    users_dir: PathBuf,
}

impl JsonFinanceStore {
    pub fn new(users_dir: PathBuf) -> Result<Self, CoreError> {
        fs::create_dir_all(&users_dir)?;
        Ok(Self { users_dir })
    }

    pub fn book_path(&self, user_id: &str) -> PathBuf {
        self.users_dir
            .join(format!("{}.{}", canonical_name(user_id), BOOK_EXTENSION))
    }

    /// Loads the user's book; a user without a file has an empty book.
    pub fn load_book(&self, user_id: &str) -> Result<UserBook, CoreError> {
        let path = self.book_path(user_id);
        if !path.exists() {
            return Ok(UserBook::default());
        }
        let data = fs::read_to_string(&path)?;
        serde_json::from_str(&data).map_err(|err| {
            CoreError::Serde(format!("{}: {}", path.display(), err))
        })
    }

    fn save_book(&self, user_id: &str, book: &UserBook) -> Result<(), CoreError> {
        let json =
            serde_json::to_string_pretty(book).map_err(|err| CoreError::Serde(err.to_string()))?;
        write_atomic(&self.book_path(user_id), &json)
    }

    fn update_book<T>(
        &self,
        user_id: &str,
        apply: impl FnOnce(&mut UserBook) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut book = self.load_book(user_id)?;
        let result = apply(&mut book)?;
        self.save_book(user_id, &book)?;
        Ok(result)
    }

    pub fn add_rule(&self, user_id: &str, rule: &RecurringRule) -> Result<(), CoreError> {
        self.put_rule_record(user_id, rule.to_record())
    }

    /// Inserts or replaces a rule row as-is, without validating it.
    pub fn put_rule_record(
        &self,
        user_id: &str,
        record: RecurringRuleRecord,
    ) -> Result<(), CoreError> {
        self.update_book(user_id, |book| {
            match book.rules.iter_mut().find(|rule| rule.id == record.id) {
                Some(existing) => *existing = record,
                None => book.rules.push(record),
            }
            Ok(())
        })
    }

    /// Removes a rule. Transactions it already generated stay in the book.
    pub fn delete_rule(&self, user_id: &str, rule_id: Uuid) -> Result<(), CoreError> {
        self.update_book(user_id, |book| {
            let before = book.rules.len();
            book.rules.retain(|rule| rule.id != rule_id);
            if book.rules.len() == before {
                return Err(CoreError::RuleNotFound(rule_id));
            }
            Ok(())
        })
    }

    /// All transactions ordered by date.
    pub fn transactions(&self, user_id: &str) -> Result<Vec<Transaction>, CoreError> {
        let mut transactions = self.load_book(user_id)?.transactions;
        transactions.sort_by_key(|txn| txn.date);
        Ok(transactions)
    }

    pub fn transaction(&self, user_id: &str, id: Uuid) -> Result<Transaction, CoreError> {
        self.load_book(user_id)?
            .transactions
            .into_iter()
            .find(|txn| txn.id == id)
            .ok_or(CoreError::TransactionNotFound(id))
    }

    pub fn update_transaction(
        &self,
        user_id: &str,
        transaction: Transaction,
    ) -> Result<(), CoreError> {
        self.update_book(user_id, |book| {
            let slot = book
                .transactions
                .iter_mut()
                .find(|txn| txn.id == transaction.id)
                .ok_or(CoreError::TransactionNotFound(transaction.id))?;
            *slot = transaction;
            Ok(())
        })
    }

    pub fn delete_transaction(&self, user_id: &str, id: Uuid) -> Result<Transaction, CoreError> {
        self.update_book(user_id, |book| {
            let index = book
                .transactions
                .iter()
                .position(|txn| txn.id == id)
                .ok_or(CoreError::TransactionNotFound(id))?;
            Ok(book.transactions.remove(index))
        })
    }
}

impl FinanceStore for JsonFinanceStore {
    fn recurring_rules(&self, user_id: &str) -> Result<Vec<RecurringRuleRecord>, CoreError> {
        Ok(self.load_book(user_id)?.rules)
    }

    fn insert_transaction(
        &self,
        user_id: &str,
        transaction: NewTransaction,
    ) -> Result<Uuid, CoreError> {
        let txn = transaction.into_transaction();
        let id = txn.id;
        self.update_book(user_id, |book| {
            book.transactions.push(txn);
            Ok(())
        })?;
        debug!(user = user_id, transaction_id = %id, "transaction inserted");
        Ok(id)
    }

    fn update_rule_last_generated_date(
        &self,
        user_id: &str,
        rule_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), CoreError> {
        self.update_book(user_id, |book| {
            let rule = book
                .rules
                .iter_mut()
                .find(|rule| rule.id == rule_id)
                .ok_or(CoreError::RuleNotFound(rule_id))?;
            rule.last_generated_date = format_date(date);
            Ok(())
        })
    }

    fn labeled_transactions_for_training(
        &self,
        user_id: &str,
    ) -> Result<Vec<TrainingExample>, CoreError> {
        Ok(self
            .load_book(user_id)?
            .transactions
            .iter()
            .filter_map(Transaction::training_example)
            .collect())
    }
}
