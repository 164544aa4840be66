use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    classifier::{CategoryClassifier, ClassifierSettings, ClassifierState, RetrainPolicy},
    recurrence_service::RecurrenceEngine,
    storage::{FinanceStore, ModelArtifactStore, ModelArtifacts},
    CoreError,
};
use fin_domain::{
    format_date, Frequency, NewTransaction, RecurringRule, RecurringRuleRecord, TrainingExample,
    Transaction, TransactionType,
};

const USER: &str = "alice";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[derive(Default)]
struct MemoryState {
    rules: Vec<RecurringRuleRecord>,
    transactions: Vec<Transaction>,
    failing_rule: Option<Uuid>,
    failing_marker: Option<Uuid>,
    labeled: Vec<TrainingExample>,
}

#[derive(Default)]
struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    fn with_rules(rules: Vec<RecurringRuleRecord>) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().rules = rules;
        store
    }

    fn with_examples(examples: Vec<TrainingExample>) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().labeled = examples;
        store
    }

    fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().transactions.clone()
    }

    fn marker(&self, rule_id: Uuid) -> String {
        let state = self.state.lock().unwrap();
        state
            .rules
            .iter()
            .find(|rule| rule.id == rule_id)
            .map(|rule| rule.last_generated_date.clone())
            .unwrap()
    }
}

impl FinanceStore for MemoryStore {
    fn recurring_rules(&self, _user_id: &str) -> Result<Vec<RecurringRuleRecord>, CoreError> {
        Ok(self.state.lock().unwrap().rules.clone())
    }

    fn insert_transaction(
        &self,
        _user_id: &str,
        transaction: NewTransaction,
    ) -> Result<Uuid, CoreError> {
        let mut state = self.state.lock().unwrap();
        if transaction.rule_id.is_some() && transaction.rule_id == state.failing_rule {
            return Err(CoreError::Storage("disk full".into()));
        }
        let txn = transaction.into_transaction();
        let id = txn.id;
        state.transactions.push(txn);
        Ok(id)
    }

    fn update_rule_last_generated_date(
        &self,
        _user_id: &str,
        rule_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_marker == Some(rule_id) {
            return Err(CoreError::Storage("marker write rejected".into()));
        }
        let rule = state
            .rules
            .iter_mut()
            .find(|rule| rule.id == rule_id)
            .ok_or(CoreError::RuleNotFound(rule_id))?;
        rule.last_generated_date = format_date(date);
        Ok(())
    }

    fn labeled_transactions_for_training(
        &self,
        _user_id: &str,
    ) -> Result<Vec<TrainingExample>, CoreError> {
        Ok(self.state.lock().unwrap().labeled.clone())
    }
}

#[derive(Default)]
struct MemoryArtifacts {
    stored: Mutex<HashMap<String, ModelArtifacts>>,
    fail_writes: bool,
}

impl ModelArtifactStore for MemoryArtifacts {
    fn read_artifacts(&self, user_id: &str) -> Result<Option<ModelArtifacts>, CoreError> {
        Ok(self.stored.lock().unwrap().get(user_id).cloned())
    }

    fn write_artifacts(&self, user_id: &str, artifacts: &ModelArtifacts) -> Result<(), CoreError> {
        if self.fail_writes {
            return Err(CoreError::Storage("read-only volume".into()));
        }
        self.stored
            .lock()
            .unwrap()
            .insert(user_id.to_string(), artifacts.clone());
        Ok(())
    }

    fn delete_artifacts(&self, user_id: &str) -> Result<(), CoreError> {
        self.stored.lock().unwrap().remove(user_id);
        Ok(())
    }
}

fn rule(frequency: Frequency, start: NaiveDate, marker: NaiveDate) -> RecurringRule {
    let mut rule = RecurringRule::new(
        TransactionType::Expense,
        100.0,
        Some("Rent".into()),
        "Monthly rent",
        start,
        frequency,
    )
    .unwrap();
    rule.last_generated_date = marker;
    rule
}

fn dates(store: &MemoryStore) -> Vec<NaiveDate> {
    store.transactions().iter().map(|txn| txn.date).collect()
}

#[test]
fn monthly_rent_catches_up_to_today() {
    let rent = rule(Frequency::Monthly, date(2024, 1, 1), date(2024, 1, 1));
    let store = MemoryStore::with_rules(vec![rent.to_record()]);

    let report = RecurrenceEngine::run_due_check(&store, USER, date(2024, 4, 15)).unwrap();

    assert_eq!(report.generated, 3);
    assert!(!report.has_failures());
    assert_eq!(
        dates(&store),
        vec![date(2024, 2, 1), date(2024, 3, 1), date(2024, 4, 1)]
    );
    assert!(store
        .transactions()
        .iter()
        .all(|txn| txn.amount == 100.0 && txn.category.as_deref() == Some("Rent")));
    assert_eq!(store.marker(rent.id), "2024-04-01");
}

#[test]
fn repeated_due_check_is_idempotent() {
    let rent = rule(Frequency::Monthly, date(2024, 1, 1), date(2024, 1, 1));
    let store = MemoryStore::with_rules(vec![rent.to_record()]);
    let today = date(2024, 4, 15);

    RecurrenceEngine::run_due_check(&store, USER, today).unwrap();
    let second = RecurrenceEngine::run_due_check(&store, USER, today).unwrap();

    assert_eq!(second.generated, 0);
    assert_eq!(store.transactions().len(), 3);
}

#[test]
fn daily_rule_three_days_behind_emits_three() {
    let mut daily = rule(Frequency::Daily, date(2024, 6, 1), date(2024, 6, 7));
    let store = MemoryStore::with_rules(vec![daily.to_record()]);

    let run =
        RecurrenceEngine::generate_due_occurrences(&store, USER, &mut daily, date(2024, 6, 10));

    assert!(run.is_complete());
    let emitted: Vec<NaiveDate> = run.occurrences.iter().map(|occ| occ.date).collect();
    assert_eq!(
        emitted,
        vec![date(2024, 6, 8), date(2024, 6, 9), date(2024, 6, 10)]
    );
    assert_eq!(daily.last_generated_date, date(2024, 6, 10));
}

#[test]
fn marker_is_monotonic_and_never_passes_today() {
    let mut weekly = rule(Frequency::Weekly, date(2024, 1, 1), date(2024, 1, 1));
    let store = MemoryStore::with_rules(vec![weekly.to_record()]);
    let mut previous = weekly.last_generated_date;

    for today in [date(2024, 1, 5), date(2024, 1, 20), date(2024, 1, 20), date(2024, 3, 2)] {
        let run = RecurrenceEngine::generate_due_occurrences(&store, USER, &mut weekly, today);
        assert!(weekly.last_generated_date >= previous);
        assert!(weekly.last_generated_date <= today);
        assert!(run
            .occurrences
            .windows(2)
            .all(|pair| pair[0].date < pair[1].date));
        previous = weekly.last_generated_date;
    }
    assert_eq!(weekly.last_generated_date, date(2024, 2, 26));
}

#[test]
fn month_end_rules_clamp_to_last_day() {
    let month_end = rule(Frequency::Monthly, date(2024, 1, 31), date(2024, 1, 31));
    let planned = RecurrenceEngine::preview(&month_end, date(2024, 5, 1));
    let planned: Vec<NaiveDate> = planned.iter().map(|occ| occ.date).collect();
    assert_eq!(
        planned,
        vec![date(2024, 2, 29), date(2024, 3, 31), date(2024, 4, 30)]
    );
}

#[test]
fn yearly_leap_day_rule_clamps_in_common_years() {
    let leap = rule(Frequency::Yearly, date(2024, 2, 29), date(2024, 2, 29));
    let planned: Vec<NaiveDate> = RecurrenceEngine::preview(&leap, date(2028, 3, 1))
        .iter()
        .map(|occ| occ.date)
        .collect();
    assert_eq!(
        planned,
        vec![
            date(2025, 2, 28),
            date(2026, 2, 28),
            date(2027, 2, 28),
            date(2028, 2, 29)
        ]
    );
}

#[test]
fn future_start_rule_waits() {
    let future = rule(Frequency::Daily, date(2024, 9, 1), date(2024, 9, 1));
    assert!(RecurrenceEngine::preview(&future, date(2024, 8, 15)).is_empty());
    assert!(RecurrenceEngine::preview(&future, date(2024, 9, 1)).is_empty());
    assert_eq!(RecurrenceEngine::preview(&future, date(2024, 9, 2)).len(), 1);
}

#[test]
fn malformed_rule_is_skipped_without_blocking_others() {
    let good = rule(Frequency::Daily, date(2024, 6, 1), date(2024, 6, 1));
    let mut bad_date = rule(Frequency::Daily, date(2024, 6, 1), date(2024, 6, 1)).to_record();
    bad_date.last_generated_date = "06/01/2024".into();
    let mut bad_frequency = rule(Frequency::Daily, date(2024, 6, 1), date(2024, 6, 1)).to_record();
    bad_frequency.frequency = "Hourly".into();
    let store = MemoryStore::with_rules(vec![bad_date.clone(), good.to_record(), bad_frequency]);

    let report = RecurrenceEngine::run_due_check(&store, USER, date(2024, 6, 3)).unwrap();

    assert_eq!(report.rules_checked, 3);
    assert_eq!(report.generated, 2);
    assert_eq!(report.skipped.len(), 2);
    assert!(report
        .skipped
        .iter()
        .all(|failure| matches!(failure.error, CoreError::MalformedRule { .. })));
    assert_eq!(store.marker(bad_date.id), "06/01/2024");
}

#[test]
fn failed_insert_abandons_rule_without_advancing_marker() {
    let failing = rule(Frequency::Daily, date(2024, 6, 1), date(2024, 6, 1));
    let healthy = rule(Frequency::Daily, date(2024, 6, 1), date(2024, 6, 1));
    let store = MemoryStore::with_rules(vec![failing.to_record(), healthy.to_record()]);
    store.state.lock().unwrap().failing_rule = Some(failing.id);

    let report = RecurrenceEngine::run_due_check(&store, USER, date(2024, 6, 4)).unwrap();

    assert_eq!(report.generated, 3);
    assert_eq!(report.failed_rule_ids(), vec![failing.id]);
    assert_eq!(store.marker(failing.id), "2024-06-01");
    assert_eq!(store.marker(healthy.id), "2024-06-04");
}

#[test]
fn failed_marker_update_keeps_marker_and_skips_count() {
    let rule = rule(Frequency::Daily, date(2024, 6, 1), date(2024, 6, 1));
    let store = MemoryStore::with_rules(vec![rule.to_record()]);
    store.state.lock().unwrap().failing_marker = Some(rule.id);

    let report = RecurrenceEngine::run_due_check(&store, USER, date(2024, 6, 4)).unwrap();

    assert_eq!(report.generated, 0);
    assert_eq!(report.failed_rule_ids(), vec![rule.id]);
    let run = &report.runs[0];
    assert!(matches!(run.error, Some(CoreError::Storage(_))));
    assert!(run.occurrences.is_empty());
    assert_eq!(store.marker(rule.id), "2024-06-01");
    // The insert landed before the marker write failed; the run stops after it.
    let inserted = store.transactions();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].date, date(2024, 6, 2));
}

fn examples(count: usize, categories: &[&str]) -> Vec<TrainingExample> {
    let vocab: HashMap<&str, [&str; 3]> = HashMap::from([
        ("Groceries", ["supermarket weekly shop", "fresh market produce", "grocery store run"]),
        ("Transport", ["metro card top up", "taxi ride airport", "fuel station diesel"]),
        ("Utilities", ["electricity bill", "water utility bill", "internet provider bill"]),
    ]);
    (0..count)
        .map(|index| {
            let category = categories[index % categories.len()];
            let phrases = vocab[category];
            TrainingExample::new(phrases[index % phrases.len()], category).unwrap()
        })
        .collect()
}

fn classifier(artifacts: Arc<MemoryArtifacts>) -> CategoryClassifier {
    CategoryClassifier::new(USER, ClassifierSettings::default(), artifacts)
}

#[test]
fn training_refuses_too_few_examples() {
    let store = MemoryStore::with_examples(examples(8, &["Groceries", "Transport", "Utilities"]));
    let mut clf = classifier(Arc::new(MemoryArtifacts::default()));

    let err = clf.train(&store).unwrap_err();

    assert!(matches!(
        err,
        CoreError::DataInsufficient {
            examples: 8,
            categories: 3
        }
    ));
    assert_eq!(clf.state(), &ClassifierState::Untrained);
    assert_eq!(clf.predict("taxi ride"), None);
}

#[test]
fn training_refuses_a_single_category() {
    let store = MemoryStore::with_examples(examples(12, &["Groceries"]));
    let artifacts = Arc::new(MemoryArtifacts::default());
    let mut clf = classifier(artifacts.clone());

    assert!(matches!(
        clf.train(&store),
        Err(CoreError::DataInsufficient { categories: 1, .. })
    ));
    assert!(artifacts.stored.lock().unwrap().is_empty());
}

#[test]
fn loosened_settings_still_need_two_categories_and_ten_examples() {
    let settings = ClassifierSettings {
        min_examples: 1,
        min_categories: 1,
        ..ClassifierSettings::default()
    };
    let artifacts = Arc::new(MemoryArtifacts::default());

    let single = MemoryStore::with_examples(examples(12, &["Groceries"]));
    let mut clf = CategoryClassifier::new(USER, settings.clone(), artifacts.clone());
    assert!(matches!(
        clf.train(&single),
        Err(CoreError::DataInsufficient { categories: 1, .. })
    ));

    let sparse = MemoryStore::with_examples(examples(4, &["Groceries", "Transport"]));
    let mut clf = CategoryClassifier::new(USER, settings, artifacts);
    assert!(matches!(
        clf.train(&sparse),
        Err(CoreError::DataInsufficient { examples: 4, .. })
    ));
}

#[test]
fn training_succeeds_with_enough_data() {
    let store = MemoryStore::with_examples(examples(15, &["Groceries", "Transport"]));
    let artifacts = Arc::new(MemoryArtifacts::default());
    let mut clf = classifier(artifacts.clone());

    clf.train(&store).unwrap();

    assert!(clf.is_ready());
    assert_eq!(clf.predict("airport taxi").as_deref(), Some("Transport"));
    assert_eq!(clf.predict("supermarket").as_deref(), Some("Groceries"));
    assert!(artifacts.stored.lock().unwrap().contains_key(USER));
}

#[test]
fn reloaded_model_predicts_identically() {
    let store = MemoryStore::with_examples(examples(
        30,
        &["Groceries", "Transport", "Utilities"],
    ));
    let artifacts = Arc::new(MemoryArtifacts::default());
    let mut original = classifier(artifacts.clone());
    original.load_or_train(&store, false).unwrap();

    let empty_store = MemoryStore::default();
    let mut reloaded = classifier(artifacts);
    reloaded.load_or_train(&empty_store, false).unwrap();

    assert_eq!(reloaded.model(), original.model());
    for description in ["water bill", "diesel", "fresh produce market", "unknown words"] {
        assert_eq!(
            reloaded.suggest(description),
            original.suggest(description),
            "{description}"
        );
    }
}

#[test]
fn predict_before_training_returns_none() {
    let clf = classifier(Arc::new(MemoryArtifacts::default()));
    assert_eq!(clf.state(), &ClassifierState::Uninitialized);
    assert_eq!(clf.predict("anything"), None);
    assert_eq!(clf.suggest(""), None);
}

#[test]
fn token_free_description_falls_back_to_prior() {
    // Eight Groceries examples against seven Transport ones.
    let store = MemoryStore::with_examples(examples(15, &["Groceries", "Transport"]));
    let mut clf = classifier(Arc::new(MemoryArtifacts::default()));
    clf.train(&store).unwrap();

    for description in ["A", "7", "", "  ", "xyzzy"] {
        let suggestion = clf.suggest(description).expect(description);
        assert_eq!(suggestion.category, "Groceries", "{description:?}");
        assert!((suggestion.probability - 8.0 / 15.0).abs() < 1e-9, "{description:?}");
    }
}

#[test]
fn corrupt_artifacts_trigger_retrain() {
    let store = MemoryStore::with_examples(examples(15, &["Groceries", "Transport"]));
    let artifacts = Arc::new(MemoryArtifacts::default());
    artifacts.stored.lock().unwrap().insert(
        USER.to_string(),
        ModelArtifacts {
            vectorizer: "{not json".into(),
            classifier: "{}".into(),
        },
    );
    let mut clf = classifier(artifacts.clone());

    clf.load_or_train(&store, false).unwrap();

    assert!(clf.is_ready());
    let stored = artifacts.stored.lock().unwrap().get(USER).cloned().unwrap();
    assert!(stored.vectorizer.starts_with('{'));
    assert_ne!(stored.vectorizer, "{not json");
}

#[test]
fn mismatched_artifact_pair_is_rejected() {
    let store_a = MemoryStore::with_examples(examples(15, &["Groceries", "Transport"]));
    let store_b = MemoryStore::with_examples(examples(20, &["Utilities", "Transport"]));
    let first = Arc::new(MemoryArtifacts::default());
    let second = Arc::new(MemoryArtifacts::default());
    classifier(first.clone()).train(&store_a).unwrap();
    classifier(second.clone()).train(&store_b).unwrap();

    let a = first.stored.lock().unwrap().get(USER).cloned().unwrap();
    let b = second.stored.lock().unwrap().get(USER).cloned().unwrap();
    let mixed = ModelArtifacts {
        vectorizer: a.vectorizer,
        classifier: b.classifier,
    };

    let err = crate::classifier::TrainedModel::from_artifacts(&mixed).unwrap_err();
    assert!(matches!(err, CoreError::ArtifactCorrupt(_)));
}

#[test]
fn write_failure_keeps_model_in_memory() {
    let store = MemoryStore::with_examples(examples(15, &["Groceries", "Transport"]));
    let artifacts = Arc::new(MemoryArtifacts {
        fail_writes: true,
        ..MemoryArtifacts::default()
    });
    let mut clf = classifier(artifacts.clone());

    clf.train(&store).unwrap();

    assert!(clf.is_ready());
    assert!(artifacts.stored.lock().unwrap().is_empty());
}

#[test]
fn insufficient_retrain_discards_previous_model() {
    let store = MemoryStore::with_examples(examples(15, &["Groceries", "Transport"]));
    let artifacts = Arc::new(MemoryArtifacts::default());
    let mut clf = classifier(artifacts.clone());
    clf.train(&store).unwrap();

    store.state.lock().unwrap().labeled.truncate(5);
    assert!(clf.load_or_train(&store, true).is_err());

    assert!(!clf.is_ready());
    assert!(artifacts.stored.lock().unwrap().is_empty());
}

#[test]
fn deferred_policy_retrains_on_next_load() {
    let store = MemoryStore::with_examples(examples(15, &["Groceries", "Transport"]));
    let settings = ClassifierSettings {
        retrain_policy: RetrainPolicy::Deferred,
        ..ClassifierSettings::default()
    };
    let mut clf = CategoryClassifier::new(USER, settings, Arc::new(MemoryArtifacts::default()));
    clf.load_or_train(&store, false).unwrap();
    let first_id = clf.model().unwrap().model_id();

    clf.notify_data_changed(&store).unwrap();
    assert!(clf.is_stale());
    assert_eq!(clf.model().unwrap().model_id(), first_id);

    clf.load_or_train(&store, false).unwrap();
    assert!(!clf.is_stale());
    assert_ne!(clf.model().unwrap().model_id(), first_id);
}

#[test]
fn immediate_policy_retrains_on_notification() {
    let store = MemoryStore::with_examples(examples(15, &["Groceries", "Transport"]));
    let mut clf = classifier(Arc::new(MemoryArtifacts::default()));
    clf.train(&store).unwrap();
    let first_id = clf.model().unwrap().model_id();

    clf.notify_data_changed(&store).unwrap();

    assert_ne!(clf.model().unwrap().model_id(), first_id);
}
