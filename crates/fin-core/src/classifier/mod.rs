//! Category suggestion from transaction descriptions.
//!
//! A bag-of-words vocabulary feeds a multinomial Naive Bayes model trained on the
//! user's own labeled history.

pub mod naive_bayes;
pub mod service;
pub mod vectorizer;

pub use naive_bayes::{ClassScore, MultinomialNaiveBayes};
pub use service::{
    CategoryClassifier, ClassifierSettings, ClassifierState, RetrainPolicy, Suggestion,
    TrainedModel, DEFAULT_SMOOTHING, MAX_VOCABULARY_TERMS, MIN_DISTINCT_CATEGORIES,
    MIN_TRAINING_EXAMPLES,
};
pub use vectorizer::{tokenize, BagOfWords, TermCounts};
