//! Engine error taxonomy.
//!
//! All variants are local to session construction and traversal; none are
//! transient, so nothing here is retried.

use thiserror::Error;

use crate::domain::Domain;
use crate::engine::Strategy;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
  /// Nothing to build from. Never produce a zero-question session instead.
  #[error("no usable items in the {domain} corpus")]
  EmptyCorpus { domain: Domain },

  /// A record is missing a required field or is otherwise malformed.
  #[error("invalid corpus item '{key}': {reason}")]
  InvalidItem { key: String, reason: String },

  #[error("item '{key}' cannot be used with strategy {strategy:?}")]
  StrategyMismatch { strategy: Strategy, key: String },

  /// Current question already has a result entry; the log was left untouched.
  #[error("question {question_index} was already answered")]
  AlreadyAnswered { question_index: usize },

  #[error("question {question_index} must be answered before advancing")]
  NotAnswered { question_index: usize },

  #[error("choice {index} is out of range for {options} options")]
  InvalidChoice { index: usize, options: usize },

  /// A judgment was given to a multiple-choice question, or a choice to a recall one.
  #[error("response kind does not match question {question_index}")]
  ResponseMismatch { question_index: usize },

  #[error("session is completed")]
  SessionCompleted,

  #[error("session is not finished ({answered}/{total} answered)")]
  SessionNotFinished { answered: usize, total: usize },

  #[error("cannot score a session with zero questions")]
  NoQuestions,
}

impl EngineError {
  /// Errors that only signal a harmless repeated action.
  pub fn is_benign(&self) -> bool {
    matches!(self, EngineError::AlreadyAnswered { .. })
  }
}
