//! Content-driven assessment engine.
//!
//! Flow:
//! 1) `adapter` normalizes one section's records into canonical items.
//! 2) `builder` turns items into an immutable `AssessmentSession`,
//!    using `sampler` for multiple-choice distractors.
//! 3) `runner` walks the session one question at a time (answer, then advance).
//! 4) `scorer` derives the result summary from the runner's log.
//!
//! Everything here is synchronous and owned by a single learner interaction.
//! Randomness is always injected (`&mut R where R: Rng`), never global.

pub mod adapter;
pub mod builder;
pub mod error;
pub mod runner;
pub mod sampler;
pub mod scorer;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;

pub use builder::{start_quiz, start_self_test};
pub use error::EngineError;
pub use runner::{Feedback, Progress, RunnerState, SessionRunner};
pub use scorer::ResultSummary;

/// Rendering hint for prompts carrying right-to-left script.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Script {
  #[default]
  Default,
  RightToLeft,
}

/// Which canonical shape the adapter should produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
  MultipleChoice,
  Recall,
}

/// How a session is generated from normalized items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
  /// One question per item, distractors sampled from the other items.
  PerItemMultipleChoice,
  /// The section's single probe question with its authored options.
  SingleFixedQuestion,
  /// Self-test: bare prompt/answer pairs judged known/unknown by the learner.
  Recall,
}

/// A candidate distractor: its source item key and answer text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolEntry {
  pub key: String,
  pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceItem {
  pub key: String,
  pub prompt: String,
  pub correct: String,
  pub pool: Vec<PoolEntry>,
  pub script: Script,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecallItem {
  pub key: String,
  pub prompt: String,
  pub answer: String,
  pub script: Script,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FixedItem {
  pub key: String,
  pub prompt: String,
  pub options: Vec<String>,
  pub correct_index: usize,
  pub script: Script,
}

/// Output of the corpus adapter.
#[derive(Clone, Debug, PartialEq)]
pub enum NormalizedItem {
  Choice(ChoiceItem),
  Recall(RecallItem),
  Fixed(FixedItem),
}

impl NormalizedItem {
  pub fn key(&self) -> &str {
    match self {
      NormalizedItem::Choice(c) => &c.key,
      NormalizedItem::Recall(r) => &r.key,
      NormalizedItem::Fixed(f) => &f.key,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuestionBody {
  MultipleChoice { options: Vec<String>, correct_index: usize },
  Recall { answer: String },
}

/// A fully resolved question. Ground truth is fixed at build time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
  pub prompt: String,
  pub script: Script,
  pub body: QuestionBody,
}

impl Question {
  pub fn options(&self) -> Option<&[String]> {
    match &self.body {
      QuestionBody::MultipleChoice { options, .. } => Some(options),
      QuestionBody::Recall { .. } => None,
    }
  }

  /// Text of the ground-truth answer (the correct option, or the recall answer).
  pub fn correct_text(&self) -> &str {
    match &self.body {
      QuestionBody::MultipleChoice { options, correct_index } => {
        options.get(*correct_index).map(String::as_str).unwrap_or_default()
      }
      QuestionBody::Recall { answer } => answer,
    }
  }
}

/// An ordered, fixed-length, immutable run of questions.
#[derive(Clone, Debug)]
pub struct AssessmentSession {
  domain: Domain,
  strategy: Strategy,
  questions: Vec<Question>,
}

impl AssessmentSession {
  pub(crate) fn new(domain: Domain, strategy: Strategy, questions: Vec<Question>) -> Self {
    Self { domain, strategy, questions }
  }

  pub fn domain(&self) -> Domain { self.domain }
  pub fn strategy(&self) -> Strategy { self.strategy }
  pub fn questions(&self) -> &[Question] { &self.questions }
  pub fn len(&self) -> usize { self.questions.len() }
}

/// Learner self-judgment for recall questions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Judgment {
  Known,
  Unknown,
}

impl Judgment {
  pub fn from_known(known: bool) -> Self {
    if known { Judgment::Known } else { Judgment::Unknown }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
  Choice(usize),
  Judgment(Judgment),
}

/// One answered question. Written once, never overwritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
  pub question_index: usize,
  pub response: Response,
  pub is_correct: bool,
}
