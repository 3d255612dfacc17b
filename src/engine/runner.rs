//! Session runner: a two-phase state machine over an immutable session.
//!
//! `answer` moves `InProgress → Answered` (the feedback pause), `advance`
//! moves to the next question or to `Completed`. Transitions live in
//! `RunnerState::on`, independent of the runner's bookkeeping.

use serde::Serialize;
use tracing::debug;

use crate::engine::scorer::{summarize, ResultSummary};
use crate::engine::{
  AssessmentSession, EngineError, Judgment, Question, QuestionBody, Response, ResultEntry,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
  InProgress,
  Answered,
  Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
  Answer,
  Advance,
}

impl RunnerState {
  /// Next state for `event` with the cursor at `cursor` of `len` questions.
  pub fn on(self, event: Event, cursor: usize, len: usize) -> Result<RunnerState, EngineError> {
    use RunnerState::*;
    match (self, event) {
      (InProgress, Event::Answer) => Ok(Answered),
      (Answered, Event::Advance) if cursor + 1 < len => Ok(InProgress),
      (Answered, Event::Advance) => Ok(Completed),
      (Answered | Completed, Event::Answer) => Err(EngineError::AlreadyAnswered { question_index: cursor }),
      (InProgress, Event::Advance) => Err(EngineError::NotAnswered { question_index: cursor }),
      (Completed, Event::Advance) => Err(EngineError::SessionCompleted),
    }
  }
}

/// What the learner sees during the pause after answering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
  pub is_correct: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub correct_index: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub answer: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
  /// 1-based position of the current question (equals `total` once completed).
  pub position: usize,
  pub total: usize,
  pub answered: usize,
  pub state: RunnerState,
}

#[derive(Debug)]
pub struct SessionRunner {
  session: AssessmentSession,
  cursor: usize,
  state: RunnerState,
  log: Vec<ResultEntry>,
}

impl SessionRunner {
  pub fn new(session: AssessmentSession) -> Self {
    let log = Vec::with_capacity(session.len());
    Self { session, cursor: 0, state: RunnerState::InProgress, log }
  }

  pub fn session(&self) -> &AssessmentSession { &self.session }
  pub fn state(&self) -> RunnerState { self.state }
  pub fn cursor(&self) -> usize { self.cursor }
  pub fn log(&self) -> &[ResultEntry] { &self.log }

  pub fn current_question(&self) -> Result<&Question, EngineError> {
    if self.state == RunnerState::Completed {
      return Err(EngineError::SessionCompleted);
    }
    self.session.questions().get(self.cursor).ok_or(EngineError::SessionCompleted)
  }

  /// Record the learner's response to the current question.
  /// A second call before `advance` returns `AlreadyAnswered` and leaves the log as is.
  pub fn answer(&mut self, response: Response) -> Result<Feedback, EngineError> {
    let next = self.state.on(Event::Answer, self.cursor, self.session.len())?;
    let question = self.current_question()?;
    let is_correct = grade(question, response, self.cursor)?;

    let feedback = match &question.body {
      QuestionBody::MultipleChoice { correct_index, .. } => {
        Feedback { is_correct, correct_index: Some(*correct_index), answer: None }
      }
      QuestionBody::Recall { .. } => {
        Feedback { is_correct, correct_index: None, answer: Some(question.correct_text().to_string()) }
      }
    };

    self.log.push(ResultEntry { question_index: self.cursor, response, is_correct });
    self.state = next;
    debug!(target: "assessment", question = self.cursor, is_correct, "Answer recorded");
    Ok(feedback)
  }

  pub fn advance(&mut self) -> Result<RunnerState, EngineError> {
    let next = self.state.on(Event::Advance, self.cursor, self.session.len())?;
    // the cursor reaches `len` on completion
    self.cursor += 1;
    self.state = next;
    Ok(next)
  }

  pub fn progress(&self) -> Progress {
    let total = self.session.len();
    Progress {
      position: (self.cursor + 1).min(total),
      total,
      answered: self.log.len(),
      state: self.state,
    }
  }

  pub fn summary(&self) -> Result<ResultSummary, EngineError> {
    if self.state != RunnerState::Completed {
      return Err(EngineError::SessionNotFinished { answered: self.log.len(), total: self.session.len() });
    }
    summarize(&self.log, self.session.len())
  }
}

fn grade(question: &Question, response: Response, question_index: usize) -> Result<bool, EngineError> {
  match (&question.body, response) {
    (QuestionBody::MultipleChoice { options, correct_index }, Response::Choice(index)) => {
      if index >= options.len() {
        return Err(EngineError::InvalidChoice { index, options: options.len() });
      }
      Ok(index == *correct_index)
    }
    (QuestionBody::Recall { .. }, Response::Judgment(j)) => Ok(j == Judgment::Known),
    _ => Err(EngineError::ResponseMismatch { question_index }),
  }
}
