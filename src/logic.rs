//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Opening an assessment session and driving it (answer/judge/advance)
//!   - Mapping runner output to protocol messages
//!   - The study plan with its built-in fallback
//!   - Narration output encoding

use rand::Rng;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::audio::{encode_base64, AudioBuffer};
use crate::domain::{Corpus, Domain};
use crate::engine::{
  start_quiz, start_self_test, EngineError, QuestionBody, Response, RunnerState, SessionRunner,
};
use crate::protocol::{question_out, DomainOut, DomainsOut, ServerWsMessage, SessionKind, SpeechOut};
use crate::seeds::fallback_study_plan;
use crate::state::AppState;

/// A session owned by one learner connection.
#[derive(Debug)]
pub struct ActiveSession {
  pub id: Uuid,
  pub kind: SessionKind,
  pub runner: SessionRunner,
}

pub fn open_session(corpus: &Corpus, domain: Domain, kind: SessionKind) -> Result<ActiveSession, EngineError> {
  let mut rng = rand::thread_rng();
  open_session_with(corpus, domain, kind, &mut rng)
}

#[instrument(level = "info", skip(corpus, rng))]
pub fn open_session_with<R: Rng + ?Sized>(
  corpus: &Corpus,
  domain: Domain,
  kind: SessionKind,
  rng: &mut R,
) -> Result<ActiveSession, EngineError> {
  let session = match kind {
    SessionKind::Quiz => start_quiz(corpus, domain, rng)?,
    SessionKind::SelfTest => start_self_test(corpus, domain, rng)?,
  };
  let id = Uuid::new_v4();
  info!(target: "madrasa_backend", session_id = %id, %domain, ?kind, strategy = ?session.strategy(), questions = session.len(), "Session opened");
  Ok(ActiveSession { id, kind, runner: SessionRunner::new(session) })
}

impl ActiveSession {
  /// First message after opening: the session header plus question 1.
  pub fn opened(&self) -> Result<ServerWsMessage, EngineError> {
    let question = self.runner.current_question()?;
    Ok(ServerWsMessage::Session {
      session_id: self.id.to_string(),
      domain: self.runner.session().domain(),
      kind: self.kind,
      progress: self.runner.progress(),
      question: question_out(self.runner.cursor(), question),
    })
  }

  pub fn respond(&mut self, response: Response) -> Result<ServerWsMessage, EngineError> {
    let feedback = self.runner.answer(response)?;
    Ok(ServerWsMessage::Feedback { feedback, progress: self.runner.progress() })
  }

  /// Show a recall answer without judging it.
  pub fn reveal(&self) -> Result<ServerWsMessage, EngineError> {
    let question = self.runner.current_question()?;
    match &question.body {
      QuestionBody::Recall { answer } => Ok(ServerWsMessage::Reveal { answer: answer.clone() }),
      QuestionBody::MultipleChoice { .. } => Err(EngineError::ResponseMismatch { question_index: self.runner.cursor() }),
    }
  }

  pub fn advance(&mut self) -> Result<ServerWsMessage, EngineError> {
    match self.runner.advance()? {
      RunnerState::Completed => {
        let summary = self.runner.summary()?;
        info!(target: "madrasa_backend", session_id = %self.id, correct = summary.correct_count, total = summary.total_questions, percentage = summary.percentage, "Session completed");
        Ok(ServerWsMessage::Completed { summary })
      }
      _ => {
        let question = self.runner.current_question()?;
        Ok(ServerWsMessage::Question {
          progress: self.runner.progress(),
          question: question_out(self.runner.cursor(), question),
        })
      }
    }
  }

  pub fn progress(&self) -> ServerWsMessage {
    ServerWsMessage::Progress { progress: self.runner.progress() }
  }
}

/// Engine errors become `error` messages; the session, if any, stays usable.
pub fn engine_error_message(e: &EngineError) -> ServerWsMessage {
  if e.is_benign() {
    info!(target: "madrasa_backend", error = %e, "Ignored repeated action");
  } else {
    warn!(target: "madrasa_backend", error = %e, "Session action rejected");
  }
  ServerWsMessage::Error { message: e.to_string() }
}

pub fn domains_overview(corpus: &Corpus) -> DomainsOut {
  let domains = Domain::ALL
    .iter()
    .map(|d| DomainOut {
      domain: *d,
      title: d.title(),
      records: corpus.collection(*d).len(),
      quiz_strategy: d.quiz_strategy(),
    })
    .collect();
  DomainsOut { domains }
}

/// Study plan from the generator, or the built-in plan on any failure.
#[instrument(level = "info", skip(state, credential))]
pub async fn do_study_plan(state: &AppState, credential: Option<&str>) -> (Vec<String>, &'static str) {
  let stats = state.corpus.stats_line();
  match state.generator.study_plan(&state.prompts, &stats, credential).await {
    Ok(items) => (items, "generated"),
    Err(e) => {
      error!(target: "madrasa_backend", error = %e, "Study plan generation failed; using fallback plan.");
      (fallback_study_plan(), "fallback")
    }
  }
}

pub fn speech_out(buffer: &AudioBuffer) -> SpeechOut {
  SpeechOut {
    sample_rate: buffer.sample_rate(),
    channels: buffer.channel_count(),
    frames: buffer.frames(),
    duration_ms: buffer.duration_ms(),
    pcm_base64: encode_base64(&buffer.to_pcm16le()),
  }
}
