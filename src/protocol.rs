//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//!
//! Questions leave the server without their ground truth: the correct index
//! and recall answers only travel inside `feedback` or `reveal` messages.

use serde::{Deserialize, Serialize};

use crate::engine::{Feedback, Progress, Question, ResultSummary, Script, Strategy};
use crate::domain::Domain;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartQuiz {
        domain: Domain,
    },
    StartSelfTest {
        domain: Domain,
    },
    Answer {
        choice: usize,
    },
    Judge {
        known: bool,
    },
    Reveal,
    Advance,
    Progress,
    CloseSession,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        #[serde(rename = "sessionId")]
        session_id: String,
        domain: Domain,
        kind: SessionKind,
        progress: Progress,
        question: QuestionOut,
    },
    Feedback {
        #[serde(flatten)]
        feedback: Feedback,
        progress: Progress,
    },
    Question {
        progress: Progress,
        question: QuestionOut,
    },
    Reveal {
        answer: String,
    },
    Completed {
        summary: ResultSummary,
    },
    Progress {
        progress: Progress,
    },
    Closed,
    Error {
        message: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Quiz,
    SelfTest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionMode {
    MultipleChoice,
    Recall,
}

/// A question as the learner sees it.
#[derive(Debug, Serialize, PartialEq)]
pub struct QuestionOut {
    pub index: usize,
    pub mode: QuestionMode,
    pub prompt: String,
    pub script: Script,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Convert an engine `Question` to the public DTO, dropping ground truth.
pub fn question_out(index: usize, q: &Question) -> QuestionOut {
    let options = q.options().map(<[String]>::to_vec);
    let mode = if options.is_some() { QuestionMode::MultipleChoice } else { QuestionMode::Recall };
    QuestionOut {
        index,
        mode,
        prompt: q.prompt.clone(),
        script: q.script,
        options,
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct DomainOut {
    pub domain: Domain,
    pub title: &'static str,
    pub records: usize,
    #[serde(rename = "quizStrategy")]
    pub quiz_strategy: Strategy,
}

#[derive(Serialize)]
pub struct DomainsOut {
    pub domains: Vec<DomainOut>,
}

#[derive(Deserialize)]
pub struct ExplainIn {
    pub text: String,
    #[serde(rename = "apiKey", default)]
    pub api_key: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatIn {
    pub message: String,
    #[serde(rename = "apiKey", default)]
    pub api_key: Option<String>,
}

#[derive(Serialize)]
pub struct TextOut {
    pub text: String,
}

#[derive(Deserialize)]
pub struct DuaIn {
    pub topic: String,
    #[serde(rename = "apiKey", default)]
    pub api_key: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct PlanIn {
    #[serde(rename = "apiKey", default)]
    pub api_key: Option<String>,
}

#[derive(Serialize)]
pub struct PlanOut {
    pub items: Vec<String>,
    /// "generated" or "fallback".
    pub origin: &'static str,
}

#[derive(Deserialize)]
pub struct SpeechIn {
    pub text: String,
    #[serde(rename = "apiKey", default)]
    pub api_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechOut {
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: usize,
    pub duration_ms: u64,
    pub pcm_base64: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}
