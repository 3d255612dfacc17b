//! WebSocket upgrade + message loop. Each connection owns at most one
//! assessment session; it is dropped on `close_session`, when another one is
//! started, or when the socket closes. One JSON reply per client message.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::domain::Domain;
use crate::engine::{EngineError, Judgment, Response};
use crate::protocol::{ClientWsMessage, ServerWsMessage, SessionKind};
use crate::logic::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "madrasa_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "madrasa_backend", "WebSocket connected");
  let mut active: Option<ActiveSession> = None;

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "madrasa_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &mut active)
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "madrasa_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }

  if let Some(s) = active.take() {
    info!(target: "madrasa_backend", session_id = %s.id, state = ?s.runner.state(), answered = s.runner.log().len(), "Discarding session on disconnect");
  }
  info!(target: "madrasa_backend", "WebSocket disconnected");
}

fn handle_client_ws(msg: ClientWsMessage, state: &AppState, active: &mut Option<ActiveSession>) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,
    ClientWsMessage::StartQuiz { domain } => start(state, domain, SessionKind::Quiz, active),
    ClientWsMessage::StartSelfTest { domain } => start(state, domain, SessionKind::SelfTest, active),
    ClientWsMessage::Answer { choice } => with_session(active, |s| s.respond(Response::Choice(choice))),
    ClientWsMessage::Judge { known } => {
      with_session(active, |s| s.respond(Response::Judgment(Judgment::from_known(known))))
    }
    ClientWsMessage::Reveal => with_session(active, |s| s.reveal()),
    ClientWsMessage::Advance => with_session(active, |s| s.advance()),
    ClientWsMessage::Progress => with_session(active, |s| Ok(s.progress())),
    ClientWsMessage::CloseSession => {
      if let Some(s) = active.take() {
        info!(target: "madrasa_backend", session_id = %s.id, "Session closed by learner");
      }
      ServerWsMessage::Closed
    }
  }
}

fn start(state: &AppState, domain: Domain, kind: SessionKind, active: &mut Option<ActiveSession>) -> ServerWsMessage {
  if let Some(old) = active.take() {
    info!(target: "madrasa_backend", session_id = %old.id, "Replacing unfinished session");
  }
  let opened = open_session(&state.corpus, domain, kind).and_then(|s| s.opened().map(|m| (s, m)));
  match opened {
    Ok((session, msg)) => {
      *active = Some(session);
      msg
    }
    Err(e) => engine_error_message(&e),
  }
}

fn with_session(
  active: &mut Option<ActiveSession>,
  f: impl FnOnce(&mut ActiveSession) -> Result<ServerWsMessage, EngineError>,
) -> ServerWsMessage {
  match active.as_mut() {
    Some(session) => f(session).unwrap_or_else(|e| engine_error_message(&e)),
    None => ServerWsMessage::Error { message: "No active session. Start a quiz or self-test first.".into() },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Prompts;
  use crate::generation::{GenSettings, Generator};
  use crate::seeds::seed_corpus;

  fn state() -> AppState {
    AppState::from_parts(seed_corpus(), Prompts::default(), Generator::new(GenSettings::default()).unwrap())
  }

  fn send(state: &AppState, active: &mut Option<ActiveSession>, json: &str) -> serde_json::Value {
    let msg: ClientWsMessage = serde_json::from_str(json).unwrap();
    serde_json::to_value(handle_client_ws(msg, state, active)).unwrap()
  }

  #[test]
  fn actions_without_session_are_errors() {
    let st = state();
    let mut active = None;
    assert_eq!(send(&st, &mut active, r#"{"type":"advance"}"#)["type"], "error");
    assert_eq!(send(&st, &mut active, r#"{"type":"ping"}"#)["type"], "pong");
  }

  #[test]
  fn self_test_round_trip_over_messages() {
    let st = state();
    let mut active = None;
    let v = send(&st, &mut active, r#"{"type":"start_self_test","domain":"tajweed"}"#);
    assert_eq!(v["type"], "session");
    assert_eq!(v["kind"], "self_test");
    assert_eq!(v["question"]["mode"], "recall");
    let total = v["progress"]["total"].as_u64().unwrap();

    for _ in 0..total {
      let fb = send(&st, &mut active, r#"{"type":"judge","known":true}"#);
      assert_eq!(fb["type"], "feedback");
      assert_eq!(fb["isCorrect"], true);
      // repeated judgment is rejected, session survives
      assert_eq!(send(&st, &mut active, r#"{"type":"judge","known":false}"#)["type"], "error");
      send(&st, &mut active, r#"{"type":"advance"}"#);
    }
    assert_eq!(send(&st, &mut active, r#"{"type":"progress"}"#)["progress"]["state"], "completed");
    let runner = &active.as_ref().unwrap().runner;
    assert_eq!(runner.summary().unwrap().percentage, 100);
  }

  #[test]
  fn starting_again_replaces_and_close_discards() {
    let st = state();
    let mut active = None;
    send(&st, &mut active, r#"{"type":"start_quiz","domain":"fiqh"}"#);
    let first = active.as_ref().unwrap().id;
    let v = send(&st, &mut active, r#"{"type":"start_quiz","domain":"duas"}"#);
    assert_eq!(v["domain"], "duas");
    assert_ne!(active.as_ref().unwrap().id, first);
    assert_eq!(active.as_ref().unwrap().runner.session().domain(), Domain::Duas);

    assert_eq!(send(&st, &mut active, r#"{"type":"close_session"}"#)["type"], "closed");
    assert!(active.is_none());
  }
}
