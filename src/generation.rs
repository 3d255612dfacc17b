//! Minimal client for the external text/speech generation service.
//!
//! Speaks the OpenAI-compatible API (chat.completions + audio/speech), which
//! DeepSeek and most hosted providers also accept. The credential is supplied
//! per call (the learner's key from settings) and falls back to `GEN_API_KEY`.
//!
//! NOTE: We never log the credential and only log payload lengths.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::audio::{decode_base64_pcm, AudioBuffer, AudioError, SPEECH_CHANNELS, SPEECH_SAMPLE_RATE};
use crate::config::Prompts;
use crate::util::{fill_template, strip_code_fences, trunc_for_log};

#[derive(Debug, Error)]
pub enum GenerationError {
  /// No credential in the request and no server default.
  #[error("missing credential: add an API key in settings")]
  MissingCredential,
  /// The remote call failed or returned no usable data.
  #[error("upstream error: {0}")]
  Upstream(String),
}

impl From<AudioError> for GenerationError {
  fn from(e: AudioError) -> Self {
    GenerationError::Upstream(e.to_string())
  }
}

impl From<reqwest::Error> for GenerationError {
  fn from(e: reqwest::Error) -> Self {
    GenerationError::Upstream(e.to_string())
  }
}

#[derive(Clone, Debug)]
pub struct GenSettings {
  pub base_url: String,
  pub chat_model: String,
  pub speech_model: String,
  pub voice: String,
  pub default_key: Option<String>,
  pub timeout: Duration,
}

impl Default for GenSettings {
  fn default() -> Self {
    Self {
      base_url: "https://api.openai.com/v1".into(),
      chat_model: "gpt-4o-mini".into(),
      speech_model: "gpt-4o-mini-tts".into(),
      voice: "alloy".into(),
      default_key: None,
      timeout: Duration::from_secs(30),
    }
  }
}

impl GenSettings {
  pub fn from_env() -> Self {
    let d = Self::default();
    let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
    Self {
      base_url: var("GEN_BASE_URL").unwrap_or(d.base_url),
      chat_model: var("GEN_CHAT_MODEL").unwrap_or(d.chat_model),
      speech_model: var("GEN_SPEECH_MODEL").unwrap_or(d.speech_model),
      voice: var("GEN_VOICE").unwrap_or(d.voice),
      default_key: var("GEN_API_KEY"),
      timeout: d.timeout,
    }
  }
}

/// Dua produced by the generator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneratedDua {
  pub ar: String,
  #[serde(default)] pub tr: String,
  #[serde(default, alias = "ru", alias = "en")] pub translation: String,
}

#[derive(Clone)]
pub struct Generator {
  client: reqwest::Client,
  settings: GenSettings,
}

impl Generator {
  pub fn new(settings: GenSettings) -> Result<Self, GenerationError> {
    let client = reqwest::Client::builder().timeout(settings.timeout).build()?;
    Ok(Self { client, settings })
  }

  pub fn settings(&self) -> &GenSettings { &self.settings }

  pub fn has_default_key(&self) -> bool { self.settings.default_key.is_some() }

  fn credential<'a>(&'a self, credential: Option<&'a str>) -> Result<&'a str, GenerationError> {
    credential
      .map(str::trim)
      .filter(|k| !k.is_empty())
      .or(self.settings.default_key.as_deref())
      .ok_or(GenerationError::MissingCredential)
  }

  /// Chat completion returning the raw text (JSON object mode when `json_mode`).
  #[instrument(level = "info", skip(self, system, prompt, credential), fields(model = %self.settings.chat_model, prompt_len = prompt.len()))]
  pub async fn generate(
    &self,
    system: &str,
    prompt: &str,
    credential: Option<&str>,
    json_mode: bool,
  ) -> Result<String, GenerationError> {
    let key = self.credential(credential)?;
    let url = format!("{}/chat/completions", self.settings.base_url);
    let req = ChatCompletionRequest {
      model: self.settings.chat_model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: prompt.into() },
      ],
      temperature: if json_mode { 0.2 } else { 0.7 },
      stream: false,
      response_format: json_mode.then(|| ResponseFormat { r#type: "json_object".into() }),
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "madrasa-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      error!(target: "madrasa_backend", %status, elapsed = ?start.elapsed(), "Generation call failed");
      return Err(GenerationError::Upstream(format!("HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Generation usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();
    if text.is_empty() {
      return Err(GenerationError::Upstream("empty completion".into()));
    }
    info!(elapsed = ?start.elapsed(), reply_len = text.len(), "Generation reply received");
    Ok(text)
  }

  /// Narrate `text`. The service returns raw 24 kHz mono 16-bit LE PCM.
  #[instrument(level = "info", skip(self, text, credential), fields(model = %self.settings.speech_model, text_len = text.len()))]
  pub async fn speak(&self, text: &str, credential: Option<&str>) -> Result<AudioBuffer, GenerationError> {
    let key = self.credential(credential)?;
    let url = format!("{}/audio/speech", self.settings.base_url);
    let req = SpeechRequest {
      model: self.settings.speech_model.clone(),
      input: text.to_string(),
      voice: self.settings.voice.clone(),
      response_format: "pcm".into(),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "madrasa-backend/0.1")
      .header(AUTHORIZATION, format!("Bearer {}", key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(GenerationError::Upstream(format!("HTTP {}: {}", status, msg)));
    }

    // Most providers stream raw PCM; some wrap it as base64 in a JSON body.
    let is_json = res
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|ct| ct.starts_with("application/json"));
    let buffer = if is_json {
      let body: InlineAudio = res.json().await?;
      decode_base64_pcm(body.audio_data()?, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS)?
    } else {
      let bytes = res.bytes().await?;
      AudioBuffer::from_pcm16le(&bytes, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS)?
    };
    info!(frames = buffer.frames(), duration_ms = buffer.duration_ms(), "Narration received");
    Ok(buffer)
  }

  // --- High-level helpers (feature-specialized) ---

  #[instrument(level = "info", skip(self, prompts, text, credential), fields(text_len = text.len()))]
  pub async fn explain(&self, prompts: &Prompts, text: &str, credential: Option<&str>) -> Result<String, GenerationError> {
    let user = fill_template(&prompts.explain_user_template, &[("text", text)]);
    self.generate(&prompts.explain_system, &user, credential, false).await
  }

  #[instrument(level = "info", skip(self, prompts, message, credential), fields(message_len = message.len()))]
  pub async fn mentor_chat(&self, prompts: &Prompts, message: &str, credential: Option<&str>) -> Result<String, GenerationError> {
    self.generate(&prompts.mentor_system, message, credential, false).await
  }

  #[instrument(level = "info", skip(self, prompts, topic, credential), fields(topic_len = topic.len()))]
  pub async fn generate_dua(&self, prompts: &Prompts, topic: &str, credential: Option<&str>) -> Result<GeneratedDua, GenerationError> {
    let user = fill_template(&prompts.dua_user_template, &[("topic", topic)]);
    let text = self.generate(&prompts.dua_system, &user, credential, true).await?;
    parse_dua(&text)
  }

  #[instrument(level = "info", skip(self, prompts, stats, credential))]
  pub async fn study_plan(&self, prompts: &Prompts, stats: &str, credential: Option<&str>) -> Result<Vec<String>, GenerationError> {
    let user = fill_template(&prompts.plan_user_template, &[("stats", stats)]);
    let text = self.generate(&prompts.plan_system, &user, credential, true).await?;
    parse_plan(&text)
  }
}

/// Accepts a JSON array of strings, or an object wrapping one under `plan` or `tasks`.
pub fn parse_plan(text: &str) -> Result<Vec<String>, GenerationError> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum PlanReply {
    List(Vec<String>),
    Plan { plan: Vec<String> },
    Tasks { tasks: Vec<String> },
  }

  let cleaned = strip_code_fences(text);
  let items = match serde_json::from_str::<PlanReply>(&cleaned) {
    Ok(PlanReply::List(v)) | Ok(PlanReply::Plan { plan: v }) | Ok(PlanReply::Tasks { tasks: v }) => v,
    Err(e) => return Err(GenerationError::Upstream(format!("unexpected plan format: {e}"))),
  };
  let items: Vec<String> = items.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
  if items.is_empty() {
    return Err(GenerationError::Upstream("plan is empty".into()));
  }
  Ok(items)
}

pub fn parse_dua(text: &str) -> Result<GeneratedDua, GenerationError> {
  let dua: GeneratedDua = serde_json::from_str(&strip_code_fences(text))
    .map_err(|e| GenerationError::Upstream(format!("failed to parse dua JSON: {e}")))?;
  if dua.ar.trim().is_empty() {
    return Err(GenerationError::Upstream("dua has no Arabic text".into()));
  }
  Ok(dua)
}

// --- Wire DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  stream: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Serialize)]
struct SpeechRequest {
  model: String,
  input: String,
  voice: String,
  response_format: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// JSON speech reply: `{"data": "<b64>"}` or `{"audio": {"data": "<b64>"}}`.
#[derive(Deserialize)]
struct InlineAudio {
  #[serde(default)] data: Option<String>,
  #[serde(default)] audio: Option<InlineAudioData>,
}
#[derive(Deserialize)]
struct InlineAudioData { data: String }

impl InlineAudio {
  fn audio_data(&self) -> Result<&str, GenerationError> {
    self.data.as_deref()
      .or(self.audio.as_ref().map(|a| a.data.as_str()))
      .ok_or_else(|| GenerationError::Upstream("no audio data in JSON reply".into()))
  }
}

/// Try to extract a clean error message from an API error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{body_partial_json, header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn generator(base_url: String, default_key: Option<&str>) -> Generator {
    Generator::new(GenSettings { base_url, default_key: default_key.map(String::from), ..Default::default() }).unwrap()
  }

  fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
      "choices": [{"message": {"role": "assistant", "content": content}, "index": 0}],
      "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
    })
  }

  #[tokio::test]
  async fn generates_text_with_request_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(header("Authorization", "Bearer user-key"))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion("  Patience is light.  ")))
      .mount(&server)
      .await;

    let gen = generator(server.uri(), Some("server-key"));
    let text = gen.generate("sys", "hello", Some("user-key"), false).await.unwrap();
    assert_eq!(text, "Patience is light.");
  }

  #[tokio::test]
  async fn falls_back_to_default_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(header("Authorization", "Bearer server-key"))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
      .mount(&server)
      .await;

    let gen = generator(server.uri(), Some("server-key"));
    assert_eq!(gen.generate("sys", "hi", Some("  "), false).await.unwrap(), "ok");
  }

  #[tokio::test]
  async fn missing_credential_fails_before_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let gen = generator(server.uri(), None);
    let err = gen.generate("sys", "hi", None, false).await.unwrap_err();
    assert!(matches!(err, GenerationError::MissingCredential));
    let err = gen.speak("text", None).await.unwrap_err();
    assert!(matches!(err, GenerationError::MissingCredential));
  }

  #[tokio::test]
  async fn upstream_error_message_is_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(
        ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": {"message": "Invalid API key"}})),
      )
      .mount(&server)
      .await;

    let gen = generator(server.uri(), None);
    let err = gen.generate("sys", "hi", Some("bad"), false).await.unwrap_err();
    let GenerationError::Upstream(msg) = err else { panic!("expected upstream error") };
    assert!(msg.contains("401"));
    assert!(msg.contains("Invalid API key"));
  }

  #[tokio::test]
  async fn empty_completion_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
      .mount(&server)
      .await;

    let gen = generator(server.uri(), Some("k"));
    assert!(matches!(gen.generate("s", "p", None, false).await, Err(GenerationError::Upstream(_))));
  }

  #[tokio::test]
  async fn json_mode_requests_json_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(body_partial_json(serde_json::json!({"response_format": {"type": "json_object"}})))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion(
        "```json\n{\"ar\": \"رَبِّ زِدْنِي عِلْمًا\", \"tr\": \"Rabbi zidni 'ilma\", \"ru\": \"My Lord, increase me in knowledge\"}\n```",
      )))
      .mount(&server)
      .await;

    let gen = generator(server.uri(), Some("k"));
    let dua = gen.generate_dua(&Prompts::default(), "knowledge", None).await.unwrap();
    assert_eq!(dua.ar, "رَبِّ زِدْنِي عِلْمًا");
    assert_eq!(dua.translation, "My Lord, increase me in knowledge");
  }

  #[tokio::test]
  async fn speech_is_decoded_from_pcm() {
    let server = MockServer::start().await;
    let pcm: Vec<u8> = [0i16, 16384, -16384, -32768].iter().flat_map(|s| s.to_le_bytes()).collect();
    Mock::given(method("POST"))
      .and(path("/audio/speech"))
      .and(body_partial_json(serde_json::json!({"response_format": "pcm"})))
      .respond_with(ResponseTemplate::new(200).set_body_bytes(pcm))
      .mount(&server)
      .await;

    let gen = generator(server.uri(), Some("k"));
    let buf = gen.speak("بِسْمِ اللَّهِ", None).await.unwrap();
    assert_eq!(buf.sample_rate(), SPEECH_SAMPLE_RATE);
    assert_eq!(buf.channel(0).unwrap(), &[0.0, 0.5, -0.5, -1.0]);
  }

  #[tokio::test]
  async fn speech_accepts_inline_base64_json() {
    let server = MockServer::start().await;
    let pcm: Vec<u8> = [16384i16, -32768].iter().flat_map(|s| s.to_le_bytes()).collect();
    Mock::given(method("POST"))
      .and(path("/audio/speech"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(serde_json::json!({"audio": {"data": crate::audio::encode_base64(&pcm)}})),
      )
      .mount(&server)
      .await;

    let gen = generator(server.uri(), Some("k"));
    let buf = gen.speak("text", None).await.unwrap();
    assert_eq!(buf.channel(0).unwrap(), &[0.5, -1.0]);
  }

  #[tokio::test]
  async fn speech_with_bad_base64_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/audio/speech"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": "!!not base64"})))
      .mount(&server)
      .await;

    let gen = generator(server.uri(), Some("k"));
    let err = gen.speak("text", None).await.unwrap_err();
    let GenerationError::Upstream(msg) = err else { panic!("expected upstream error") };
    assert!(msg.contains("base64"));
  }

  #[tokio::test]
  async fn empty_speech_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/audio/speech"))
      .respond_with(ResponseTemplate::new(200))
      .mount(&server)
      .await;

    let gen = generator(server.uri(), Some("k"));
    let err = gen.speak("text", None).await.unwrap_err();
    let GenerationError::Upstream(msg) = err else { panic!("expected upstream error") };
    assert!(msg.contains("no audio data"));
  }

  #[test]
  fn plan_accepts_list_and_wrapped_forms() {
    assert_eq!(parse_plan("[\"a\", \" b \"]").unwrap(), vec!["a", "b"]);
    assert_eq!(parse_plan("{\"plan\": [\"x\"]}").unwrap(), vec!["x"]);
    assert_eq!(parse_plan("```json\n{\"tasks\": [\"y\"]}\n```").unwrap(), vec!["y"]);
    assert!(parse_plan("{\"steps\": [\"z\"]}").is_err());
    assert!(parse_plan("[]").is_err());
    assert!(parse_plan("not json").is_err());
  }

  #[test]
  fn dua_requires_arabic() {
    assert!(parse_dua("{\"ar\": \"\", \"tr\": \"x\"}").is_err());
    assert!(parse_dua("nope").is_err());
  }
}
