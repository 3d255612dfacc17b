//! Application state: the shared read-only corpus, prompts, and the
//! generation client.
//!
//! Sessions are not stored here. Each WebSocket connection owns its own
//! runner, so nothing in this struct is ever mutated after startup.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{build_corpus, inventory, load_config_from_env, Prompts};
use crate::domain::{Corpus, Domain};
use crate::generation::{GenSettings, GenerationError, Generator};

#[derive(Clone)]
pub struct AppState {
    pub corpus: Arc<Corpus>,
    pub prompts: Prompts,
    pub generator: Generator,
}

impl AppState {
    /// Build state from env: load config, assemble the corpus, init the generation client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, GenerationError> {
        let cfg_opt = load_config_from_env();
        let prompts = cfg_opt
            .as_ref()
            .map(|c| c.prompts.clone())
            .unwrap_or_default();
        let corpus = build_corpus(cfg_opt.as_ref());

        let counts = inventory(&corpus);
        for domain in Domain::ALL {
            let records = counts.get(&domain).copied().unwrap_or(0);
            info!(target: "madrasa_backend", %domain, records, strategy = ?domain.quiz_strategy(), "Startup corpus inventory");
        }

        let generator = Generator::new(GenSettings::from_env())?;
        let settings = generator.settings();
        if generator.has_default_key() {
            info!(target: "madrasa_backend", base_url = %settings.base_url, chat_model = %settings.chat_model, speech_model = %settings.speech_model, "Generation enabled with server default key.");
        } else {
            info!(target: "madrasa_backend", base_url = %settings.base_url, "No GEN_API_KEY; generation requires a per-request apiKey.");
        }

        Ok(Self::from_parts(corpus, prompts, generator))
    }

    pub fn from_parts(corpus: Corpus, prompts: Prompts, generator: Generator) -> Self {
        Self { corpus: Arc::new(corpus), prompts, generator }
    }
}
