//! Loading configuration (prompts + optional corpus) from TOML.
//!
//! The file is read from `MADRASA_CONFIG_PATH`. Sections missing from the file
//! fall back to the built-in seeds; see `build_corpus`.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{AnswerPair, Corpus, Domain, Passage, Probe, Rule};
use crate::seeds;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct MadrasaConfig {
  #[serde(default)] pub prompts: Prompts,
  #[serde(default)] pub fiqh: Option<Vec<AnswerPair>>,
  #[serde(default)] pub surahs: Option<Vec<Passage>>,
  #[serde(default)] pub duas: Option<Vec<Passage>>,
  #[serde(default)] pub tajweed: Option<Vec<Rule>>,
  #[serde(default)] pub azkars: Option<AzkarsCfg>,
  #[serde(default)] pub probes: ProbesCfg,
}

/// Adhkar are authored as two lists and flattened into one section.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct AzkarsCfg {
  #[serde(default)] pub morning: Vec<Passage>,
  #[serde(default)] pub evening: Vec<Passage>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ProbesCfg {
  #[serde(default)] pub azkars: Option<Probe>,
  #[serde(default)] pub surahs: Option<Probe>,
  #[serde(default)] pub duas: Option<Probe>,
  #[serde(default)] pub fiqh: Option<Probe>,
  #[serde(default)] pub tajweed: Option<Probe>,
}

/// Prompts used by the generation client. Override them in TOML to tune tone.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub explain_system: String,
  pub explain_user_template: String,
  pub mentor_system: String,
  pub dua_system: String,
  pub dua_user_template: String,
  pub plan_system: String,
  pub plan_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      explain_system: "You are a knowledgeable Islamic scholar. Keep explanations simple and inspiring.".into(),
      explain_user_template: "Explain the meaning and wisdom of this Islamic text briefly: \"{text}\"".into(),
      mentor_system: "You are a friendly madrasa mentor. Answer Islamic questions with wisdom and kindness.".into(),
      dua_system: "You are an expert in duas.".into(),
      dua_user_template: "Create a dua for: \"{topic}\". Return strictly valid JSON with keys: \"ar\" (Arabic text), \"tr\" (transliteration), \"translation\" (English translation). Do not use markdown blocks.".into(),
      plan_system: "You are a strict but fair madrasa teacher who loves precision and numbers.".into(),
      plan_user_template: "Draw up a strict madrasa study plan for exactly 3 months.\nUse ONLY the following material available in the app:\n{stats}\n\nSpread the load so the student learns ALL of it in exactly 3 months. Give concrete numbers: how many cards, adhkar or questions to learn per day or per week for each section.\nReturn strictly a JSON array of strings, each string one plan item with numbers. No markdown blocks. Example: [\"Learn 1 morning dhikr a day\", \"Go through 3 fiqh questions a week\"].".into(),
    }
  }
}

pub fn parse_config(s: &str) -> Result<MadrasaConfig, toml::de::Error> {
  toml::from_str::<MadrasaConfig>(s)
}

/// Attempt to load `MadrasaConfig` from MADRASA_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_from_env() -> Option<MadrasaConfig> {
  let path = std::env::var("MADRASA_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "madrasa_backend", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "madrasa_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "madrasa_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

/// Assemble the corpus: configured sections win, seeds fill the gaps.
/// Every record leaves here with a unique, non-blank key.
pub fn build_corpus(cfg: Option<&MadrasaConfig>) -> Corpus {
  let Some(cfg) = cfg else {
    return seeds::seed_corpus();
  };

  let mut fiqh = cfg.fiqh.clone().unwrap_or_else(seeds::seed_fiqh);
  let mut surahs = cfg.surahs.clone().unwrap_or_else(seeds::seed_surahs);
  let mut duas = cfg.duas.clone().unwrap_or_else(seeds::seed_duas);
  let mut tajweed = cfg.tajweed.clone().unwrap_or_else(seeds::seed_tajweed);
  let mut azkars = match &cfg.azkars {
    Some(a) => flatten_azkars(a),
    None => seeds::seed_azkars(),
  };

  assign_keys(&mut fiqh, "fiqh", |p| &mut p.id);
  assign_keys(&mut surahs, "surah", |p| &mut p.id);
  assign_keys(&mut duas, "dua", |p| &mut p.id);
  assign_keys(&mut tajweed, "tajweed", |r| &mut r.id);
  assign_keys(&mut azkars, "azkar", |p| &mut p.id);

  let mut probes = seeds::seed_probes();
  let configured = [
    (Domain::Azkars, &cfg.probes.azkars),
    (Domain::Surahs, &cfg.probes.surahs),
    (Domain::Duas, &cfg.probes.duas),
    (Domain::Fiqh, &cfg.probes.fiqh),
    (Domain::Tajweed, &cfg.probes.tajweed),
  ];
  for (domain, probe) in configured {
    if let Some(p) = probe {
      probes.insert(domain, p.clone());
    }
  }

  Corpus { azkars, surahs, duas, fiqh, tajweed, probes }
}

fn flatten_azkars(cfg: &AzkarsCfg) -> Vec<Passage> {
  let label = |period: &str, prefix: &str, i: usize, p: &Passage| {
    let mut p = p.clone();
    if p.name.trim().is_empty() {
      p.name = format!("{period} dhikr #{}", i + 1);
    }
    if p.id.trim().is_empty() {
      p.id = format!("azkar-{prefix}{}", i + 1);
    }
    p
  };
  cfg
    .morning
    .iter()
    .enumerate()
    .map(|(i, p)| label("Morning", "m", i, p))
    .chain(cfg.evening.iter().enumerate().map(|(i, p)| label("Evening", "e", i, p)))
    .collect()
}

/// Explicit ids are reserved first, so a generated key never takes one
/// that a later record spells out.
fn assign_keys<T>(items: &mut [T], prefix: &str, id_of: impl Fn(&mut T) -> &mut String) {
  let mut seen = HashSet::new();
  let mut needs_key = Vec::new();
  for (i, item) in items.iter_mut().enumerate() {
    let id = id_of(item);
    if id.trim().is_empty() {
      needs_key.push(i);
    } else if !seen.insert(id.clone()) {
      warn!(target: "madrasa_backend", %prefix, duplicate = %id, "Duplicate corpus key; reassigning");
      needs_key.push(i);
    }
  }
  for i in needs_key {
    let mut fresh = format!("{prefix}-{}", i + 1);
    while !seen.insert(fresh.clone()) {
      fresh.push('x');
    }
    *id_of(&mut items[i]) = fresh;
  }
}

/// Record counts by domain, for startup logging.
pub fn inventory(corpus: &Corpus) -> HashMap<Domain, usize> {
  Domain::ALL.iter().map(|d| (*d, corpus.collection(*d).len())).collect()
}
