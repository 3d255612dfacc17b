//! Domain models: the study sections, their corpus records, and the loaded corpus.
//!
//! Records are authored externally (seeds or TOML) and are read-only to the engine.
//! Each section uses exactly one record shape; see `Corpus::collection`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::Strategy;

/// Study sections of the madrasa browser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
  Azkars,
  Surahs,
  Duas,
  Fiqh,
  Tajweed,
}

impl Domain {
  pub const ALL: [Domain; 5] = [Domain::Azkars, Domain::Surahs, Domain::Duas, Domain::Fiqh, Domain::Tajweed];

  pub fn as_str(&self) -> &'static str {
    match self {
      Domain::Azkars => "azkars",
      Domain::Surahs => "surahs",
      Domain::Duas => "duas",
      Domain::Fiqh => "fiqh",
      Domain::Tajweed => "tajweed",
    }
  }

  /// Quiz strategy used by the "full test" of a section.
  /// Adhkar and duas only have one canonical probe question.
  pub fn quiz_strategy(&self) -> Strategy {
    match self {
      Domain::Azkars | Domain::Duas => Strategy::SingleFixedQuestion,
      Domain::Surahs | Domain::Fiqh | Domain::Tajweed => Strategy::PerItemMultipleChoice,
    }
  }

  /// Human-readable title used by self-test sessions and the domain overview.
  pub fn title(&self) -> &'static str {
    match self {
      Domain::Azkars => "Adhkar",
      Domain::Surahs => "Surahs",
      Domain::Duas => "Duas",
      Domain::Fiqh => "Fiqh",
      Domain::Tajweed => "Tajweed",
    }
  }
}

impl fmt::Display for Domain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A direct question/answer record (fiqh).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnswerPair {
  #[serde(default)] pub id: String,
  #[serde(default)] pub question: String,
  #[serde(default)] pub answer: String,
  #[serde(default)] pub arabic: Option<String>,
}

/// A labeled Arabic passage (surah, dhikr, dua).
/// `translation` is the optional secondary human-readable label.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Passage {
  #[serde(default)] pub id: String,
  #[serde(default)] pub name: String,
  #[serde(default)] pub ar: String,
  /// Transliteration.
  #[serde(default)] pub tr: Option<String>,
  #[serde(default)] pub translation: Option<String>,
  #[serde(default)] pub content: Option<String>,
}

/// A titled rule with an explanatory body (tajweed).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Rule {
  #[serde(default)] pub id: String,
  #[serde(default)] pub title: String,
  #[serde(default)] pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProbeOption {
  #[serde(default)] pub id: String,
  pub text: String,
  #[serde(default)] pub is_correct: bool,
}

/// The single canonical question of a section with a fixed option set.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Probe {
  pub text: String,
  #[serde(default)] pub options: Vec<ProbeOption>,
}

/// Borrowed view over one section's records, tagged by shape.
#[derive(Clone, Copy, Debug)]
pub enum Collection<'a> {
  AnswerPairs(&'a [AnswerPair]),
  Passages(&'a [Passage]),
  Rules(&'a [Rule]),
}

impl Collection<'_> {
  pub fn len(&self) -> usize {
    match self {
      Collection::AnswerPairs(items) => items.len(),
      Collection::Passages(items) => items.len(),
      Collection::Rules(items) => items.len(),
    }
  }
}

/// The full in-memory corpus. Loaded once at startup and shared read-only.
#[derive(Clone, Debug, Default)]
pub struct Corpus {
  pub azkars: Vec<Passage>,
  pub surahs: Vec<Passage>,
  pub duas: Vec<Passage>,
  pub fiqh: Vec<AnswerPair>,
  pub tajweed: Vec<Rule>,
  pub probes: HashMap<Domain, Probe>,
}

impl Corpus {
  pub fn collection(&self, domain: Domain) -> Collection<'_> {
    match domain {
      Domain::Azkars => Collection::Passages(&self.azkars),
      Domain::Surahs => Collection::Passages(&self.surahs),
      Domain::Duas => Collection::Passages(&self.duas),
      Domain::Fiqh => Collection::AnswerPairs(&self.fiqh),
      Domain::Tajweed => Collection::Rules(&self.tajweed),
    }
  }

  pub fn probe(&self, domain: Domain) -> Option<&Probe> {
    self.probes.get(&domain)
  }

  /// Material statistics fed to the study-plan prompt.
  pub fn stats_line(&self) -> String {
    Domain::ALL
      .iter()
      .map(|d| format!("{}: {}", d.title(), self.collection(*d).len()))
      .collect::<Vec<_>>()
      .join(", ")
  }
}
