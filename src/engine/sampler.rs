//! Distractor sampling and option-set assembly.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::engine::PoolEntry;

/// Wrong options requested for every multiple-choice question.
pub const DISTRACTOR_COUNT: usize = 3;

/// Shuffled options with the position of the correct one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionSet {
  pub options: Vec<String>,
  pub correct_index: usize,
}

/// Draw up to `count` distractors with pairwise-distinct text.
///
/// Entries keyed `exclude_key`, blank entries and entries repeating the correct
/// text are never eligible. When fewer distinct values remain the result is
/// simply shorter (degraded mode); it is never padded.
pub fn sample<'a, R: Rng + ?Sized>(
  correct: &str,
  pool: &'a [PoolEntry],
  exclude_key: &str,
  count: usize,
  rng: &mut R,
) -> Vec<&'a PoolEntry> {
  let correct = correct.trim();
  let mut eligible: Vec<&PoolEntry> = pool
    .iter()
    .filter(|e| e.key != exclude_key)
    .filter(|e| {
      let t = e.text.trim();
      !t.is_empty() && t != correct
    })
    .collect();
  eligible.shuffle(rng);

  let mut seen = HashSet::new();
  let picked: Vec<&PoolEntry> = eligible
    .into_iter()
    .filter(|e| seen.insert(e.text.trim().to_string()))
    .take(count)
    .collect();

  if picked.len() < count {
    debug!(target: "assessment", %exclude_key, requested = count, available = picked.len(), "Degraded distractor pool");
  }
  picked
}

/// Merge the correct answer into the distractors at a uniformly random position.
pub fn option_set<R: Rng + ?Sized>(correct: &str, distractors: &[&PoolEntry], rng: &mut R) -> OptionSet {
  let mut options: Vec<String> = distractors.iter().map(|d| d.text.trim().to_string()).collect();
  options.shuffle(rng);
  let correct_index = rng.gen_range(0..=options.len());
  options.insert(correct_index, correct.trim().to_string());
  OptionSet { options, correct_index }
}
