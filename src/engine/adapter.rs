//! Corpus adapter: one function per record shape, each producing canonical items.
//!
//! Malformed records are dropped with a warning; if nothing survives the
//! section fails with `EmptyCorpus`.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::domain::{AnswerPair, Collection, Domain, Passage, Probe, Rule};
use crate::engine::{
  ChoiceItem, EngineError, FixedItem, Mode, NormalizedItem, PoolEntry, RecallItem, Script,
};
use crate::util::{join_nonblank, script_of, word_snippet};

/// Stripped from surah openings so snippets identify the surah itself.
pub const BASMALA: &str = "بِسْمِ اللَّهِ الرَّحْمَنِ الرَّحِيمِ";

/// Tokens kept in an Arabic identification snippet.
pub const SNIPPET_WORDS: usize = 5;

pub fn normalize(
  domain: Domain,
  collection: Collection<'_>,
  mode: Mode,
) -> Result<Vec<NormalizedItem>, EngineError> {
  let results = match collection {
    Collection::AnswerPairs(items) => adapt_all(items, mode, answer_pair_item),
    Collection::Passages(items) => adapt_all(items, mode, passage_item),
    Collection::Rules(items) => adapt_all(items, mode, rule_item),
  };
  keep_valid(domain, results)
}

/// Two passes: records are validated alone first, and only the survivors
/// feed each other's distractor pools.
fn adapt_all<T: Clone>(
  items: &[T],
  mode: Mode,
  adapt: fn(&T, &[T], Mode) -> Result<NormalizedItem, EngineError>,
) -> Vec<Result<NormalizedItem, EngineError>> {
  let mut results = Vec::with_capacity(items.len());
  let mut valid = Vec::with_capacity(items.len());
  for item in items {
    match adapt(item, &[], mode) {
      Ok(_) => valid.push(item.clone()),
      Err(e) => results.push(Err(e)),
    }
  }
  results.extend(valid.iter().map(|i| adapt(i, &valid, mode)));
  results
}

/// Normalize a fixed-strategy section's probe question.
pub fn normalize_probe(domain: Domain, probe: Option<&Probe>) -> Result<Vec<NormalizedItem>, EngineError> {
  let Some(probe) = probe else {
    return Err(EngineError::EmptyCorpus { domain });
  };
  keep_valid(domain, vec![probe_item(&format!("{domain}-probe"), probe)])
}

fn keep_valid(
  domain: Domain,
  results: Vec<Result<NormalizedItem, EngineError>>,
) -> Result<Vec<NormalizedItem>, EngineError> {
  let total = results.len();
  let mut out = Vec::with_capacity(total);
  for r in results {
    match r {
      Ok(item) => out.push(item),
      Err(e) => warn!(target: "assessment", %domain, error = %e, "Skipping corpus item"),
    }
  }
  if out.is_empty() {
    return Err(EngineError::EmptyCorpus { domain });
  }
  debug!(target: "assessment", %domain, kept = out.len(), total, "Corpus normalized");
  Ok(out)
}

fn require(key: &str, field: &str, value: &str) -> Result<(), EngineError> {
  if value.trim().is_empty() {
    return Err(EngineError::InvalidItem { key: key.to_string(), reason: format!("missing {field}") });
  }
  Ok(())
}

fn non_blank(s: &Option<String>) -> Option<&str> {
  s.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

/// Pool of the other records' texts for one field.
fn pool_from<'a, T, F>(items: &'a [T], own_key: &str, key_of: impl Fn(&'a T) -> &'a str, text_of: F) -> Vec<PoolEntry>
where
  F: Fn(&'a T) -> Option<&'a str>,
{
  items
    .iter()
    .filter(|i| key_of(*i) != own_key)
    .filter_map(|i| text_of(i).map(|t| PoolEntry { key: key_of(i).to_string(), text: t.to_string() }))
    .collect()
}

pub fn answer_pair_item(item: &AnswerPair, all: &[AnswerPair], mode: Mode) -> Result<NormalizedItem, EngineError> {
  require(&item.id, "question", &item.question)?;
  require(&item.id, "answer", &item.answer)?;

  Ok(match mode {
    Mode::MultipleChoice => NormalizedItem::Choice(ChoiceItem {
      key: item.id.clone(),
      prompt: item.question.trim().to_string(),
      correct: item.answer.trim().to_string(),
      pool: pool_from(all, &item.id, |p| p.id.as_str(), |p| Some(p.answer.as_str())),
      script: Script::Default,
    }),
    Mode::Recall => NormalizedItem::Recall(RecallItem {
      key: item.id.clone(),
      prompt: item.question.trim().to_string(),
      answer: join_nonblank(&[Some(item.answer.as_str()), non_blank(&item.arabic)]),
      script: Script::Default,
    }),
  })
}

/// Passages prefer their translation as the answer; without one the learner
/// identifies the passage by name from an Arabic snippet.
pub fn passage_item(item: &Passage, all: &[Passage], mode: Mode) -> Result<NormalizedItem, EngineError> {
  require(&item.id, "name", &item.name)?;

  match mode {
    Mode::MultipleChoice => match non_blank(&item.translation) {
      Some(translation) => Ok(NormalizedItem::Choice(ChoiceItem {
        key: item.id.clone(),
        prompt: format!("How is \"{}\" translated?", item.name.trim()),
        correct: translation.to_string(),
        pool: pool_from(all, &item.id, |p| p.id.as_str(), |p| non_blank(&p.translation)),
        script: Script::Default,
      })),
      None => {
        require(&item.id, "ar", &item.ar)?;
        Ok(NormalizedItem::Choice(ChoiceItem {
          key: item.id.clone(),
          prompt: format!("Which passage is this?\n\n{}", arabic_snippet(&item.ar)),
          correct: item.name.trim().to_string(),
          pool: pool_from(all, &item.id, |p| p.id.as_str(), |p| Some(p.name.as_str())),
          script: Script::RightToLeft,
        }))
      }
    },
    Mode::Recall => {
      let answer = join_nonblank(&[non_blank(&item.content), Some(item.ar.as_str())]);
      require(&item.id, "ar", &answer)?;
      Ok(NormalizedItem::Recall(RecallItem {
        key: item.id.clone(),
        prompt: item.name.trim().to_string(),
        answer,
        script: Script::Default,
      }))
    }
  }
}

pub fn rule_item(item: &Rule, all: &[Rule], mode: Mode) -> Result<NormalizedItem, EngineError> {
  require(&item.id, "title", &item.title)?;
  require(&item.id, "content", &item.content)?;

  Ok(match mode {
    Mode::MultipleChoice => NormalizedItem::Choice(ChoiceItem {
      key: item.id.clone(),
      prompt: format!("{}?", item.title.trim()),
      correct: item.content.trim().to_string(),
      pool: pool_from(all, &item.id, |r| r.id.as_str(), |r| Some(r.content.as_str())),
      script: Script::Default,
    }),
    Mode::Recall => NormalizedItem::Recall(RecallItem {
      key: item.id.clone(),
      prompt: item.title.trim().to_string(),
      answer: item.content.trim().to_string(),
      script: Script::Default,
    }),
  })
}

/// Options must be non-blank, unique by text, with exactly one flagged correct.
pub fn probe_item(key: &str, probe: &Probe) -> Result<NormalizedItem, EngineError> {
  require(key, "text", &probe.text)?;
  let invalid = |reason: &str| EngineError::InvalidItem { key: key.to_string(), reason: reason.to_string() };

  if probe.options.is_empty() {
    return Err(invalid("probe has no options"));
  }
  let mut seen = HashSet::new();
  for o in &probe.options {
    let text = o.text.trim();
    if text.is_empty() {
      return Err(invalid("probe option text is blank"));
    }
    if !seen.insert(text) {
      return Err(invalid("probe options contain duplicate text"));
    }
  }
  let correct: Vec<usize> = probe
    .options
    .iter()
    .enumerate()
    .filter(|(_, o)| o.is_correct)
    .map(|(i, _)| i)
    .collect();
  let [correct_index] = correct.as_slice() else {
    return Err(invalid("probe must flag exactly one correct option"));
  };

  Ok(NormalizedItem::Fixed(FixedItem {
    key: key.to_string(),
    prompt: probe.text.trim().to_string(),
    options: probe.options.iter().map(|o| o.text.trim().to_string()).collect(),
    correct_index: *correct_index,
    script: script_of(&probe.text),
  }))
}

fn arabic_snippet(ar: &str) -> String {
  word_snippet(ar.replace(BASMALA, "").trim(), SNIPPET_WORDS)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::ProbeOption;

  fn pair(id: &str, q: &str, a: &str) -> AnswerPair {
    AnswerPair { id: id.into(), question: q.into(), answer: a.into(), arabic: None }
  }

  fn passage(id: &str, name: &str, ar: &str, translation: Option<&str>) -> Passage {
    Passage {
      id: id.into(),
      name: name.into(),
      ar: ar.into(),
      tr: None,
      translation: translation.map(String::from),
      content: None,
    }
  }

  fn opt(text: &str, is_correct: bool) -> ProbeOption {
    ProbeOption { id: String::new(), text: text.into(), is_correct }
  }

  #[test]
  fn empty_collection_is_empty_corpus() {
    let err = normalize(Domain::Fiqh, Collection::AnswerPairs(&[]), Mode::MultipleChoice).unwrap_err();
    assert_eq!(err, EngineError::EmptyCorpus { domain: Domain::Fiqh });
  }

  #[test]
  fn answer_pairs_pool_excludes_self() {
    let items = vec![pair("a", "A?", "1"), pair("b", "B?", "2"), pair("c", "C?", "3")];
    let out = normalize(Domain::Fiqh, Collection::AnswerPairs(&items), Mode::MultipleChoice).unwrap();
    assert_eq!(out.len(), 3);
    let NormalizedItem::Choice(first) = &out[0] else { panic!("expected choice item") };
    assert_eq!(first.prompt, "A?");
    assert_eq!(first.correct, "1");
    let keys: Vec<&str> = first.pool.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["b", "c"]);
  }

  #[test]
  fn answer_pair_recall_appends_arabic() {
    let mut item = pair("a", "A?", "1");
    item.arabic = Some("واحد".into());
    let NormalizedItem::Recall(r) = answer_pair_item(&item, &[], Mode::Recall).unwrap() else {
      panic!("expected recall item")
    };
    assert_eq!(r.answer, "1\n\nواحد");
  }

  #[test]
  fn invalid_items_are_dropped() {
    let items = vec![pair("a", "A?", "1"), pair("b", "", "2")];
    let out = normalize(Domain::Fiqh, Collection::AnswerPairs(&items), Mode::Recall).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].key(), "a");

    let err = answer_pair_item(&items[1], &items, Mode::Recall).unwrap_err();
    assert!(matches!(err, EngineError::InvalidItem { ref key, .. } if key == "b"));
  }

  #[test]
  fn rejected_records_never_supply_distractors() {
    let items = vec![pair("a", "A?", "1"), pair("b", "", "BROKEN"), pair("c", "C?", "3")];
    let out = normalize(Domain::Fiqh, Collection::AnswerPairs(&items), Mode::MultipleChoice).unwrap();
    let keys: Vec<&str> = out.iter().map(|i| i.key()).collect();
    assert_eq!(keys, vec!["a", "c"]);
    for item in &out {
      let NormalizedItem::Choice(c) = item else { panic!("expected choice item") };
      assert!(c.pool.iter().all(|p| p.key != "b" && p.text != "BROKEN"), "{:?}", c.pool);
      assert_eq!(c.pool.len(), 1);
    }

    let rules = vec![
      Rule { id: "t1".into(), title: "Idgham".into(), content: "Merging".into() },
      Rule { id: "t2".into(), title: " ".into(), content: "Orphaned".into() },
      Rule { id: "t3".into(), title: "Ikhfa".into(), content: "Hiding".into() },
    ];
    let out = normalize(Domain::Tajweed, Collection::Rules(&rules), Mode::MultipleChoice).unwrap();
    for item in &out {
      let NormalizedItem::Choice(c) = item else { panic!("expected choice item") };
      assert!(c.pool.iter().all(|p| p.text != "Orphaned"));
    }
  }

  #[test]
  fn all_invalid_escalates_to_empty_corpus() {
    let items = vec![pair("a", "", "1"), pair("b", "B?", " ")];
    let err = normalize(Domain::Fiqh, Collection::AnswerPairs(&items), Mode::Recall).unwrap_err();
    assert_eq!(err, EngineError::EmptyCorpus { domain: Domain::Fiqh });
  }

  #[test]
  fn passage_with_translation_asks_for_it() {
    let items = vec![
      passage("s1", "Al-Ikhlas", "قُلْ هُوَ اللَّهُ أَحَدٌ", Some("Sincerity")),
      passage("s2", "Al-Falaq", "قُلْ أَعُوذُ بِرَبِّ الْفَلَقِ", Some("The Daybreak")),
      passage("s3", "An-Nas", "قُلْ أَعُوذُ بِرَبِّ النَّاسِ", None),
    ];
    let NormalizedItem::Choice(c) = passage_item(&items[0], &items, Mode::MultipleChoice).unwrap() else {
      panic!("expected choice item")
    };
    assert_eq!(c.prompt, "How is \"Al-Ikhlas\" translated?");
    assert_eq!(c.correct, "Sincerity");
    assert_eq!(c.script, Script::Default);
    // only other translated passages feed the pool
    assert_eq!(c.pool, vec![PoolEntry { key: "s2".into(), text: "The Daybreak".into() }]);
  }

  #[test]
  fn passage_without_translation_uses_arabic_snippet() {
    let ar = format!("{BASMALA} قُلْ أَعُوذُ بِرَبِّ النَّاسِ مَلِكِ النَّاسِ إِلَهِ النَّاسِ");
    let items = vec![passage("s3", "An-Nas", &ar, None), passage("s1", "Al-Ikhlas", "x", Some("Sincerity"))];
    let NormalizedItem::Choice(c) = passage_item(&items[0], &items, Mode::MultipleChoice).unwrap() else {
      panic!("expected choice item")
    };
    assert_eq!(c.prompt, "Which passage is this?\n\nقُلْ أَعُوذُ بِرَبِّ النَّاسِ مَلِكِ...");
    assert_eq!(c.correct, "An-Nas");
    assert_eq!(c.script, Script::RightToLeft);
    assert_eq!(c.pool, vec![PoolEntry { key: "s1".into(), text: "Al-Ikhlas".into() }]);
  }

  #[test]
  fn passage_recall_joins_content_and_arabic() {
    let mut p = passage("d1", "Before sleep", "بِاسْمِكَ اللَّهُمَّ أَمُوتُ وَأَحْيَا", None);
    p.content = Some("In Your name, O Allah, I die and I live.".into());
    let NormalizedItem::Recall(r) = passage_item(&p, &[], Mode::Recall).unwrap() else {
      panic!("expected recall item")
    };
    assert_eq!(r.prompt, "Before sleep");
    assert_eq!(r.answer, "In Your name, O Allah, I die and I live.\n\nبِاسْمِكَ اللَّهُمَّ أَمُوتُ وَأَحْيَا");
  }

  #[test]
  fn passage_without_name_is_invalid() {
    let p = passage("x", "  ", "نص", None);
    assert!(matches!(passage_item(&p, &[], Mode::Recall), Err(EngineError::InvalidItem { .. })));
  }

  #[test]
  fn rules_ask_for_the_explanation() {
    let items = vec![
      Rule { id: "t1".into(), title: "Idgham".into(), content: "Merging".into() },
      Rule { id: "t2".into(), title: "Ikhfa".into(), content: "Hiding".into() },
    ];
    let NormalizedItem::Choice(c) = rule_item(&items[0], &items, Mode::MultipleChoice).unwrap() else {
      panic!("expected choice item")
    };
    assert_eq!(c.prompt, "Idgham?");
    assert_eq!(c.correct, "Merging");
    assert_eq!(c.pool.len(), 1);
  }

  #[test]
  fn probe_is_validated() {
    let good = Probe { text: "Which is correct?".into(), options: vec![opt("a", false), opt("b", true)] };
    let NormalizedItem::Fixed(f) = probe_item("k", &good).unwrap() else { panic!("expected fixed item") };
    assert_eq!(f.correct_index, 1);
    assert_eq!(f.options, vec!["a", "b"]);

    let two_correct = Probe { text: "q".into(), options: vec![opt("a", true), opt("b", true)] };
    assert!(probe_item("k", &two_correct).is_err());
    let dup = Probe { text: "q".into(), options: vec![opt("a", true), opt(" a ", false)] };
    assert!(probe_item("k", &dup).is_err());
    let none = Probe { text: "q".into(), options: vec![] };
    assert!(probe_item("k", &none).is_err());
  }

  #[test]
  fn missing_or_broken_probe_is_empty_corpus() {
    assert_eq!(normalize_probe(Domain::Duas, None).unwrap_err(), EngineError::EmptyCorpus { domain: Domain::Duas });
    let broken = Probe { text: "q".into(), options: vec![opt("a", false)] };
    assert_eq!(
      normalize_probe(Domain::Duas, Some(&broken)).unwrap_err(),
      EngineError::EmptyCorpus { domain: Domain::Duas }
    );
  }
}
