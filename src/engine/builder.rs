//! Session builder: normalized items + strategy → immutable `AssessmentSession`.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, instrument};

use crate::domain::{Corpus, Domain};
use crate::engine::adapter::{normalize, normalize_probe};
use crate::engine::sampler::{option_set, sample, DISTRACTOR_COUNT};
use crate::engine::{
  AssessmentSession, ChoiceItem, EngineError, Mode, NormalizedItem, Question, QuestionBody, Strategy,
};

/// Build a session. Item order is shuffled once; inputs are never mutated.
#[instrument(level = "debug", skip(items, rng), fields(%domain, ?strategy, items = items.len()))]
pub fn build<R: Rng + ?Sized>(
  domain: Domain,
  items: &[NormalizedItem],
  strategy: Strategy,
  rng: &mut R,
) -> Result<AssessmentSession, EngineError> {
  if items.is_empty() {
    return Err(EngineError::EmptyCorpus { domain });
  }

  let questions = match strategy {
    Strategy::PerItemMultipleChoice => {
      let mut order: Vec<&NormalizedItem> = items.iter().collect();
      order.shuffle(rng);
      let mut questions = Vec::with_capacity(order.len());
      for item in order {
        let NormalizedItem::Choice(choice) = item else {
          return Err(mismatch(strategy, item));
        };
        questions.push(choice_question(choice, rng));
      }
      questions
    }
    Strategy::SingleFixedQuestion => {
      let fixed = items
        .iter()
        .find_map(|i| match i {
          NormalizedItem::Fixed(f) => Some(f),
          _ => None,
        })
        .ok_or_else(|| mismatch(strategy, &items[0]))?;
      vec![Question {
        prompt: fixed.prompt.clone(),
        script: fixed.script,
        body: QuestionBody::MultipleChoice { options: fixed.options.clone(), correct_index: fixed.correct_index },
      }]
    }
    Strategy::Recall => {
      let mut order: Vec<&NormalizedItem> = items.iter().collect();
      order.shuffle(rng);
      order.into_iter().map(recall_question).collect()
    }
  };

  info!(target: "assessment", %domain, ?strategy, questions = questions.len(), "Session built");
  Ok(AssessmentSession::new(domain, strategy, questions))
}

/// Normalize a section for its quiz strategy and build the session.
pub fn start_quiz<R: Rng + ?Sized>(corpus: &Corpus, domain: Domain, rng: &mut R) -> Result<AssessmentSession, EngineError> {
  let strategy = domain.quiz_strategy();
  let items = match strategy {
    Strategy::SingleFixedQuestion => normalize_probe(domain, corpus.probe(domain))?,
    Strategy::PerItemMultipleChoice | Strategy::Recall => {
      normalize(domain, corpus.collection(domain), Mode::MultipleChoice)?
    }
  };
  build(domain, &items, strategy, rng)
}

/// Build a self-test (recall) session over every record of a section.
pub fn start_self_test<R: Rng + ?Sized>(
  corpus: &Corpus,
  domain: Domain,
  rng: &mut R,
) -> Result<AssessmentSession, EngineError> {
  let items = normalize(domain, corpus.collection(domain), Mode::Recall)?;
  build(domain, &items, Strategy::Recall, rng)
}

fn choice_question<R: Rng + ?Sized>(item: &ChoiceItem, rng: &mut R) -> Question {
  let distractors = sample(&item.correct, &item.pool, &item.key, DISTRACTOR_COUNT, rng);
  let set = option_set(&item.correct, &distractors, rng);
  Question {
    prompt: item.prompt.clone(),
    script: item.script,
    body: QuestionBody::MultipleChoice { options: set.options, correct_index: set.correct_index },
  }
}

/// Any item shape can be self-tested: the ground-truth text becomes the answer.
fn recall_question(item: &NormalizedItem) -> Question {
  let (prompt, script, answer) = match item {
    NormalizedItem::Recall(r) => (&r.prompt, r.script, r.answer.clone()),
    NormalizedItem::Choice(c) => (&c.prompt, c.script, c.correct.clone()),
    NormalizedItem::Fixed(f) => (&f.prompt, f.script, f.options.get(f.correct_index).cloned().unwrap_or_default()),
  };
  Question { prompt: prompt.clone(), script, body: QuestionBody::Recall { answer } }
}

fn mismatch(strategy: Strategy, item: &NormalizedItem) -> EngineError {
  EngineError::StrategyMismatch { strategy, key: item.key().to_string() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  use rand::rngs::StdRng;
  use rand::SeedableRng;

  use crate::domain::{AnswerPair, Collection};
  use crate::seeds::seed_corpus;

  fn pairs(rows: &[(&str, &str, &str)]) -> Vec<AnswerPair> {
    rows
      .iter()
      .map(|(id, q, a)| AnswerPair { id: (*id).into(), question: (*q).into(), answer: (*a).into(), arabic: None })
      .collect()
  }

  fn assert_option_invariants(q: &Question) {
    let QuestionBody::MultipleChoice { options, correct_index } = &q.body else {
      panic!("expected multiple choice")
    };
    assert!(*correct_index < options.len());
    let unique: HashSet<&String> = options.iter().collect();
    assert_eq!(unique.len(), options.len(), "duplicate option text in {options:?}");
  }

  #[test]
  fn per_item_session_has_one_question_per_item() {
    let items = pairs(&[("a", "A?", "1"), ("b", "B?", "2"), ("c", "C?", "3"), ("d", "D?", "4")]);
    let normalized = normalize(Domain::Fiqh, Collection::AnswerPairs(&items), Mode::MultipleChoice).unwrap();
    let before = normalized.clone();
    let mut rng = StdRng::seed_from_u64(11);
    let session = build(Domain::Fiqh, &normalized, Strategy::PerItemMultipleChoice, &mut rng).unwrap();

    assert_eq!(session.len(), 4);
    assert_eq!(normalized, before);
    let answers: HashSet<&str> = ["1", "2", "3", "4"].into_iter().collect();
    for q in session.questions() {
      assert_option_invariants(q);
      let options = q.options().unwrap();
      // four distinct answers: the correct one plus the other three items'
      assert_eq!(options.len(), 4);
      assert_eq!(options.iter().map(String::as_str).collect::<HashSet<_>>(), answers);
      let expected = match q.prompt.as_str() {
        "A?" => "1",
        "B?" => "2",
        "C?" => "3",
        _ => "4",
      };
      assert_eq!(q.correct_text(), expected);
    }
  }

  #[test]
  fn two_item_corpus_degrades_without_duplicates() {
    let items = pairs(&[("a", "A?", "1"), ("b", "B?", "2")]);
    let normalized = normalize(Domain::Fiqh, Collection::AnswerPairs(&items), Mode::MultipleChoice).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let session = build(Domain::Fiqh, &normalized, Strategy::PerItemMultipleChoice, &mut rng).unwrap();
    assert_eq!(session.len(), 2);
    for q in session.questions() {
      assert_option_invariants(q);
      assert_eq!(q.options().unwrap().len(), 2);
    }
  }

  #[test]
  fn empty_items_fail() {
    let mut rng = StdRng::seed_from_u64(0);
    let err = build(Domain::Fiqh, &[], Strategy::PerItemMultipleChoice, &mut rng).unwrap_err();
    assert_eq!(err, EngineError::EmptyCorpus { domain: Domain::Fiqh });
    let err = build(Domain::Fiqh, &[], Strategy::Recall, &mut rng).unwrap_err();
    assert_eq!(err, EngineError::EmptyCorpus { domain: Domain::Fiqh });
  }

  #[test]
  fn recall_items_cannot_serve_multiple_choice() {
    let items = pairs(&[("a", "A?", "1")]);
    let normalized = normalize(Domain::Fiqh, Collection::AnswerPairs(&items), Mode::Recall).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let err = build(Domain::Fiqh, &normalized, Strategy::PerItemMultipleChoice, &mut rng).unwrap_err();
    assert!(matches!(err, EngineError::StrategyMismatch { .. }));
  }

  #[test]
  fn fixed_strategy_yields_exactly_one_question() {
    let corpus = seed_corpus();
    let mut rng = StdRng::seed_from_u64(9);
    for domain in [Domain::Azkars, Domain::Duas] {
      let session = start_quiz(&corpus, domain, &mut rng).unwrap();
      assert_eq!(session.strategy(), Strategy::SingleFixedQuestion);
      assert_eq!(session.len(), 1);
      assert_option_invariants(&session.questions()[0]);
    }
  }

  #[test]
  fn seed_quizzes_hold_option_invariants() {
    let corpus = seed_corpus();
    for seed in 0..20 {
      let mut rng = StdRng::seed_from_u64(seed);
      for domain in [Domain::Fiqh, Domain::Surahs, Domain::Tajweed] {
        let session = start_quiz(&corpus, domain, &mut rng).unwrap();
        assert_eq!(session.len(), corpus.collection(domain).len());
        session.questions().iter().for_each(assert_option_invariants);
      }
    }
  }

  #[test]
  fn self_test_covers_every_record() {
    let corpus = seed_corpus();
    let mut rng = StdRng::seed_from_u64(2);
    for domain in Domain::ALL {
      let session = start_self_test(&corpus, domain, &mut rng).unwrap();
      assert_eq!(session.strategy(), Strategy::Recall);
      assert_eq!(session.len(), corpus.collection(domain).len());
      assert!(session.questions().iter().all(|q| matches!(q.body, QuestionBody::Recall { .. })));
    }
  }

  #[test]
  fn empty_section_cannot_start() {
    let corpus = Corpus::default();
    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(
      start_self_test(&corpus, Domain::Fiqh, &mut rng).unwrap_err(),
      EngineError::EmptyCorpus { domain: Domain::Fiqh }
    );
    assert_eq!(
      start_quiz(&corpus, Domain::Duas, &mut rng).unwrap_err(),
      EngineError::EmptyCorpus { domain: Domain::Duas }
    );
  }
}
