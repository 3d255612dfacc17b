//! Result aggregation.

use serde::Serialize;

use crate::engine::{EngineError, ResultEntry};

/// Derived on demand from the result log; never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
  pub total_questions: usize,
  pub correct_count: usize,
  pub wrong_count: usize,
  pub percentage: u32,
}

/// Unanswered questions count as wrong. Percentage rounds half away from zero.
pub fn summarize(log: &[ResultEntry], total_questions: usize) -> Result<ResultSummary, EngineError> {
  if total_questions == 0 {
    return Err(EngineError::NoQuestions);
  }
  let correct_count = log.iter().filter(|e| e.is_correct).count().min(total_questions);
  let percentage = (correct_count as f64 / total_questions as f64 * 100.0).round() as u32;
  Ok(ResultSummary {
    total_questions,
    correct_count,
    wrong_count: total_questions - correct_count,
    percentage,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::{Judgment, Response};

  fn entries(flags: &[bool]) -> Vec<ResultEntry> {
    flags
      .iter()
      .enumerate()
      .map(|(i, ok)| ResultEntry {
        question_index: i,
        response: Response::Judgment(Judgment::from_known(*ok)),
        is_correct: *ok,
      })
      .collect()
  }

  #[test]
  fn zero_questions_is_guarded() {
    assert_eq!(summarize(&[], 0).unwrap_err(), EngineError::NoQuestions);
  }

  #[test]
  fn counts_and_rounds() {
    let s = summarize(&entries(&[true, false, false]), 3).unwrap();
    assert_eq!((s.correct_count, s.wrong_count, s.percentage), (1, 2, 33));

    let s = summarize(&entries(&[true, true, false]), 3).unwrap();
    assert_eq!(s.percentage, 67);

    let s = summarize(&entries(&[true]), 8).unwrap();
    // 12.5 rounds up
    assert_eq!(s.percentage, 13);
  }

  #[test]
  fn unanswered_count_as_wrong() {
    let s = summarize(&entries(&[true]), 4).unwrap();
    assert_eq!(s.wrong_count, 3);
    assert_eq!(s.percentage, 25);
  }

  #[test]
  fn summary_serializes_camel_case() {
    let s = summarize(&entries(&[true, true]), 2).unwrap();
    let v = serde_json::to_value(s).unwrap();
    assert_eq!(v["totalQuestions"], 2);
    assert_eq!(v["percentage"], 100);
  }
}
