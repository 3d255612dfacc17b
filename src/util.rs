//! Small text helpers used across modules.

use crate::engine::Script;

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// True if the char belongs to the Arabic blocks (incl. presentation forms).
pub fn is_arabic(ch: char) -> bool {
  ('\u{0600}'..='\u{06FF}').contains(&ch)
    || ('\u{0750}'..='\u{077F}').contains(&ch)
    || ('\u{08A0}'..='\u{08FF}').contains(&ch)
    || ('\u{FB50}'..='\u{FDFF}').contains(&ch)
    || ('\u{FE70}'..='\u{FEFF}').contains(&ch)
}

/// Rendering hint: right-to-left when the text carries any Arabic letters.
pub fn script_of(text: &str) -> Script {
  if text.chars().any(is_arabic) { Script::RightToLeft } else { Script::Default }
}

/// First `words` whitespace-separated tokens, single-spaced, followed by "...".
pub fn word_snippet(text: &str, words: usize) -> String {
  let head: Vec<&str> = text.split_whitespace().take(words).collect();
  format!("{}...", head.join(" "))
}

/// Join the non-blank parts with a blank line between them.
pub fn join_nonblank(parts: &[Option<&str>]) -> String {
  parts
    .iter()
    .flatten()
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join("\n\n")
}

/// Strip markdown code fences models like to wrap JSON in.
pub fn strip_code_fences(s: &str) -> String {
  s.replace("```json", "").replace("```", "").trim().to_string()
}

/// Log-safe truncation for large strings (char-boundary aware).
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} bytes total)", head, s.len())
  }
}
