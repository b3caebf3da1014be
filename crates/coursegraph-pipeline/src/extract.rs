//! Course-code extraction from free-text requirement strings.
//!
//! Requirement text is prose ("CSC108H1 or equivalent; at least one of..."),
//! so this is best-effort pattern matching, not a parser: anything shaped
//! like a course code counts as a reference, and phrasing such as "or any
//! 200-level course" is invisible to it.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Three uppercase letters, a level character (digit 1-4 or UTSC letter
/// A-D), two digits, and an optional trailing digit for 4-digit numbers.
static COURSE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z]{3}[1-4A-D][0-9]{2}[0-9]?").expect("course code pattern is valid")
});

/// Distinct course-code-shaped substrings of `text`, as matched — no
/// normalization happens here; letter-form codes are reconciled against the
/// catalog later, at lookup time.
pub fn extract_codes(text: &str) -> BTreeSet<String> {
    COURSE_CODE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
