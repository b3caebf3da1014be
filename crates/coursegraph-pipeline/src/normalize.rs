//! Canonical course-code derivation.
//!
//! Codes are fixed-width: a 3-letter subject, a level character, two digits,
//! then campus/session decoration (`CSC108H1-F`, `CSCA08H3`). The rules here
//! are deliberately positional slicing, documented per quirk; they are not a
//! general course-code grammar. Malformed input yields a nonsensical code
//! rather than an error — upstream data is accepted as-is.

use coursegraph_core::Campus;

/// UTSC writes course levels as letters where the other campuses use digits.
const LEVEL_LETTERS: [(char, char); 4] = [('A', '1'), ('B', '2'), ('C', '3'), ('D', '4')];

/// Base of a raw code: the first 7 characters when the 7th is a digit
/// (4-digit course numbers, e.g. `ECO2061H1`), otherwise the first 6
/// (`CSC108H1` -> `CSC108`). Trimmed; shorter input is passed through.
pub fn base_code(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let take = if chars.get(6).is_some_and(|c| c.is_ascii_digit()) {
        7
    } else {
        chars.len().min(6)
    };
    chars[..take]
        .iter()
        .collect::<String>()
        .trim()
        .to_string()
}

/// The letter-to-digit alternate of a code (`CSCA08` -> `CSC108`), or
/// `None` when position 3 is not a level letter.
pub fn level_alternate(code: &str) -> Option<String> {
    let mut chars: Vec<char> = code.chars().collect();
    let level = *chars.get(3)?;
    let digit = LEVEL_LETTERS
        .iter()
        .find(|(letter, _)| *letter == level)?
        .1;
    chars[3] = digit;
    Some(chars.into_iter().collect())
}

/// Canonical code for a raw source code. The UTSC letter notation is
/// reconciled here so the same course keys identically across campuses.
pub fn canonical_code(campus: Campus, raw: &str) -> String {
    let code = base_code(raw);
    if campus == Campus::Utsc && code.chars().count() == 6 {
        if let Some(alternate) = level_alternate(&code) {
            return alternate;
        }
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seventh_digit_keeps_seven_characters() {
        assert_eq!(base_code("ECO2061H1"), "ECO2061");
        assert_eq!(base_code("MGT2305H-F"), "MGT2305");
    }

    #[test]
    fn non_digit_seventh_character_keeps_six() {
        assert_eq!(base_code("CSC108H1"), "CSC108");
        assert_eq!(base_code("MAT137Y1-F"), "MAT137");
        assert_eq!(base_code("CSCA08H3"), "CSCA08");
    }

    #[test]
    fn short_and_garbage_input_does_not_panic() {
        assert_eq!(base_code("AB"), "AB");
        assert_eq!(base_code(""), "");
        assert_eq!(base_code("   X  "), "X");
    }

    #[test]
    fn level_letters_map_to_digits() {
        assert_eq!(level_alternate("CSCA08").as_deref(), Some("CSC108"));
        assert_eq!(level_alternate("MGEB02H3").as_deref(), Some("MGE202H3"));
        assert_eq!(level_alternate("CSC108"), None);
        assert_eq!(level_alternate("CSCE08"), None);
        assert_eq!(level_alternate("AB"), None);
    }

    #[test]
    fn utsc_six_character_bases_are_digit_substituted() {
        assert_eq!(canonical_code(Campus::Utsc, "CSCA08H3"), "CSC108");
        assert_eq!(canonical_code(Campus::Utsc, "MATB41H3"), "MAT241");
    }

    #[test]
    fn all_three_campuses_converge_on_one_canonical_code() {
        assert_eq!(canonical_code(Campus::Utsg, "CSC108H1"), "CSC108");
        assert_eq!(canonical_code(Campus::Utm, "CSC108H5F"), "CSC108");
        assert_eq!(canonical_code(Campus::Utsc, "CSCA08H3"), "CSC108");
    }

    #[test]
    fn other_campuses_never_substitute() {
        // A letter at position 3 outside UTSC is left alone.
        assert_eq!(canonical_code(Campus::Utsg, "CSCA08H1"), "CSCA08");
    }
}
