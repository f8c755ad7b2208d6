//! Reference normalization shared by the segmenter and both matchers.
//!
//! The presentation controller names scripture content with underscores
//! and suffixes ("Luke 2_21-40 (NIV)-1") while source documents use
//! colons ("Luke 2:21-40"). Stripping the same fixed punctuation set from
//! both sides bridges the two conventions before any comparison.

/// Punctuation stripped before comparison.
const STRIP_CHARS: [char; 5] = [':', '_', '-', '(', ')'];

/// Lower-case, strip the fixed punctuation set and collapse whitespace.
/// Total on any input; empty string maps to empty string.
pub fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| if STRIP_CHARS.contains(&c) { ' ' } else { c })
        .collect();

    stripped.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Alphabetic tokens longer than two characters, used for the partial
/// verse-overlap tier.
pub fn significant_tokens(s: &str) -> Vec<String> {
    normalize(s)
        .split_whitespace()
        .filter(|t| t.len() > 2 && t.chars().all(|c| c.is_alphabetic()))
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridges_colon_and_underscore_conventions() {
        assert_eq!(normalize("Luke 2:21-40"), normalize("Luke 2_21-40"));
    }

    #[test]
    fn strips_punctuation_and_collapses_whitespace() {
        assert_eq!(normalize("  Praise:  Song (Video) "), "praise song video");
        assert_eq!(normalize("Luke 2_21-40 (NIV)-1"), "luke 2 21 40 niv 1");
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn significant_tokens_drop_numbers_and_short_words() {
        assert_eq!(
            significant_tokens("Luke 2:21-40 (NIV)"),
            vec!["luke".to_string(), "niv".to_string()]
        );
    }
}
