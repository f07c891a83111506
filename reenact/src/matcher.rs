//! Fuzzy text matching for screen verification.
//!
//! The replay engine never does pixel matching; it compares the text it can
//! read off the live screen against the OCR text recorded for an action and
//! treats the normalized Levenshtein distance as the drift signal.

/// Minimum number of single-character insertions, deletions, or
/// substitutions required to turn `a` into `b`.
///
/// Two-row dynamic programming over characters, O(len(a)·len(b)) time and
/// O(min(len(a), len(b))) space.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let mut shorter: Vec<char> = a.chars().collect();
    let mut longer: Vec<char> = b.chars().collect();
    if shorter.len() > longer.len() {
        std::mem::swap(&mut shorter, &mut longer);
    }
    if shorter.is_empty() {
        return longer.len();
    }

    let mut previous: Vec<usize> = (0..=shorter.len()).collect();
    let mut current = vec![0usize; shorter.len() + 1];

    for (row, lc) in longer.iter().enumerate() {
        current[0] = row + 1;
        for (col, sc) in shorter.iter().enumerate() {
            let substitution = previous[col] + usize::from(lc != sc);
            let insertion = current[col] + 1;
            let deletion = previous[col + 1] + 1;
            current[col + 1] = substitution.min(insertion).min(deletion);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[shorter.len()]
}

/// How badly the live screen text diverges from the expected OCR text, as a
/// fraction in `[0.0, 1.0+]`.
///
/// Both strings are truncated to the shorter character length before
/// comparison, so trailing content a partial OCR capture never saw is not
/// penalized. When the truncation length is zero the ratio is undefined;
/// the policy here is: both empty reads as a perfect match, one empty reads
/// as a maximal mismatch.
pub fn mismatch_ratio(live: &str, expected: &str) -> f32 {
    let length = live.chars().count().min(expected.chars().count());
    if length == 0 {
        return if live.is_empty() && expected.is_empty() {
            0.0
        } else {
            1.0
        };
    }
    let live_truncated: String = live.chars().take(length).collect();
    let expected_truncated: String = expected.chars().take(length).collect();
    levenshtein(&live_truncated, &expected_truncated) as f32 / length as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_of_identical_strings_is_zero() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("Settings", "Settings"), 0);
    }

    #[test]
    fn distance_against_empty_is_length() {
        assert_eq!(levenshtein("kitten", ""), 6);
        assert_eq!(levenshtein("", "kitten"), 6);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            ("kitten", "sitting"),
            ("flaw", "lawn"),
            ("Settings", "Setlings"),
            ("abc", ""),
        ];
        for (a, b) in pairs {
            assert_eq!(levenshtein(a, b), levenshtein(b, a), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn known_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
        assert_eq!(levenshtein("Settings", "Setlings"), 1);
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(levenshtein("héllo", "hello"), 1);
        assert_eq!(levenshtein("日本語", "日本"), 1);
    }

    #[test]
    fn close_match_stays_below_threshold() {
        // 1 edit over 8 characters.
        let ratio = mismatch_ratio("Setlings", "Settings");
        assert!((ratio - 0.125).abs() < f32::EPSILON);
    }

    #[test]
    fn distant_strings_exceed_threshold() {
        // "Xyzzyxqq" vs "Settings": well past the 0.5 cutoff.
        assert!(mismatch_ratio("Xyzzyxqq", "Settings") > 0.5);
    }

    #[test]
    fn truncates_to_shorter_string() {
        // Live screen read more text than the recorded OCR; the tail must
        // not count against the match.
        assert_eq!(mismatch_ratio("Settings and more below", "Settings"), 0.0);
        assert_eq!(mismatch_ratio("Settings", "Settings and more below"), 0.0);
    }

    #[test]
    fn empty_versus_empty_is_a_match() {
        assert_eq!(mismatch_ratio("", ""), 0.0);
    }

    #[test]
    fn empty_versus_text_is_maximal_mismatch() {
        assert_eq!(mismatch_ratio("", "Settings"), 1.0);
        assert_eq!(mismatch_ratio("Settings", ""), 1.0);
    }
}
