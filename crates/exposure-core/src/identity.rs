//! Identity validation for judge responses.
//!
//! The remote judge is asked to echo back the job title and task it was
//! judging. A response whose echo does not sufficiently match the actual
//! input (after normalization) is rejected as answering a different record;
//! context confusion and hallucinated inputs surface exactly this way.

/// Maximum Levenshtein distance tolerated between the normalized input and
/// the normalized echoed field.
pub const MAX_ECHO_DISTANCE: usize = 15;

/// English stop-words removed before comparison. Fixed subset of the NLTK
/// list; embedded so no runtime corpus download is needed.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "being", "but", "by", "can", "could", "did",
    "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further", "had", "has",
    "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in", "into",
    "is", "it", "its", "just", "me", "more", "most", "my", "no", "nor", "not", "now", "of", "off",
    "on", "once", "only", "or", "other", "our", "out", "over", "own", "s", "same", "she", "should",
    "so", "some", "such", "t", "than", "that", "the", "their", "theirs", "them", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
    "with", "you", "your", "yours",
];

/// Lower-case, strip punctuation, drop stop-words.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    stripped
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether an echoed field sufficiently matches the input it should repeat.
pub fn echo_matches(input: &str, echoed: &str) -> bool {
    strsim::levenshtein(&normalize(input), &normalize(echoed)) <= MAX_ECHO_DISTANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_case_punctuation_and_stop_words() {
        assert_eq!(
            normalize("Designing a sustainable building."),
            "designing sustainable building"
        );
        assert_eq!(normalize("The Architect!"), "architect");
    }

    #[test]
    fn close_paraphrase_is_accepted() {
        assert!(echo_matches("Architect", "Architect"));
        assert!(echo_matches("Designing a building", "Design of a building"));
    }

    #[test]
    fn unrelated_profession_is_rejected() {
        assert!(!echo_matches(
            "Architect designing sustainable residential buildings",
            "Veterinary surgeon performing routine animal checkups"
        ));
    }
}
