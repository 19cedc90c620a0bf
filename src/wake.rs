//! Wake phrase detection over a configured phrase set
//!
//! A transcript triggers the assistant when it contains a reference
//! phrase verbatim, or when the whole utterance is close enough to one
//! of them by normalized Levenshtein similarity. The substring check
//! catches "oye, inventario activar por favor"; the similarity check
//! tolerates recognition noise on short utterances.

use crate::fuzzy::similarity;

pub struct WakeWordDetector {
    phrases: Vec<String>,
    threshold: f64,
}

impl WakeWordDetector {
    pub fn new(phrases: &[String], threshold: f64) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.to_lowercase()).collect(),
            threshold,
        }
    }

    /// Check whether a transcript should wake the assistant.
    pub fn detect(&self, transcript: &str) -> bool {
        let normalized = transcript.trim().to_lowercase();

        self.phrases.iter().any(|phrase| {
            normalized.contains(phrase.as_str())
                || similarity(&normalized, phrase) > self.threshold
        })
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> WakeWordDetector {
        let phrases = vec![
            "inventario activar".to_string(),
            "hola inventario".to_string(),
        ];
        WakeWordDetector::new(&phrases, 0.8)
    }

    #[test]
    fn test_exact_phrase() {
        assert!(detector().detect("inventario activar"));
    }

    #[test]
    fn test_substring_match() {
        assert!(detector().detect("hola inventario por favor"));
        assert!(detector().detect("  Inventario Activar  "));
    }

    #[test]
    fn test_fuzzy_match() {
        // one substitution in an 18-char phrase, similarity ~0.94
        assert!(detector().detect("imventario activar"));
    }

    #[test]
    fn test_no_match() {
        assert!(!detector().detect("xyz completely unrelated text"));
        assert!(!detector().detect("buscar lápices"));
        assert!(!detector().detect(""));
    }
}
