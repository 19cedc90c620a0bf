//! Fuzzy string matching utilities using Levenshtein distance
//!
//! Used for wake-phrase detection so that transcription noise
//! ("imbentario activar") still triggers the assistant.

/// Normalized similarity between two strings, in `[0.0, 1.0]`.
///
/// Case-insensitive. `1.0` means identical (two empty strings count
/// as identical), `0.0` means nothing in common.
pub fn similarity(a: &str, b: &str) -> f64 {
    // measure on the lowercased text: lowercasing can change the char
    // count ("İ" becomes "i\u{307}") and the distance is computed on
    // the lowercased form
    let longest = a
        .to_lowercase()
        .chars()
        .count()
        .max(b.to_lowercase().chars().count());
    if longest == 0 {
        return 1.0;
    }
    let dist = edit_distance(a, b);
    (longest - dist) as f64 / longest as f64
}

/// Case-insensitive Levenshtein distance, counted in chars.
///
/// Single-row dynamic programming, O(len(b)) working memory.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut prev_diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            let next = (prev_diag + cost).min(row[j] + 1).min(row[j + 1] + 1);
            prev_diag = row[j + 1];
            row[j + 1] = next;
        }
    }
    row[b.len()]
}

/// Trim a raw transcript and cap it at `max_len` chars.
pub fn sanitize_command(raw: &str, max_len: usize) -> String {
    raw.trim().chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("hola", "hola"), 0);
        assert_eq!(edit_distance("hola", "ola"), 1);
        assert_eq!(edit_distance("inventario", "imbentario"), 2);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn test_edit_distance_case_insensitive() {
        assert_eq!(edit_distance("Inventario", "inventario"), 0);
    }

    #[test]
    fn test_similarity_identity() {
        for s in ["", "a", "inventario activar", "lápiz"] {
            assert_eq!(similarity(s, s), 1.0);
        }
    }

    #[test]
    fn test_similarity_symmetric_and_bounded() {
        let pairs = [
            ("inventario", "imbentario"),
            ("hola", "adios"),
            ("", "algo"),
            ("registrar entrada", "registrar salida"),
        ];
        for (a, b) in pairs {
            let s = similarity(a, b);
            assert_eq!(s, similarity(b, a));
            assert!((0.0..=1.0).contains(&s), "similarity out of range: {s}");
        }
    }

    #[test]
    fn test_similarity_empty_vs_empty() {
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_similarity_with_expanding_lowercase() {
        // "İ" lowercases to two chars; the ratio must stay in range
        for (a, b) in [("İ", ""), ("İİİ", "iii"), ("İNVENTARIO", "inventario")] {
            let s = similarity(a, b);
            assert!((0.0..=1.0).contains(&s), "similarity out of range: {s}");
        }
    }

    #[test]
    fn test_sanitize_trims_and_caps() {
        assert_eq!(sanitize_command("  hola  ", 500), "hola");
        assert_eq!(sanitize_command("", 500), "");

        let long = "x".repeat(600);
        let sanitized = sanitize_command(&format!("  {long}  "), 500);
        assert_eq!(sanitized.chars().count(), 500);
        assert!(!sanitized.starts_with(' ') && !sanitized.ends_with(' '));
    }

    #[test]
    fn test_sanitize_respects_char_boundaries() {
        let s = "á".repeat(10);
        assert_eq!(sanitize_command(&s, 4), "á".repeat(4));
    }
}
