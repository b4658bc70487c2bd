//! Fact normalisation and similarity

use crate::fingerprint::{fingerprint, hamming_distance, EMPTY_FINGERPRINT};
use crate::SimilarityConfig;

/// Normalise a fact for comparison
///
/// Trims, folds full-width punctuation to ASCII, collapses whitespace,
/// maps CJK numerals to digits and joins digits separated by whitespace.
///
/// # Examples
///
/// ```
/// use factwire_dedup::normalize_fact;
///
/// assert_eq!(normalize_fact("  央行下调利率五个基点。 "), "央行下调利率5个基点.");
/// assert_eq!(normalize_fact("growth of 3  5 percent"), "growth of 35 percent");
/// ```
pub fn normalize_fact(fact: &str) -> String {
    let folded: String = fact.trim().chars().map(fold_char).collect();

    // Collapse whitespace runs and expand numerals in one pass
    let mut collapsed = String::with_capacity(folded.len());
    let mut in_whitespace = false;
    for c in folded.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                collapsed.push(' ');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        match numeral(c) {
            Some(digits) => collapsed.push_str(digits),
            None => collapsed.push(c),
        }
    }

    let chars: Vec<char> = collapsed.chars().collect();
    let mut out = String::with_capacity(collapsed.len());
    for (i, c) in chars.iter().enumerate() {
        if *c == ' '
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())
        {
            continue;
        }
        out.push(*c);
    }
    out
}

fn fold_char(c: char) -> char {
    match c {
        '。' => '.',
        '，' => ',',
        '！' => '!',
        '？' => '?',
        '：' => ':',
        '；' => ';',
        '“' | '”' => '"',
        '‘' | '’' => '\'',
        '（' => '(',
        '）' => ')',
        other => other,
    }
}

fn numeral(c: char) -> Option<&'static str> {
    let digits = match c {
        '零' | '〇' => "0",
        '一' => "1",
        '二' => "2",
        '三' => "3",
        '四' => "4",
        '五' => "5",
        '六' => "6",
        '七' => "7",
        '八' => "8",
        '九' => "9",
        '十' => "10",
        _ => return None,
    };
    Some(digits)
}

/// Levenshtein distance over characters
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Whether two facts state the same thing
///
/// Facts equal after [`normalize_fact`] are similar; otherwise their
/// fingerprint distance decides. When either fact has no word or CJK
/// tokens, short facts fall back to normalised Levenshtein similarity.
pub fn is_similar_fact(a: &str, b: &str, config: &SimilarityConfig) -> bool {
    let a = normalize_fact(a);
    let b = normalize_fact(b);

    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }

    let (hash_a, hash_b) = (fingerprint(&a), fingerprint(&b));
    if hash_a != EMPTY_FINGERPRINT && hash_b != EMPTY_FINGERPRINT {
        return hamming_distance(hash_a, hash_b) <= config.hamming_threshold;
    }

    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    if len_a < config.edit_max_len && len_b < config.edit_max_len {
        return strsim::normalized_levenshtein(&a, &b) > config.edit_similarity;
    }

    false
}
