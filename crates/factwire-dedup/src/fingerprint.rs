//! Token parity fingerprints
//!
//! Text is split into runs of alphanumeric characters. A run without CJK
//! characters is one lower-cased word token; a run containing CJK characters
//! contributes each CJK character as its own token. Every distinct token owns
//! one of 64 buckets (the first 8 bytes of its SHA-256 digest, modulo 64) and
//! the fingerprint is a fixed seed with the bucket bit of each token toggled.
//!
//! A single character edit changes at most three tokens, so it moves the
//! fingerprint by at most three bits.

use factwire_domain::language::is_cjk;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Starting bits; tokens toggle bits of this value
const SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Fingerprint of text that has no tokens; never a duplicate of anything
pub const EMPTY_FINGERPRINT: i64 = 0;

/// Compute the fingerprint of `text`
///
/// The unsigned 64-bit hash is reinterpreted as `i64` so it fits a signed
/// BIGINT column; values above `i64::MAX` come out negative.
pub fn fingerprint(text: &str) -> i64 {
    let tokens = tokens(text);
    if tokens.is_empty() {
        return EMPTY_FINGERPRINT;
    }

    let hash = tokens
        .iter()
        .fold(SEED, |acc, token| acc ^ (1u64 << bucket(token)));

    hash as i64
}

/// Distinct tokens of `text`
fn tokens(text: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    for run in text.split(|c: char| !c.is_alphanumeric()) {
        if run.is_empty() {
            continue;
        }
        if run.chars().any(is_cjk) {
            tokens.extend(run.chars().filter(|c| is_cjk(*c)).map(String::from));
        } else {
            tokens.insert(run.chars().flat_map(char::to_lowercase).collect());
        }
    }
    tokens
}

fn bucket(token: &str) -> u32 {
    let digest = Sha256::digest(token.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % 64) as u32
}

/// Number of differing bits between two fingerprints
pub fn hamming_distance(a: i64, b: i64) -> u32 {
    (a ^ b).count_ones()
}

/// Whether two fingerprints are near-duplicates
///
/// The empty fingerprint never matches, not even itself.
pub fn is_duplicate(a: i64, b: i64, threshold: u32) -> bool {
    if a == EMPTY_FINGERPRINT || b == EMPTY_FINGERPRINT {
        return false;
    }
    hamming_distance(a, b) <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FACT: &str =
        "Bank X raised its benchmark lending rate by 25 basis points on Tuesday to curb inflation";

    #[derive(Debug, Clone)]
    enum Edit {
        Replace(usize, char),
        Insert(usize, char),
        Delete(usize),
    }

    fn apply(text: &str, edit: &Edit) -> String {
        let mut chars: Vec<char> = text.chars().collect();
        match *edit {
            Edit::Replace(at, c) if !chars.is_empty() => {
                let index = at % chars.len();
                chars[index] = c;
            }
            Edit::Delete(at) if !chars.is_empty() => {
                let index = at % chars.len();
                chars.remove(index);
            }
            Edit::Insert(at, c) => {
                let index = at % (chars.len() + 1);
                chars.insert(index, c);
            }
            _ => {}
        }
        chars.into_iter().collect()
    }

    fn edit_char() -> impl Strategy<Value = char> {
        prop::sample::select(vec![
            'a', 'b', 'X', 'Y', '0', '9', ' ', '.', ',', '-', '央', '行', '利', '率', '上', '调',
        ])
    }

    fn edit() -> impl Strategy<Value = Edit> {
        prop_oneof![
            (any::<usize>(), edit_char()).prop_map(|(at, c)| Edit::Replace(at, c)),
            (any::<usize>(), edit_char()).prop_map(|(at, c)| Edit::Insert(at, c)),
            any::<usize>().prop_map(Edit::Delete),
        ]
    }

    #[test]
    fn test_empty_text_is_sentinel() {
        assert_eq!(fingerprint(""), EMPTY_FINGERPRINT);
        assert_eq!(fingerprint("   "), EMPTY_FINGERPRINT);
        assert_eq!(fingerprint("!!"), EMPTY_FINGERPRINT);
    }

    #[test]
    fn test_single_token_toggles_one_seed_bit() {
        // sha256("abc") = ba7816bf8f01cfea..., bucket 42
        assert_eq!(fingerprint("abc"), (SEED ^ (1 << 42)) as i64);
        assert_eq!(fingerprint("abc"), 0x9e37_7db9_7f4a_7c15_u64 as i64);
        assert!(fingerprint("abc") < 0, "values above i64::MAX wrap negative");
        assert_eq!(fingerprint("ABC"), fingerprint("abc"));
    }

    #[test]
    fn test_known_fingerprint() {
        assert_eq!(fingerprint(FACT), -4741925672563583697);
        assert_eq!(fingerprint("央行上调利率"), -7010000449049822191);
    }

    #[test]
    fn test_case_punctuation_and_repeats_ignored() {
        let with_period = format!("{}.", FACT);
        assert_eq!(hamming_distance(fingerprint(FACT), fingerprint(&with_period)), 0);
        assert_eq!(
            fingerprint("The bank raised rates"),
            fingerprint("the BANK raised rates!!")
        );
        assert_eq!(fingerprint("rates rates rates"), fingerprint("rates"));
    }

    #[test]
    fn test_latin_inside_cjk_run_is_dropped() {
        assert_eq!(fingerprint("GDP增长"), fingerprint("增长"));
        assert_ne!(fingerprint("增长 GDP"), fingerprint("增长"));
    }

    #[test]
    fn test_added_word_is_near_duplicate() {
        let a = fingerprint("Bank X raises rates.");
        let b = fingerprint("Bank X raises rates again.");
        assert_eq!(hamming_distance(a, b), 1);
        assert!(is_duplicate(a, b, 3));

        let singular = FACT.replace("basis points", "basis point");
        assert_eq!(hamming_distance(fingerprint(FACT), fingerprint(&singular)), 2);
        assert!(is_duplicate(fingerprint(FACT), fingerprint(&singular), 3));
    }

    #[test]
    fn test_distinct_facts_are_far_apart() {
        let unrelated = "Regulators published draft capital buffer rules for systemically important banks";
        assert_eq!(hamming_distance(fingerprint(FACT), fingerprint(unrelated)), 20);
        assert!(!is_duplicate(fingerprint(FACT), fingerprint(unrelated), 3));
    }

    #[test]
    fn test_sentinel_never_duplicates() {
        assert!(!is_duplicate(0, 0, 64));
        assert!(!is_duplicate(0, fingerprint(FACT), 64));
    }

    #[test]
    fn test_hamming_distance_handles_sign_bit() {
        assert_eq!(hamming_distance(-1, 0), 64);
        assert_eq!(hamming_distance(i64::MIN, 0), 1);
    }

    proptest! {
        #[test]
        fn fingerprint_is_deterministic(text in ".{0,200}") {
            prop_assert_eq!(fingerprint(&text), fingerprint(&text));
        }

        #[test]
        fn distance_is_symmetric(a in "[a-z ]{0,60}", b in "[a-z ]{0,60}") {
            let (fa, fb) = (fingerprint(&a), fingerprint(&b));
            prop_assert_eq!(hamming_distance(fa, fb), hamming_distance(fb, fa));
            prop_assert!(hamming_distance(fa, fb) <= 64);
        }

        #[test]
        fn single_character_edit_moves_at_most_three_bits(
            text in "[abXY09 .,\\-央行利率上调]{0,400}",
            edit in edit(),
        ) {
            let original = fingerprint(&text);
            let edited = fingerprint(&apply(&text, &edit));
            prop_assume!(original != EMPTY_FINGERPRINT && edited != EMPTY_FINGERPRINT);
            prop_assert!(
                hamming_distance(original, edited) <= 3,
                "{:?} moved the fingerprint by {} bits",
                edit,
                hamming_distance(original, edited)
            );
        }

        #[test]
        fn single_edit_of_prose_moves_at_most_three_bits(
            words in prop::collection::vec("[A-Za-z]{1,9}", 20..120),
            edit in edit(),
        ) {
            let text = words.join(" ");
            let original = fingerprint(&text);
            let edited = fingerprint(&apply(&text, &edit));
            prop_assume!(edited != EMPTY_FINGERPRINT);
            prop_assert!(hamming_distance(original, edited) <= 3);
        }
    }
}
