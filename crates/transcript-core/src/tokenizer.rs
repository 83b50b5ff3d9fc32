//! Word/punctuation tokenization and smart-spaced detokenization.
//!
//! A token is either a run of alphanumerics optionally joined by a single
//! apostrophe (`won't`, `it's`), or a single non-alphanumeric,
//! non-whitespace character (punctuation). `tokenize`/`detokenize` are
//! inverses of each other modulo whitespace normalization.

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9]+(?:'[A-Za-z0-9]+)?|[^\sA-Za-z0-9]").unwrap());

static PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\w\s]$").unwrap());

/// Split `text` into an ordered sequence of word and punctuation tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN_RE.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Reconstruct text from tokens with smart spacing: the first token is
/// emitted as-is, every later token is space-prefixed unless it is a
/// single non-word, non-whitespace character, in which case it is fused
/// onto the previous token.
pub fn detokenize(tokens: &[String]) -> String {
    let mut out = String::new();
    for tok in tokens {
        if out.is_empty() {
            out.push_str(tok);
        } else if is_pure_punctuation(tok) {
            out.push_str(tok);
        } else {
            out.push(' ');
            out.push_str(tok);
        }
    }
    out
}

fn is_pure_punctuation(tok: &str) -> bool {
    PUNCT_RE.is_match(tok)
}

/// Longest common prefix length between two token sequences.
pub fn lcp_len(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tokenizes_words_and_punctuation() {
        assert_eq!(tokenize("hello, world!"), toks(&["hello", ",", "world", "!"]));
    }

    #[test]
    fn keeps_apostrophe_contractions_as_one_token() {
        assert_eq!(tokenize("it's won't"), toks(&["it's", "won't"]));
    }

    #[test]
    fn empty_input_tokenizes_to_empty() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn detokenize_fuses_punctuation_without_space() {
        let t = toks(&["hello", ",", "world", "!"]);
        assert_eq!(detokenize(&t), "hello, world!");
    }

    #[test]
    fn detokenize_spaces_ordinary_tokens() {
        let t = toks(&["one", "two", "three"]);
        assert_eq!(detokenize(&t), "one two three");
    }

    #[test]
    fn tokenize_detokenize_round_trip_modulo_whitespace() {
        let original = "Well, I'm not sure - maybe?";
        let tokens = tokenize(original);
        let reconstructed = detokenize(&tokens);
        assert_eq!(tokenize(&reconstructed), tokens);
    }

    #[test]
    fn lcp_len_stops_at_first_mismatch() {
        let a = toks(&["one", "two", "three"]);
        let b = toks(&["one", "two", "four"]);
        assert_eq!(lcp_len(&a, &b), 2);
    }

    #[test]
    fn lcp_len_is_case_sensitive() {
        let a = toks(&["One"]);
        let b = toks(&["one"]);
        assert_eq!(lcp_len(&a, &b), 0);
    }

    #[test]
    fn lcp_len_of_identical_is_full_length() {
        let a = toks(&["a", "b", "c"]);
        assert_eq!(lcp_len(&a, &a.clone()), 3);
    }
}
