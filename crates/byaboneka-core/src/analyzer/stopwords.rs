//! Embedded English + Kinyarwanda stopword set.
//!
//! Tokens appearing here are dropped during keyword extraction regardless of
//! length. The list is intentionally small: item reports are short, and an
//! over-aggressive list starts eating signal ("lost my black phone" must keep
//! "black" and "phone").

pub const STOPWORDS: &[&str] = &[
    // English
    "a", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by",
    "can", "did", "do", "for", "from", "had", "has", "have", "her", "his",
    "how", "i", "if", "in", "into", "is", "it", "its", "lost", "found", "my",
    "near", "new", "no", "not", "of", "on", "or", "our", "out", "so", "some",
    "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "to", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "will", "with", "would", "you", "your", "item", "items",
    "please", "help", "around", "inside", "left", "bus", "taxi", "moto",
    // Kinyarwanda
    "na", "ni", "ya", "wa", "ba", "cya", "bya", "mu", "ku", "kuri", "muri",
    "iyo", "uyu", "iki", "icyo", "ibi", "ibyo", "aba", "abo", "uwo", "iyi",
    "kandi", "ariko", "cyangwa", "kuko", "ubwo", "none", "nuko", "naho",
    "hari", "nta", "buri", "byose", "bose", "cyane", "gusa", "ndetse",
    "kubera", "nyuma", "mbere", "hafi", "imbere", "inyuma", "hejuru",
    "hasi", "yange", "yanjye", "wanjye", "nabuze", "yabuze", "nabonye",
    "yabonetse",
];

/// Binary membership test. The list is short enough that a linear scan is
/// fine; callers hit this once per token.
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_stopwords() {
        assert!(is_stopword("the"));
        assert!(is_stopword("lost"));
        assert!(!is_stopword("iphone"));
    }

    #[test]
    fn test_kinyarwanda_stopwords() {
        assert!(is_stopword("kandi"));
        assert!(is_stopword("nabuze"));
        assert!(!is_stopword("telefone"));
    }

    #[test]
    fn test_list_is_lowercase() {
        for word in STOPWORDS {
            assert_eq!(*word, word.to_lowercase(), "stopword not lowercase: {}", word);
        }
    }
}
