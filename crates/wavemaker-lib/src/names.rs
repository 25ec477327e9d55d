//! Human-readable batch name prefixes
//!
//! Each wave gets one random prefix shared by every pod in the batch so
//! operators can visually correlate a wave's members in `kubectl get pods`
//! output. Prefixes are lower-case and DNS-label safe.

use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "amber", "bold", "brisk", "calm", "clever", "crimson", "dapper", "eager", "fuzzy", "gentle",
    "glad", "golden", "happy", "jolly", "keen", "lively", "lucky", "mellow", "nimble", "proud",
    "quiet", "rapid", "silver", "sunny", "swift", "tidy", "vivid", "witty",
];

const NOUNS: &[&str] = &[
    "badger", "bison", "crane", "dingo", "falcon", "gecko", "heron", "ibex", "jackal", "koala",
    "lemur", "lynx", "marmot", "marten", "newt", "otter", "owl", "panda", "quail", "raven",
    "shrew", "stoat", "tapir", "vole", "walrus", "wren", "yak", "zebra",
];

/// Generate one random prefix for a batch, e.g. `swiftotter`.
pub fn batch_prefix() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    format!("{adjective}{noun}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_dns_label_safe() {
        for _ in 0..100 {
            let prefix = batch_prefix();
            assert!(!prefix.is_empty());
            assert!(
                prefix.chars().all(|c| c.is_ascii_lowercase()),
                "{prefix} should be lower-case ascii"
            );
            // Leave room for the generated-name suffix under the 63 char
            // label limit.
            assert!(prefix.len() < 20);
        }
    }

    #[test]
    fn test_word_lists_are_lower_case() {
        for word in ADJECTIVES.iter().chain(NOUNS.iter()) {
            assert!(word.chars().all(|c| c.is_ascii_lowercase()));
        }
    }
}
