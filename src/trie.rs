//! Prefix autocomplete over the lexicon keys.

use std::collections::BTreeMap;

/// A character trie. Children are kept in a `BTreeMap` so depth-first
/// traversal visits completions in lexicographic order without sorting.
#[derive(Debug, Default)]
pub struct Trie {
    root: TrieNode,
}

#[derive(Debug, Default)]
struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    is_terminal: bool,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a trie from an iterator of words.
    pub fn from_words<'a>(words: impl Iterator<Item = &'a str>) -> Self {
        let mut trie = Self::new();
        for word in words {
            trie.insert(word);
        }
        trie
    }

    /// Insert one word, lowercased.
    pub fn insert(&mut self, word: &str) {
        let mut node = &mut self.root;
        for c in word.chars().flat_map(char::to_lowercase) {
            node = node.children.entry(c).or_default();
        }
        node.is_terminal = true;
    }

    /// Up to `limit` completions of `prefix`, in lexicographic order.
    ///
    /// An empty or unknown prefix yields no completions. The prefix itself
    /// is included when it is a complete word.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<String> {
        if prefix.is_empty() || limit == 0 {
            return vec![];
        }
        let prefix: String = prefix.chars().flat_map(char::to_lowercase).collect();

        let mut node = &self.root;
        for c in prefix.chars() {
            match node.children.get(&c) {
                Some(child) => node = child,
                None => return vec![],
            }
        }

        let mut suggestions = Vec::new();
        let mut current = prefix;
        collect(node, &mut current, &mut suggestions, limit);
        suggestions
    }
}

/// Depth-first collection rooted at `node`; `current` holds the word built
/// so far and is restored before returning.
fn collect(node: &TrieNode, current: &mut String, suggestions: &mut Vec<String>, limit: usize) {
    if suggestions.len() >= limit {
        return;
    }
    if node.is_terminal {
        suggestions.push(current.clone());
    }
    for (c, child) in &node.children {
        if suggestions.len() >= limit {
            return;
        }
        current.push(*c);
        collect(child, current, suggestions, limit);
        current.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    fn sample() -> Trie {
        Trie::from_words(["machine", "machinery", "macro", "neural", "net"].into_iter())
    }

    #[test]
    fn completions_are_lexicographic_and_bounded() {
        let trie = sample();
        check!(trie.suggest("mach", 5) == vec!["machine", "machinery"]);
        check!(trie.suggest("mac", 2) == vec!["machine", "machinery"]);
        check!(trie.suggest("mac", 3) == vec!["machine", "machinery", "macro"]);
    }

    #[rstest]
    #[case("")]
    #[case("zzz")]
    #[case("machineryx")]
    fn empty_and_unknown_prefixes_yield_nothing(#[case] prefix: &str) {
        let trie = sample();
        check!(trie.suggest(prefix, 5).is_empty());
    }

    #[test]
    fn a_complete_word_suggests_itself_first() {
        let trie = sample();
        check!(trie.suggest("net", 5) == vec!["net"]);
        check!(trie.suggest("ne", 5) == vec!["net", "neural"]);
    }

    #[test]
    fn prefixes_are_case_insensitive() {
        let trie = sample();
        check!(trie.suggest("MACH", 5) == vec!["machine", "machinery"]);
    }
}
