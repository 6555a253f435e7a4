//! # N-gram Extraction
//!
//! Sliding windows of exactly `n` tokens, advancing one position at a time.
//! No padding is added at sequence boundaries.

use std::slice::Windows;

/// Lazy iterator over the n-grams of a token sequence.
#[derive(Debug, Clone)]
pub struct Ngrams<'a, T> {
    windows: Option<Windows<'a, T>>,
}

impl<'a, T> Iterator for Ngrams<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        self.windows.as_mut()?.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.windows
            .as_ref()
            .map_or((0, Some(0)), |windows| windows.size_hint())
    }
}

impl<T> ExactSizeIterator for Ngrams<'_, T> {}

/// Every contiguous run of `n` tokens in `tokens`, in order.
///
/// Yields nothing when `n` is zero or longer than the sequence.
pub fn ngrams<T>(tokens: &[T], n: usize) -> Ngrams<'_, T> {
    let windows = (n > 0).then(|| tokens.windows(n));
    Ngrams { windows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(tokens: &[&str], n: usize) -> Vec<Vec<String>> {
        ngrams(tokens, n)
            .map(|window| window.iter().map(|t| t.to_string()).collect())
            .collect()
    }

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn trigrams() {
        let tokens: Vec<&str> = "this is a test string for n-grams".split(' ').collect();
        let expected = vec![
            words("this is a"),
            words("is a test"),
            words("a test string"),
            words("test string for"),
            words("string for n-grams"),
        ];
        assert_eq!(collect(&tokens, 3), expected);
    }

    #[test]
    fn bigrams() {
        let tokens: Vec<&str> = "this is a test string for n-grams".split(' ').collect();
        let expected = vec![
            words("this is"),
            words("is a"),
            words("a test"),
            words("test string"),
            words("string for"),
            words("for n-grams"),
        ];
        assert_eq!(collect(&tokens, 2), expected);
    }

    #[test]
    fn unigrams() {
        let tokens: Vec<&str> = "this is a test string for n-grams".split(' ').collect();
        let found = collect(&tokens, 1);
        assert_eq!(found.len(), 7);
        assert_eq!(found[6], words("n-grams"));
    }

    #[test]
    fn short_sequence_yields_nothing() {
        assert!(collect(&["this", "is"], 3).is_empty());
        assert_eq!(ngrams(&["this", "is"], 3).len(), 0);
    }

    #[test]
    fn zero_width_yields_nothing() {
        assert_eq!(ngrams(&["a", "b"], 0).count(), 0);
    }

    #[test]
    fn exact_size() {
        let tokens = [1, 2, 3, 4, 5];
        assert_eq!(ngrams(&tokens, 2).len(), 4);
    }
}
