use std::str::SplitWhitespace;

/// Greedy word-bounded splitter.
///
/// Each yielded chunk holds at most `budget` whitespace-delimited words joined by
/// single spaces. Words are never split; an empty input yields nothing. The
/// iterator borrows the input and can be cloned to restart from its current
/// position.
#[derive(Clone)]
pub struct WordChunks<'a> {
    words: SplitWhitespace<'a>,
    budget: usize,
}

/// Split `text` into chunks of at most `budget` words.
pub fn chunk_words(text: &str, budget: usize) -> WordChunks<'_> {
    WordChunks {
        words: text.split_whitespace(),
        budget,
    }
}

impl Iterator for WordChunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let first = self.words.next()?;
        let mut chunk = String::from(first);
        let mut count = 1;
        while count < self.budget {
            match self.words.next() {
                Some(word) => {
                    chunk.push(' ');
                    chunk.push_str(word);
                    count += 1;
                }
                None => break,
            }
        }
        Some(chunk)
    }
}

/// Number of whitespace-delimited words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// First `limit` words of `text`, joined by single spaces.
pub fn first_words(text: &str, limit: usize) -> String {
    text.split_whitespace()
        .take(limit)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert_eq!(chunk_words("", 300).count(), 0);
        assert_eq!(chunk_words("  \n\t ", 300).count(), 0);
    }

    #[test]
    fn chunk_count_is_ceiling_of_words_over_budget() {
        for (words, budget) in [(1, 300), (300, 300), (301, 300), (1000, 300), (7, 2), (9, 3)] {
            let text = numbered_words(words);
            let expected = words.div_ceil(budget);
            assert_eq!(
                chunk_words(&text, budget).count(),
                expected,
                "words={words} budget={budget}"
            );
        }
    }

    #[test]
    fn chunks_respect_budget_and_reproduce_words() {
        let text = numbered_words(1000);
        let chunks: Vec<String> = chunk_words(&text, 300).collect();
        assert!(chunks.iter().all(|chunk| word_count(chunk) <= 300));

        let rebuilt: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn oversized_single_word_is_kept() {
        let long_word = "x".repeat(5000);
        let text = format!("a {long_word} b");
        let chunks: Vec<String> = chunk_words(&text, 1).collect();
        assert_eq!(chunks, vec!["a".to_string(), long_word, "b".to_string()]);
    }

    #[test]
    fn zero_budget_still_makes_progress() {
        let chunks: Vec<String> = chunk_words("a b c", 0).collect();
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn cloned_iterator_restarts_from_same_position() {
        let text = numbered_words(10);
        let chunks = chunk_words(&text, 4);
        let first: Vec<String> = chunks.clone().collect();
        let second: Vec<String> = chunks.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn first_words_takes_prefix() {
        let text = numbered_words(2000);
        let prefix = first_words(&text, 1500);
        assert_eq!(word_count(&prefix), 1500);
        assert!(prefix.starts_with("w0 w1 "));
        assert!(prefix.ends_with("w1499"));
    }
}
