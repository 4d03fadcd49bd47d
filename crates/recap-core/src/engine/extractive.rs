use std::collections::HashMap;

use serde_json::{Value, json};

use crate::EngineFault;
use crate::chunk::{chunk_words, first_words, word_count};

use super::SummarizeEngine;

/// Unpunctuated captions are split into pseudo-sentences of this many words.
const SENTENCE_WINDOW: usize = 25;

const STOPWORDS: [&str; 40] = [
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "his", "how", "its", "who", "did", "get", "him", "she", "too",
    "use", "that", "this", "with", "have", "from", "they", "will", "what", "when", "there",
    "their", "about", "would",
];

/// Local engine that picks the highest-scoring sentences by word frequency.
///
/// Deterministic and offline. Output keeps the selected sentences in their
/// original order and never exceeds `max_length` words.
#[derive(Debug, Default)]
pub struct ExtractiveEngine;

impl ExtractiveEngine {
    pub fn new() -> Self {
        Self
    }
}

impl SummarizeEngine for ExtractiveEngine {
    fn name(&self) -> &'static str {
        "extractive"
    }

    fn summarize(
        &self,
        text: &str,
        max_length: usize,
        min_length: usize,
    ) -> Result<Value, EngineFault> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Ok(json!([]));
        }
        let summary = select(&sentences, max_length, min_length);
        Ok(json!([{ "summary_text": summary }]))
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = Vec::new();
    for word in text.split_whitespace() {
        current.push(word);
        if word.ends_with(['.', '!', '?']) {
            sentences.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        sentences.push(current.join(" "));
    }

    sentences
        .into_iter()
        .flat_map(|sentence| {
            if word_count(&sentence) > SENTENCE_WINDOW * 2 {
                chunk_words(&sentence, SENTENCE_WINDOW).collect::<Vec<_>>()
            } else {
                vec![sentence]
            }
        })
        .collect()
}

fn normalize(word: &str) -> Option<String> {
    let token: String = word
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    if token.chars().count() < 3 || STOPWORDS.contains(&token.as_str()) {
        None
    } else {
        Some(token)
    }
}

fn select(sentences: &[String], max_length: usize, min_length: usize) -> String {
    let mut frequencies: HashMap<String, usize> = HashMap::new();
    for sentence in sentences {
        for token in sentence.split_whitespace().filter_map(normalize) {
            *frequencies.entry(token).or_default() += 1;
        }
    }

    let mut ranked: Vec<(usize, f64)> = sentences
        .iter()
        .enumerate()
        .map(|(index, sentence)| {
            let words = word_count(sentence).max(1);
            let score: usize = sentence
                .split_whitespace()
                .filter_map(normalize)
                .map(|token| frequencies.get(&token).copied().unwrap_or(0))
                .sum();
            (index, score as f64 / words as f64)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut chosen = Vec::new();
    let mut total = 0;
    for (index, _) in &ranked {
        let words = word_count(&sentences[*index]);
        if total + words > max_length {
            continue;
        }
        chosen.push(*index);
        total += words;
        if total >= min_length {
            break;
        }
    }

    if chosen.is_empty() {
        let best = ranked.first().map(|(index, _)| *index).unwrap_or(0);
        return first_words(&sentences[best], max_length);
    }

    chosen.sort_unstable();
    chosen
        .iter()
        .map(|index| sentences[*index].as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
