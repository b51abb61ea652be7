//! Intents extracted from sheet records.

use crate::types::{Example, Intent, Record};
use serde_json::Map;
use std::collections::BTreeMap;

/// Separator of extra utterances in the examples cell.
pub const EXAMPLE_SEPARATOR: &str = "--";

/// One intent per distinct intent code, sorted by code.
///
/// The question is the first example, followed by the `--`-separated
/// utterances of the examples cell. Records sharing a code pool their
/// examples.
pub fn from_records(records: &[Record]) -> Vec<Intent> {
    let mut by_code: BTreeMap<&str, Vec<Example>> = BTreeMap::new();
    for record in records {
        let examples = by_code.entry(record.intent.as_str()).or_default();
        for text in examples_of(record) {
            if !examples.iter().any(|e| e.text == text) {
                examples.push(Example::new(text));
            }
        }
    }
    by_code
        .into_iter()
        .map(|(code, examples)| Intent {
            code: code.to_string(),
            examples,
            description: String::new(),
            extra: Map::new(),
        })
        .collect()
}

fn examples_of(record: &Record) -> impl Iterator<Item = &str> {
    std::iter::once(record.question.as_str())
        .chain(record.examples.split(EXAMPLE_SEPARATOR))
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(intent: &str, question: &str, examples: &str) -> Record {
        Record {
            question: question.to_string(),
            intent: intent.to_string(),
            examples: examples.to_string(),
            ..Record::default()
        }
    }

    #[test]
    fn question_and_examples_become_utterances() {
        let intents = from_records(&[
            record("q2", "O que é onda?", ""),
            record("q1", "O que é maré?", "maré é o quê?--o que significa maré"),
        ]);
        let codes: Vec<&str> = intents.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["q1", "q2"]);

        let texts: Vec<&str> = intents[0].examples.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["O que é maré?", "maré é o quê?", "o que significa maré"]);
        assert_eq!(intents[1].examples.len(), 1);
        assert_eq!(intents[0].description, "");
    }

    #[test]
    fn shared_codes_pool_examples() {
        let intents = from_records(&[
            record("q1", "a", "b"),
            record("q1", "b", "c"),
        ]);
        assert_eq!(intents.len(), 1);
        let texts: Vec<&str> = intents[0].examples.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }
}
