//! Answer-node titles built from a record's modifier, noun, recipient and
//! contexts, following Portuguese phrasing rules.
//!
//! Each modifier requires some combination of fields; a record missing them
//! cannot be titled and aborts generation.

use crate::types::Record;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Labels that classify a record but never act as a conversation context.
pub const NON_CONTEXTUAL_TAGS: [&str; 7] = [
    "fauna", "flora", "outras", "física", "turismo", "saúde", "geologia",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TitleError {
    #[error("questions of type '{modifier}' need {requirement}; question: {question}")]
    MissingFields {
        modifier: String,
        requirement: &'static str,
        question: String,
    },
    #[error("modifier '{0}' is not supported")]
    UnknownModifier(String),
}

/// Phrasing fixups applied to the joined title, in order.
static FIXUPS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\bem amazônia azul", "na Amazônia Azul"),
        (r"\bde amazônia azul", "da Amazônia Azul"),
        (r"\bem brasil", "no Brasil"),
        (r"\bde brasil", "do Brasil"),
        (r"\bem oceano", "no oceano"),
        (r"\bde oceano", "do oceano"),
        (r"\bde governo", "do governo"),
        (r"\bde mundo", "do mundo"),
        (r"\bem ambiente", "no ambiente"),
        (r"\bde branqueamento", "do branqueamento"),
        (r"\bde poluição", "da poluição"),
        (r"\bum tartaruga", "uma tartaruga"),
        (r"\bde projeto de", "do projeto"),
        (r"\s+\?", "?"),
        (r"\s+", " "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("title fixup pattern is valid"),
            replacement,
        )
    })
    .collect()
});

/// Contexts among `tags`: hyphens become spaces, non-contextual tags are
/// removed, duplicates and empties dropped (first occurrence wins).
pub fn contexts<'a>(tags: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let context = tag.replace('-', " ");
        let context = context.trim();
        if context.is_empty() || NON_CONTEXTUAL_TAGS.iter().any(|t| context.contains(t)) {
            continue;
        }
        if !out.iter().any(|c| c == context) {
            out.push(context.to_string());
        }
    }
    out
}

/// Build the title of the answer node for `record` given its contexts.
pub fn title(record: &Record, contexts: &[String]) -> Result<String, TitleError> {
    let modifier = record.modifier.replace('-', " ");
    let noun = record.noun.replace('-', " ");
    let recipient = record.recipient.replace('-', " ");
    let context = contexts.join("/");

    let (m, n, r, c) = (modifier.as_str(), noun.as_str(), recipient.as_str(), context.as_str());
    let missing = |requirement: &'static str| TitleError::MissingFields {
        modifier: modifier.clone(),
        requirement,
        question: record.question.clone(),
    };

    let mut parts: Vec<String> = Vec::new();
    match m {
        "causa" => {
            if c.is_empty() && r.is_empty() {
                return Err(missing("a recipient or a context"));
            }
            parts.push(m.to_string());
            push_if(&mut parts, n, |n| format!("de {n}"));
            push_if(&mut parts, r, |r| format!("de {r}"));
            push_if(&mut parts, c, |c| format!("de {c}"));
            parts.push("?".to_string());
        }
        "definição" => {
            if r.is_empty() && c.is_empty() {
                return Err(missing("a recipient or a context"));
            }
            if !r.is_empty() {
                push_if(&mut parts, c, |c| format!("{c}:"));
                parts.push(m.to_string());
                push_if(&mut parts, n, |n| format!("de {n}"));
                parts.push(format!("de {r}?"));
            } else {
                parts.push(m.to_string());
                push_if(&mut parts, n, |n| format!("de {n}"));
                parts.push(format!("de {c}?"));
            }
        }
        "detalhar" => {
            if r.is_empty() && c.is_empty() {
                return Err(missing("a recipient or a context"));
            }
            parts.push(m.to_string());
            push_if(&mut parts, n, str::to_string);
            push_if(&mut parts, r, |r| format!("de {r}"));
            push_if(&mut parts, c, |c| format!("de {c}"));
        }
        "diferença" => {
            parts.push(m.to_string());
            parts.push(format!("entre {n}"));
            parts.push(format!("e {}?", first_of(r, c)));
        }
        "é" => {
            let present = [n, r, c].iter().filter(|v| !v.is_empty()).count();
            if present < 2 {
                return Err(missing("two of noun, recipient and context"));
            }
            parts.push(first_of(n, c).to_string());
            parts.push(format!("é {}?", first_of(r, c)));
        }
        "efeito" => {
            parts.push(m.to_string());
            push_if(&mut parts, n, |n| format!("de {n}"));
            if !r.is_empty() {
                push_if(&mut parts, c, |c| format!("de {c}"));
                parts.push(format!("em {r}"));
            } else {
                parts.push(format!("em {c}"));
            }
            parts.push("?".to_string());
        }
        "existe" => {
            if r.is_empty() {
                return Err(missing("a recipient"));
            }
            push_if(&mut parts, c, |c| format!("{c}:"));
            parts.push(m.to_string());
            push_if(&mut parts, n, str::to_string);
            parts.push(format!("em {r}?"));
        }
        "explicar" => {
            parts.push(m.to_string());
            if !n.is_empty() {
                parts.push(n.to_string());
                push_if(&mut parts, r, |r| format!("de {r}"));
                push_if(&mut parts, c, |c| format!("de {c}"));
            } else {
                parts.push(c.to_string());
            }
        }
        "listar" => {
            if n.is_empty() {
                parts.push(m.to_string());
                parts.push(c.to_string());
            } else if !r.is_empty() {
                push_if(&mut parts, c, |c| format!("{c}:"));
                parts.push(m.to_string());
                parts.push(plural(n));
                parts.push(format!("de {r}"));
            } else {
                parts.push(m.to_string());
                parts.push(plural(n));
                push_if(&mut parts, c, |c| format!("de {c}"));
            }
        }
        "maior" | "menor" => {
            parts.push(m.to_string());
            push_if(&mut parts, n, str::to_string);
            push_if(&mut parts, c, |c| format!("de {c}"));
            push_if(&mut parts, r, |r| format!("de {r}"));
            parts.push("?".to_string());
        }
        "maiores" | "menores" => {
            parts.push(m.to_string());
            parts.push(plural(n));
            push_if(&mut parts, c, |c| format!("de {c}"));
            push_if(&mut parts, r, |r| format!("de {r}"));
            parts.push("?".to_string());
        }
        "onde" => {
            if c.is_empty() && r.is_empty() {
                return Err(missing("a recipient or a context"));
            }
            parts.push(format!("{m} tem"));
            if !n.is_empty() {
                parts.push(plural(n));
                parts.push(format!("de {}", first_of(r, c)));
            } else {
                parts.push(c.to_string());
                push_if(&mut parts, r, |r| format!("em {r}"));
            }
            parts.push("?".to_string());
        }
        "porque" => {
            if c.is_empty() {
                return Err(missing("a context"));
            }
            parts.push(format!("{c}:"));
            push_if(&mut parts, r, str::to_string);
            parts.push("por que?".to_string());
        }
        "quantidade" => {
            if n.is_empty() && c.is_empty() {
                return Err(missing("a noun or a context"));
            }
            if !n.is_empty() {
                parts.push(format!("{c}:"));
                parts.push(m.to_string());
                parts.push(format!("de {}", plural(n)));
            } else {
                parts.push(m.to_string());
                parts.push(format!("de {c}"));
            }
            push_if(&mut parts, r, |r| format!("em {r}"));
            parts.push("?".to_string());
        }
        "responsável" => {
            if n.is_empty() {
                return Err(missing("a noun"));
            }
            if c.is_empty() && r.is_empty() {
                return Err(missing("a recipient or a context"));
            }
            parts.push(m.to_string());
            parts.push(format!("por {n}"));
            parts.push(format!("de {}?", first_of(r, c)));
        }
        _ => return Err(TitleError::UnknownModifier(modifier.clone())),
    }

    if let Some(first) = parts.first_mut() {
        *first = capitalize(first);
    }
    let mut title = parts.join(" ").trim().to_string();
    for (pattern, replacement) in FIXUPS.iter() {
        title = pattern.replace_all(&title, *replacement).into_owned();
    }
    Ok(title)
}

fn push_if(parts: &mut Vec<String>, value: &str, render: impl FnOnce(&str) -> String) {
    if !value.is_empty() {
        parts.push(render(value));
    }
}

fn first_of<'a>(a: &'a str, b: &'a str) -> &'a str {
    if a.is_empty() {
        b
    } else {
        a
    }
}

/// Upper-case the first character and lower-case the rest.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Best-effort Portuguese plural of a single word. Multi-word phrases and
/// invariable words (ending in `x`) are returned unchanged.
pub fn plural(word: &str) -> String {
    let word = word.trim();
    if word.is_empty() || word.contains(' ') || word.ends_with('x') {
        return word.to_string();
    }

    let mut word = word.replace("ão", "õe");
    for (suffix, replacement) in [("r", "re"), ("z", "ze"), ("m", "n")] {
        if let Some(stem) = word.strip_suffix(suffix) {
            word = format!("{stem}{replacement}");
        }
    }
    word = replace_l_after_vowel(&word).replace("il", "ei");

    if word.ends_with('s') {
        word
    } else {
        word + "s"
    }
}

/// `l` preceded by a, e, o or u becomes `i` (animal → animais).
fn replace_l_after_vowel(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut previous = None;
    for c in word.chars() {
        if c == 'l' && matches!(previous, Some('a' | 'e' | 'o' | 'u')) {
            out.push('i');
        } else {
            out.push(c);
        }
        previous = Some(c);
    }
    out
}
