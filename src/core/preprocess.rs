//! Chat preprocessing: the minimal normalization applied before the greeting
//! short-circuit and the resolver. Heavier linguistic work (lemmatization,
//! tokenizer quirks) stays behind the external contracts.

use regex::Regex;
use std::sync::OnceLock;

fn spaces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" +").expect("static regex"))
}

/// Splits on runs of spaces, the same tokenization the model's span offsets
/// are defined over.
pub fn whitespace_tokens(text: &str) -> Vec<String> {
    spaces_re()
        .split(text.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalizes an incoming chat line: lowercase, punctuation stripped,
/// whitespace collapsed. Returns the ordered sentences of the chat; a plain
/// command comes back as a single sentence.
pub fn preprocess_chat(chat: &str) -> Vec<String> {
    let mut cleaned = String::with_capacity(chat.len());
    for ch in chat.chars() {
        match ch {
            '.' | ',' | '!' | '?' | ';' | ':' | '"' | '(' | ')' | '[' | ']' | '{' | '}' => {
                cleaned.push(' ');
            }
            _ => {
                for lower in ch.to_lowercase() {
                    cleaned.push(lower);
                }
            }
        }
    }
    let sentence = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    vec![sentence]
}
