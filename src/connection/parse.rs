// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS reply parsing
//!
//! Turns raw reply blocks into attribute maps or a structured error.
//! Status words are a closed set; anything else starting with `!` is a
//! protocol violation.

use std::collections::HashMap;

use crate::error::{ApiError, Result};

/// Reply sentence status, in dominance order: a sentence carrying both
/// `!re` and `!done` counts as `!done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Done,
    Trap,
    Fatal,
    Re,
}

impl ReplyStatus {
    const STATUS_WORDS: [(&'static str, ReplyStatus); 4] = [
        ("!done", ReplyStatus::Done),
        ("!trap", ReplyStatus::Trap),
        ("!fatal", ReplyStatus::Fatal),
        ("!re", ReplyStatus::Re),
    ];

    /// Whether a sentence with this status ends a reply block.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Re)
    }
}

/// A reply attribute value.
///
/// The wire format is byte-preserving; only the boolean literals are
/// coerced, everything else stays a string for downstream helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyValue {
    Bool(bool),
    Text(String),
}

impl ReplyValue {
    fn coerce(raw: String) -> Self {
        match raw.as_str() {
            "true" | "yes" => Self::Bool(true),
            "false" | "no" => Self::Bool(false),
            _ => Self::Text(raw),
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Bool(_) => None,
            Self::Text(s) => Some(s.as_str()),
        }
    }
}

impl From<&str> for ReplyValue {
    fn from(raw: &str) -> Self {
        Self::coerce(raw.to_string())
    }
}

/// Attributes of one reply sentence, keyed without the `=K=V` framing
pub type AttributeMap = HashMap<String, ReplyValue>;

/// Classifies a sentence by the status words it carries.
///
/// Returns `None` for sentences without any known status word. Dominance
/// follows the declaration order of [`ReplyStatus::STATUS_WORDS`], so
/// `!done` wins over a stray `!re` in the same sentence.
pub(crate) fn sentence_status(words: &[String]) -> Option<ReplyStatus> {
    ReplyStatus::STATUS_WORDS
        .iter()
        .find(|(status_word, _)| words.iter().any(|w| w.as_str() == *status_word))
        .map(|&(_, status)| status)
}

/// Splits an `=K=V` word into key and raw value.
///
/// The value may itself contain `=`; a word without a second separator
/// yields an empty value. Returns `None` for non-attribute words.
pub(crate) fn parse_attribute(word: &str) -> Option<(&str, &str)> {
    let rest = word.strip_prefix('=')?;
    Some(match rest.split_once('=') {
        Some((key, value)) => (key, value),
        None => (rest, ""),
    })
}

/// Collects the attributes of one sentence, coercing booleans.
///
/// Known status words are skipped; an unknown `!` word fails the whole
/// sentence as a protocol violation. Other non-attribute words (API tags
/// and the like) are ignored.
fn sentence_attributes(words: &[String]) -> Result<AttributeMap> {
    let mut attributes = AttributeMap::new();
    for word in words {
        if word.starts_with('!') {
            if !ReplyStatus::STATUS_WORDS
                .iter()
                .any(|(w, _)| word.as_str() == *w)
            {
                tracing::warn!("Unknown status word in reply: {}", word);
                return Err(ApiError::Protocol(format!("unknown status word {word:?}")));
            }
            continue;
        }
        if let Some((key, value)) = parse_attribute(word) {
            attributes.insert(key.to_string(), ReplyValue::from(value));
        }
        // ignore other headers
    }
    Ok(attributes)
}

/// First `=message=` value anywhere in the block.
fn block_message(block: &[Vec<String>]) -> Option<String> {
    block
        .iter()
        .flat_map(|sentence| sentence.iter())
        .find_map(|word| match parse_attribute(word) {
            Some(("message", value)) => Some(value.to_string()),
            _ => None,
        })
}

/// Raw string attributes across the whole block, for error details.
fn block_details(block: &[Vec<String>]) -> HashMap<String, String> {
    let mut details = HashMap::new();
    for word in block.iter().flat_map(|sentence| sentence.iter()) {
        if let Some((key, value)) = parse_attribute(word) {
            details.insert(key.to_string(), value.to_string());
        }
    }
    details
}

const UNKNOWN_ERROR: &str = "Unknown error";

/// Parses a complete reply block.
///
/// A `!done` block yields one attribute map per sentence that carries
/// attributes; sentences made of status words only contribute nothing.
/// `!trap` and `!fatal` blocks become the matching [`ApiError`].
pub(crate) fn parse_block(block: &[Vec<String>]) -> Result<Vec<AttributeMap>> {
    let terminal = block
        .last()
        .ok_or_else(|| ApiError::Protocol("empty reply block".to_string()))?;

    let status = sentence_status(terminal)
        .filter(|s| s.is_terminal())
        .ok_or_else(|| ApiError::Protocol("reply block lacks a terminal status".to_string()))?;

    match status {
        ReplyStatus::Done => {
            let mut rows = Vec::new();
            for sentence in block {
                let attributes = sentence_attributes(sentence)?;
                if !attributes.is_empty() {
                    rows.push(attributes);
                }
            }
            Ok(rows)
        }
        ReplyStatus::Trap => Err(ApiError::Trap {
            message: block_message(block).unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            details: block_details(block),
        }),
        ReplyStatus::Fatal => Err(ApiError::Fatal {
            message: block_message(block).unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        }),
        ReplyStatus::Re => unreachable!("is_terminal filtered !re"),
    }
}
