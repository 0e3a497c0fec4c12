//! Ordered FITS header table.
//!
//! Cards are kept in file order. Commentary cards (`HISTORY`, `COMMENT`) may
//! repeat; value cards are looked up by keyword (first match wins).

use crate::consts::HISTORY_TEXT_WIDTH;

/// A typed header value.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{}", if *b { "T" } else { "F" }),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for HeaderValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for HeaderValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// One 80-character header record.
#[derive(Clone, Debug, PartialEq)]
pub enum Card {
    Value {
        keyword: String,
        value: HeaderValue,
        comment: Option<String>,
    },
    /// `HISTORY`, `COMMENT`, or any keyword without a value indicator.
    Commentary { keyword: String, text: String },
}

impl Card {
    pub fn keyword(&self) -> &str {
        match self {
            Self::Value { keyword, .. } | Self::Commentary { keyword, .. } => keyword,
        }
    }
}

/// Ordered key-value metadata table of a frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// First value stored under `key` (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        let key = key.to_ascii_uppercase();
        self.cards.iter().find_map(|card| match card {
            Card::Value { keyword, value, .. } if *keyword == key => Some(value),
            _ => None,
        })
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(HeaderValue::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(HeaderValue::as_i64)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Replace the first value card for `key`, or append a new one.
    /// An existing comment is preserved.
    pub fn set(&mut self, key: &str, value: impl Into<HeaderValue>) {
        let key = key.to_ascii_uppercase();
        let value = value.into();
        for card in &mut self.cards {
            if let Card::Value {
                keyword,
                value: existing,
                ..
            } = card
            {
                if *keyword == key {
                    *existing = value;
                    return;
                }
            }
        }
        self.cards.push(Card::Value {
            keyword: key,
            value,
            comment: None,
        });
    }

    /// Remove every value card stored under `key`. Returns whether any was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let key = key.to_ascii_uppercase();
        let before = self.cards.len();
        self.cards
            .retain(|card| !matches!(card, Card::Value { keyword, .. } if *keyword == key));
        before != self.cards.len()
    }

    /// Append a `HISTORY` entry, wrapping text longer than one card.
    pub fn push_history(&mut self, text: &str) {
        self.push_commentary("HISTORY", text);
    }

    pub fn push_comment(&mut self, text: &str) {
        self.push_commentary("COMMENT", text);
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.commentary("HISTORY")
    }

    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.commentary("COMMENT")
    }

    fn commentary<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.cards.iter().filter_map(move |card| match card {
            Card::Commentary { keyword, text } if keyword == key => Some(text.as_str()),
            _ => None,
        })
    }

    fn push_commentary(&mut self, keyword: &str, text: &str) {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            self.cards.push(Card::Commentary {
                keyword: keyword.to_string(),
                text: String::new(),
            });
            return;
        }
        for chunk in chars.chunks(HISTORY_TEXT_WIDTH) {
            self.cards.push(Card::Commentary {
                keyword: keyword.to_string(),
                text: chunk.iter().collect(),
            });
        }
    }
}
