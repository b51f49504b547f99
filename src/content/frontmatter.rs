//! Front-matter parsing
//!
//! A post may open with a block of `key: value` lines fenced by `---`
//! lines:
//!
//! ```text
//! ---
//! header: Hello
//! creation_date: 03/01/2024
//! ---
//! Body starts here.
//! ```
//!
//! The block is only recognized at the very start of the document.
//! Anything else is returned untouched as body, so parsing never fails.

use chrono::NaiveDate;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::helpers::parse_post_date;

lazy_static! {
    static ref FRONT_MATTER: Regex =
        Regex::new(r"(?s)\A---\r?\n(.*?)\r?\n---\r?\n").expect("front-matter pattern is valid");
}

/// Keys the page templates know how to display
pub const RECOGNIZED_KEYS: [&str; 4] = ["creation_date", "header", "subheader", "creator"];

/// Metadata read from a post's front-matter
///
/// Keys keep the order they appear in. Unrecognized keys are stored as
/// well, they are just not displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Metadata {
    fields: IndexMap<String, String>,
}

impl Metadata {
    /// Split a document into its metadata and body
    ///
    /// Lines without a colon and lines with an empty key are skipped. A
    /// repeated key takes the last value.
    pub fn parse(document: &str) -> (Self, &str) {
        let Some(captures) = FRONT_MATTER.captures(document) else {
            return (Self::default(), document);
        };
        let (Some(whole), Some(block)) = (captures.get(0), captures.get(1)) else {
            return (Self::default(), document);
        };

        let mut fields = IndexMap::new();
        for line in block.as_str().split('\n') {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            fields.insert(key.to_string(), value.trim().to_string());
        }

        (Self { fields }, &document[whole.end()..])
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn creation_date(&self) -> Option<&str> {
        self.get("creation_date")
    }

    pub fn header(&self) -> Option<&str> {
        self.get("header")
    }

    pub fn subheader(&self) -> Option<&str> {
        self.get("subheader")
    }

    pub fn creator(&self) -> Option<&str> {
        self.get("creator")
    }

    /// The creation date, if present and in `DD/MM/YYYY` form
    pub fn parsed_creation_date(&self) -> Option<NaiveDate> {
        self.creation_date().and_then(parse_post_date)
    }

    /// Keys present that the templates do not display
    pub fn unrecognized_keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .keys()
            .map(String::as_str)
            .filter(|key| !RECOGNIZED_KEYS.contains(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
