//! Normalized subject record
//!
//! The shape handed to the subjects service writer. A record is built fresh
//! from one source record and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Vocabulary a subject belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheme {
    #[serde(rename = "DDC")]
    Ddc,
    #[serde(rename = "GND")]
    Gnd,
    #[serde(rename = "MESH")]
    Mesh,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Ddc => "DDC",
            Scheme::Gnd => "GND",
            Scheme::Mesh => "MESH",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub scheme: String,
    pub identifier: String,
}

impl Identifier {
    pub fn url(identifier: impl Into<String>) -> Self {
        Self {
            scheme: "url".to_string(),
            identifier: identifier.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub id: String,
    pub scheme: Scheme,
    /// Display label per 2-letter language code
    pub title: BTreeMap<String, String>,
    /// Label in the configured default language
    pub subject: String,
    pub synonyms: Vec<String>,
    pub identifiers: Vec<Identifier>,
}

impl SubjectRecord {
    pub fn new(scheme: Scheme) -> Self {
        Self {
            id: String::new(),
            scheme,
            title: BTreeMap::new(),
            subject: String::new(),
            synonyms: Vec::new(),
            identifiers: Vec::new(),
        }
    }
}
