//! DDC (Dewey Decimal Classification) subjects from flat YAML rows

use std::collections::BTreeMap;

use crate::datastreams::transformers::Transformer;
use crate::domain::{Identifier, Result, Scheme, SubjectError, SubjectRecord};
use crate::infrastructure::config::{Language, SubjectsConfig, resolve_default_language};

/// One source row: `id` plus one label per language code
pub type DdcRow = BTreeMap<String, String>;

pub const DEWEY_BASE_URL: &str = "http://dewey.info/";

/// Basic check for a Dewey notation, e.g. "551" or "005.133"
pub fn is_dewey_notation(ddc: &str) -> bool {
    !ddc.is_empty() && ddc.chars().all(|c| c.is_ascii_digit() || c == '.')
}

#[derive(Debug, Clone)]
pub struct DdcYamlTransformer {
    default_lang: String,
    languages: Vec<Language>,
}

impl DdcYamlTransformer {
    pub fn new(config: &SubjectsConfig) -> Self {
        Self {
            default_lang: resolve_default_language(&config.ddc_lang, &config.languages),
            languages: config.languages.clone(),
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_lang
    }
}

impl Transformer for DdcYamlTransformer {
    type Input = DdcRow;

    const NAME: &'static str = "ddc-subjects";

    fn apply(&self, row: &DdcRow) -> Result<SubjectRecord> {
        let id = row.get("id").ok_or(SubjectError::MissingField("id"))?;
        if !is_dewey_notation(id) {
            tracing::warn!("DDC id '{}' is not a Dewey notation", id);
        }

        let mut record = SubjectRecord::new(Scheme::Ddc);
        record.id = id.clone();
        record
            .identifiers
            .push(Identifier::url(format!("{}{}", DEWEY_BASE_URL, id)));

        for language in &self.languages {
            if let Some(label) = row.get(&language.code) {
                record.title.insert(language.code.clone(), label.clone());
            }
        }

        // The class number keeps numerically close classes apart
        if let Some(label) = row.get(&self.default_lang) {
            record.subject = format!("{} {}", id, label);
        }

        Ok(record)
    }
}
