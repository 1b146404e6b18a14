//! GND (Gemeinsame Normdatei) subjects from MARC 21 authority records
//!
//! Field usage:
//! - 024 $a = GND id, $0 = URI
//! - 150 $a = preferred term, $x = subdivision, $g = qualifier
//! - 450 = see-from terms (synonyms), same subfields as 150
//! - 750 $4 EQ = equivalent term in another language, $9 L:<iso639-2>

use std::collections::HashSet;

use super::languages::to_iso639_1;
use crate::datastreams::readers::RawRecord;
use crate::datastreams::transformers::Transformer;
use crate::domain::{Identifier, Result, Scheme, SubjectRecord};
use crate::modules::cataloguing_pro::marc::{DataField, MarcRecord, parse_marc_xml};

/// GND labels are German
pub const GND_LANGUAGE: &str = "de";

#[derive(Debug, Clone, Default)]
pub struct GndMarc21Transformer;

impl GndMarc21Transformer {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for GndMarc21Transformer {
    type Input = RawRecord;

    const NAME: &'static str = "gnd-subjects";

    fn apply(&self, entry: &RawRecord) -> Result<SubjectRecord> {
        let marc = parse_marc_xml(entry.as_bytes())?;
        Ok(map_marc_record(&marc))
    }
}

/// Map a parsed authority record. Every field is optional.
pub fn map_marc_record(marc: &MarcRecord) -> SubjectRecord {
    let mut record = SubjectRecord::new(Scheme::Gnd);

    if let Some(f024) = marc.field("024") {
        if let Some(id) = f024.subfield("a") {
            record.id = format!("gnd:{}", id);
        }
        if let Some(uri) = f024.subfield("0") {
            record.identifiers.push(Identifier::url(uri));
        }
    }

    if let Some(label) = marc.field("150").and_then(compose_label) {
        record.title.insert(GND_LANGUAGE.to_string(), label.clone());
        record.subject = label;
    }

    for field in marc.fields("750") {
        if field.subfield("4") != Some("EQ") {
            continue;
        }
        let Some(label) = field.subfield("a") else {
            continue;
        };
        for code in field.subfields("9").filter_map(|sf| sf.strip_prefix("L:")) {
            match to_iso639_1(code) {
                Some(lang) => {
                    record.title.insert(lang.to_string(), label.to_string());
                }
                None => tracing::debug!("Skipping language code without 2-letter form: {}", code),
            }
        }
    }

    // Keyed on the bare $a text, so variants differing only in $g collapse
    let mut seen: HashSet<&str> = HashSet::new();
    for field in marc.fields("450") {
        let Some(term) = field.subfield("a") else {
            continue;
        };
        if seen.contains(term) || record.synonyms.iter().any(|s| s == term) {
            continue;
        }
        seen.insert(term);
        if let Some(synonym) = compose_label(field) {
            record.synonyms.push(synonym);
        }
    }

    record
}

/// `<$x> / <$a> <<$g>>`, skipping empty parts. None without $a.
fn compose_label(field: &DataField) -> Option<String> {
    let term = field.subfield("a")?;

    let mut label = [field.subfield("x").unwrap_or_default(), term]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" / ");

    if let Some(qualifier) = field.subfield("g").filter(|g| !g.is_empty()) {
        label.push_str(&format!(" <{}>", qualifier));
    }

    Some(label)
}
