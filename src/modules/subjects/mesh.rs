//! MeSH (Medical Subject Headings) subjects from NLM descriptor records
//!
//! Record format follows nlmdescriptorrecordset_20200101.dtd. Translated
//! descriptor sets carry the local label with the English one in brackets,
//! e.g. `Schlachthöfe[Abattoirs]`.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::datastreams::readers::RawRecord;
use crate::datastreams::transformers::Transformer;
use crate::domain::{Identifier, Result, Scheme, SubjectError, SubjectRecord};
use crate::infrastructure::config::{SubjectsConfig, resolve_default_language};
use crate::utils::xml;

pub const MESH_HTTP_BASE: &str = "http://id.nlm.nih.gov/mesh/";
pub const MESH_HTTPS_BASE: &str = "https://id.nlm.nih.gov/mesh/";

/// The parts of a `DescriptorRecord` the mapping uses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    pub ui: Option<String>,
    pub name: Option<String>,
    pub concepts: Vec<Concept>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Concept {
    pub preferred: bool,
    pub terms: Vec<Term>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Term {
    pub concept_preferred: bool,
    pub permuted: bool,
    pub string: Option<String>,
}

impl Term {
    /// Neither the concept's preferred term nor a permutation
    pub fn is_synonym(&self) -> bool {
        !self.concept_preferred && !self.permuted
    }
}

/// `Y` flags only; a missing attribute counts as neither `Y` nor `N`.
fn flag(e: &BytesStart<'_>, name: &str) -> Result<Option<bool>> {
    Ok(match xml::attribute(e, name)?.as_deref() {
        Some("Y") => Some(true),
        Some("N") => Some(false),
        _ => None,
    })
}

/// Parse one `DescriptorRecord` element. Paths are relative to the record root.
pub fn parse_descriptor(source: &[u8]) -> Result<Descriptor> {
    let mut reader = Reader::from_reader(source);

    let mut descriptor = Descriptor::default();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                path.push(String::from_utf8_lossy(&xml::local_name(&e)).into_owned());
                text.clear();
                open_element(&mut descriptor, &path, &e)?;
            }
            Ok(Event::Empty(e)) => {
                path.push(String::from_utf8_lossy(&xml::local_name(&e)).into_owned());
                open_element(&mut descriptor, &path, &e)?;
                path.pop();
            }
            Ok(Event::Text(e)) => text.push_str(&xml::text(&e)?),
            Ok(Event::CData(e)) => text.push_str(&xml::cdata(&e)),
            Ok(Event::End(_)) => {
                close_element(&mut descriptor, &path, std::mem::take(&mut text));
                path.pop();
                if path.is_empty() {
                    break;
                }
            }
            Ok(Event::Eof) => {
                if path.is_empty() {
                    return Err(SubjectError::Parse(
                        "No DescriptorRecord element found".to_string(),
                    ));
                }
                return Err(SubjectError::Parse(
                    "Unexpected end of DescriptorRecord".to_string(),
                ));
            }
            Err(e) => {
                return Err(SubjectError::Parse(format!(
                    "MeSH XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => (),
        }
        buf.clear();
    }

    Ok(descriptor)
}

fn relative<'a>(path: &'a [String]) -> Vec<&'a str> {
    path.iter().skip(1).map(String::as_str).collect()
}

fn open_element(descriptor: &mut Descriptor, path: &[String], e: &BytesStart<'_>) -> Result<()> {
    match relative(path).as_slice() {
        ["ConceptList", "Concept"] => descriptor.concepts.push(Concept {
            preferred: flag(e, "PreferredConceptYN")?.unwrap_or(false),
            terms: Vec::new(),
        }),
        ["ConceptList", "Concept", "TermList", "Term"] => {
            if let Some(concept) = descriptor.concepts.last_mut() {
                concept.terms.push(Term {
                    // Unflagged terms are never treated as synonyms
                    concept_preferred: flag(e, "ConceptPreferredTermYN")?.unwrap_or(true),
                    permuted: flag(e, "IsPermutedTermYN")?.unwrap_or(true),
                    string: None,
                });
            }
        }
        _ => {}
    }
    Ok(())
}

fn close_element(descriptor: &mut Descriptor, path: &[String], text: String) {
    match relative(path).as_slice() {
        ["DescriptorUI"] => descriptor.ui = Some(text.trim().to_string()),
        ["DescriptorName", "String"] => descriptor.name = Some(text),
        ["ConceptList", "Concept", "TermList", "Term", "String"] => {
            if let Some(term) = descriptor
                .concepts
                .last_mut()
                .and_then(|c| c.terms.last_mut())
            {
                term.string = Some(text);
            }
        }
        _ => {}
    }
}

/// Split `Local[English]` into its two labels.
///
/// Without a `[` the whole name is the local label and there is no English
/// part. A missing `]` takes the rest of the string as the English label.
pub fn split_descriptor_name(name: &str) -> (&str, Option<&str>) {
    match name.split_once('[') {
        Some((local, rest)) => {
            let english = rest.split_once(']').map_or(rest, |(english, _)| english);
            (local, Some(english))
        }
        None => (name, None),
    }
}

#[derive(Debug, Clone)]
pub struct MeshSubjectXmlTransformer {
    default_lang: String,
}

impl MeshSubjectXmlTransformer {
    pub fn new(config: &SubjectsConfig) -> Self {
        Self {
            default_lang: resolve_default_language(&config.mesh_lang, &config.languages),
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_lang
    }

    pub fn map_descriptor(&self, descriptor: &Descriptor) -> Result<SubjectRecord> {
        let ui = descriptor
            .ui
            .as_deref()
            .filter(|ui| !ui.is_empty())
            .ok_or(SubjectError::MissingField("DescriptorUI"))?;

        let mut record = SubjectRecord::new(Scheme::Mesh);
        record.id = format!("mesh:{}", ui);
        record
            .identifiers
            .push(Identifier::url(format!("{}{}", MESH_HTTP_BASE, ui)));
        record
            .identifiers
            .push(Identifier::url(format!("{}{}", MESH_HTTPS_BASE, ui)));

        if let Some(name) = &descriptor.name {
            let (local, english) = split_descriptor_name(name);
            record
                .title
                .insert(self.default_lang.clone(), local.to_string());
            match english {
                Some(english) => {
                    record.title.insert("en".to_string(), english.to_string());
                }
                None => tracing::warn!("MeSH descriptor {} has no English name: {}", ui, name),
            }
            record.subject = local.to_string();
        }

        for concept in descriptor.concepts.iter().filter(|c| c.preferred) {
            record.synonyms.extend(
                concept
                    .terms
                    .iter()
                    .filter(|t| t.is_synonym())
                    .filter_map(|t| t.string.clone()),
            );
        }

        Ok(record)
    }
}

impl Transformer for MeshSubjectXmlTransformer {
    type Input = RawRecord;

    const NAME: &'static str = "mesh-subjects";

    fn apply(&self, entry: &RawRecord) -> Result<SubjectRecord> {
        let descriptor = parse_descriptor(entry.as_bytes())?;
        self.map_descriptor(&descriptor)
    }
}
