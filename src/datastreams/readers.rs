//! Record readers
//!
//! Split a multi-record source document into one raw buffer per record. XML
//! readers stream: records are produced lazily, in document order, and a
//! parse error ends the sequence.

use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, QName, ResolveResult};
use quick_xml::reader::NsReader;
use std::fmt;
use std::io::{BufRead, Read};

use crate::domain::{Result, SubjectError};
use crate::modules::subjects::ddc::DdcRow;

pub const MARC21_NAMESPACE: &str = "http://www.loc.gov/MARC21/slim";

/// Serialized form of exactly one source record element
#[derive(Clone, PartialEq, Eq)]
pub struct RawRecord(Vec<u8>);

impl RawRecord {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for RawRecord {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<String> for RawRecord {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&str> for RawRecord {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl fmt::Debug for RawRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawRecord({})", String::from_utf8_lossy(&self.0))
    }
}

/// Element whose parent a record element must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    /// Direct children of the document element
    Root,
    /// Children of any element with this local name
    Element(&'static str),
}

/// Which elements of a document are records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSelector {
    pub namespace: Option<&'static str>,
    pub local_name: &'static str,
    pub parent: Parent,
}

/// Lazy sequence of the records matched by a [`RecordSelector`]
pub struct XmlRecords<R: BufRead> {
    reader: NsReader<R>,
    selector: RecordSelector,
    stack: Vec<Vec<u8>>,
    buf: Vec<u8>,
    seen_root: bool,
    done: bool,
}

impl<R: BufRead> XmlRecords<R> {
    pub fn new(source: R, selector: RecordSelector) -> Self {
        Self {
            reader: NsReader::from_reader(source),
            selector,
            stack: Vec::new(),
            buf: Vec::new(),
            seen_root: false,
            done: false,
        }
    }

    fn matches(&self, local_name: &[u8], namespace: Option<&[u8]>) -> bool {
        if local_name != self.selector.local_name.as_bytes()
            || namespace != self.selector.namespace.map(str::as_bytes)
        {
            return false;
        }
        match self.selector.parent {
            Parent::Root => self.stack.len() == 1,
            Parent::Element(name) => self
                .stack
                .last()
                .is_some_and(|parent| parent.as_slice() == name.as_bytes()),
        }
    }

    fn next_record(&mut self) -> Result<Option<RawRecord>> {
        loop {
            self.buf.clear();
            let position = self.reader.buffer_position();
            let (namespace, event) = match self.reader.read_resolved_event_into(&mut self.buf) {
                Ok((ResolveResult::Bound(ns), event)) => {
                    (Some(ns.as_ref().to_vec()), event.into_owned())
                }
                Ok((_, event)) => (None, event.into_owned()),
                Err(e) => return Err(parse_error(position, e)),
            };

            match event {
                Event::Start(e) => {
                    let local_name = e.local_name().as_ref().to_vec();
                    if self.matches(&local_name, namespace.as_deref()) {
                        return self.capture(e).map(Some);
                    }
                    self.stack.push(local_name);
                    self.seen_root = true;
                }
                Event::Empty(e) => {
                    let local_name = e.local_name().as_ref().to_vec();
                    if self.matches(&local_name, namespace.as_deref()) {
                        let mut inherited = Vec::new();
                        self.note_inherited(&e, &[declared_prefixes(&e)], &mut inherited);
                        let mut writer = Writer::new(Vec::new());
                        write(&mut writer, Event::Empty(declare_namespaces(e, &inherited)))?;
                        return Ok(Some(RawRecord::new(writer.into_inner())));
                    }
                    self.seen_root = true;
                }
                Event::End(_) => {
                    self.stack.pop();
                }
                Event::Eof => {
                    if !self.seen_root {
                        return Err(SubjectError::Parse("Document has no root element".to_string()));
                    }
                    if !self.stack.is_empty() {
                        return Err(SubjectError::Parse("Unexpected end of document".to_string()));
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }

    /// Copy events up to the matching end tag into a standalone record.
    fn capture(&mut self, start: BytesStart<'static>) -> Result<RawRecord> {
        let mut scopes = vec![declared_prefixes(&start)];
        let mut inherited = Vec::new();
        self.note_inherited(&start, &scopes, &mut inherited);

        let mut body = Writer::new(Vec::new());
        let mut buf = Vec::new();
        while !scopes.is_empty() {
            buf.clear();
            let position = self.reader.buffer_position();
            let event = match self.reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(e) => return Err(parse_error(position, e)),
            };
            match &event {
                Event::Start(e) => {
                    scopes.push(declared_prefixes(e));
                    self.note_inherited(e, &scopes, &mut inherited);
                }
                Event::Empty(e) => {
                    scopes.push(declared_prefixes(e));
                    self.note_inherited(e, &scopes, &mut inherited);
                    scopes.pop();
                }
                Event::End(_) => {
                    scopes.pop();
                }
                Event::Eof => {
                    return Err(SubjectError::Parse(
                        "Unexpected end of document inside record".to_string(),
                    ));
                }
                _ => {}
            }
            write(&mut body, event)?;
        }

        let mut writer = Writer::new(Vec::new());
        write(&mut writer, Event::Start(declare_namespaces(start, &inherited)))?;
        let mut bytes = writer.into_inner();
        bytes.extend_from_slice(&body.into_inner());
        Ok(RawRecord::new(bytes))
    }

    /// Record the bindings `e` uses that were declared outside the record.
    ///
    /// Must run right after `e` is read, while the reader still has its scope.
    fn note_inherited(
        &self,
        e: &BytesStart<'_>,
        scopes: &[Vec<PrefixKey>],
        inherited: &mut Vec<(PrefixKey, Vec<u8>)>,
    ) {
        let mut names = vec![(e.name().as_ref().to_vec(), false)];
        for attr in e.attributes().flatten() {
            if attr.key.as_namespace_binding().is_none() && attr.key.prefix().is_some() {
                names.push((attr.key.as_ref().to_vec(), true));
            }
        }

        for (name, attribute) in names {
            let qname = QName(&name);
            let prefix: PrefixKey = qname.prefix().map(|p| p.as_ref().to_vec());
            if prefix.as_deref() == Some(b"xml".as_slice())
                || scopes.iter().any(|scope| scope.contains(&prefix))
                || inherited.iter().any(|(known, _)| *known == prefix)
            {
                continue;
            }
            if let (ResolveResult::Bound(ns), _) = self.reader.resolve(qname, attribute) {
                inherited.push((prefix, ns.as_ref().to_vec()));
            }
        }
    }
}

impl<R: BufRead> Iterator for XmlRecords<R> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn parse_error(position: usize, e: quick_xml::Error) -> SubjectError {
    SubjectError::Parse(format!("at position {}: {}", position, e))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| SubjectError::Parse(e.to_string()))
}

/// Namespace prefix; `None` is the default namespace
type PrefixKey = Option<Vec<u8>>;

fn declared_prefixes(e: &BytesStart<'_>) -> Vec<PrefixKey> {
    e.attributes()
        .flatten()
        .filter_map(|attr| match attr.key.as_namespace_binding()? {
            PrefixDeclaration::Default => Some(None),
            PrefixDeclaration::Named(prefix) => Some(Some(prefix.to_vec())),
        })
        .collect()
}

/// Carry inherited bindings on the record itself, so it parses alone.
fn declare_namespaces(
    start: BytesStart<'static>,
    inherited: &[(PrefixKey, Vec<u8>)],
) -> BytesStart<'static> {
    let mut start = start;
    for (prefix, namespace) in inherited {
        let key = match prefix {
            Some(prefix) => format!("xmlns:{}", String::from_utf8_lossy(prefix)),
            None => "xmlns".to_string(),
        };
        let namespace = String::from_utf8_lossy(namespace).into_owned();
        start.push_attribute((key.as_str(), namespace.as_str()));
    }
    start
}

/// Reader for MARC21 slim `collection` documents
#[derive(Debug, Clone, Copy, Default)]
pub struct Marc21CollectionReader;

impl Marc21CollectionReader {
    pub const NAME: &'static str = "marc21-collection";

    pub const SELECTOR: RecordSelector = RecordSelector {
        namespace: Some(MARC21_NAMESPACE),
        local_name: "record",
        parent: Parent::Root,
    };

    pub fn read<R: BufRead>(&self, source: R) -> XmlRecords<R> {
        XmlRecords::new(source, Self::SELECTOR)
    }
}

/// Reader for MeSH `DescriptorRecordSet` documents
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshReader;

impl MeshReader {
    pub const NAME: &'static str = "mesh-xml";

    pub const SELECTOR: RecordSelector = RecordSelector {
        namespace: None,
        local_name: "DescriptorRecord",
        parent: Parent::Root,
    };

    pub fn read<R: BufRead>(&self, source: R) -> XmlRecords<R> {
        XmlRecords::new(source, Self::SELECTOR)
    }
}

/// Reader for YAML documents holding a sequence of flat rows
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlReader;

impl YamlReader {
    pub const NAME: &'static str = "yaml";

    /// Scalar values become strings; nulls and nested values are dropped.
    pub fn read<R: Read>(&self, source: R) -> Result<Vec<DdcRow>> {
        let document: serde_yaml::Value = serde_yaml::from_reader(source)?;
        let rows = match document {
            serde_yaml::Value::Null => Vec::new(),
            serde_yaml::Value::Sequence(items) => items.iter().filter_map(yaml_row).collect(),
            mapping @ serde_yaml::Value::Mapping(_) => yaml_row(&mapping).into_iter().collect(),
            _ => {
                return Err(SubjectError::Parse(
                    "YAML document is not a sequence of rows".to_string(),
                ));
            }
        };
        Ok(rows)
    }
}

fn yaml_row(value: &serde_yaml::Value) -> Option<DdcRow> {
    let mapping = value.as_mapping()?;
    Some(
        mapping
            .iter()
            .filter_map(|(k, v)| Some((yaml_scalar(k)?, yaml_scalar(v)?)))
            .collect(),
    )
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<R: BufRead>(records: XmlRecords<R>) -> Vec<String> {
        records
            .map(|r| String::from_utf8(r.unwrap().into_bytes()).unwrap())
            .collect()
    }

    #[test]
    fn test_marc_collection_in_document_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<collection xmlns="http://www.loc.gov/MARC21/slim">
  <record type="Authority"><controlfield tag="001">1</controlfield></record>
  <record type="Authority"><controlfield tag="001">2</controlfield></record>
</collection>"#;

        let records = collect(Marc21CollectionReader.read(xml.as_bytes()));
        assert_eq!(
            records,
            vec![
                r#"<record type="Authority" xmlns="http://www.loc.gov/MARC21/slim"><controlfield tag="001">1</controlfield></record>"#,
                r#"<record type="Authority" xmlns="http://www.loc.gov/MARC21/slim"><controlfield tag="001">2</controlfield></record>"#,
            ]
        );
    }

    #[test]
    fn test_prefixed_marc_collection() {
        let xml = r#"<marc:collection xmlns:marc="http://www.loc.gov/MARC21/slim">
  <marc:record><marc:leader>00000nz</marc:leader></marc:record>
</marc:collection>"#;

        let records = collect(Marc21CollectionReader.read(xml.as_bytes()));
        assert_eq!(
            records,
            vec![
                r#"<marc:record xmlns:marc="http://www.loc.gov/MARC21/slim"><marc:leader>00000nz</marc:leader></marc:record>"#
            ]
        );
    }

    #[test]
    fn test_inherited_prefixes_are_declared_on_record() {
        let xml = r#"<collection xmlns="http://www.loc.gov/MARC21/slim" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <record xsi:schemaLocation="a b"><datafield tag="150" xsi:type="t"/></record>
</collection>"#;

        let records = collect(Marc21CollectionReader.read(xml.as_bytes()));
        assert_eq!(
            records,
            vec![
                r#"<record xsi:schemaLocation="a b" xmlns="http://www.loc.gov/MARC21/slim" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><datafield tag="150" xsi:type="t"/></record>"#
            ]
        );
    }

    #[test]
    fn test_prefix_used_only_below_record_is_declared() {
        let xml = r#"<collection xmlns="http://www.loc.gov/MARC21/slim" xmlns:x="urn:x">
  <record><datafield tag="150"><x:note/></datafield></record>
</collection>"#;

        let records = collect(Marc21CollectionReader.read(xml.as_bytes()));
        assert_eq!(
            records,
            vec![
                r#"<record xmlns="http://www.loc.gov/MARC21/slim" xmlns:x="urn:x"><datafield tag="150"><x:note/></datafield></record>"#
            ]
        );
    }

    #[test]
    fn test_bindings_declared_inside_record_are_kept() {
        let xml = r#"<collection xmlns="http://www.loc.gov/MARC21/slim" xmlns:x="urn:outer">
  <record><x:note xmlns:x="urn:inner"/></record>
</collection>"#;

        let records = collect(Marc21CollectionReader.read(xml.as_bytes()));
        assert_eq!(
            records,
            vec![
                r#"<record xmlns="http://www.loc.gov/MARC21/slim"><x:note xmlns:x="urn:inner"/></record>"#
            ]
        );
    }

    #[test]
    fn test_records_outside_namespace_are_skipped() {
        let xml = r#"<collection><record><leader>x</leader></record></collection>"#;
        assert!(collect(Marc21CollectionReader.read(xml.as_bytes())).is_empty());
    }

    #[test]
    fn test_mesh_descriptor_set() {
        let xml = r#"<DescriptorRecordSet LanguageCode="ger">
  <DescriptorRecord DescriptorClass="1"><DescriptorUI>D000001</DescriptorUI></DescriptorRecord>
  <DescriptorRecord DescriptorClass="1"><DescriptorUI>D000002</DescriptorUI></DescriptorRecord>
  <DescriptorRecord/>
</DescriptorRecordSet>"#;

        let records = collect(MeshReader.read(xml.as_bytes()));
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            r#"<DescriptorRecord DescriptorClass="1"><DescriptorUI>D000001</DescriptorUI></DescriptorRecord>"#
        );
        assert_eq!(records[2], "<DescriptorRecord/>");
    }

    #[test]
    fn test_nested_records_are_not_split() {
        let xml = r#"<DescriptorRecordSet><Wrapper><DescriptorRecord/></Wrapper></DescriptorRecordSet>"#;
        assert!(collect(MeshReader.read(xml.as_bytes())).is_empty());
    }

    #[test]
    fn test_malformed_document_ends_with_error() {
        let xml = r#"<DescriptorRecordSet>
  <DescriptorRecord><DescriptorUI>D000001</DescriptorUI></DescriptorRecord>
  <DescriptorRecord><DescriptorUI>D000002</Descriptor></DescriptorRecord>
</DescriptorRecordSet>"#;

        let mut records = MeshReader.read(xml.as_bytes());
        assert!(records.next().unwrap().is_ok());
        assert!(matches!(records.next(), Some(Err(SubjectError::Parse(_)))));
        assert!(records.next().is_none());
    }

    #[test]
    fn test_truncated_document() {
        let xml = "<DescriptorRecordSet><DescriptorRecord>";
        let mut records = MeshReader.read(xml.as_bytes());
        assert!(matches!(records.next(), Some(Err(SubjectError::Parse(_)))));
    }

    #[test]
    fn test_empty_document() {
        let mut records = MeshReader.read("".as_bytes());
        assert!(matches!(records.next(), Some(Err(SubjectError::Parse(_)))));
    }

    #[test]
    fn test_yaml_rows() {
        let yaml = r#"
- id: 551
  en: Geology, hydrology, meteorology
  de: Geologie, Hydrologie, Meteorologie
- id: "004"
  en: Computer science
  notes: null
  nested: [a, b]
"#;
        let rows = YamlReader.read(yaml.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], "551");
        assert_eq!(rows[0]["de"], "Geologie, Hydrologie, Meteorologie");
        assert_eq!(rows[1]["id"], "004");
        assert_eq!(rows[1].len(), 2);
    }

    #[test]
    fn test_yaml_scalar_document_is_rejected() {
        assert!(YamlReader.read("just a string".as_bytes()).is_err());
    }
}
