// MARC Record Parser
// Supports MARC 21 slim XML (authority and bibliographic records)

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::domain::{Result, SubjectError};
use crate::utils::xml;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarcRecord {
    pub leader: String,
    pub control_fields: Vec<ControlField>,
    pub data_fields: Vec<DataField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlField {
    pub tag: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataField {
    pub tag: String,
    pub ind1: String,
    pub ind2: String,
    pub subfields: Vec<Subfield>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    pub code: String,
    pub value: String,
}

impl MarcRecord {
    /// First data field with `tag`
    pub fn field(&self, tag: &str) -> Option<&DataField> {
        self.data_fields.iter().find(|f| f.tag == tag)
    }

    /// All data fields with `tag`, in record order
    pub fn fields<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DataField> + 'a {
        self.data_fields.iter().filter(move |f| f.tag == tag)
    }

    pub fn control_field(&self, tag: &str) -> Option<&str> {
        self.control_fields
            .iter()
            .find(|f| f.tag == tag)
            .map(|f| f.value.as_str())
    }
}

impl DataField {
    /// First subfield with `code`
    pub fn subfield(&self, code: &str) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// All subfields with `code`, in field order
    pub fn subfields<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.subfields
            .iter()
            .filter(move |sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }
}

/// Where the text currently being read belongs
enum Target {
    None,
    Leader,
    Control,
    Subfield,
}

/// Parse the first MARC `record` element of `xml`.
///
/// Elements are matched by local name, so both `<record>` in the default
/// namespace and prefixed `<marc:record>` are accepted.
pub fn parse_marc_xml(xml: &[u8]) -> Result<MarcRecord> {
    let mut reader = Reader::from_reader(xml);

    let mut record: Option<MarcRecord> = None;
    let mut target = Target::None;
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = xml::local_name(&e);
                if let Some(rec) = record.as_mut() {
                    target = open_element(rec, &name, &e)?;
                    text.clear();
                } else if name == b"record" {
                    record = Some(MarcRecord::default());
                }
            }
            Ok(Event::Empty(e)) => {
                let name = xml::local_name(&e);
                if let Some(rec) = record.as_mut() {
                    if !matches!(open_element(rec, &name, &e)?, Target::None) {
                        close_element(rec, &name, String::new());
                    }
                } else if name == b"record" {
                    return Ok(MarcRecord::default());
                }
            }
            Ok(Event::Text(e)) => {
                if !matches!(target, Target::None) {
                    text.push_str(&xml::text(&e)?);
                }
            }
            Ok(Event::CData(e)) => {
                if !matches!(target, Target::None) {
                    text.push_str(&xml::cdata(&e));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if let Some(rec) = record.as_mut() {
                    if name == b"record" {
                        break;
                    }
                    if !matches!(target, Target::None) {
                        close_element(rec, &name, std::mem::take(&mut text));
                        target = Target::None;
                    }
                }
            }
            Ok(Event::Eof) => {
                if record.is_some() {
                    return Err(SubjectError::Parse(
                        "Unexpected end of MARC record".to_string(),
                    ));
                }
                break;
            }
            Err(e) => {
                return Err(SubjectError::Parse(format!(
                    "MARC XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => (),
        }
        buf.clear();
    }

    record.ok_or_else(|| SubjectError::Parse("No MARC record element found".to_string()))
}

fn open_element(rec: &mut MarcRecord, name: &[u8], e: &BytesStart<'_>) -> Result<Target> {
    let target = match name {
        b"leader" => Target::Leader,
        b"controlfield" => {
            rec.control_fields.push(ControlField {
                tag: xml::attribute(e, "tag")?.unwrap_or_default(),
                value: String::new(),
            });
            Target::Control
        }
        b"datafield" => {
            rec.data_fields.push(DataField {
                tag: xml::attribute(e, "tag")?.unwrap_or_default(),
                ind1: xml::attribute(e, "ind1")?.unwrap_or_default(),
                ind2: xml::attribute(e, "ind2")?.unwrap_or_default(),
                subfields: Vec::new(),
            });
            Target::None
        }
        b"subfield" => match rec.data_fields.last_mut() {
            Some(field) => {
                field.subfields.push(Subfield {
                    code: xml::attribute(e, "code")?.unwrap_or_default(),
                    value: String::new(),
                });
                Target::Subfield
            }
            // Subfield outside of a datafield
            None => Target::None,
        },
        _ => Target::None,
    };
    Ok(target)
}

fn close_element(rec: &mut MarcRecord, name: &[u8], value: String) {
    match name {
        b"leader" => rec.leader = value,
        b"controlfield" => {
            if let Some(field) = rec.control_fields.last_mut() {
                field.value = value;
            }
        }
        b"subfield" => {
            if let Some(sf) = rec
                .data_fields
                .last_mut()
                .and_then(|f| f.subfields.last_mut())
            {
                sf.value = value;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"<record xmlns="http://www.loc.gov/MARC21/slim" type="Authority">
  <leader>00000nz  a2200000nc 4500</leader>
  <controlfield tag="001">040307557</controlfield>
  <datafield tag="024" ind1="7" ind2=" ">
    <subfield code="a">4030755-7</subfield>
    <subfield code="0">http://d-nb.info/gnd/4030755-7</subfield>
    <subfield code="2">gnd</subfield>
  </datafield>
  <datafield tag="450" ind1=" " ind2=" ">
    <subfield code="a">Hof &amp; Garten</subfield>
    <subfield code="9"><![CDATA[L:ger]]></subfield>
    <subfield code="9">L:eng</subfield>
  </datafield>
  <datafield tag="450" ind1=" " ind2=" ">
    <subfield code="a">Zweiter</subfield>
    <subfield code="x"/>
  </datafield>
</record>"#;

    #[test]
    fn test_parse_fields_and_subfields() {
        let record = parse_marc_xml(RECORD.as_bytes()).unwrap();

        assert_eq!(record.leader, "00000nz  a2200000nc 4500");
        assert_eq!(record.control_field("001"), Some("040307557"));

        let f024 = record.field("024").unwrap();
        assert_eq!(f024.ind1, "7");
        assert_eq!(f024.subfield("a"), Some("4030755-7"));
        assert_eq!(f024.subfield("0"), Some("http://d-nb.info/gnd/4030755-7"));

        let f450: Vec<_> = record.fields("450").collect();
        assert_eq!(f450.len(), 2);
        assert_eq!(f450[0].subfield("a"), Some("Hof & Garten"));
        assert_eq!(
            f450[0].subfields("9").collect::<Vec<_>>(),
            vec!["L:ger", "L:eng"]
        );
        assert_eq!(f450[1].subfield("x"), Some(""));
    }

    #[test]
    fn test_prefixed_record() {
        let xml = r#"<marc:record xmlns:marc="http://www.loc.gov/MARC21/slim">
            <marc:datafield tag="150" ind1=" " ind2=" ">
                <marc:subfield code="a">Mozartjahr</marc:subfield>
            </marc:datafield>
        </marc:record>"#;
        let record = parse_marc_xml(xml.as_bytes()).unwrap();
        assert_eq!(record.field("150").unwrap().subfield("a"), Some("Mozartjahr"));
    }

    #[test]
    fn test_missing_field_is_none() {
        let record = parse_marc_xml(RECORD.as_bytes()).unwrap();
        assert!(record.field("150").is_none());
        assert_eq!(record.field("024").unwrap().subfield("x"), None);
    }

    #[test]
    fn test_malformed_xml() {
        let result = parse_marc_xml(b"<record><datafield tag=\"150\"></record>");
        assert!(matches!(result, Err(SubjectError::Parse(_))));
    }

    #[test]
    fn test_no_record_element() {
        let result = parse_marc_xml(b"<collection/>");
        assert!(matches!(result, Err(SubjectError::Parse(_))));
    }
}
