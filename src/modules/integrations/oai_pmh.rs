//! OAI-PMH harvesting of MARC21 authority records
//!
//! Used for incremental GND updates from the DNB repository. Each
//! `ListRecords` page is split into standalone MARC records; deleted records
//! carry no metadata and are only counted.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::time::Duration;

use crate::datastreams::readers::{MARC21_NAMESPACE, Parent, RawRecord, RecordSelector, XmlRecords};
use crate::domain::{Result, SubjectError};
use crate::utils::xml;

pub const LIST_RECORDS: &str = "ListRecords";
pub const MARC21_PREFIX: &str = "MARC21-xml";
pub const GND_SUBJECTS_SET: &str = "authorities:sachbegriff";

/// Error code for an empty result, which is not a failure
pub const NO_RECORDS_MATCH: &str = "noRecordsMatch";

const METADATA_RECORD: RecordSelector = RecordSelector {
    namespace: Some(MARC21_NAMESPACE),
    local_name: "record",
    parent: Parent::Element("metadata"),
};

#[derive(Debug, Default)]
pub struct OaiPage {
    pub records: Vec<RawRecord>,
    pub deleted: usize,
    pub resumption_token: Option<String>,
}

#[derive(Debug, Default)]
struct Envelope {
    error: Option<(String, String)>,
    deleted: usize,
    resumption_token: Option<String>,
}

/// Parse one `ListRecords` response page.
pub fn parse_list_records(xml: &[u8]) -> Result<OaiPage> {
    let envelope = scan_envelope(xml)?;

    if let Some((code, message)) = envelope.error {
        if code == NO_RECORDS_MATCH {
            return Ok(OaiPage::default());
        }
        return Err(SubjectError::Oai { code, message });
    }

    let records = XmlRecords::new(xml, METADATA_RECORD).collect::<Result<Vec<_>>>()?;

    Ok(OaiPage {
        records,
        deleted: envelope.deleted,
        resumption_token: envelope.resumption_token,
    })
}

#[derive(Clone, Copy)]
enum Capture {
    None,
    Error,
    Token,
}

fn scan_envelope(xml: &[u8]) -> Result<Envelope> {
    let mut reader = Reader::from_reader(xml);

    let mut envelope = Envelope::default();
    let mut capture = Capture::None;
    let mut text = String::new();
    let mut buf = Vec::new();

    // error            = protocol error, code attribute + message text
    // header[@status]  = "deleted" for removed records
    // resumptionToken  = next page, empty on the last one
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"error" => {
                    let code = xml::attribute(&e, "code")?.unwrap_or_default();
                    envelope.error = Some((code, String::new()));
                    capture = Capture::Error;
                    text.clear();
                }
                b"resumptionToken" => {
                    capture = Capture::Token;
                    text.clear();
                }
                b"header" => {
                    if xml::attribute(&e, "status")?.as_deref() == Some("deleted") {
                        envelope.deleted += 1;
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"error" => {
                    let code = xml::attribute(&e, "code")?.unwrap_or_default();
                    envelope.error = Some((code, String::new()));
                }
                b"header" => {
                    if xml::attribute(&e, "status")?.as_deref() == Some("deleted") {
                        envelope.deleted += 1;
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if !matches!(capture, Capture::None) {
                    text.push_str(&xml::text(&e)?);
                }
            }
            Ok(Event::End(e)) => match (e.local_name().as_ref(), capture) {
                (b"error", Capture::Error) => {
                    if let Some((_, message)) = envelope.error.as_mut() {
                        *message = text.trim().to_string();
                    }
                    capture = Capture::None;
                }
                (b"resumptionToken", Capture::Token) => {
                    let token = text.trim();
                    if !token.is_empty() {
                        envelope.resumption_token = Some(token.to_string());
                    }
                    capture = Capture::None;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SubjectError::Parse(format!(
                    "OAI-PMH response error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => (),
        }
        buf.clear();
    }

    Ok(envelope)
}

/// Pages through `ListRecords` for one metadata prefix and set.
pub struct OaiHarvester {
    client: reqwest::Client,
    base_url: String,
    metadata_prefix: String,
    set: Option<String>,
}

impl OaiHarvester {
    /// Harvester for GND subject headings in MARC21 at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        url::Url::parse(base_url)
            .map_err(|e| SubjectError::Config(format!("Invalid OAI-PMH URL '{}': {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            metadata_prefix: MARC21_PREFIX.to_string(),
            set: Some(GND_SUBJECTS_SET.to_string()),
        })
    }

    pub fn with_set(mut self, set: Option<&str>) -> Self {
        self.set = set.map(str::to_string);
        self
    }

    /// All records changed between `from` and `until`, following resumption
    /// tokens until the repository reports the last page.
    pub async fn list_records(&self, from: &str, until: &str) -> Result<Vec<RawRecord>> {
        let mut query = vec![
            ("verb", LIST_RECORDS),
            ("metadataPrefix", self.metadata_prefix.as_str()),
            ("from", from),
            ("until", until),
        ];
        if let Some(set) = &self.set {
            query.push(("set", set.as_str()));
        }

        let mut records = Vec::new();
        let mut page = self.fetch_page(&query).await?;
        let mut pages = 1;
        let mut previous_token: Option<String> = None;
        loop {
            tracing::debug!(
                "OAI-PMH page {}: {} records, {} deleted",
                pages,
                page.records.len(),
                page.deleted
            );
            records.append(&mut page.records);

            let Some(token) = page.resumption_token.take() else {
                break;
            };
            if previous_token.as_deref() == Some(token.as_str()) {
                return Err(SubjectError::Oai {
                    code: "badResumptionToken".to_string(),
                    message: format!("Resumption token {} repeated", token),
                });
            }
            page = self
                .fetch_page(&[("verb", LIST_RECORDS), ("resumptionToken", token.as_str())])
                .await?;
            previous_token = Some(token);
            pages += 1;
        }

        tracing::info!(
            "Harvested {} records from {} in {} pages",
            records.len(),
            self.base_url,
            pages
        );
        Ok(records)
    }

    async fn fetch_page(&self, query: &[(&str, &str)]) -> Result<OaiPage> {
        let response = self
            .client
            .get(&self.base_url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes().await?;
        parse_list_records(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <responseDate>2025-01-01T00:15:00Z</responseDate>
  <request verb="ListRecords">https://services.dnb.de/oai/repository</request>
  <ListRecords>
    <record>
      <header><identifier>oai:d-nb.de/authorities/4558957-4</identifier></header>
      <metadata>
        <record xmlns="http://www.loc.gov/MARC21/slim" type="Authority">
          <datafield tag="150" ind1=" " ind2=" "><subfield code="a">Mozartjahr</subfield></datafield>
        </record>
      </metadata>
    </record>
    <record>
      <header status="deleted"><identifier>oai:d-nb.de/authorities/1</identifier></header>
    </record>
    <resumptionToken completeListSize="3" cursor="0">token-1</resumptionToken>
  </ListRecords>
</OAI-PMH>"#;

    #[test]
    fn test_parse_page() {
        let page = parse_list_records(PAGE.as_bytes()).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.deleted, 1);
        assert_eq!(page.resumption_token.as_deref(), Some("token-1"));
        assert!(
            String::from_utf8_lossy(page.records[0].as_bytes())
                .starts_with(r#"<record xmlns="http://www.loc.gov/MARC21/slim" type="Authority">"#)
        );
    }

    #[test]
    fn test_last_page_has_no_token() {
        let xml = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/"><ListRecords>
            <resumptionToken completeListSize="3" cursor="2"/>
        </ListRecords></OAI-PMH>"#;
        let page = parse_list_records(xml.as_bytes()).unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.resumption_token, None);
    }

    #[test]
    fn test_no_records_match_is_empty() {
        let xml = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
            <error code="noRecordsMatch">No matching records</error>
        </OAI-PMH>"#;
        let page = parse_list_records(xml.as_bytes()).unwrap();
        assert!(page.records.is_empty());
    }

    #[test]
    fn test_protocol_error() {
        let xml = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
            <error code="badResumptionToken">Token expired</error>
        </OAI-PMH>"#;
        match parse_list_records(xml.as_bytes()) {
            Err(SubjectError::Oai { code, message }) => {
                assert_eq!(code, "badResumptionToken");
                assert_eq!(message, "Token expired");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            OaiHarvester::new("not a url"),
            Err(SubjectError::Config(_))
        ));
    }
}
