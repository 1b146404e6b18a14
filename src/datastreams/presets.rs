//! Pipeline presets
//!
//! Reader, transformer and writer chains for the vocabulary jobs, in the
//! descriptor form consumed by the datastream engine.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::readers::{Marc21CollectionReader, MeshReader, YamlReader};
use super::transformers::Transformer;
use super::writers::JsonLinesWriter;
use crate::modules::integrations::oai_pmh::{GND_SUBJECTS_SET, LIST_RECORDS, MARC21_PREFIX};
use crate::modules::subjects::{DdcYamlTransformer, GndMarc21Transformer, MeshSubjectXmlTransformer};

pub const OAI_PMH_READER: &str = "oai-pmh";
pub const HTTP_READER: &str = "http";
pub const GZIP_READER: &str = "gzip";
pub const ZIP_READER: &str = "zip";
pub const ASYNC_WRITER: &str = "async";

/// One stage of a pipeline: a registered type and its arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

impl StageDescriptor {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            args: None,
        }
    }

    pub fn with_args(kind: &str, args: Value) -> Self {
        Self {
            kind: kind.to_string(),
            args: Some(args),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatastreamConfig {
    pub readers: Vec<StageDescriptor>,
    pub transformers: Vec<StageDescriptor>,
    pub writers: Vec<StageDescriptor>,
}

fn subjects_service_writers() -> Vec<StageDescriptor> {
    let writer_name = JsonLinesWriter::<Vec<u8>>::NAME;
    vec![StageDescriptor::with_args(
        ASYNC_WRITER,
        json!({ "writer": { "type": writer_name } }),
    )]
}

/// Bulk DDC load from a local YAML file
pub fn ddc_preset(origin: &str) -> DatastreamConfig {
    DatastreamConfig {
        readers: vec![StageDescriptor::with_args(
            YamlReader::NAME,
            json!({ "origin": origin }),
        )],
        transformers: vec![StageDescriptor::new(DdcYamlTransformer::NAME)],
        writers: subjects_service_writers(),
    }
}

/// Incremental GND updates harvested over OAI-PMH between `from` and `until`
pub fn gnd_updates_preset(base_url: &str, from: &str, until: &str) -> DatastreamConfig {
    DatastreamConfig {
        readers: vec![StageDescriptor::with_args(
            OAI_PMH_READER,
            json!({
                "verb": LIST_RECORDS,
                "base_url": base_url,
                "metadata_prefix": MARC21_PREFIX,
                "set": GND_SUBJECTS_SET,
                "from": from,
                "until": until,
            }),
        )],
        transformers: vec![StageDescriptor::new(GndMarc21Transformer::NAME)],
        writers: subjects_service_writers(),
    }
}

/// Full GND import from a gzip-compressed MARC21 collection
pub fn gnd_import_preset(file_url: &str) -> DatastreamConfig {
    DatastreamConfig {
        readers: vec![
            StageDescriptor::with_args(HTTP_READER, json!({ "origin": file_url })),
            StageDescriptor::new(GZIP_READER),
            StageDescriptor::new(Marc21CollectionReader::NAME),
        ],
        transformers: vec![StageDescriptor::new(GndMarc21Transformer::NAME)],
        writers: subjects_service_writers(),
    }
}

/// Full MeSH import from a zip archive holding a descriptor set
pub fn mesh_import_preset(file_url: &str) -> DatastreamConfig {
    DatastreamConfig {
        readers: vec![
            StageDescriptor::with_args(HTTP_READER, json!({ "origin": file_url })),
            StageDescriptor::with_args(ZIP_READER, json!({ "regex": "\\.xml$" })),
            StageDescriptor::new(MeshReader::NAME),
        ],
        transformers: vec![StageDescriptor::new(MeshSubjectXmlTransformer::NAME)],
        writers: subjects_service_writers(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddc_preset_shape() {
        let value = serde_json::to_value(ddc_preset("ddc.yaml")).unwrap();
        assert_eq!(
            value,
            json!({
                "readers": [{"type": "yaml", "args": {"origin": "ddc.yaml"}}],
                "transformers": [{"type": "ddc-subjects"}],
                "writers": [{"type": "async", "args": {"writer": {"type": "subjects-service"}}}],
            })
        );
    }

    #[test]
    fn test_gnd_updates_window() {
        let preset = gnd_updates_preset(
            "https://services.dnb.de/oai/repository",
            "2025-01-01T00:00:00Z",
            "2025-01-01T00:15:00Z",
        );
        let args = preset.readers[0].args.as_ref().unwrap();
        assert_eq!(preset.readers[0].kind, "oai-pmh");
        assert_eq!(args["metadata_prefix"], "MARC21-xml");
        assert_eq!(args["set"], "authorities:sachbegriff");
        assert_eq!(args["from"], "2025-01-01T00:00:00Z");
        assert_eq!(args["until"], "2025-01-01T00:15:00Z");
        assert_eq!(preset.transformers[0].kind, "gnd-subjects");
    }

    #[test]
    fn test_import_chains_end_in_record_readers() {
        let gnd = gnd_import_preset("https://example.org/gnd.xml.gz");
        let kinds: Vec<_> = gnd.readers.iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(kinds, vec!["http", "gzip", "marc21-collection"]);

        let mesh = mesh_import_preset("https://example.org/mesh.zip");
        let kinds: Vec<_> = mesh.readers.iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(kinds, vec!["http", "zip", "mesh-xml"]);
        assert_eq!(mesh.transformers[0].kind, "mesh-subjects");
    }

    #[test]
    fn test_descriptor_round_trips_without_args() {
        let parsed: StageDescriptor = serde_json::from_value(json!({"type": "gzip"})).unwrap();
        assert_eq!(parsed, StageDescriptor::new("gzip"));
    }
}
