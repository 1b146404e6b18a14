// Subject vocabularies
// Field mappings from DDC, GND and MeSH sources to normalized subject records

pub mod ddc;
pub mod gnd;
pub mod languages;
pub mod mesh;

pub use ddc::{DdcRow, DdcYamlTransformer};
pub use gnd::GndMarc21Transformer;
pub use mesh::MeshSubjectXmlTransformer;
