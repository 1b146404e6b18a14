pub mod datastreams;
pub mod domain;
pub mod infrastructure;
pub mod jobs;
pub mod modules;
pub mod utils;

pub use datastreams::transformers::Transformer;
pub use domain::{Identifier, Result, Scheme, SubjectError, SubjectRecord};
pub use infrastructure::config;
pub use infrastructure::ext;
pub use modules::subjects::{DdcYamlTransformer, GndMarc21Transformer, MeshSubjectXmlTransformer};
