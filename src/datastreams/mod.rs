//! Datastreams
//!
//! Readers split sources into raw records, transformers map each one to a
//! normalized subject record, writers hand the result on. Presets describe
//! these chains for the external pipeline engine.

pub mod presets;
pub mod readers;
pub mod transformers;
pub mod writers;

use std::borrow::Borrow;
use std::io::Write;

use crate::domain::Result;
use transformers::Transformer;
use writers::JsonLinesWriter;

pub use readers::{Marc21CollectionReader, MeshReader, RawRecord, YamlReader};

/// Run every entry through `transformer` into `writer`, stopping at the
/// first error. Returns the number of records written.
pub fn process<I, E, T, W>(entries: I, transformer: &T, writer: &mut JsonLinesWriter<W>) -> Result<usize>
where
    I: IntoIterator<Item = Result<E>>,
    E: Borrow<T::Input>,
    T: Transformer,
    W: Write,
{
    let mut count = 0;
    for entry in entries {
        let record = transformer.apply(entry?.borrow())?;
        writer.write(&record)?;
        count += 1;
    }
    tracing::info!("{} wrote {} records", T::NAME, count);
    Ok(count)
}
