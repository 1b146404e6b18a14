use std::io::Write;

use crate::domain::{Result, SubjectRecord};

/// Writes one JSON document per line, the way records are handed to the
/// subjects service when running outside the host application.
pub struct JsonLinesWriter<W: Write> {
    inner: W,
    written: usize,
}

impl<W: Write> JsonLinesWriter<W> {
    pub const NAME: &'static str = "subjects-service";

    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn write(&mut self, record: &SubjectRecord) -> Result<()> {
        serde_json::to_writer(&mut self.inner, record)?;
        self.inner.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Scheme;

    #[test]
    fn test_one_record_per_line() {
        let mut writer = JsonLinesWriter::new(Vec::new());
        let mut record = SubjectRecord::new(Scheme::Ddc);
        record.id = "551".to_string();
        writer.write(&record).unwrap();
        record.id = "552".to_string();
        writer.write(&record).unwrap();
        assert_eq!(writer.written(), 2);

        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: SubjectRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.id, "552");
    }
}
