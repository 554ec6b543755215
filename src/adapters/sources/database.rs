use crate::domain::model::RawRecord;
use crate::domain::ports::{RecordIter, Source};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Stand-in for a product table. `fail_after` makes it break after that many
/// rows (`0` fails on open).
pub struct DatabaseSource {
    name: String,
    fail_after: Option<usize>,
}

impl DatabaseSource {
    pub fn new(name: impl Into<String>, fail_after: Option<usize>) -> Self {
        Self {
            name: name.into(),
            fail_after,
        }
    }

    fn rows() -> Vec<RawRecord> {
        let rows: [&[(&str, &str)]; 4] = [
            &[("name", "sony headphones"), ("price", "149.99"), ("category", "Accessories")],
            &[("name", "bose speakers"), ("price", "399.99"), ("category", "Accessories")],
            &[("name", "apple iPhone 12"), ("price", "699.99"), ("category", "Electronics")],
            &[
                ("name", "samsung Galaxy S21"),
                ("price", "799.99"),
                ("category", "Electronics"),
                ("subcategory", "Phone"),
            ],
        ];
        rows.iter()
            .map(|row| row.iter().map(|(k, v)| (*k, Value::from(*v))).collect())
            .collect()
    }
}

#[async_trait]
impl Source for DatabaseSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self) -> Result<RecordIter> {
        if self.fail_after == Some(0) {
            return Err(EtlError::source_failed(&self.name, "Simulated database error"));
        }

        let name = self.name.clone();
        let fail_after = self.fail_after;
        let rows = Self::rows().into_iter().enumerate().map(move |(i, row)| {
            if Some(i) == fail_after {
                return Err(EtlError::source_failed(&name, "Simulated database error"));
            }
            Ok(row)
        });
        Ok(Box::new(rows))
    }
}
