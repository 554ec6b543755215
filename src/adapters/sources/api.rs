use crate::domain::model::RawRecord;
use crate::domain::ports::{RecordIter, Source};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Product feed served as a JSON array of objects. Without an endpoint the
/// built-in sample catalogue is served instead.
pub struct ApiSource {
    name: String,
    endpoint: Option<String>,
    client: Client,
}

impl ApiSource {
    pub fn new(name: impl Into<String>, endpoint: Option<String>) -> Self {
        Self {
            name: name.into(),
            endpoint,
            client: Client::new(),
        }
    }

    fn sample() -> Vec<Value> {
        vec![
            json!({"name": "apple iPhone 12", "price": "699.99", "category": "Electronics"}),
            json!({"name": "samsung Galaxy S21", "price": "799.99", "category": "Electronics"}),
        ]
    }
}

fn into_record(value: Value) -> Result<RawRecord> {
    match value {
        Value::Object(obj) => Ok(obj.into_iter().collect()),
        other => Err(EtlError::normalization(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

#[async_trait]
impl Source for ApiSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self) -> Result<RecordIter> {
        let Some(endpoint) = &self.endpoint else {
            tracing::debug!("No endpoint configured for '{}', using sample data", self.name);
            return Ok(Box::new(Self::sample().into_iter().map(into_record)));
        };

        tracing::debug!("Making API request to: {}", endpoint);
        let response = self.client.get(endpoint).send().await?;
        tracing::debug!("API response status: {}", response.status());

        if !response.status().is_success() {
            return Err(EtlError::source_failed(
                &self.name,
                format!("{} returned {}", endpoint, response.status()),
            ));
        }

        let items = match response.json::<Value>().await? {
            Value::Array(items) => items,
            // A lone object is one record.
            obj @ Value::Object(_) => vec![obj],
            other => {
                return Err(EtlError::source_failed(
                    &self.name,
                    format!("unexpected response body: {}", other),
                ))
            }
        };

        let name = self.name.clone();
        Ok(Box::new(items.into_iter().map(move |item| {
            into_record(item).map_err(|e| EtlError::source_failed(&name, e))
        })))
    }
}
