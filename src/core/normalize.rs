use crate::domain::model::{CanonicalRecord, RawRecord};
use crate::utils::error::{EtlError, Result};
use serde_json::Value;

/// Maps a raw record onto the canonical product shape.
///
/// Only the price is mandatory; a missing name or category becomes an empty
/// string and a missing or blank subcategory becomes `None`.
pub fn normalize(record: &RawRecord) -> Result<CanonicalRecord> {
    let price = parse_price(record.get("price"))?;
    let name = title_case(text_field(record, "name")?.unwrap_or_default().trim());
    let category = text_field(record, "category")?
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let subcategory = text_field(record, "subcategory")?
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    Ok(CanonicalRecord {
        name,
        price,
        category,
        subcategory,
    })
}

/// Lazily normalizes `records`, logging and counting the ones rejected.
pub struct Normalized<'a, I> {
    records: I,
    rejected: &'a mut usize,
}

impl<I: Iterator<Item = RawRecord>> Iterator for Normalized<'_, I> {
    type Item = CanonicalRecord;

    fn next(&mut self) -> Option<Self::Item> {
        for raw in self.records.by_ref() {
            match normalize(&raw) {
                Ok(record) => return Some(record),
                Err(e) => {
                    *self.rejected += 1;
                    tracing::debug!("Dropping record {:?}: {}", raw.data, e);
                }
            }
        }
        None
    }
}

pub fn normalize_all<I>(records: I, rejected: &mut usize) -> Normalized<'_, I::IntoIter>
where
    I: IntoIterator<Item = RawRecord>,
{
    Normalized {
        records: records.into_iter(),
        rejected,
    }
}

fn parse_price(value: Option<&Value>) -> Result<f64> {
    let price = match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| EtlError::normalization(format!("price {} is not a float", n)))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| EtlError::normalization(format!("price '{}': {}", s, e)))?,
        Some(other) => {
            return Err(EtlError::normalization(format!(
                "price has unsupported type: {}",
                other
            )))
        }
        None => return Err(EtlError::normalization("price is missing")),
    };

    if !price.is_finite() || price < 0.0 {
        return Err(EtlError::normalization(format!(
            "price {} is not a non-negative number",
            price
        )));
    }
    // Folds -0.0 into 0.0.
    Ok(price + 0.0)
}

fn text_field(record: &RawRecord, field: &str) -> Result<Option<String>> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(EtlError::normalization(format!(
            "{} has unsupported type: {}",
            field, other
        ))),
    }
}

/// Upper-cases every letter that follows a non-letter and lower-cases the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => panic!("test records must be objects"),
        }
    }

    #[test]
    fn test_normalize_trims_and_cases_fields() {
        let record = normalize(&raw(json!({
            "name": "  apple iPhone 12 ",
            "price": "699.99",
            "category": " Electronics ",
            "subcategory": " Phone"
        })))
        .unwrap();

        assert_eq!(record.name, "Apple Iphone 12");
        assert_eq!(record.price, 699.99);
        assert_eq!(record.category, "electronics");
        assert_eq!(record.subcategory.as_deref(), Some("phone"));
    }

    #[test]
    fn test_normalize_accepts_numeric_price() {
        let record = normalize(&raw(json!({"name": "hp printer", "price": 199.99}))).unwrap();
        assert_eq!(record.price, 199.99);
        assert_eq!(record.category, "");
        assert_eq!(record.subcategory, None);
    }

    #[test]
    fn test_normalize_rejects_unparseable_price() {
        for price in [json!("abc"), json!("12.99 USD"), json!(-1.0), json!("NaN"), json!([1])] {
            let result = normalize(&raw(json!({"name": "x", "price": price.clone()})));
            assert!(
                matches!(result, Err(EtlError::Normalization { .. })),
                "price {} should be rejected",
                price
            );
        }
    }

    #[test]
    fn test_negative_zero_price_is_stored_as_zero() {
        for price in [json!("-0"), json!(-0.0)] {
            let record = normalize(&raw(json!({"name": "freebie", "price": price}))).unwrap();
            assert_eq!(record.price, 0.0);
            assert!(record.price.is_sign_positive());
        }
    }

    #[test]
    fn test_normalize_rejects_missing_price() {
        assert!(normalize(&raw(json!({"name": "x", "category": "y"}))).is_err());
    }

    #[test]
    fn test_blank_subcategory_is_absent() {
        let record = normalize(&raw(json!({"price": 1, "subcategory": "   "}))).unwrap();
        assert_eq!(record.subcategory, None);

        let record = normalize(&raw(json!({"price": 1, "subcategory": null}))).unwrap();
        assert_eq!(record.subcategory, None);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("samsung Galaxy S21"), "Samsung Galaxy S21");
        assert_eq!(title_case("dell-laptop x1"), "Dell-Laptop X1");
        assert_eq!(title_case("o'neil"), "O'Neil");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_normalize_all_drops_rejected_records() {
        let records = vec![
            raw(json!({"name": "a", "price": "1.0"})),
            raw(json!({"name": "b", "price": "abc"})),
            raw(json!({"name": "c", "price": 3})),
        ];
        let mut rejected = 0;

        let names: Vec<String> = normalize_all(records, &mut rejected)
            .map(|r| r.name)
            .collect();

        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(rejected, 1);
    }
}
