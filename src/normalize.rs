use serde_json::Value;
use tracing::trace;

use crate::record::{Record, stringify};
use crate::url_shape::{Shaped, UrlShaper};

/// Rewrites decoded records in place before they are keyed and sampled.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    url_fields: Vec<String>,
    shaper: UrlShaper,
}

impl Normalizer {
    pub fn new(url_fields: Vec<String>, shaper: UrlShaper) -> Self {
        Self { url_fields, shaper }
    }

    /// Flattens list values to comma-joined strings and breaks the URL field out into
    /// `<field>.path`, `<field>.query` and friends.
    ///
    /// Only the first configured URL field is ever decomposed. Existing fields are
    /// never overwritten by derived ones.
    pub fn normalize(&self, record: &mut Record) {
        for value in record.values_mut() {
            if let Value::Array(items) = value {
                let joined = items.iter().map(stringify).collect::<Vec<_>>().join(",");
                *value = Value::String(joined);
            }
        }

        let Some(field) = self.url_fields.first() else {
            return;
        };
        let Some(raw) = record.get(field).map(stringify) else {
            return;
        };

        match self.shaper.parse(&raw) {
            Ok(shaped) => add_url_fields(record, field, shaped),
            Err(e) => trace!(field = %field, error = %e, "skipping url decomposition"),
        }
    }
}

fn add_url_fields(record: &mut Record, field: &str, shaped: Shaped) {
    let mut add = |suffix: String, value: String| {
        record
            .entry(format!("{}.{}", field, suffix))
            .or_insert(Value::String(value));
    };

    add("path".to_string(), shaped.path);
    for (name, values) in shaped.path_fields {
        add(format!("pathFields.{}", name), values.join(","));
    }
    add("pathShape".to_string(), shaped.path_shape);
    add("query".to_string(), shaped.query);
    for (name, values) in shaped.query_fields {
        add(format!("queryFields.{}", name), values.join(","));
    }
    add("queryShape".to_string(), shaped.query_shape);
    add("uri".to_string(), shaped.uri);
}
