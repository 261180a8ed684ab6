use crate::record::{Record, stringify};

// Joins the per-field values of a sampling key. Unlikely to appear in field values.
pub const KEY_SEPARATOR: &str = "•";

// Builds the sampling key: each configured field's value in order, empty when absent
pub fn sampling_key(record: &Record, fields: &[String]) -> String {
    fields
        .iter()
        .map(|field| record.get(field).map(stringify).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}
