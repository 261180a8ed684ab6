use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::record::Record;

// Field carrying the sampling key on every forwarded event
pub const SAMPLE_KEY_FIELD: &str = "event.samplekey";

// A kept record, ready to hand to a sink
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub data: Record,
    pub sample_rate: u32,
    pub sample_key: String,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    // Adds the sampling key to the record's fields unless the record already has one
    pub fn new(mut data: Record, sample_rate: u32, sample_key: String) -> Self {
        data.entry(SAMPLE_KEY_FIELD)
            .or_insert_with(|| sample_key.clone().into());
        Self {
            data,
            sample_rate: sample_rate.max(1),
            sample_key,
            timestamp: Utc::now(),
        }
    }
}

// Collector batch API element
#[derive(Serialize, Debug)]
pub struct BatchEvent<'a> {
    pub data: &'a Record,
    pub samplerate: u32,
    pub time: String,
}

impl<'a> From<&'a Event> for BatchEvent<'a> {
    fn from(event: &'a Event) -> Self {
        Self {
            data: &event.data,
            samplerate: event.sample_rate,
            time: event.timestamp.to_rfc3339(),
        }
    }
}
