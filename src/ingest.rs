//! The per-request pipeline: one JSON object per line, each normalized,
//! keyed, sampled and (if kept) handed to the sink.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{info, warn};

use crate::config::Config;
use crate::decision::decide;
use crate::error::LineError;
use crate::key::sampling_key;
use crate::metrics::{EVENTS_QUEUED, LINES_TOTAL, OVERSIZED_LINES, PARSE_ERRORS, SAMPLED_OUT, SEND_ERRORS};
use crate::models::Event;
use crate::normalize::Normalizer;
use crate::record::Record;
use crate::sampler::EmaSampler;
use crate::sink::EventSink;

// How much of a bad line ends up in the log
const LOG_PREVIEW_BYTES: usize = 256;

/// Counts for one request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestSummary {
    pub total: usize,
    /// Kept and accepted by the sink.
    pub success: usize,
    pub sampled_out: usize,
    pub parse_errors: usize,
    pub oversized: usize,
    pub send_errors: usize,
    pub elapsed: Duration,
}

enum Outcome {
    Sent,
    SampledOut,
}

pub struct Ingester {
    normalizer: Normalizer,
    sampling_fields: Vec<String>,
    max_line_length: usize,
    sampler: Arc<EmaSampler>,
    sink: Arc<dyn EventSink>,
}

impl Ingester {
    pub fn new(config: &Config, sampler: Arc<EmaSampler>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            normalizer: Normalizer::new(config.url_fields.clone(), config.shaper.clone()),
            sampling_fields: config.sampling_fields.clone(),
            max_line_length: config.max_line_length,
            sampler,
            sink,
        }
    }

    pub fn sampler(&self) -> &Arc<EmaSampler> {
        &self.sampler
    }

    /// Processes every line of `body` in order. Bad lines are counted and skipped,
    /// they never stop the rest of the body from being processed.
    pub fn ingest<R: Rng>(&self, body: &[u8], rng: &mut R) -> IngestSummary {
        let start = Instant::now();
        let mut summary = IngestSummary::default();

        for line in lines(body) {
            summary.total += 1;
            match self.process_line(line, rng) {
                Ok(Outcome::Sent) => summary.success += 1,
                Ok(Outcome::SampledOut) => summary.sampled_out += 1,
                Err(e @ LineError::TooLong { .. }) => {
                    summary.oversized += 1;
                    warn!(error = %e, "skipping line");
                }
                Err(e @ LineError::Json(_)) => {
                    summary.parse_errors += 1;
                    warn!(error = %e, raw = %preview(line), "skipping line");
                }
                Err(e @ LineError::Sink(_)) => {
                    summary.send_errors += 1;
                    warn!(error = %e, raw = %preview(line), "dropping event");
                }
            }
        }

        summary.elapsed = start.elapsed();
        record_metrics(&summary);
        info!(
            success = summary.success,
            total = summary.total,
            "sampled {} of {} input lines in {}ms",
            summary.success,
            summary.total,
            summary.elapsed.as_millis()
        );
        summary
    }

    fn process_line<R: Rng>(&self, line: &[u8], rng: &mut R) -> Result<Outcome, LineError> {
        if line.len() > self.max_line_length {
            return Err(LineError::TooLong {
                len: line.len(),
                max: self.max_line_length,
            });
        }

        let mut record: Record = serde_json::from_slice(line)?;
        self.normalizer.normalize(&mut record);

        let key = sampling_key(&record, &self.sampling_fields);
        let rate = self.sampler.get_sample_rate(&key);
        let decision = decide(rate, rng);
        if !decision.keep {
            return Ok(Outcome::SampledOut);
        }

        self.sink.send(Event::new(record, decision.rate, key))?;
        Ok(Outcome::Sent)
    }
}

// Newline-separated lines, a trailing "\r" stripped. No final empty line after a trailing newline.
fn lines(body: &[u8]) -> impl Iterator<Item = &[u8]> {
    let trimmed = body.strip_suffix(b"\n").unwrap_or(body);
    trimmed
        .split(|b| *b == b'\n')
        .filter(move |_| !body.is_empty())
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

fn preview(line: &[u8]) -> String {
    let end = line.len().min(LOG_PREVIEW_BYTES);
    String::from_utf8_lossy(&line[..end]).into_owned()
}

fn record_metrics(summary: &IngestSummary) {
    LINES_TOTAL.inc_by(summary.total as u64);
    EVENTS_QUEUED.inc_by(summary.success as u64);
    SAMPLED_OUT.inc_by(summary.sampled_out as u64);
    PARSE_ERRORS.inc_by(summary.parse_errors as u64);
    OVERSIZED_LINES.inc_by(summary.oversized as u64);
    SEND_ERRORS.inc_by(summary.send_errors as u64);
}
