use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, IntCounter, register_counter, register_gauge, register_histogram,
    register_int_counter,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("honeylog_requests_total", "Total number of ingest requests").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "honeylog_request_latency_seconds",
        "Time spent processing one ingest request"
    )
    .unwrap();
    pub static ref LINES_TOTAL: IntCounter =
        register_int_counter!("honeylog_lines_total", "Input lines received").unwrap();
    pub static ref PARSE_ERRORS: IntCounter =
        register_int_counter!("honeylog_parse_errors_total", "Lines that were not a JSON object").unwrap();
    pub static ref OVERSIZED_LINES: IntCounter =
        register_int_counter!("honeylog_oversized_lines_total", "Lines over the maximum length").unwrap();
    pub static ref SAMPLED_OUT: IntCounter =
        register_int_counter!("honeylog_sampled_out_total", "Records dropped by sampling").unwrap();
    pub static ref EVENTS_QUEUED: IntCounter =
        register_int_counter!("honeylog_events_queued_total", "Kept events handed to the sink").unwrap();
    pub static ref SEND_ERRORS: IntCounter =
        register_int_counter!("honeylog_send_errors_total", "Kept events the sink refused").unwrap();
    pub static ref EVENTS_SENT: IntCounter =
        register_int_counter!("honeylog_events_sent_total", "Events accepted by the collector").unwrap();
    pub static ref BATCH_FAILURES: IntCounter =
        register_int_counter!("honeylog_batch_failures_total", "Batches the collector did not accept").unwrap();
    pub static ref SAMPLER_KEYS: Gauge =
        register_gauge!("honeylog_sampler_keys", "Sampling keys with a live moving average").unwrap();
}
