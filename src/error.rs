use thiserror::Error;

/// Startup configuration errors. Any of these stop the process before it serves traffic.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("at least one sampling field is required")]
    NoSamplingFields,

    #[error("invalid url pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },

    #[error("dataset name is required")]
    NoDataset,
}

/// Errors for a single input line. Counted per request, never fatal to it.
#[derive(Error, Debug)]
pub enum LineError {
    #[error("line of {len} bytes exceeds the maximum of {max}")]
    TooLong { len: usize, max: usize },

    #[error("json parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event send error: {0}")]
    Sink(#[from] SinkError),
}

/// URL decomposition failures. The normalizer skips the enrichment on these.
#[derive(Error, Debug, PartialEq)]
pub enum UrlShapeError {
    #[error("empty url")]
    Empty,

    #[error("not a request uri")]
    NotARequestUri,

    #[error("invalid url: {0}")]
    Invalid(#[from] url::ParseError),
}

/// Hand-off failures from the event sink.
#[derive(Error, Debug, PartialEq)]
pub enum SinkError {
    #[error("sink queue is full")]
    QueueFull,

    #[error("sink is closed")]
    Closed,
}
