use std::io;
use thiserror::Error;

/// A latency report could not be decoded. Aborts the whole report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("weird source key {0:?}")]
    WeirdSourceKey(String),

    #[error("missing measurements line after header {0:?}")]
    MissingMeasurements(String),

    #[error("invalid format: header {header:?} does not match data {data:?}")]
    InvalidFormat { header: String, data: String },

    #[error("{key:?} invalid latency value {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Failures talking to the node over the info protocol.
#[derive(Error, Debug)]
pub enum InfoError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("info request timed out after {0}ms")]
    Timeout(u64),

    #[error("unexpected protocol header: version {version}, type {kind}")]
    BadHeader { version: u8, kind: u8 },

    #[error("info reply of {0} bytes exceeds limit")]
    TooLarge(u64),

    #[error("info reply is not valid UTF-8")]
    NotUtf8,

    #[error("node did not answer {0:?}")]
    MissingReply(String),
}

impl InfoError {
    /// True when the stream may hold a partial or late reply, so the
    /// connection cannot carry another request.
    pub fn breaks_connection(&self) -> bool {
        !matches!(self, InfoError::MissingReply(_))
    }
}

/// One report kind failed during a scrape. Other kinds still run.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("{kind}: {source}")]
    Info {
        kind: &'static str,
        #[source]
        source: InfoError,
    },

    #[error("{kind}: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: DecodeError,
    },
}

impl ScrapeError {
    pub fn info(kind: &'static str, source: InfoError) -> Self {
        Self::Info { kind, source }
    }

    pub fn decode(kind: &'static str, source: DecodeError) -> Self {
        Self::Decode { kind, source }
    }

    pub fn breaks_connection(&self) -> bool {
        match self {
            Self::Info { source, .. } => source.breaks_connection(),
            Self::Decode { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaks_connection() {
        assert!(InfoError::Timeout(100).breaks_connection());
        assert!(InfoError::NotUtf8.breaks_connection());
        assert!(!InfoError::MissingReply("sets".into()).breaks_connection());

        let decode = ScrapeError::decode("latency", DecodeError::WeirdSourceKey("x".into()));
        assert!(!decode.breaks_connection());
        assert!(ScrapeError::info("latency", InfoError::Timeout(100)).breaks_connection());
    }
}
