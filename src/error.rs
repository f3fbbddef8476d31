use std::{io, path::PathBuf};

use thiserror::Error;

/// Longest record prefix kept in a [`Error::Format`] diagnostic.
const RECORD_CONTEXT: usize = 64;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open input {}: {source}", path.display())]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("read failed at byte offset {offset}: {source}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },
    #[error("malformed record {record:?}: {source}")]
    Format {
        record: String,
        #[source]
        source: FormatError,
    },
    #[error("no record terminator within {chunk_size} bytes starting at offset {offset}")]
    RecordTooLong { offset: u64, chunk_size: usize },
    #[error("failed to spawn thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("a pipeline thread panicked")]
    WorkerPanicked,
}

impl Error {
    /// Wraps a parse failure with the (truncated) line it happened on.
    pub(crate) fn format(record: &[u8], source: FormatError) -> Self {
        let line = match memchr::memchr(b'\n', record) {
            Some(end) => &record[..end],
            None => record,
        };
        let line = &line[..line.len().min(RECORD_CONTEXT)];
        Error::Format {
            record: String::from_utf8_lossy(line).into_owned(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("missing ';' between key and value")]
    MissingDelimiter,
    #[error("empty key")]
    EmptyKey,
    #[error("empty value")]
    EmptyValue,
    #[error("value must end with '.' and exactly one fractional digit")]
    MissingFraction,
    #[error("value has no integer digits")]
    MissingIntegerPart,
    #[error("unexpected byte {byte:#04x} at position {position} of value")]
    UnexpectedByte { byte: u8, position: usize },
    #[error("value has too many digits")]
    OutOfRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_keeps_only_the_first_line() {
        let err = Error::format(b"Oslo;1.x\nBergen;2.0\n", FormatError::EmptyValue);
        match err {
            Error::Format { record, source } => {
                assert_eq!(record, "Oslo;1.x");
                assert_eq!(source, FormatError::EmptyValue);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn format_error_truncates_long_records() {
        let long = vec![b'a'; 500];
        let Error::Format { record, .. } = Error::format(&long, FormatError::MissingDelimiter)
        else {
            panic!("expected a format error");
        };
        assert_eq!(record.len(), RECORD_CONTEXT);
    }
}
