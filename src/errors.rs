use crate::record::MIN_FIELDS;
use std::error::Error;
use std::fmt;
use std::fmt::Formatter;
use std::string::FromUtf8Error;

/// A per-record problem. Always recovered locally: the offending line is
/// skipped with a diagnostic and the batch keeps going.
#[derive(Debug, PartialEq)]
pub enum RecordError {
    /// The tokenized line is shorter than the positional contract allows.
    TooFewFields(usize),
}

/// A failure while rendering the cleaned table to text.
#[derive(Debug)]
pub enum ExportError {
    SerializeError(csv::Error),
    EncodingError(FromUtf8Error),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::TooFewFields(found) => write!(
                f,
                "record has {} fields, at least {} are required",
                found, MIN_FIELDS
            ),
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::SerializeError(err) => {
                write!(f, "failed to serialize cleaned record: {}", err)
            }
            ExportError::EncodingError(err) => write!(f, "failed to encode csv output: {}", err),
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::SerializeError(err)
    }
}

impl From<FromUtf8Error> for ExportError {
    fn from(err: FromUtf8Error) -> Self {
        ExportError::EncodingError(err)
    }
}

impl Error for RecordError {}
impl Error for ExportError {}
