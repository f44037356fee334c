//! Error type for the protocol layer.
use std::fmt;

use crate::binutil::ParseError;
use crate::param::ParamId;

/// Errors produced by the address codec, the logical state and the importers.
///
/// An unavailable transport is not an error: sends are dropped and logged.
#[derive(Debug)]
pub enum Cv2612Error {
    /// A parameter value does not fit the parameter's bit width.
    ValueOutOfRange { id: ParamId, value: u8, max: u8 },

    /// A patch/channel/operator/voice/step index is outside its range.
    ///
    /// - `what` names the index kind (for example `"patch"`).
    /// - `index` is the offending value.
    /// - `count` is the number of valid indices.
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },

    /// A MIDI byte (channel, CC number or value) is outside the 7-bit/4-bit range.
    InvalidMidi { what: &'static str, value: u8 },

    /// A parameter label did not match any known parameter.
    UnknownParam(String),

    /// A legacy `id-pid-cid-op` key could not be decoded.
    InvalidKey(String),

    /// An imported document does not have the shape of the logical state.
    ShapeMismatch(String),

    /// JSON (de)serialization failed.
    Json(serde_json::Error),

    /// A binary instrument could not be read.
    Parse(ParseError),
}

impl fmt::Display for Cv2612Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cv2612Error::ValueOutOfRange { id, value, max } => {
                write!(f, "value {} out of range for {} (max {})", value, id, max)
            }
            Cv2612Error::IndexOutOfRange { what, index, count } => {
                write!(f, "{} index {} out of range (0..{})", what, index, count)
            }
            Cv2612Error::InvalidMidi { what, value } => {
                write!(f, "invalid MIDI {}: {}", what, value)
            }
            Cv2612Error::UnknownParam(label) => write!(f, "unknown parameter: {:?}", label),
            Cv2612Error::InvalidKey(key) => write!(f, "invalid parameter key: {:?}", key),
            Cv2612Error::ShapeMismatch(path) => write!(f, "state shape mismatch at {}", path),
            Cv2612Error::Json(e) => write!(f, "json error: {}", e),
            Cv2612Error::Parse(e) => write!(f, "parse error: {}", e),
        }
    }
}

impl std::error::Error for Cv2612Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Cv2612Error::Json(e) => Some(e),
            Cv2612Error::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Cv2612Error {
    fn from(e: serde_json::Error) -> Self {
        Cv2612Error::Json(e)
    }
}

impl From<ParseError> for Cv2612Error {
    fn from(e: ParseError) -> Self {
        Cv2612Error::Parse(e)
    }
}
