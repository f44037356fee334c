//! Utilities used by binary readers: parse error type and slice accessor.
use std::fmt;

/// Error type returned by the binary reading helpers in this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// An attempted read was outside the available buffer range.
    ///
    /// - `offset` is the index that was attempted to be accessed.
    /// - `needed` is the number of bytes required for the operation.
    /// - `available` is the current buffer length.
    /// - `context` is an optional string describing the logical location
    ///   (for example `"dmp_header"` or `"operator 2"`) where the access
    ///   was attempted.
    OffsetOutOfRange {
        offset: usize,
        needed: usize,
        available: usize,
        context: Option<String>,
    },

    /// The leading version/system/type bytes name a format this reader does
    /// not understand.
    UnsupportedHeader([u8; 3]),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::OffsetOutOfRange {
                offset,
                needed,
                available,
                context,
            } => {
                if let Some(ctx) = context {
                    write!(
                        f,
                        "offset out of range at {}: 0x{:X} (needed {} bytes, available {})",
                        ctx, offset, needed, available
                    )
                } else {
                    write!(
                        f,
                        "offset out of range: 0x{:X} (needed {} bytes, available {})",
                        offset, needed, available
                    )
                }
            }
            ParseError::UnsupportedHeader(h) => write!(
                f,
                "unsupported header: {:02X} {:02X} {:02X}",
                h[0], h[1], h[2]
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Return a borrowed slice of length `len` starting at `off` from `bytes`.
///
/// `context` names the logical block being read and ends up in the error
/// message when the range exceeds the buffer.
pub fn read_slice<'a>(
    bytes: &'a [u8],
    off: usize,
    len: usize,
    context: &str,
) -> Result<&'a [u8], ParseError> {
    if bytes.len() < off + len {
        return Err(ParseError::OffsetOutOfRange {
            offset: off,
            needed: len,
            // Report the remaining number of bytes from `off` to the end of the buffer.
            available: bytes.len().saturating_sub(off),
            context: Some(context.into()),
        });
    }
    Ok(&bytes[off..off + len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_slice_reports_remaining() {
        let data = [0u8; 10];
        let err = read_slice(&data, 8, 4, "block").unwrap_err();
        assert_eq!(
            err,
            ParseError::OffsetOutOfRange {
                offset: 8,
                needed: 4,
                available: 2,
                context: Some("block".into()),
            }
        );
        assert_eq!(read_slice(&data, 6, 4, "block").unwrap().len(), 4);
    }
}
