//! Fragment stream read from JSON lines.
//!
//! Each non-blank line holds one serialized [`ResponseFragment`]. This lets a
//! recorded response be replayed through the loop without an inference
//! engine.

use crate::execution::domain::{ResponseFragment, StreamError};
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

/// Failures while reading a fragment script.
#[derive(Debug, Error)]
pub enum FragmentScriptError {
    /// The underlying reader failed or a line was not valid UTF-8.
    #[error("failed to read fragment script: {0}")]
    Read(#[from] LinesCodecError),

    /// A line did not describe a fragment.
    #[error("invalid fragment on line {line}: {source}")]
    Parse {
        /// One-based line number.
        line: usize,
        /// Deserialization failure.
        source: serde_json::Error,
    },
}

/// Longest line [`fragment_script`] accepts, in bytes.
pub const MAX_FRAGMENT_LINE_LENGTH: usize = 1024 * 1024;

/// Streams fragments from a JSON-lines reader.
///
/// Lines are read lazily, so fragments after the point where the consumer
/// stops are never parsed. A line longer than [`MAX_FRAGMENT_LINE_LENGTH`]
/// yields [`FragmentScriptError::Read`].
pub fn fragment_script<R>(reader: R) -> impl Stream<Item = Result<ResponseFragment, StreamError>>
where
    R: AsyncRead,
{
    fragment_script_with_max_line_length(reader, MAX_FRAGMENT_LINE_LENGTH)
}

/// Streams fragments like [`fragment_script`] with a custom line limit.
pub fn fragment_script_with_max_line_length<R>(
    reader: R,
    max_line_length: usize,
) -> impl Stream<Item = Result<ResponseFragment, StreamError>>
where
    R: AsyncRead,
{
    FramedRead::new(reader, LinesCodec::new_with_max_length(max_line_length))
        .enumerate()
        .filter_map(|(index, line)| async move {
            match line {
                Ok(text) if text.trim().is_empty() => None,
                Ok(text) => Some(serde_json::from_str(&text).map_err(|source| {
                    StreamError::new(FragmentScriptError::Parse {
                        line: index + 1,
                        source,
                    })
                })),
                Err(err) => Some(Err(StreamError::new(FragmentScriptError::from(err)))),
            }
        })
}
