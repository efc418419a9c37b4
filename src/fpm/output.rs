//! Forwarding of worker stdout/stderr into the log.
//!
//! The supervisor hands the worker's streams to its caller untouched. The
//! binary uses [`forward_output`] to drain them line by line through
//! [`FramedRead`] + [`OutputCodec`], so an unread pipe never stalls the
//! worker.

use bytes::BytesMut;
use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tokio_util::codec::{Decoder, FramedRead, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{AppError, Result};

/// Longest worker output line accepted: 64 KiB.
pub const MAX_LINE_BYTES: usize = 65_536;

/// One decoded unit of worker output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    /// A complete line without its terminator.
    Text(String),
    /// A line longer than [`MAX_LINE_BYTES`]; its bytes are discarded up to
    /// the next newline.
    Overlong,
}

/// Line decoder for worker output with a [`MAX_LINE_BYTES`] cap.
///
/// An over-long line is reported as [`OutputLine::Overlong`] rather than as an
/// error, so the stream keeps being drained. Only I/O failures are errors.
#[derive(Debug)]
pub struct OutputCodec(LinesCodec);

impl OutputCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_LINE_BYTES))
    }
}

impl Default for OutputCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for OutputCodec {
    type Item = OutputLine;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        map_decoded(self.0.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        map_decoded(self.0.decode_eof(src))
    }
}

fn map_decoded(
    decoded: std::result::Result<Option<String>, LinesCodecError>,
) -> Result<Option<OutputLine>> {
    match decoded {
        Ok(line) => Ok(line.map(OutputLine::Text)),
        // LinesCodec switches to discarding until the next newline.
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(OutputLine::Overlong)),
        Err(LinesCodecError::Io(io_err)) => Err(AppError::Io(io_err.to_string())),
    }
}

/// Log every line of `stream` under `label` until EOF or cancellation.
///
/// Returns the number of lines forwarded. Over-long lines are logged and
/// skipped; only an I/O error ends forwarding before EOF.
pub async fn forward_output<R>(stream: R, label: &'static str, cancel: CancellationToken) -> u64
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(stream, OutputCodec::new());
    let mut forwarded: u64 = 0;

    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => {
                debug!(stream = label, forwarded, "output forwarding cancelled");
                break;
            }
            next = lines.next() => next,
        };

        match next {
            Some(Ok(OutputLine::Text(line))) => {
                forwarded += 1;
                info!(stream = label, %line, "worker output");
            }
            Some(Ok(OutputLine::Overlong)) => {
                warn!(
                    stream = label,
                    max_bytes = MAX_LINE_BYTES,
                    "skipping over-long worker output line"
                );
            }
            Some(Err(err)) => {
                warn!(stream = label, %err, "worker output read failed");
                break;
            }
            None => {
                debug!(stream = label, forwarded, "worker output closed");
                break;
            }
        }
    }

    forwarded
}

/// Await a spawned [`forward_output`] task.
///
/// Returns the forwarded line count, or `None` if the task panicked or was
/// aborted; the failure is logged.
pub async fn join_forwarder(label: &'static str, handle: JoinHandle<u64>) -> Option<u64> {
    match handle.await {
        Ok(forwarded) => Some(forwarded),
        Err(err) => {
            warn!(stream = label, %err, "output forwarder task failed");
            None
        }
    }
}
