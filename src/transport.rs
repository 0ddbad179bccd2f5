//! Framed JSON-RPC transport: `Content-Length`-delimited frames over a
//! byte-stream pair.
//!
//! The read side is built on [`BufRead::fill_buf`]/[`BufRead::consume`], a
//! pull-model primitive, rather than an event-driven "wait for more bytes"
//! reader. That choice makes the end-of-stream-with-buffered-data case
//! hold for free: a single blocking `read` call returns whatever the OS has
//! already buffered, so there is never a scenario where data sits behind a
//! closed stream waiting for a notification that will never come.

use std::io::{BufRead, BufReader, Read, Write};

use tracing::{debug, warn};

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, INTERNAL_PARSE_ERROR_METHOD};

/// The outcome of a single [`FramedTransport::read`] call.
pub enum Frame {
    /// A fully decoded message (including the parse-error sentinel).
    Message(JsonRpcRequest),
    /// Header block parsed but `Content-Length` was absent, non-numeric,
    /// zero, or negative. No frame was produced; call `read` again.
    Skip,
    /// The input stream has no more bytes and no partial frame is buffered.
    EndOfStream,
}

/// A `Content-Length`-framed JSON-RPC transport over a generic byte-stream
/// pair.
pub struct FramedTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
}

impl<R: Read, W: Write> FramedTransport<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            reader: BufReader::new(input),
            writer: output,
        }
    }

    /// Read at most one frame. See [`Frame`] for the four possible outcomes.
    ///
    /// # Errors
    ///
    /// Returns an error only on a genuine I/O failure reading the input
    /// stream; malformed frames are reported via [`Frame::Skip`] /
    /// [`Frame::Message`] with the `__internal_parse_error__` method, never
    /// as an `Err`.
    pub fn read(&mut self) -> std::io::Result<Frame> {
        let mut content_length: Option<i64> = None;

        loop {
            let Some(line) = self.read_line()? else {
                // Stream ended with no blank-line terminator in hand —
                // either before any header arrived, or mid-header block.
                // Both count as end-of-stream.
                return Ok(Frame::EndOfStream);
            };

            let trimmed = trim_crlf(&line);
            if trimmed.is_empty() {
                break;
            }

            if let Some((name, value)) = trimmed.split_once(':') {
                if name.trim().eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse::<i64>().ok();
                }
            }
        }

        let Some(len) = content_length.filter(|&n| n > 0) else {
            debug!("frame skipped: missing or invalid content-length");
            return Ok(Frame::Skip);
        };

        #[allow(clippy::cast_sign_loss)]
        let Some(body) = self.read_exact_bytes(len as usize)? else {
            // Declared a body longer than what the stream ultimately
            // delivered before closing.
            return Ok(Frame::EndOfStream);
        };

        match serde_json::from_slice::<JsonRpcRequest>(&body) {
            Ok(request) => Ok(Frame::Message(request)),
            Err(e) => {
                warn!(error = %e, "frame body failed to parse as JSON-RPC request");
                Ok(Frame::Message(JsonRpcRequest {
                    jsonrpc: "2.0".to_owned(),
                    id: None,
                    method: INTERNAL_PARSE_ERROR_METHOD.to_owned(),
                    params: serde_json::json!({ "message": e.to_string() }),
                }))
            }
        }
    }

    /// Serialize and write `response` as one `Content-Length` frame.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the underlying write fails.
    pub fn write(&mut self, response: &JsonRpcResponse) -> std::io::Result<()> {
        let body = serde_json::to_vec(response)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        write!(self.writer, "Content-Length: {}\r\n\r\n", body.len())?;
        self.writer.write_all(&body)?;
        self.writer.flush()
    }

    /// Read one line (through and including `\n`), or `None` if the stream
    /// ended before a newline was found — whether zero bytes were read or
    /// a partial line was in flight. Bytes beyond the newline that arrived
    /// in the same underlying read stay in the `BufReader`'s own buffer and
    /// are not re-read (push-back semantics fall out of `fill_buf`/`consume`).
    fn read_line(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                return Ok(None);
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    line.extend_from_slice(&available[..=pos]);
                    self.reader.consume(pos + 1);
                    return Ok(Some(line));
                }
                None => {
                    let n = available.len();
                    line.extend_from_slice(available);
                    self.reader.consume(n);
                }
            }
        }
    }

    /// Read exactly `len` bytes, or `None` if the stream closed first.
    fn read_exact_bytes(&mut self, len: usize) -> std::io::Result<Option<Vec<u8>>> {
        let mut body = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                return Ok(None);
            }
            let take = available.len().min(len - filled);
            body[filled..filled + take].copy_from_slice(&available[..take]);
            self.reader.consume(take);
            filled += take;
        }
        Ok(Some(body))
    }
}

fn trim_crlf(line: &[u8]) -> String {
    let trimmed = line
        .strip_suffix(b"\n")
        .map_or(line, |rest| rest.strip_suffix(b"\r").unwrap_or(rest));
    String::from_utf8_lossy(trimmed).into_owned()
}
