use base64::{Engine, engine::general_purpose::STANDARD};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::errors::{ProtocolError, Result, TransportError};

/// Maximum allowed decoded record size (1MB) to prevent unbounded buffering
/// from a peer that never sends a newline.
pub const MAX_RECORD_SIZE: usize = 1024 * 1024;

/// Largest encoded line that can decode to [`MAX_RECORD_SIZE`] bytes.
const MAX_ENCODED_SIZE: usize = MAX_RECORD_SIZE.div_ceil(3) * 4;

const DELIMITER: u8 = b'\n';

/// Frames message text for the stream binding: base64, then one newline.
pub fn encode_record(text: &str) -> Result<Vec<u8>> {
    if text.len() > MAX_RECORD_SIZE {
        return Err(ProtocolError::TooLarge {
            actual: text.len(),
            max: MAX_RECORD_SIZE,
        });
    }
    let mut buf = STANDARD.encode(text).into_bytes();
    buf.push(DELIMITER);
    Ok(buf)
}

/// Writes one framed record. The whole record goes out in one chunk so a
/// reader never observes a delimiter without its payload.
pub async fn write_record<W: AsyncWrite + Unpin>(
    writer: &mut W,
    text: &str,
) -> std::result::Result<(), TransportError> {
    let buf = encode_record(text)?;
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Reassembles newline-delimited base64 records from arbitrary read chunks.
/// Only complete records are dispatched; partial input stays buffered.
#[derive(Debug, Default)]
pub struct LineCodec {
    buf: Vec<u8>,
}

impl LineCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes received that don't yet form a complete record.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Pops the next complete record. Empty lines are skipped. Returns
    /// `None` when no complete record is buffered.
    pub fn next_record(&mut self) -> Option<Result<String>> {
        loop {
            let Some(end) = self.buf.iter().position(|&b| b == DELIMITER) else {
                if self.buf.len() > MAX_ENCODED_SIZE {
                    let actual = self.buf.len();
                    self.buf.clear();
                    return Some(Err(ProtocolError::TooLarge {
                        actual,
                        max: MAX_ENCODED_SIZE,
                    }));
                }
                return None;
            };

            let mut line: Vec<u8> = self.buf.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            if line.len() > MAX_ENCODED_SIZE {
                return Some(Err(ProtocolError::TooLarge {
                    actual: line.len(),
                    max: MAX_ENCODED_SIZE,
                }));
            }
            return Some(decode_line(&line));
        }
    }
}

fn decode_line(line: &[u8]) -> Result<String> {
    let bytes = STANDARD.decode(line)?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::AsyncReadExt,
        net::{TcpListener, TcpStream},
    };

    use super::*;

    #[test]
    fn record_is_base64_and_newline() {
        let record = encode_record("{\"type\":\"X\"}").unwrap();
        assert_eq!(record.last(), Some(&b'\n'));
        assert_eq!(record, b"eyJ0eXBlIjoiWCJ9\n");
    }

    #[test]
    fn reassembles_split_records() {
        let record = encode_record("hello world").unwrap();
        let (head, tail) = record.split_at(5);
        let mut codec = LineCodec::new();

        codec.push(head);
        assert!(codec.next_record().is_none());
        assert_eq!(codec.buffered(), 5);

        codec.push(tail);
        assert_eq!(codec.next_record().unwrap().unwrap(), "hello world");
        assert!(codec.next_record().is_none());
        assert_eq!(codec.buffered(), 0);
    }

    #[test]
    fn multiple_records_in_one_chunk() {
        let mut chunk = encode_record("one").unwrap();
        chunk.extend(b"\n\r\n");
        chunk.extend(encode_record("two").unwrap());
        chunk.extend(b"dGh");

        let mut codec = LineCodec::new();
        codec.push(&chunk);
        assert_eq!(codec.next_record().unwrap().unwrap(), "one");
        assert_eq!(codec.next_record().unwrap().unwrap(), "two");
        assert!(codec.next_record().is_none());

        codec.push(b"yZWU=\r\n");
        assert_eq!(codec.next_record().unwrap().unwrap(), "three");
    }

    #[test]
    fn bad_records_are_reported_and_skipped() {
        let mut codec = LineCodec::new();
        codec.push(b"!!not base64!!\n");
        codec.push(&encode_record("ok").unwrap());
        assert!(matches!(
            codec.next_record(),
            Some(Err(ProtocolError::Encoding(_)))
        ));
        assert_eq!(codec.next_record().unwrap().unwrap(), "ok");
    }

    #[test]
    fn reject_oversized_record() {
        assert!(matches!(
            encode_record(&"x".repeat(MAX_RECORD_SIZE + 1)),
            Err(ProtocolError::TooLarge { .. })
        ));

        let mut codec = LineCodec::new();
        codec.push(&vec![b'A'; MAX_ENCODED_SIZE + 1]);
        assert!(matches!(
            codec.next_record(),
            Some(Err(ProtocolError::TooLarge { .. }))
        ));
        assert_eq!(codec.buffered(), 0);
    }

    #[tokio::test]
    async fn write_and_read_over_tcp() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).await.unwrap();
        let (mut stream, _) = server.accept().await.unwrap();

        write_record(&mut stream, "first").await.unwrap();
        write_record(&mut stream, "second").await.unwrap();
        drop(stream);

        let mut bytes = Vec::new();
        client.read_to_end(&mut bytes).await.unwrap();
        let mut codec = LineCodec::new();
        codec.push(&bytes);
        assert_eq!(codec.next_record().unwrap().unwrap(), "first");
        assert_eq!(codec.next_record().unwrap().unwrap(), "second");
    }
}
