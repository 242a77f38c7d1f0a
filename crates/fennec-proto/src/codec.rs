//! Tokio codec for line-oriented IRC framing.
//!
//! Decoding frames on `\n` and tolerates both `\r\n` and the degenerate bare
//! `\n` terminator. Empty lines are discarded inside the decoder so the
//! connection loop only ever sees complete messages. Encoding always emits
//! `\r\n`.

use crate::message::Message;
use bytes::{BufMut, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Upper bound on a single line, terminator included. A peer that streams
/// more than this without a newline is misbehaving and gets disconnected.
pub const MAX_LINE_LEN: usize = 4096;

/// Framing errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line exceeds {MAX_LINE_LEN} bytes")]
    LineTooLong,
}

/// Line codec: `Message` in, `Message` out.
#[derive(Debug, Default)]
pub struct LineCodec {
    // Scan resume point, so repeated decode calls stay linear.
    next_index: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LineCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        loop {
            let newline = src[self.next_index..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|i| self.next_index + i);

            match newline {
                Some(i) => {
                    let line = src.split_to(i + 1);
                    self.next_index = 0;
                    let text = String::from_utf8_lossy(&line[..i]);
                    // Empty lines (including a stray "\r\n") are discarded.
                    if let Some(msg) = Message::parse(&text) {
                        return Ok(Some(msg));
                    }
                }
                None => {
                    if src.len() > MAX_LINE_LEN {
                        return Err(CodecError::LineTooLong);
                    }
                    self.next_index = src.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        match self.decode(src)? {
            Some(msg) => Ok(Some(msg)),
            None => {
                // A final unterminated line still counts.
                if src.is_empty() {
                    return Ok(None);
                }
                let line = src.split_to(src.len());
                self.next_index = 0;
                let text = String::from_utf8_lossy(&line);
                Ok(Message::parse(&text))
            }
        }
    }
}

impl Encoder<Message> for LineCodec {
    type Error = CodecError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), CodecError> {
        let line = msg.to_string();
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
