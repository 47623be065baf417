//! Message framing over stream and datagram transports.
//!
//! - `Delimited`: `<payload>|`, accumulated until the terminator shows up.
//! - `LengthPrefixed`: `[<len>]<payload>`, tolerant of partial reads and of
//!   several messages arriving in one chunk.
//! - `Datagram`: one payload per received chunk, no header.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use super::protocol::{MAX_MESSAGE_SIZE, Message, ProtocolError, parse_payload};

pub const DELIMITER: u8 = b'|';

const MAX_LENGTH_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    Delimited,
    LengthPrefixed,
    Datagram,
}

/// Result of parsing the front of a byte buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum Parsed<'a> {
    Message(Message, &'a [u8]),
    /// One frame (or a run of unusable bytes) was consumed but did not hold a
    /// valid message.
    Malformed(ProtocolError, &'a [u8]),
    Incomplete,
}

impl Framing {
    pub fn encode(self, message: &Message) -> Bytes {
        let payload = message.to_string();
        let mut out = BytesMut::with_capacity(payload.len() + 8);
        match self {
            Self::Delimited => {
                out.put_slice(payload.as_bytes());
                out.put_u8(DELIMITER);
            }
            Self::LengthPrefixed => {
                out.put_slice(format!("[{}]", payload.len()).as_bytes());
                out.put_slice(payload.as_bytes());
            }
            Self::Datagram => out.put_slice(payload.as_bytes()),
        }
        out.freeze()
    }

    /// Parses the first message at the front of `bytes` and returns what
    /// follows it. Has no side effects.
    pub fn parse(self, bytes: &[u8]) -> Parsed<'_> {
        if bytes.is_empty() {
            return Parsed::Incomplete;
        }
        match self {
            Self::Delimited => match bytes.iter().position(|&b| b == DELIMITER) {
                Some(end) => finish(&bytes[..end], &bytes[end + 1..]),
                None => Parsed::Incomplete,
            },
            Self::LengthPrefixed => parse_length_prefixed(bytes),
            Self::Datagram => finish(bytes, &[]),
        }
    }
}

fn finish<'a>(payload: &[u8], rest: &'a [u8]) -> Parsed<'a> {
    match parse_payload(payload) {
        Ok(message) => Parsed::Message(message, rest),
        Err(error) => Parsed::Malformed(error, rest),
    }
}

fn parse_length_prefixed(bytes: &[u8]) -> Parsed<'_> {
    if bytes[0] != b'[' {
        let skip = bytes.iter().position(|&b| b == b'[').unwrap_or(bytes.len());
        return Parsed::Malformed(
            ProtocolError::FrameHeader(format!("{skip} byte(s) before frame start")),
            &bytes[skip..],
        );
    }

    let digits = bytes[1..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    let Some(&terminator) = bytes.get(1 + digits) else {
        if digits > MAX_LENGTH_DIGITS {
            return Parsed::Malformed(
                ProtocolError::FrameHeader("length prefix too long".into()),
                &bytes[1..],
            );
        }
        return Parsed::Incomplete;
    };
    if terminator != b']' || digits == 0 || digits > MAX_LENGTH_DIGITS {
        return Parsed::Malformed(
            ProtocolError::FrameHeader("expected `[<len>]`".into()),
            &bytes[1..],
        );
    }

    let len = std::str::from_utf8(&bytes[1..1 + digits])
        .ok()
        .and_then(|digits| digits.parse::<usize>().ok())
        .unwrap_or(usize::MAX);
    let body = &bytes[2 + digits..];
    if len > MAX_MESSAGE_SIZE {
        return Parsed::Malformed(
            ProtocolError::FrameTooLarge {
                len,
                max: MAX_MESSAGE_SIZE,
            },
            body,
        );
    }
    if body.len() < len {
        return Parsed::Incomplete;
    }
    finish(&body[..len], &body[len..])
}

/// Incremental decoder that owns the per-connection receive buffer.
#[derive(Debug)]
pub struct FrameDecoder {
    framing: Framing,
    buffer: BytesMut,
    max_buffered: usize,
}

impl FrameDecoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buffer: BytesMut::with_capacity(MAX_MESSAGE_SIZE * 2),
            max_buffered: MAX_MESSAGE_SIZE * 4,
        }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feeds one received chunk and returns every message it completed, in
    /// arrival order. Malformed frames are reported individually and skipped.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<Result<Message, ProtocolError>> {
        let mut out = Vec::new();

        if self.framing == Framing::Datagram {
            match self.framing.parse(chunk) {
                Parsed::Message(message, _) => out.push(Ok(message)),
                Parsed::Malformed(error, _) => out.push(Err(error)),
                Parsed::Incomplete => {}
            }
            return out;
        }

        self.buffer.extend_from_slice(chunk);
        loop {
            let total = self.buffer.len();
            let (result, remaining) = match self.framing.parse(&self.buffer) {
                Parsed::Message(message, rest) => (Ok(message), rest.len()),
                Parsed::Malformed(error, rest) => (Err(error), rest.len()),
                Parsed::Incomplete => break,
            };
            self.buffer.advance(total - remaining);
            out.push(result);
        }

        if self.buffer.len() > self.max_buffered {
            let len = self.buffer.len();
            self.buffer.clear();
            out.push(Err(ProtocolError::FrameTooLarge {
                len,
                max: self.max_buffered,
            }));
        }

        out
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping(t0: i64) -> Message {
        Message::Ping { t0 }
    }

    #[test]
    fn length_prefixed_header_matches_payload() {
        let framed = Framing::LengthPrefixed.encode(&ping(1000));
        assert_eq!(&framed[..], b"[9]ping:1000");
    }

    #[test]
    fn parse_returns_remaining_bytes() {
        let bytes = b"ping:1|pong:1:2|pi";
        let Parsed::Message(first, rest) = Framing::Delimited.parse(bytes) else {
            panic!("expected a message");
        };
        assert_eq!(first, ping(1));
        assert_eq!(rest, b"pong:1:2|pi");

        let Parsed::Message(_, rest) = Framing::Delimited.parse(rest) else {
            panic!("expected a message");
        };
        assert_eq!(Framing::Delimited.parse(rest), Parsed::Incomplete);
    }

    #[test]
    fn message_split_across_chunks_is_decoded_once() {
        for framing in [Framing::Delimited, Framing::LengthPrefixed] {
            let framed = framing.encode(&Message::Pong { t0: 1000, t1: 1050 });
            let (head, tail) = framed.split_at(5);

            let mut decoder = FrameDecoder::new(framing);
            assert!(decoder.decode(head).is_empty());

            let decoded = decoder.decode(tail);
            assert_eq!(decoded, vec![Ok(Message::Pong { t0: 1000, t1: 1050 })]);
            assert_eq!(decoder.buffered(), 0);
        }
    }

    #[test]
    fn concatenated_frames_decode_in_order() {
        let mut chunk = BytesMut::new();
        for t0 in [1, 22, 333] {
            chunk.extend_from_slice(&Framing::LengthPrefixed.encode(&ping(t0)));
        }

        let mut decoder = FrameDecoder::new(Framing::LengthPrefixed);
        let decoded = decoder.decode(&chunk);
        assert_eq!(decoded, vec![Ok(ping(1)), Ok(ping(22)), Ok(ping(333))]);
    }

    #[test]
    fn malformed_frame_is_dropped_without_losing_the_next() {
        let mut decoder = FrameDecoder::new(Framing::Delimited);
        let decoded = decoder.decode(b"ping:oops|ping:5|");

        assert_eq!(decoded.len(), 2);
        assert!(decoded[0].is_err());
        assert_eq!(decoded[1], Ok(ping(5)));
    }

    #[test]
    fn length_prefixed_resyncs_after_garbage() {
        let mut decoder = FrameDecoder::new(Framing::LengthPrefixed);
        let decoded = decoder.decode(b"xx[6]ping:7[x]end[3]end");

        let messages: Vec<Message> = decoded.into_iter().filter_map(Result::ok).collect();
        assert_eq!(messages, vec![ping(7), Message::End]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn oversize_length_prefix_is_rejected() {
        let parsed = Framing::LengthPrefixed.parse(b"[99999]ping");
        assert!(matches!(
            parsed,
            Parsed::Malformed(ProtocolError::FrameTooLarge { len: 99999, .. }, _)
        ));
    }

    #[test]
    fn datagrams_are_never_merged() {
        let mut decoder = FrameDecoder::new(Framing::Datagram);

        assert_eq!(decoder.decode(b"ping:1"), vec![Ok(ping(1))]);
        assert_eq!(decoder.decode(b"goal"), vec![Ok(Message::Goal)]);
        assert!(decoder.decode(b"pi").first().is_some_and(Result::is_err));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn unterminated_stream_garbage_is_bounded() {
        let mut decoder = FrameDecoder::new(Framing::Delimited);
        let junk = vec![b'a'; MAX_MESSAGE_SIZE * 5];

        let decoded = decoder.decode(&junk);
        assert!(matches!(
            decoded.as_slice(),
            [Err(ProtocolError::FrameTooLarge { .. })]
        ));
        assert_eq!(decoder.buffered(), 0);
    }
}
