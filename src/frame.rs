// https://redis.io/docs/reference/protocol-spec

use std::fmt;
use std::io::Cursor;

use bytes::Buf;
use bytes::Bytes;
use thiserror::Error as ThisError;

static CRLF: &[u8; 2] = b"\r\n";

#[derive(Debug, ThisError, PartialEq)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("invalid frame data type: {0}")]
    InvalidType(u8),
    #[error("invalid frame length")]
    InvalidLength,
    #[error("malformed integer frame")]
    MalformedInteger,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    /// The RESP2 null bulk string, `$-1\r\n`.
    NullBulk,
    /// Never produced by the parser; serialized as a null bulk string.
    Null,
    Array(Vec<Frame>),
}

// Parsing is transactional at the call site: the cursor position is only
// meaningful on `Ok`, and callers must not advance their underlying buffer
// on any `Err`.
impl Frame {
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        // The first byte in a serialized payload identifies its type.
        // Subsequent bytes constitute the type's contents.
        match get_byte(src)? {
            b'+' => {
                let bytes = get_line(src)?;
                Ok(Frame::Simple(String::from_utf8_lossy(bytes).into_owned()))
            }
            b'-' => {
                let bytes = get_line(src)?;
                Ok(Frame::Error(String::from_utf8_lossy(bytes).into_owned()))
            }
            b':' => {
                let bytes = get_line(src)?;
                let integer = std::str::from_utf8(bytes)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or(Error::MalformedInteger)?;
                Ok(Frame::Integer(integer))
            }
            // $<length>\r\n<data>\r\n
            b'$' => {
                let length = get_length(src)?;

                if length == -1 {
                    return Ok(Frame::NullBulk);
                }
                if length < 0 {
                    return Err(Error::InvalidLength);
                }

                let length = length as usize;
                if src.remaining() < length + CRLF.len() {
                    return Err(Error::Incomplete);
                }

                let start = src.position() as usize;
                let data = &src.get_ref()[start..start + length];
                if &src.get_ref()[start + length..start + length + 2] != CRLF {
                    return Err(Error::InvalidLength);
                }

                let data = Bytes::copy_from_slice(data);
                src.advance(length + CRLF.len());

                Ok(Frame::Bulk(data))
            }
            // *<number-of-elements>\r\n<element-1>...<element-n>
            b'*' => {
                let length = get_length(src)?;
                if length < 0 {
                    return Err(Error::InvalidLength);
                }

                let mut frames = Vec::with_capacity(length as usize);
                for _ in 0..length {
                    frames.push(Self::parse(src)?);
                }

                Ok(Frame::Array(frames))
            }
            byte => Err(Error::InvalidType(byte)),
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Frame::Simple(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(b'+');
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Error(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(b'-');
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Integer(i) => {
                let digits = i.to_string();
                let mut bytes = Vec::with_capacity(1 + digits.len() + CRLF.len());
                bytes.push(b':');
                bytes.extend_from_slice(digits.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Bulk(data) => {
                let length_str = data.len().to_string();
                let mut bytes =
                    Vec::with_capacity(1 + length_str.len() + CRLF.len() * 2 + data.len());
                bytes.push(b'$');
                bytes.extend_from_slice(length_str.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes.extend_from_slice(data);
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::NullBulk | Frame::Null => b"$-1\r\n".to_vec(),
            Frame::Array(frames) => {
                let length_str = frames.len().to_string();
                let mut bytes = Vec::with_capacity(1 + length_str.len() + CRLF.len());
                bytes.push(b'*');
                bytes.extend_from_slice(length_str.as_bytes());
                bytes.extend_from_slice(CRLF);
                for frame in frames {
                    bytes.extend(frame.serialize());
                }
                bytes
            }
        }
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Integer(i) => write!(f, ":{}", i),
            Frame::Bulk(bytes) => write!(f, "${}", String::from_utf8_lossy(bytes)),
            Frame::NullBulk | Frame::Null => write!(f, "$-1"),
            Frame::Array(arr) => {
                write!(f, "*{}", arr.len())?;
                for frame in arr {
                    write!(f, " {}", frame)?;
                }
                Ok(())
            }
        }
    }
}

/// Reads the bytes up to the next CRLF and positions the cursor past it.
fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let end = src.get_ref().len();

    let line_end = src.get_ref()[start..end]
        .windows(2)
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    src.set_position((line_end + CRLF.len()) as u64);

    Ok(&src.get_ref()[start..line_end])
}

/// Reads a `<len>\r\n` header as a signed length.
fn get_length(src: &mut Cursor<&[u8]>) -> Result<i64, Error> {
    let bytes = get_line(src)?;
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(Error::InvalidLength)
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> Result<Frame, Error> {
        let mut cursor = Cursor::new(data);
        Frame::parse(&mut cursor)
    }

    #[test]
    fn parse_simple_string_frame() {
        assert!(matches!(parse(b"+OK\r\n"), Ok(Frame::Simple(ref s)) if s == "OK"));
    }

    #[test]
    fn parse_error_frame() {
        assert!(matches!(
            parse(b"-Error message\r\n"),
            Ok(Frame::Error(ref s)) if s == "Error message"
        ));
    }

    fn parse_integer_frame(data: &[u8], expected: i64) {
        assert!(matches!(parse(data), Ok(Frame::Integer(i)) if i == expected));
    }

    #[test]
    fn parse_integer_frame_positive() {
        parse_integer_frame(b":1000\r\n", 1000);
    }

    #[test]
    fn parse_integer_frame_negative() {
        parse_integer_frame(b":-1000\r\n", -1000);
    }

    #[test]
    fn parse_integer_frame_zero() {
        parse_integer_frame(b":0\r\n", 0);
    }

    #[test]
    fn parse_integer_frame_malformed() {
        assert_eq!(parse(b":12x4\r\n"), Err(Error::MalformedInteger));
        assert_eq!(parse(b":\r\n"), Err(Error::MalformedInteger));
    }

    #[test]
    fn parse_bulk_string_frame() {
        assert!(matches!(
            parse(b"$6\r\nfoobar\r\n"),
            Ok(Frame::Bulk(ref b)) if b == &Bytes::from("foobar")
        ));
    }

    #[test]
    fn parse_bulk_string_frame_empty() {
        assert!(matches!(
            parse(b"$0\r\n\r\n"),
            Ok(Frame::Bulk(ref b)) if b.is_empty()
        ));
    }

    #[test]
    fn parse_bulk_string_frame_null() {
        assert_eq!(parse(b"$-1\r\n"), Ok(Frame::NullBulk));
    }

    #[test]
    fn parse_bulk_string_frame_bad_length() {
        assert_eq!(parse(b"$abc\r\nfoobar\r\n"), Err(Error::InvalidLength));
        assert_eq!(parse(b"$-4\r\n"), Err(Error::InvalidLength));
    }

    #[test]
    fn parse_bulk_string_frame_missing_terminator() {
        // The payload is followed by garbage where CRLF is required.
        assert_eq!(parse(b"$3\r\nfooXXtrailing"), Err(Error::InvalidLength));
    }

    #[test]
    fn parse_bulk_string_frame_binary_payload() {
        let frame = parse(b"$5\r\na\x00b\r\x01\r\n").unwrap();
        assert_eq!(frame, Frame::Bulk(Bytes::from_static(b"a\x00b\r\x01")));
    }

    #[test]
    fn parse_array_frame_empty() {
        assert!(matches!(parse(b"*0\r\n"), Ok(Frame::Array(ref a)) if a.is_empty()));
    }

    #[test]
    fn parse_array_frame() {
        let frame = parse(b"*2\r\n$5\r\nhello\r\n$5\r\nworld\r\n").unwrap();
        assert_eq!(
            frame,
            Frame::Array(vec![
                Frame::Bulk(Bytes::from("hello")),
                Frame::Bulk(Bytes::from("world")),
            ])
        );
    }

    #[test]
    fn parse_array_frame_nested() {
        let frame = parse(b"*2\r\n*3\r\n:1\r\n:2\r\n:3\r\n*2\r\n+Hello\r\n-World\r\n").unwrap();
        assert_eq!(
            frame,
            Frame::Array(vec![
                Frame::Array(vec![
                    Frame::Integer(1),
                    Frame::Integer(2),
                    Frame::Integer(3),
                ]),
                Frame::Array(vec![
                    Frame::Simple("Hello".to_string()),
                    Frame::Error("World".to_string()),
                ]),
            ])
        );
    }

    #[test]
    fn parse_array_frame_negative_length() {
        assert_eq!(parse(b"*-1\r\n"), Err(Error::InvalidLength));
    }

    #[test]
    fn parse_array_frame_null_in_the_middle() {
        let frame = parse(b"*3\r\n$5\r\nhello\r\n$-1\r\n$5\r\nworld\r\n").unwrap();
        assert_eq!(
            frame,
            Frame::Array(vec![
                Frame::Bulk(Bytes::from("hello")),
                Frame::NullBulk,
                Frame::Bulk(Bytes::from("world")),
            ])
        );
    }

    #[test]
    fn parse_unknown_type() {
        assert_eq!(parse(b"?3\r\n"), Err(Error::InvalidType(b'?')));
    }

    #[test]
    fn parse_consumes_exactly_one_frame() {
        let data = b"+OK\r\n+SECOND\r\n";
        let mut cursor = Cursor::new(&data[..]);
        let frame = Frame::parse(&mut cursor).unwrap();
        assert_eq!(frame, Frame::Simple("OK".to_string()));
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn every_proper_prefix_is_incomplete() {
        let frames = vec![
            Frame::Simple("PONG".to_string()),
            Frame::Integer(-42),
            Frame::Bulk(Bytes::from("hello")),
            Frame::NullBulk,
            Frame::Array(vec![
                Frame::Bulk(Bytes::from("SET")),
                Frame::Bulk(Bytes::from("key")),
                Frame::Bulk(Bytes::from("value")),
            ]),
            Frame::Array(vec![Frame::Array(vec![Frame::Integer(1)])]),
        ];

        for frame in frames {
            let serialized = frame.serialize();
            for len in 0..serialized.len() {
                assert_eq!(
                    parse(&serialized[..len]),
                    Err(Error::Incomplete),
                    "prefix of {:?} with length {} should be incomplete",
                    frame,
                    len
                );
            }
        }
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let frames = vec![
            Frame::Simple("OK".to_string()),
            Frame::Error("ERR something went wrong".to_string()),
            Frame::Integer(i64::MIN),
            Frame::Bulk(Bytes::from("value")),
            Frame::Bulk(Bytes::new()),
            Frame::NullBulk,
            Frame::Array(vec![]),
            Frame::Array(vec![
                Frame::Simple("OK".to_string()),
                Frame::NullBulk,
                Frame::Array(vec![Frame::Integer(7)]),
            ]),
        ];

        for frame in frames {
            let serialized = frame.serialize();
            let mut cursor = Cursor::new(&serialized[..]);
            let reparsed = Frame::parse(&mut cursor).unwrap();
            assert_eq!(reparsed, frame);
            assert_eq!(cursor.position() as usize, serialized.len());
        }
    }

    #[test]
    fn serialize_internal_null_as_null_bulk() {
        assert_eq!(Frame::Null.serialize(), b"$-1\r\n");
        assert_eq!(Frame::NullBulk.serialize(), b"$-1\r\n");
    }
}
