use std::convert::TryInto;
use std::io::Cursor;

use crate::buffer::Buffer;
use crate::frame::{self, Frame};

/// Tries to parse one frame out of the buffer's readable span.
///
/// Returns `Ok(None)` when the buffer does not yet hold a complete frame;
/// the buffer is only advanced past the bytes of a successfully parsed
/// frame, so a partial frame is retried untouched once more data arrives.
pub fn decode(buffer: &mut Buffer) -> Result<Option<Frame>, frame::Error> {
    if buffer.readable_bytes() == 0 {
        return Ok(None);
    }

    let mut cursor = Cursor::new(buffer.peek());
    let frame = match Frame::parse(&mut cursor) {
        Ok(frame) => frame,
        Err(frame::Error::Incomplete) => return Ok(None), // Not enough data to parse a frame.
        Err(err) => return Err(err),
    };

    let position: usize = cursor
        .position()
        .try_into()
        .expect("cursor position is too large");

    // Remove the parsed frame from the buffer.
    buffer.retrieve(position);

    Ok(Some(frame))
}
