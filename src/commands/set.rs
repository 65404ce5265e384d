use bytes::Bytes;

use crate::commands::executable::{Context, Executable};
use crate::commands::{wrong_arity, CommandError, CommandParser};
use crate::frame::Frame;

/// SET stores a byte-string value under a key. Overwriting always clears
/// any expiry the previous value carried.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: String,
    pub value: Bytes,
}

impl Set {
    pub(crate) const NAME: &'static str = "SET";
}

impl Executable for Set {
    fn exec(self, ctx: Context) -> Result<Frame, crate::Error> {
        ctx.store.set(self.key, self.value);
        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string().map_err(wrong_arity(Self::NAME))?;
        let value = parser.next_bytes().map_err(wrong_arity(Self::NAME))?;

        Ok(Self { key, value })
    }
}
