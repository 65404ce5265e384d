use crate::commands::executable::{Context, Executable};
use crate::commands::{wrong_arity, CommandError, CommandParser};
use crate::frame::Frame;

/// Like TTL, with the remaining time reported in milliseconds.
///
/// Ref: <https://redis.io/docs/latest/commands/pttl/>
#[derive(Debug, PartialEq)]
pub struct Pttl {
    pub key: String,
}

impl Pttl {
    pub(crate) const NAME: &'static str = "PTTL";
}

impl Executable for Pttl {
    fn exec(self, ctx: Context) -> Result<Frame, crate::Error> {
        let ttl = match ctx.store.remaining_ttl(&self.key) {
            None => -2,
            Some(None) => -1,
            Some(Some(remaining)) => remaining.as_millis() as i64,
        };
        Ok(Frame::Integer(ttl))
    }
}

impl TryFrom<&mut CommandParser> for Pttl {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string().map_err(wrong_arity(Self::NAME))?;
        Ok(Self { key })
    }
}
