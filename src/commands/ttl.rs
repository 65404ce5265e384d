use crate::commands::executable::{Context, Executable};
use crate::commands::{wrong_arity, CommandError, CommandParser};
use crate::frame::Frame;

/// TTL returns the remaining time to live of a key that has a timeout:
/// -2 when the key does not exist, -1 when it has no timeout, otherwise
/// the remaining time rounded up to whole seconds.
///
/// Ref: <https://redis.io/docs/latest/commands/ttl/>
#[derive(Debug, PartialEq)]
pub struct Ttl {
    pub key: String,
}

impl Ttl {
    pub(crate) const NAME: &'static str = "TTL";
}

impl Executable for Ttl {
    fn exec(self, ctx: Context) -> Result<Frame, crate::Error> {
        let ttl = match ctx.store.remaining_ttl(&self.key) {
            None => -2,
            Some(None) => -1,
            Some(Some(remaining)) => remaining.as_millis().div_ceil(1000) as i64,
        };
        Ok(Frame::Integer(ttl))
    }
}

impl TryFrom<&mut CommandParser> for Ttl {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string().map_err(wrong_arity(Self::NAME))?;
        Ok(Self { key })
    }
}
