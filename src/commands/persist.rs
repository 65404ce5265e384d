use crate::commands::executable::{Context, Executable};
use crate::commands::{wrong_arity, CommandError, CommandParser};
use crate::frame::Frame;

/// PERSIST removes the timeout from a key, turning it back into a
/// persistent entry. Returns 1 when a timeout was removed, 0 when the key
/// does not exist or had no timeout.
///
/// Ref: <https://redis.io/docs/latest/commands/persist/>
#[derive(Debug, PartialEq)]
pub struct Persist {
    pub key: String,
}

impl Persist {
    pub(crate) const NAME: &'static str = "PERSIST";
}

impl Executable for Persist {
    fn exec(self, ctx: Context) -> Result<Frame, crate::Error> {
        let cleared = ctx.store.persist(&self.key);
        Ok(Frame::Integer(i64::from(cleared)))
    }
}

impl TryFrom<&mut CommandParser> for Persist {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string().map_err(wrong_arity(Self::NAME))?;
        Ok(Self { key })
    }
}
