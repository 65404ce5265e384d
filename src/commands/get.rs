use crate::commands::executable::{Context, Executable};
use crate::commands::{wrong_arity, CommandError, CommandParser};
use crate::frame::Frame;

/// GET returns the value of a key, or a null bulk string when the key does
/// not exist. An entry whose expiry has elapsed counts as missing and is
/// removed on the way out.
///
/// Ref: <https://redis.io/docs/latest/commands/get/>
#[derive(Debug, PartialEq)]
pub struct Get {
    pub key: String,
}

impl Get {
    pub(crate) const NAME: &'static str = "GET";
}

impl Executable for Get {
    fn exec(self, ctx: Context) -> Result<Frame, crate::Error> {
        match ctx.store.get(&self.key) {
            Some(value) => {
                ctx.stats.keyspace_hit();
                Ok(Frame::Bulk(value.clone()))
            }
            None => {
                ctx.stats.keyspace_miss();
                Ok(Frame::NullBulk)
            }
        }
    }
}

impl TryFrom<&mut CommandParser> for Get {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string().map_err(wrong_arity(Self::NAME))?;
        Ok(Self { key })
    }
}
