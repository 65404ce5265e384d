use std::time::{Duration, Instant};

use crate::commands::executable::{Context, Executable};
use crate::commands::{wrong_arity, CommandError, CommandParser};
use crate::frame::Frame;

/// EXPIRE sets a timeout on a key, in seconds. Returns 1 when the timeout
/// was set and 0 when the key does not exist. A timeout of 0 is accepted;
/// the key becomes immediately expired and is collected lazily.
///
/// Ref: <https://redis.io/docs/latest/commands/expire/>
#[derive(Debug, PartialEq)]
pub struct Expire {
    pub key: String,
    pub seconds: i64,
}

impl Expire {
    pub(crate) const NAME: &'static str = "EXPIRE";
}

impl Executable for Expire {
    fn exec(self, ctx: Context) -> Result<Frame, crate::Error> {
        if self.seconds < 0 {
            return Ok(Frame::Error(
                "ERR invalid expire time in 'expire' command".to_string(),
            ));
        }
        if !ctx.store.exists(&self.key) {
            return Ok(Frame::Integer(0));
        }

        let at = Instant::now() + Duration::from_secs(self.seconds as u64);
        ctx.store.set_expiry(&self.key, at);
        Ok(Frame::Integer(1))
    }
}

impl TryFrom<&mut CommandParser> for Expire {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string().map_err(wrong_arity(Self::NAME))?;
        let seconds = parser
            .next_string()
            .map_err(wrong_arity(Self::NAME))?
            .parse::<i64>()
            .map_err(|_| CommandError::NotAnInteger)?;

        Ok(Self { key, seconds })
    }
}
