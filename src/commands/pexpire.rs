use std::time::{Duration, Instant};

use crate::commands::executable::{Context, Executable};
use crate::commands::{wrong_arity, CommandError, CommandParser};
use crate::frame::Frame;

/// Like EXPIRE, with the timeout given in milliseconds.
///
/// Ref: <https://redis.io/docs/latest/commands/pexpire/>
#[derive(Debug, PartialEq)]
pub struct Pexpire {
    pub key: String,
    pub millis: i64,
}

impl Pexpire {
    pub(crate) const NAME: &'static str = "PEXPIRE";
}

impl Executable for Pexpire {
    fn exec(self, ctx: Context) -> Result<Frame, crate::Error> {
        if self.millis < 0 {
            return Ok(Frame::Error(
                "ERR invalid expire time in 'pexpire' command".to_string(),
            ));
        }
        if !ctx.store.exists(&self.key) {
            return Ok(Frame::Integer(0));
        }

        let at = Instant::now() + Duration::from_millis(self.millis as u64);
        ctx.store.set_expiry(&self.key, at);
        Ok(Frame::Integer(1))
    }
}

impl TryFrom<&mut CommandParser> for Pexpire {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string().map_err(wrong_arity(Self::NAME))?;
        let millis = parser
            .next_string()
            .map_err(wrong_arity(Self::NAME))?
            .parse::<i64>()
            .map_err(|_| CommandError::NotAnInteger)?;

        Ok(Self { key, millis })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Stats;
    use crate::store::Store;
    use bytes::Bytes;

    #[test]
    fn sets_millisecond_expiry() {
        let mut store = Store::new();
        let stats = Stats::new(0);
        store.set("k".to_string(), Bytes::from("v"));

        let reply = Pexpire {
            key: "k".to_string(),
            millis: 5000,
        }
        .exec(Context {
            store: &mut store,
            stats: &stats,
        })
        .unwrap();

        assert_eq!(reply, Frame::Integer(1));
        let remaining = store.remaining_ttl("k").unwrap().unwrap();
        assert!(remaining <= Duration::from_millis(5000));
        assert!(remaining > Duration::from_millis(4000));
    }

    #[test]
    fn missing_key_returns_zero() {
        let mut store = Store::new();
        let stats = Stats::new(0);

        let reply = Pexpire {
            key: "nope".to_string(),
            millis: 100,
        }
        .exec(Context {
            store: &mut store,
            stats: &stats,
        })
        .unwrap();

        assert_eq!(reply, Frame::Integer(0));
    }
}
