use bytes::Bytes;

use crate::commands::executable::{Context, Executable};
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;

/// INFO reports server statistics as a bulk string of `name:value` lines.
#[derive(Debug, PartialEq)]
pub struct Info;

impl Info {
    pub(crate) const NAME: &'static str = "INFO";
}

impl Executable for Info {
    fn exec(self, ctx: Context) -> Result<Frame, crate::Error> {
        let report = ctx.stats.render(ctx.store.len());
        Ok(Frame::Bulk(Bytes::from(report)))
    }
}

impl TryFrom<&mut CommandParser> for Info {
    type Error = CommandError;

    fn try_from(_parser: &mut CommandParser) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}
