use crate::frame::Frame;
use crate::stats::Stats;
use crate::store::Store;

/// Everything a command handler may touch while executing: the keyspace
/// and the server counters. The engine constructs one per dispatch.
pub struct Context<'a> {
    pub store: &'a mut Store,
    pub stats: &'a Stats,
}

pub trait Executable {
    fn exec(self, ctx: Context) -> Result<Frame, crate::Error>;
}
