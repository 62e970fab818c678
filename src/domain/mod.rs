mod bucket;
mod fuel;
mod ledger;
mod state;

pub use bucket::*;
pub use fuel::*;
pub use ledger::*;
pub use state::*;
