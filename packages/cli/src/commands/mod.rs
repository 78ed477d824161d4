pub mod check;
pub mod replay;
pub mod simulate;

pub use check::{check, CheckArgs};
pub use replay::{replay, ReplayArgs};
pub use simulate::{simulate, SimulateArgs};
