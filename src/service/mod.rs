//! Service layer: translates transport requests into engine operations.

pub mod dispatcher;

pub use dispatcher::{Command, CommandOutcome, Dispatcher};
