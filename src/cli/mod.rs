mod args;
pub mod paths;

pub use args::{Cli, Commands, StartArgs};
