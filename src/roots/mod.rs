//! Search roots handed to the bundler.

mod aggregate;
mod symlinks;

pub use aggregate::{aggregate_with_symlinks, RootSet};
