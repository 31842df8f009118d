//! Option schema, parsers and resolution for the `start` command.
//!
//! The schema is a static, ordered list of option specs. Resolution walks
//! it once: supplied raw text goes through the option's parser, everything
//! else falls back to a literal default or one derived from the project
//! configuration.

mod parse;
mod resolver;
mod schema;

pub use resolver::{resolve, RawArgs, ResolveError, ResolvedConfig};
pub use schema::{start_options, validate_schema, OptionSpec, ValueKind};
