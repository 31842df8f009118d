use clap::{Arg, ArgAction, ArgMatches, Args, Command, FromArgMatches, Parser, Subcommand};
use std::path::PathBuf;

use crate::options::{start_options, OptionSpec, RawArgs, ValueKind};

/// Id of the `--config` argument, which is not part of the option schema.
const CONFIG_ARG: &str = "config";

/// Packager CLI - development server for JS bundles
#[derive(Parser)]
#[command(name = "packager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Starts the webserver
    Start(StartArgs),
}

/// Flags of `packager start`.
///
/// The flags are generated from [`start_options`]. Values are kept as raw
/// text; typing and defaults are applied by the option resolver.
#[derive(Debug, Clone, Default)]
pub struct StartArgs {
    raw: RawArgs,
    /// Project config file (defaults to packager.config.json in the project root)
    pub config: Option<PathBuf>,
}

impl StartArgs {
    /// Raw values keyed by option name, for the options actually given.
    pub fn raw_args(&self) -> &RawArgs {
        &self.raw
    }

    pub fn verbose(&self) -> bool {
        self.raw.contains_key("verbose")
    }
}

/// One clap argument per schema entry, with the entry's name as id.
fn schema_args(schema: &[OptionSpec]) -> Vec<Arg> {
    schema
        .iter()
        .map(|spec| {
            let mut long_names = spec.long_names().into_iter();
            let mut arg = Arg::new(spec.name).help(spec.description);
            if let Some(primary) = long_names.next() {
                arg = arg.long(primary);
            }
            for alias in long_names {
                arg = arg.alias(alias);
            }

            if spec.value_kind == ValueKind::Boolean {
                arg.action(ArgAction::SetTrue)
            } else {
                arg.action(ArgAction::Set)
                    .value_name(spec.value_kind.placeholder())
            }
        })
        .collect()
}

/// Collect the raw text of every schema option present in `matches`.
///
/// Flags that were given are recorded as `"true"`.
fn raw_args_from(matches: &ArgMatches, schema: &[OptionSpec]) -> RawArgs {
    let mut raw = RawArgs::new();

    for spec in schema {
        if spec.value_kind == ValueKind::Boolean {
            if matches.get_flag(spec.name) {
                raw.insert(spec.name.to_string(), "true".to_string());
            }
        } else if let Some(value) = matches.get_one::<String>(spec.name) {
            raw.insert(spec.name.to_string(), value.clone());
        }
    }

    raw
}

impl Args for StartArgs {
    fn augment_args(cmd: Command) -> Command {
        cmd.args_override_self(true)
            .args(schema_args(&start_options()))
            .arg(
                Arg::new(CONFIG_ARG)
                    .long(CONFIG_ARG)
                    .value_name("PATH")
                    .value_parser(clap::value_parser!(PathBuf))
                    .help("Project config file (defaults to packager.config.json in the project root)"),
            )
    }

    fn augment_args_for_update(cmd: Command) -> Command {
        Self::augment_args(cmd)
    }
}

impl FromArgMatches for StartArgs {
    fn from_arg_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        Ok(Self {
            raw: raw_args_from(matches, &start_options()),
            config: matches.get_one::<PathBuf>(CONFIG_ARG).cloned(),
        })
    }

    fn update_from_arg_matches(&mut self, matches: &ArgMatches) -> Result<(), clap::Error> {
        *self = Self::from_arg_matches(matches)?;
        Ok(())
    }
}
