mod cmd;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use skbuild_lib::build::BuildError;
use tracing_subscriber::EnvFilter;

use crate::output::{OutputFormat, print_error};

/// skb - per-architecture build orchestrator for SK-Build projects
#[derive(Parser)]
#[command(name = "skb")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build a target of the project in the current directory
  Build {
    /// Name of the target to build
    #[arg(short, long, default_value = "none")]
    target: String,
  },

  /// Remove object, output and temporary directories
  Clean,

  /// Read or change plugin configuration
  Config {
    #[command(subcommand)]
    action: ConfigAction,
  },

  /// Show the current project and its targets
  Info,
}

#[derive(Subcommand)]
enum ConfigAction {
  /// Print the value of PLUGIN.FIELD
  Get { key: String },

  /// Set PLUGIN.FIELD to VALUE and save the plugin's config
  Set { key: String, value: String },

  /// List every plugin field and its value
  List,
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let result = match cli.command {
    Commands::Build { target } => cmd::cmd_build(&target, cli.output),
    Commands::Clean => cmd::cmd_clean(),
    Commands::Config { action } => match action {
      ConfigAction::Get { key } => cmd::cmd_config_get(&key),
      ConfigAction::Set { key, value } => cmd::cmd_config_set(&key, &value),
      ConfigAction::List => cmd::cmd_config_list(cli.output),
    },
    Commands::Info => cmd::cmd_info(cli.output),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{e:#}"));
      let code = e.downcast_ref::<BuildError>().map_or(1, BuildError::exit_code);
      ExitCode::from(u8::try_from(code).unwrap_or(1))
    }
  }
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .without_time()
    .init();
}
