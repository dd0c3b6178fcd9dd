pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod planner;
pub mod record;
pub mod render;
pub mod rollover;
pub mod session;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting planner CLI"
  );

  let mut cfg = config::Config::load(
    cli.plannerrc.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    datastore::DataStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open datastore at \
         {}",
        data_dir.display()
      )
    })?;
  let planner =
    planner::PlannerStore::load(store)?;

  let command = match cli.command {
    | Some(command) => command,
    | None => {
      cli::Command::from_default_name(
        &cfg.default_command()
      )?
    }
  };
  debug!(command = command.name(), "resolved command");

  let renderer =
    render::Renderer::new(&cfg)?;
  let mut session =
    session::Session::new(
      cfg, planner, cli.today
    )?;

  if command != cli::Command::Rollover {
    session.start()?;
  }

  commands::dispatch(
    &mut session,
    &renderer,
    command
  )?;

  info!("done");
  Ok(())
}
