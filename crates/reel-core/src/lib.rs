pub mod cli;
pub mod commands;
pub mod config;
pub mod render;
pub mod shared;
pub mod store;
pub mod task;

use std::ffi::OsString;
use std::io::{
  self,
  IsTerminal,
  Write
};

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
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting reel"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.reelrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .iter()
        .map(|kv| {
          (
            kv.key.clone(),
            kv.value.clone()
          )
        })
    )
  );

  let renderer =
    render::Renderer::new(&cfg)?;
  let mut store =
    build_store(&cli, &cfg);

  let stdin = io::stdin();
  let prompt = stdin
    .is_terminal()
    .then(|| cfg.prompt());

  let stdout = io::stdout();
  let mut out = stdout.lock();
  commands::run_startup(
    &mut store,
    &renderer,
    &cli.initial_lines(),
    cli.batch,
    stdin.lock(),
    &mut out,
    prompt.as_deref()
  )?;

  finish(&mut out)
}

/// A fresh store, with the demo movies
/// when `--demo` or `demo.seed` asks.
pub fn build_store(
  cli: &cli::GlobalCli,
  cfg: &config::Config
) -> store::TaskStore {
  let mut store =
    store::TaskStore::new();
  if cli.demo || cfg.seed_demo() {
    debug!("seeding demo movies");
    store.seed_demo();
  }
  store
}

fn finish<W: Write>(
  out: &mut W
) -> anyhow::Result<()> {
  out
    .flush()
    .context("failed to flush stdout")?;
  info!("done");
  Ok(())
}
