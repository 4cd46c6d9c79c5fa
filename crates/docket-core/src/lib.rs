pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod engine;
pub mod error;
pub mod ids;
pub mod progress;
pub mod recurrence;
pub mod render;
pub mod shared;
pub mod task;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use datastore::{
  BlobStore,
  MemoryStore,
  TaskStore
};
pub use datetime::Due;
pub use engine::{
  TaskEngine,
  ToggleOutcome
};
pub use error::{
  SchedulingError,
  TaskError,
  ValidationError
};
pub use ids::{
  IdProvider,
  SequentialIds,
  UuidIds
};
pub use progress::{
  StepProgress,
  compute_progress
};
pub use recurrence::next_occurrence;
pub use shared::SharedEngine;
pub use task::{
  Importance,
  Recurrence,
  RecurrenceInput,
  Step,
  Task,
  TaskDraft
};
pub use view::{
  ImportanceFilter,
  ViewQuery,
  visible
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
    "starting docket"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.docketrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
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

  let store = BlobStore::open(&data_dir)
    .with_context(|| {
      format!(
        "failed to open task store at \
         {}",
        data_dir.display()
      )
    })?;
  let mut engine =
    TaskEngine::open(store, UuidIds);

  let renderer =
    render::Renderer::new(&cfg)?;
  let command = cli.command.unwrap_or(
    cli::Command::List(
      cli::ListArgs::default()
    )
  );
  let now =
    chrono::Local::now().naive_local();

  commands::dispatch(
    &mut engine,
    &cfg,
    &renderer,
    command,
    now
  )?;

  info!("done");
  Ok(())
}
