//! gitver CLI
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use gitver::{Cli, Session};

mod logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.color.apply();

    let session = Session::from_cli(&cli)?;
    let settings = logging::LogSettings::resolve(&session.config, cli.quiet, cli.verbose, cli.color);
    let _guard = logging::init(&settings).context("failed to initialize logging")?;

    let span = tracing::info_span!("gitver", command = cli.command.name(), repo = %session.cwd);
    let _entered = span.enter();
    tracing::debug!(
        sources = ?session.config_sources,
        sink = ?settings.sink,
        filter = %settings.filter,
        "session ready"
    );

    cli.command
        .run(&session)
        .inspect_err(|err| tracing::error!(error = %err, "command failed"))
}
