//! Maintenance tasks for the gitver workspace.
//!
//! Man pages and shell completions are generated from the `gitver` clap
//! definition, so they never drift from the actual flags. Paths are relative
//! to the workspace root.

#![deny(unsafe_code)]

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "xtask")]
#[command(about = "gitver workspace tasks")]
struct Xtask {
    #[command(subcommand)]
    command: Task,
}

#[derive(Subcommand, Debug)]
enum Task {
    /// Write shell completion scripts for gitver.
    Completions(commands::completions::CompletionsArgs),

    /// Write gitver.1 and one page per subcommand.
    Man(commands::man::ManArgs),

    /// Write man pages and completions for every shell under dist/share.
    Dist,
}

fn main() -> Result<(), String> {
    let root = workspace_root();
    let written = match Xtask::parse().command {
        Task::Completions(args) => commands::completions::write(&root.join(args.out_dir), args.shell)?,
        Task::Man(args) => commands::man::write(&root.join(args.out_dir))?,
        Task::Dist => {
            let share = root.join("dist").join("share");
            let mut written = commands::man::write(&share.join("man").join("man1"))?;
            written.extend(commands::completions::write(&share.join("completions"), None)?);
            written
        }
    };
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir.parent().unwrap_or(&manifest_dir).to_path_buf()
}
