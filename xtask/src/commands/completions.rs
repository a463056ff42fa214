use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use clap_complete::{Shell, generate_to};

const SHELLS: [Shell; 4] = [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell];

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Output directory
    #[arg(long = "out-dir", default_value = "dist/share/completions")]
    pub out_dir: PathBuf,

    /// Only this shell (default: bash, zsh, fish and powershell)
    #[arg(long, value_enum)]
    pub shell: Option<Shell>,
}

/// Generate completion scripts into `out_dir`, returning the files written.
pub fn write(out_dir: &Path, shell: Option<Shell>) -> Result<Vec<PathBuf>, String> {
    fs::create_dir_all(out_dir).map_err(|e| format!("{}: {e}", out_dir.display()))?;

    let mut cmd = gitver::command();
    let shells = shell.map_or_else(|| SHELLS.to_vec(), |s| vec![s]);
    shells
        .into_iter()
        .map(|shell| {
            generate_to(shell, &mut cmd, "gitver", out_dir)
                .map_err(|e| format!("generate {shell} completions: {e}"))
        })
        .collect()
}
