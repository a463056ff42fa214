use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;

#[derive(Args, Debug)]
pub struct ManArgs {
    /// Output directory
    #[arg(long = "out-dir", default_value = "dist/share/man/man1")]
    pub out_dir: PathBuf,
}

/// Render `gitver.1` plus `gitver-<subcommand>.1` pages into `out_dir`.
pub fn write(out_dir: &Path) -> Result<Vec<PathBuf>, String> {
    fs::create_dir_all(out_dir).map_err(|e| format!("{}: {e}", out_dir.display()))?;

    let cmd = gitver::command();
    let mut pages = vec![("gitver".to_string(), cmd.clone())];
    pages.extend(
        cmd.get_subcommands()
            .filter(|sub| !sub.is_hide_set())
            .map(|sub| {
                let name = format!("gitver-{}", sub.get_name());
                (name.clone(), sub.clone().bin_name(name))
            }),
    );

    pages
        .into_iter()
        .map(|(name, page)| {
            let mut buffer = Vec::new();
            clap_mangen::Man::new(page)
                .render(&mut buffer)
                .map_err(|e| format!("render {name}.1: {e}"))?;
            let path = out_dir.join(format!("{name}.1"));
            fs::write(&path, buffer).map_err(|e| format!("{}: {e}", path.display()))?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_root_and_subcommand_pages() {
        let tmp = tempfile::TempDir::new().unwrap();
        let written = write(tmp.path()).unwrap();
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            ["gitver.1", "gitver-calculate.1", "gitver-config.1", "gitver-doctor.1", "gitver-info.1"]
        );
        let root = fs::read_to_string(&written[0]).unwrap();
        assert!(root.contains("calculate"));
    }
}
