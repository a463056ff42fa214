//! Config command — show the effective configuration.

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tracing::{debug, instrument};

use gitver_core::branch_config::BranchConfigurationResolver;
use gitver_core::repository::Branch;

use crate::Session;

/// Arguments for the `config` subcommand.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Show the configuration resolved for BRANCH instead
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: Option<String>,
}

/// Print the merged configuration as YAML, or JSON with `--json`.
#[instrument(name = "cmd_config", skip_all, fields(branch = args.branch.as_deref()))]
pub fn cmd_config(args: ConfigArgs, session: &Session) -> anyhow::Result<()> {
    debug!(sources = ?session.config_sources, "executing config command");

    let output = match args.branch {
        Some(name) => {
            let resolver = BranchConfigurationResolver::new(&session.config).context("invalid configuration")?;
            let branch = Branch {
                name,
                tip: None,
                is_remote: false,
            };
            let effective = resolver.resolve(&branch)?;
            render(&effective, session.json)?
        }
        None => render(&session.config, session.json)?,
    };
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn render<T: Serialize>(value: &T, json: bool) -> anyhow::Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_saphyr::to_string(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitver_core::Config;

    #[test]
    fn yaml_contains_branches() {
        let yaml = render(&Config::default(), false).unwrap();
        assert!(yaml.contains("branches:"));
        assert!(yaml.contains("develop:"));
    }

    #[test]
    fn json_is_parseable() {
        let json = render(&Config::default(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["mode"], "continuous-delivery");
    }

    #[test]
    fn branch_configuration_resolves() {
        let args = ConfigArgs {
            branch: Some("release/2.0".into()),
        };
        let session = Session {
            json: true,
            ..Session::new("/tmp", Config::default())
        };
        assert!(cmd_config(args, &session).is_ok());
    }
}
