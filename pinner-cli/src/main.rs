//! ipfs-pinner CLI
//!
//! Pins files, directories or existing CIDs to an IPFS pinning service.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use colored::*;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ipfs_pinner::{Config, Pinner};
use pinner_core::types::is_cid;

/// Pin files or directories to IPFS
#[derive(Parser, Debug)]
#[command(name = "ipfs-pinner")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// IPFS pinner: infura, pinata, nftstorage, web3storage or fleek
    #[arg(short = 't', long = "target", default_value = "infura")]
    target: String,

    /// Pinner apikey or username
    #[arg(short = 'u', long = "apikey")]
    apikey: Option<String>,

    /// Pinner secret or password
    #[arg(short = 'p', long = "secret")]
    secret: Option<String>,

    /// Base URL replacing the pinner's public API
    #[arg(long, env = "IPFS_PINNER_ENDPOINT")]
    endpoint: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Files, directories or CIDs to pin
    #[arg(required = true, value_name = "PATH|CID")]
    paths: Vec<String>,
}

/// One command-line argument, classified.
#[derive(Debug, PartialEq, Eq)]
struct Target {
    arg: String,
    is_cid: bool,
}

impl Target {
    fn new(arg: String) -> Self {
        let is_cid = is_cid(&arg);
        Self { arg, is_cid }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "ipfs_pinner=debug,pinner_services=debug,pinner_http=debug,pinner_file=debug,warn"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {:#}", "ipfs-pinner:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Pins every argument; returns false if any of them failed.
async fn run(cli: Cli) -> Result<bool> {
    let pinner: Pinner = cli.target.parse()?;
    let cfg = config(pinner, cli.apikey, cli.secret, cli.endpoint, |name| std::env::var(name).ok())?;
    debug!(?cfg, "Configured");

    let targets: Vec<Target> = cli.paths.into_iter().map(Target::new).collect();
    must_exist(&targets)?;

    let mut ok = true;
    for target in &targets {
        let result = if target.is_cid {
            cfg.pin_hash(&target.arg).await
        } else {
            cfg.pin(target.arg.as_str()).await
        };

        match result {
            Ok(cid) => println!("{}  {}", cid.green(), target.arg),
            Err(e) => {
                eprintln!("{} {}", "ipfs-pinner:".red().bold(), e);
                ok = false;
            }
        }
    }
    Ok(ok)
}

/// Builds the configuration, falling back to `IPFS_PINNER_<NAME>_*` variables.
fn config(
    pinner: Pinner,
    apikey: Option<String>,
    secret: Option<String>,
    endpoint: Option<String>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let apikey = apikey
        .filter(|v| !v.is_empty())
        .or_else(|| env(&pinner.api_key_env()))
        .unwrap_or_default();
    let secret = secret
        .filter(|v| !v.is_empty())
        .or_else(|| env(&pinner.secret_env()))
        .unwrap_or_default();

    match pinner {
        Pinner::NftStorage if apikey.is_empty() => bail!("{} requires an apikey", pinner),
        Pinner::Fleek if apikey.is_empty() || secret.is_empty() => {
            bail!("{} requires an apikey and a secret", pinner)
        }
        _ => {}
    }

    let mut cfg = Config::new(pinner.as_str(), apikey, secret);
    if let Some(endpoint) = endpoint {
        cfg = cfg.with_endpoint(endpoint);
    }
    Ok(cfg)
}

/// Fails listing every path argument that does not exist.
fn must_exist(targets: &[Target]) -> Result<()> {
    let missing: Vec<&str> = targets
        .iter()
        .filter(|t| !t.is_cid && std::fs::symlink_metadata(Path::new(&t.arg)).is_err())
        .map(|t| t.arg.as_str())
        .collect();

    if !missing.is_empty() {
        bail!("no such file or directory: {}", missing.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_classify_arguments() {
        assert!(Target::new(CID.to_string()).is_cid);
        assert!(!Target::new("./site".to_string()).is_cid);
    }

    #[test]
    fn test_env_fallback() {
        let cfg = config(
            Pinner::Pinata,
            None,
            None,
            None,
            env(&[
                ("IPFS_PINNER_PINATA_API_KEY", "env-key"),
                ("IPFS_PINNER_PINATA_SECRET_API_KEY", "env-secret"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.apikey, "env-key");
        assert_eq!(cfg.secret, "env-secret");
    }

    #[test]
    fn test_flags_beat_env() {
        let cfg = config(
            Pinner::Pinata,
            Some("flag-key".into()),
            None,
            Some("http://localhost:1".into()),
            env(&[("IPFS_PINNER_PINATA_API_KEY", "env-key")]),
        )
        .unwrap();
        assert_eq!(cfg.apikey, "flag-key");
        assert_eq!(cfg.endpoint.as_deref(), Some("http://localhost:1"));
    }

    #[test]
    fn test_required_credentials() {
        assert!(config(Pinner::NftStorage, None, None, None, env(&[])).is_err());
        assert!(config(Pinner::Fleek, Some("k".into()), None, None, env(&[])).is_err());
        assert!(config(Pinner::Infura, None, None, None, env(&[])).is_ok());
    }

    #[test]
    fn test_must_exist() {
        let dir = std::env::temp_dir();
        let present = Target::new(dir.to_string_lossy().into_owned());
        let cid = Target::new(CID.to_string());
        assert!(must_exist(&[present, cid]).is_ok());

        let missing = Target::new("/definitely/not/here".to_string());
        let err = must_exist(&[missing]).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here"));
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["ipfs-pinner", "-t", "pinata", "-u", "k", "-p", "s", "a.txt", CID]).unwrap();
        assert_eq!(cli.target, "pinata");
        assert_eq!(cli.paths.len(), 2);
        assert!(Cli::try_parse_from(["ipfs-pinner"]).is_err());
    }
}
