//! Attune CLI Binary
//!
//! Thin process wrapper around the reconciliation engine: parse a
//! declaration manifest, wire the default adapters, run one sync pass,
//! print the report.

use anyhow::Context;
use attune::avatar::FsAvatarStore;
use attune::content::ContentResolver;
use attune::declaration::AgentDeclaration;
use attune::secrets::AgeCipher;
use attune::settings::SettingsLoader;
use attune::store::SledStore;
use attune::validate;
use attune::Syncer;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "attune", about = "Declarative agent reconciliation", version)]
struct Cli {
    /// Engine settings file (TOML); ATTUNE_* env vars overlay it
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile the store against a declaration manifest
    Sync {
        /// YAML document with a top-level `agents:` list
        manifest: PathBuf,
    },
    /// Validate a manifest without touching the store
    Check { manifest: PathBuf },
}

#[derive(serde::Deserialize)]
struct Manifest {
    #[serde(default)]
    agents: Vec<AgentDeclaration>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    attune::logging::init_logging(None)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;
    let settings = SettingsLoader::load(cli.settings.as_deref())
        .context("failed to load settings")?;

    match cli.command {
        Command::Check { manifest } => {
            let declared = load_manifest(&manifest)?;
            let mut invalid = 0;
            for decl in &declared {
                let report = validate::validate_agent(decl);
                for error in &report.errors {
                    eprintln!("{}: {}", decl.id, error);
                }
                if !report.is_valid() {
                    invalid += 1;
                }
            }
            if invalid > 0 {
                anyhow::bail!("{} of {} agent declarations invalid", invalid, declared.len());
            }
            println!("{} agent declarations valid", declared.len());
        }
        Command::Sync { manifest } => {
            let declared = load_manifest(&manifest)?;
            let base_dir = match settings.base_dir.clone() {
                Some(dir) => dir,
                None => manifest_dir(&manifest)?,
            };
            let passphrase = std::env::var("ATTUNE_PASSPHRASE")
                .context("ATTUNE_PASSPHRASE must be set to encrypt action credentials")?;

            let store = Arc::new(SledStore::open(&settings.data_dir)?);
            let syncer = Syncer::new(
                ContentResolver::new(base_dir),
                store.clone(),
                store.clone(),
                Arc::new(AgeCipher::new(passphrase)),
                Arc::new(FsAvatarStore::new(&settings.avatar_dir)),
            )
            .with_max_instructions_len(settings.max_instructions_len);

            let report = syncer.sync(&declared);
            store.flush()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.success {
                anyhow::bail!("sync completed with {} error(s)", report.errors.len());
            }
        }
    }
    Ok(())
}

fn load_manifest(path: &Path) -> anyhow::Result<Vec<AgentDeclaration>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: Manifest = serde_yaml::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(manifest.agents)
}

fn manifest_dir(manifest: &Path) -> anyhow::Result<PathBuf> {
    match manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => std::env::current_dir().context("failed to get current directory"),
    }
}
