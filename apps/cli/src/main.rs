mod progress;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use packbox::{
    Detector, Installer, IntoProgressCallback, Loader, LoaderMeta, Manifest, PackboxConfig,
    PackboxError, Source, MANIFEST_FILE_NAME,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::progress::{DetectProgress, InstallProgress};

const TOKEN_FILE_NAME: &str = ".curseforge";

#[derive(Parser)]
#[command(name = "packbox", version, about = "Record and reinstall Minecraft modpacks")]
struct Cli {
    /// Pack root containing the manifest and content folders
    #[arg(short = 'C', long = "dir", default_value = ".", global = true)]
    dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Files resolved or downloaded at once
    #[arg(short = 'j', long = "jobs", default_value_t = 1, global = true)]
    jobs: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new manifest file
    Init {
        #[arg(long)]
        name: String,
        #[arg(long)]
        author: String,
        /// Pack version
        #[arg(long)]
        version: String,
        #[arg(long)]
        loader: Loader,
        /// Minecraft version
        #[arg(long)]
        minecraft: String,
        #[arg(long)]
        loader_version: String,
        /// Primary source: modrinth or curseforge
        #[arg(long)]
        source: Source,
        /// Fallback source, or none
        #[arg(long, default_value = "none")]
        fallback: Source,
    },
    /// Resolve files in pack folders and record them in the manifest
    Detect {
        /// Folders to scan: mods, resourcepacks, shaderpacks
        #[arg(short = 'f', long = "folders", value_delimiter = ',', default_value = "mods")]
        folders: Vec<String>,
    },
    /// Download every file recorded in the manifest
    Install,
    /// List Minecraft versions, or loader versions for one Minecraft version
    Versions {
        loader: Loader,
        #[arg(long)]
        minecraft: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<PackboxError>() {
                Some(packbox_err) => {
                    eprintln!("Error: {}", packbox_err);
                    if let Some(suggestion) = packbox_err.suggestion() {
                        eprintln!("Hint: {}", suggestion);
                    }
                }
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "info,packbox=debug" } else { "warn,packbox=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let manifest_path = cli.dir.join(MANIFEST_FILE_NAME);

    match cli.command {
        Command::Init {
            name,
            author,
            version,
            loader,
            minecraft,
            loader_version,
            source,
            fallback,
        } => {
            let manifest = Manifest::new(
                name,
                author,
                version,
                loader,
                minecraft,
                loader_version,
                source,
                fallback,
            );
            manifest.validate()?;
            if manifest_path.exists() {
                warn!("Overwriting existing manifest {}", manifest_path.display());
            }
            manifest.save(&manifest_path)?;
            println!("Manifest file created: {}", manifest_path.display());
        }
        Command::Detect { folders } => {
            let manifest = Manifest::load(&manifest_path)?;
            let config = load_config(&cli.dir, cli.jobs)?;
            if folders.is_empty() {
                println!("No folders selected");
                return Ok(());
            }

            let detector = Detector::new(config, &cli.dir);
            let report = detector
                .detect(&manifest, folders.as_slice(), Some(DetectProgress.into_callback()))
                .await?;

            println!(
                "Detection complete: {} matched, {} not found",
                report.matched,
                report.unresolved.len()
            );
            for path in &report.unresolved {
                println!("  not found: {}", path);
            }
        }
        Command::Install => {
            let manifest = Manifest::load(&manifest_path)?;
            let config = load_config(&cli.dir, cli.jobs)?;
            println!("Installing files from manifest file");

            let progress = InstallProgress::new(manifest.mods.len());
            let installer = Installer::new(config, &cli.dir)?;
            let report = installer
                .install(&manifest, Some(progress.clone().into_callback()))
                .await;
            progress.finish(format!("{} failed", report.failed()));

            println!(
                "Installation complete: {}/{} mods installed",
                report.processed(),
                report.total
            );
        }
        Command::Versions { loader, minecraft } => {
            let config = PackboxConfig::from_env()?;
            let meta = LoaderMeta::new(&config)?;
            let versions = match minecraft.as_deref() {
                Some(minecraft) => meta.loader_versions(loader, minecraft).await?,
                None => meta.minecraft_versions(loader).await?,
            };
            for version in versions {
                println!("{}", version);
            }
        }
    }

    Ok(())
}

/// Environment configuration, with the pack's token file taking precedence for the CurseForge key
fn load_config(root: &Path, jobs: usize) -> Result<PackboxConfig> {
    let mut config = PackboxConfig::from_env()?.with_max_concurrent(jobs);
    if let Some(token) = read_token_file(root)? {
        debug!("Using CurseForge API key from {}", TOKEN_FILE_NAME);
        config = config.with_curseforge_api_key(token);
    }
    Ok(config)
}

fn read_token_file(root: &Path) -> Result<Option<String>> {
    let path = root.join(TOKEN_FILE_NAME);
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            let token = contents.trim();
            Ok((!token.is_empty()).then(|| token.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detect_folders() {
        let cli = Cli::try_parse_from(["packbox", "-C", "pack", "detect", "-f", "mods,shaderpacks"]).unwrap();
        assert_eq!(cli.dir, PathBuf::from("pack"));
        match cli.command {
            Command::Detect { folders } => assert_eq!(folders, vec!["mods", "shaderpacks"]),
            _ => panic!("Expected detect"),
        }
    }

    #[test]
    fn test_detect_folders_with_spaces_are_trimmed() {
        let cli = Cli::try_parse_from(["packbox", "detect", "-f", "mods, shaderpacks"]).unwrap();
        match cli.command {
            Command::Detect { folders } => {
                let folders = packbox::detect::normalize_folders(&folders).unwrap();
                assert_eq!(folders, vec!["mods", "shaderpacks"]);
            }
            _ => panic!("Expected detect"),
        }
    }

    #[test]
    fn test_parse_init_defaults_fallback_to_none() {
        let cli = Cli::try_parse_from([
            "packbox", "init", "--name", "Pack", "--author", "me", "--version", "1.0",
            "--loader", "fabric", "--minecraft", "1.20.1", "--loader-version", "0.15.11",
            "--source", "modrinth",
        ])
        .unwrap();
        match cli.command {
            Command::Init { loader, source, fallback, .. } => {
                assert_eq!(loader, Loader::Fabric);
                assert_eq!(source, Source::Modrinth);
                assert_eq!(fallback, Source::None);
            }
            _ => panic!("Expected init"),
        }
    }

    #[test]
    fn test_token_file_is_trimmed_and_optional() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_token_file(dir.path()).unwrap(), None);

        std::fs::write(dir.path().join(TOKEN_FILE_NAME), "  secret-key\n").unwrap();
        assert_eq!(read_token_file(dir.path()).unwrap(), Some("secret-key".to_string()));
    }
}
