//! Point d'entrée CLI pour zonage

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use zonage_cli::Config;

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Résoudre une sélection de zones de livraison et compter les clients par chauffeur
#[derive(Parser)]
#[command(name = "zonage")]
#[command(author, version)]
#[command(about = "Résoudre une sélection de zones (base, quadrant, sous-quadrant) et attribuer les clients")]
#[command(long_about = "Applique une sélection de zones de livraison : une sélection plus fine masque ses ancêtres, une sélection vide affiche tout.\n\nLes clients sont attribués aux zones sélectionnées puis comptés par chauffeur.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Fichier de configuration JSON (défaut : env ZONAGE_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Apply {
            report,
            export,
            drivers_export,
        } => {
            let config = Config::resolve(cli.config.as_deref())?;
            info!("Applying selection");
            cli::cmd_apply(
                config,
                report.as_deref(),
                export.as_deref(),
                drivers_export.as_deref(),
            )
            .await?;
        }
        Commands::Watch {
            interval,
            report,
            export,
        } => {
            let config = Config::resolve(cli.config.as_deref())?;
            cli::cmd_watch(config, interval, report.as_deref(), export.as_deref()).await?;
        }
        Commands::Batch { input, output } => {
            let config = Config::resolve(cli.config.as_deref())?;
            info!(input = %input.display(), output = %output.display(), "Batch");
            cli::cmd_batch(config, &input, &output).await?;
        }
        Commands::Normalize { keys } => cli::cmd_normalize(&keys),
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
