use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use session_state::config::{self, mutate_config, read_config, SessionConfig};
use session_state::SessionState;

#[derive(Parser, Debug)]
#[command(name = "session-state", about = "Inspect and edit persisted UI session state")]
struct Cli {
    /// Document store directory (overrides the config file)
    #[arg(long, global = true, value_name = "DIR")]
    store_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a session document, creating the default if it is missing
    Show {
        #[arg(value_enum)]
        document: DocumentKind,
    },
    /// Print or change the user settings stored in the app state
    Settings {
        #[arg(long)]
        theme: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        font_size: Option<String>,
        #[arg(long)]
        storage_path: Option<String>,
    },
    /// Print or change the session configuration file
    Config {
        #[arg(long)]
        debounce_ms: Option<u64>,
        #[arg(long, value_name = "DIR")]
        directory: Option<String>,
    },
    /// Print the config file and store directory in effect
    Paths,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DocumentKind {
    AppState,
    Layout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = read_config();
    if let Some(dir) = &cli.store_dir {
        config.store.directory = Some(dir.display().to_string());
    }

    match cli.command {
        Commands::Show { document } => {
            let session = SessionState::open(&config);
            match document {
                DocumentKind::AppState => print_json(&session.app_state.get_app_state().await?)?,
                DocumentKind::Layout => print_json(&session.layout.get_layout().await?)?,
            }
        }
        Commands::Settings {
            theme,
            language,
            font_size,
            storage_path,
        } => {
            let session = SessionState::open(&config);
            let mut state = session.app_state.get_app_state().await?;
            let changes = [
                (theme, &mut state.settings.theme),
                (language, &mut state.settings.language),
                (font_size, &mut state.settings.font_size),
                (storage_path, &mut state.settings.storage_path),
            ];
            let mut changed = false;
            for (value, field) in changes {
                if let Some(value) = value {
                    *field = value;
                    changed = true;
                }
            }

            if changed {
                state = session
                    .app_state
                    .write_app_state(state)
                    .await
                    .context("failed to save settings")?;
            }
            print_json(&state.settings)?;
        }
        Commands::Config {
            debounce_ms,
            directory,
        } => {
            if debounce_ms.is_some() || directory.is_some() {
                mutate_config(|config| {
                    if let Some(ms) = debounce_ms {
                        config.persistence.debounce_ms = ms;
                    }
                    if let Some(dir) = directory {
                        config.store.directory = Some(dir);
                    }
                });
            }
            print!("{}", serde_yaml::to_string(&read_config())?);
        }
        Commands::Paths => print_paths(&config),
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_paths(config: &SessionConfig) {
    println!("config: {}", config::config_file_path().display());
    println!("store:  {}", config.store_dir().display());
}
