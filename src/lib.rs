pub mod encoder;
pub mod gemini;
pub mod prompt;
pub mod render;
pub mod settings;
pub mod studio;
pub mod ticker;
pub mod utils;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::encoder::SelectedFile;
use crate::gemini::GeminiClient;
use crate::settings::{load_settings_from_dir, save_settings_to_dir, settings_path};
use crate::studio::{Selection, Studio};
use crate::utils::{config_dir, ensure_data_dir, init_tracing};

#[derive(Debug, Parser)]
#[command(
    name = "everskies",
    version,
    about = "Turn a character illustration into an Everskies-style pixel doll"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send an image through the style transfer and save the result
    Convert(ConvertArgs),
    /// Inspect or change saved settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Character illustration (JPG, PNG, WebP, ...)
    pub image: PathBuf,

    /// Directory to save the generated image into
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Show the result without saving it
    #[arg(long)]
    pub no_save: bool,

    /// Gemini API key, overriding the environment and settings
    #[arg(long)]
    pub api_key: Option<String>,

    /// Gemini model id
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Print current settings with the key redacted
    Show,
    /// Print the settings file location
    Path,
    /// Update one or more settings
    Set {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

// ===== Commands =====

async fn convert(args: ConvertArgs, config_dir: &Path) -> Result<()> {
    let settings = load_settings_from_dir(config_dir);
    let config = settings.resolve(args.api_key, args.model, |k| std::env::var(k).ok());
    info!(model = %config.model, "using gemini model");

    let mut studio = Studio::new(Arc::new(GeminiClient::new(config)));
    println!("{}\n", render::header());

    let file = SelectedFile::from_path(&args.image).await;
    match studio.select_file(file).await {
        Selection::Ready => {}
        Selection::Ignored => {
            warn!(path = %args.image.display(), "not an image file, nothing to do");
            println!("{}", render::upload_panel(None));
            return Ok(());
        }
        Selection::ReadFailed => {
            if let Some(banner) = render::error_banner(studio.state()) {
                eprintln!("{banner}");
            }
            bail!("could not read {}", args.image.display());
        }
    }
    println!("{}\n", render::upload_panel(studio.input()));

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.magenta} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));

    studio
        .generate(|state| spinner.set_message(state.status_message.clone()))
        .await;
    spinner.finish_and_clear();

    println!("{}\n", render::result_panel(studio.state()));
    if let Some(banner) = render::error_banner(studio.state()) {
        eprintln!("{banner}");
        bail!("generation failed");
    }

    if !args.no_save {
        let out = match args.out.or(settings.output_dir) {
            Some(dir) => dir,
            None => std::env::current_dir().context("resolve current dir")?,
        };
        let path = studio.download(&out).await?;
        println!("Saved {}", path.display());
    }
    println!("\n{}", render::style_guide());
    Ok(())
}

fn settings_cmd(cmd: SettingsCommand, config_dir: &Path) -> Result<()> {
    match cmd {
        SettingsCommand::Show => {
            let s = load_settings_from_dir(config_dir);
            println!("{}", serde_json::to_string_pretty(&s.redacted())?);
        }
        SettingsCommand::Path => {
            println!("{}", settings_path(config_dir).display());
        }
        SettingsCommand::Set {
            api_key,
            model,
            base_url,
            output_dir,
        } => {
            let mut s = load_settings_from_dir(config_dir);
            if api_key.is_some() {
                s.gemini_api_key = api_key;
            }
            if model.is_some() {
                s.gemini_model = model;
            }
            if base_url.is_some() {
                s.gemini_base_url = base_url;
            }
            if output_dir.is_some() {
                s.output_dir = output_dir;
            }
            save_settings_to_dir(config_dir, &s)?;
            info!(path = %settings_path(config_dir).display(), "settings saved");
        }
    }
    Ok(())
}

// ===== Startup and Main =====

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = ensure_data_dir()?;
    let _log_guard = init_tracing(&data_dir)?;
    let config_dir = config_dir()?;

    match cli.command {
        Command::Convert(args) => {
            let rt = tokio::runtime::Runtime::new().context("start tokio runtime")?;
            rt.block_on(convert(args, &config_dir))
        }
        Command::Settings(cmd) => settings_cmd(cmd, &config_dir),
    }
}
