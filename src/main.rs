// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use ytaisub::app_config::{self, Config, TranslationProvider};
use ytaisub::app_controller::{Controller, RunOptions};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Google,
    Ollama,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Google => TranslationProvider::Google,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download a video, transcribe it and translate the subtitles
    Run {
        /// Video URL (anything yt-dlp understands)
        #[arg(value_name = "URL")]
        url: String,

        /// Stop after writing the source-language subtitles
        #[arg(long)]
        no_translate: bool,

        /// Prefer subtitles published by the platform over speech recognition
        #[arg(long)]
        platform_subtitles: bool,

        /// Directory for downloads and generated files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Transcribe a local audio file into an SRT file
    Transcribe {
        /// Audio file to transcribe
        #[arg(value_name = "AUDIO")]
        audio: PathBuf,

        /// Directory for the generated SRT file (defaults to the audio's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Translate an existing SRT file into a sibling file
    Translate {
        /// SRT file to translate
        #[arg(value_name = "SRT")]
        srt: PathBuf,
    },

    /// Generate shell completions for ytaisub
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// ytaisub - subtitles for online videos, transcribed and translated
#[derive(Parser, Debug)]
#[command(name = "ytaisub")]
#[command(version)]
#[command(about = "Generate and translate subtitles for online videos")]
#[command(long_about = "ytaisub downloads a video, recognizes its speech, writes an SRT file and
translates it into another language, keeping index and timing lines intact.

EXAMPLES:
    ytaisub run https://youtu.be/VIDEO_ID                 # Full pipeline with conf.json
    ytaisub -s en -t de run https://youtu.be/VIDEO_ID     # English to German
    ytaisub run --platform-subtitles https://youtu.be/ID  # Reuse published subtitles
    ytaisub transcribe talk.mp3                           # Audio to SRT only
    ytaisub -p ollama -m llama3.2:3b translate talk.srt   # Translate with a local LLM
    ytaisub completions bash > ytaisub.bash               # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default
    one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Translation provider to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long, global = true)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long, global = true)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation, filtered by the global max level
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                tag,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    // Info until the config says otherwise
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();
    if let Err(e) = run_cli(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run_cli(cli: CommandLineOptions) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "ytaisub", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Run {
            url,
            no_translate,
            platform_subtitles,
            output_dir,
        } => {
            let mut config = config;
            if let Some(dir) = output_dir {
                config.media.work_dir = dir;
            }
            let mut controller = Controller::from_config(config)?;
            let options = RunOptions {
                translate: !no_translate,
                prefer_platform_subtitles: platform_subtitles,
            };
            let report = controller.run(&url, &options).await?;
            info!("Subtitles: {}", report.subtitles.display());
            if let Some(translated) = report.translated {
                info!("Translated: {}", translated.display());
            }
        }
        Commands::Transcribe { audio, output_dir } => {
            let output_dir = output_dir
                .or_else(|| {
                    audio
                        .parent()
                        .filter(|dir| !dir.as_os_str().is_empty())
                        .map(PathBuf::from)
                })
                .unwrap_or_else(|| PathBuf::from("."));
            let mut controller = Controller::from_config(config)?;
            let srt = controller.transcribe_to_srt(&audio, &output_dir).await?;
            info!("Subtitles: {}", srt.display());
        }
        Commands::Translate { srt } => {
            let controller = Controller::from_config(config)?;
            controller.check_translator().await?;
            let translated = controller.translate_srt(&srt).await?;
            info!("Translated: {}", translated.display());
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Load the config file, apply command-line overrides and validate
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(&cli.config_path)?;

    if let Some(provider) = &cli.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(model) = &cli.model {
        if let Some(provider_config) = config.translation.get_active_provider_config_mut() {
            provider_config.model = model.clone();
        }
    }

    if let Some(source_lang) = &cli.source_language {
        config.source_language = source_lang.clone();
    }

    if let Some(target_lang) = &cli.target_language {
        config.target_language = target_lang.clone();
    }

    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    Ok(config)
}
