mod config;
mod config_cmd;
mod server;

use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigPaths};
use recap_core::engine::create_engine;
use recap_core::transcript::{TranscriptSource, YoutubeCaptions, fetch_transcript_text};
use recap_core::{EngineEntry, ModelRegistry, ModelSelector, Strategy, Summarizer};
use server::AppState;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_FILTER: &str = "recap=info,recap_core=info,tower_http=info";

#[derive(Parser)]
#[command(name = "recap", version, about = "YouTube transcript summarizer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP summarization service
    Serve(ServeArgs),
    /// Summarize one video and print the result
    Summarize(SummarizeArgs),
    /// Inspect or edit the config file
    Config(config_cmd::ConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct ServeArgs {
    /// Address to bind (overrides server.host)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides server.port)
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug, Clone)]
struct SummarizeArgs {
    /// YouTube URL or 11-character video id
    url: String,

    /// Model selector: bart or t5
    #[arg(long, default_value = "bart")]
    model: String,

    /// Maximum summary length (overrides summarize.max_length)
    #[arg(long)]
    max_length: Option<usize>,

    /// Minimum summary length (overrides summarize.min_length)
    #[arg(long)]
    min_length: Option<usize>,

    /// Summarize word-bounded chunks and join the results
    #[arg(long)]
    chunked: bool,
}

fn main() {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let paths = match ConfigPaths::from_home() {
        Ok(paths) => paths,
        Err(err) => {
            eprintln!("config paths error: {err}");
            std::process::exit(1);
        }
    };

    let outcome = match cli.command {
        Command::Config(args) => {
            config_cmd::run(&args, &paths).map_err(|e| format!("config failed: {e}"))
        }
        Command::Serve(args) => load_config(&paths).and_then(|config| run_serve(&args, &config)),
        Command::Summarize(args) => {
            load_config(&paths).and_then(|config| run_summarize(&args, &config))
        }
    };

    if let Err(err) = outcome {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(paths: &ConfigPaths) -> Result<Config, String> {
    let mut config =
        Config::load_or_create(paths).map_err(|e| format!("config load failed: {e}"))?;
    config.apply_env_overrides();
    config
        .validate()
        .map_err(|e| format!("config invalid: {e}"))?;
    Ok(config)
}

fn non_empty_str(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Build every configured engine once; the registry is shared read-only afterwards.
///
/// Entries start from the model family's conventions and the config only
/// overrides what it sets explicitly.
fn build_registry(config: &Config) -> Result<ModelRegistry, String> {
    let mut registry = ModelRegistry::new();
    for selector in ModelSelector::ALL {
        let engine_config = config.engines.get(selector);
        let engine = create_engine(
            engine_config.provider.as_str(),
            non_empty_str(&engine_config.model),
            non_empty_str(&engine_config.api_key),
            non_empty_str(&engine_config.base_url),
        )
        .map_err(|e| format!("engine {selector} init failed: {e}"))?;
        let mut entry = EngineEntry::with_defaults(selector, Arc::from(engine));
        if let Some(prefix) = &engine_config.prefix {
            entry = entry.with_prefix(Some(prefix.as_str()));
        }
        if let Some(ceiling) = engine_config.input_ceiling {
            entry = entry.with_input_ceiling(Some(ceiling));
        }
        registry.register(entry);
    }
    Ok(registry)
}

fn build_captions(config: &Config) -> YoutubeCaptions {
    YoutubeCaptions::new(
        non_empty_str(&config.transcript.base_url),
        non_empty_str(&config.transcript.language),
    )
}

fn run_serve(args: &ServeArgs, config: &Config) -> Result<(), String> {
    let host = args
        .host
        .clone()
        .unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);

    let options = config
        .summarize
        .options()
        .map_err(|e| format!("config invalid: {e}"))?;
    let registry = build_registry(config)?;
    let summarizer = Summarizer::new(Arc::new(registry), options);
    let transcripts: Arc<dyn TranscriptSource> = Arc::new(build_captions(config));
    let state = AppState::new(Arc::new(summarizer), transcripts);

    info!(
        host = %host,
        port,
        strategy = %options.strategy,
        "starting server"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("runtime init failed: {e}"))?;
    runtime
        .block_on(server::serve(&host, port, state))
        .map_err(|e| format!("server failed: {e}"))
}

fn run_summarize(args: &SummarizeArgs, config: &Config) -> Result<(), String> {
    let mut options = config
        .summarize
        .options()
        .map_err(|e| format!("config invalid: {e}"))?;
    if let Some(max_length) = args.max_length {
        options.max_length = max_length;
    }
    if let Some(min_length) = args.min_length {
        options.min_length = min_length;
    }
    if args.chunked {
        options.strategy = Strategy::Chunked;
    }

    let registry = build_registry(config)?;
    let summarizer = Summarizer::new(Arc::new(registry), options);
    summarizer
        .registry()
        .lookup(&args.model)
        .map_err(|e| e.to_string())?;

    let captions = build_captions(config);
    let transcript = fetch_transcript_text(&captions, &args.url).map_err(|e| e.to_string())?;
    let summary = summarizer
        .summarize(&transcript, &args.model)
        .map_err(|e| e.to_string())?;

    println!("{}", summary.text);
    if let Some(truncation) = summary.truncation {
        eprintln!("note: {truncation}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn summarize_args_parse_overrides() {
        let cli = Cli::try_parse_from([
            "recap",
            "summarize",
            "https://youtu.be/dQw4w9WgXcQ",
            "--model",
            "t5",
            "--max-length",
            "120",
            "--chunked",
        ])
        .unwrap();
        let Command::Summarize(args) = cli.command else {
            panic!("expected summarize command");
        };
        assert_eq!(args.model, "t5");
        assert_eq!(args.max_length, Some(120));
        assert_eq!(args.min_length, None);
        assert!(args.chunked);
    }

    #[test]
    fn registry_honors_engine_config() {
        let mut config = Config::default();
        config.engines.bart.provider = "extractive".to_string();
        config.engines.t5.provider = "extractive".to_string();
        config.engines.t5.input_ceiling = Some(0);

        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.selectors(), ModelSelector::ALL.to_vec());
        let t5 = registry.get(ModelSelector::T5).unwrap();
        assert_eq!(t5.prefix(), Some("summarize: "));
        assert_eq!(t5.input_ceiling(), None);
        let bart = registry.get(ModelSelector::Bart).unwrap();
        assert_eq!(bart.prefix(), None);
        assert_eq!(bart.engine_name(), "extractive");
    }

    #[test]
    fn partial_engine_table_keeps_family_conventions() {
        let config: Config = toml::from_str(
            r#"
[engines.t5]
provider = "huggingface"
model = "t5-base"

[engines.bart]
provider = "extractive"
prefix = ""
"#,
        )
        .unwrap();
        config.validate().unwrap();

        let registry = build_registry(&config).unwrap();
        let t5 = registry.get(ModelSelector::T5).unwrap();
        assert_eq!(t5.prefix(), Some("summarize: "));
        assert_eq!(t5.input_ceiling(), Some(1500));
        let bart = registry.get(ModelSelector::Bart).unwrap();
        assert_eq!(bart.prefix(), None);
        assert_eq!(bart.input_ceiling(), None);
    }

    #[test]
    fn registry_rejects_unknown_provider() {
        let mut config = Config::default();
        config.engines.t5.provider = "openai".to_string();
        let err = build_registry(&config).err().unwrap();
        assert!(err.contains("engine t5 init failed"));
    }
}
