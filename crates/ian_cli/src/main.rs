use clap::Parser;
use ian_core::{ArticleStore, Error, GenerationRequest, Result};
use ian_inference::{create_backend, ArticleOrchestrator, InferenceConfig};
use ian_web::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod logging;

/// Parses `--timeout` with humantime ("90s", "2m", "1m 30s"); zero is rejected.
fn parse_timeout(s: &str) -> std::result::Result<Duration, String> {
    let timeout = humantime::parse_duration(s).map_err(|e| e.to_string())?;
    if timeout.is_zero() {
        return Err("timeout must be positive".to_string());
    }
    Ok(timeout)
}

#[derive(Parser, Debug)]
#[command(author, version, about = "AI newsroom: generate articles with a local language model", long_about = None)]
pub struct Cli {
    /// Record store: memory or sqlite
    #[arg(long, env = "IAN_STORAGE", default_value = "memory")]
    storage: String,
    /// SQLite database file
    #[arg(long, env = "IAN_DATABASE_URL")]
    database_url: Option<String>,
    #[arg(long, default_value = "ollama", help = "Generation backend. Available: ollama (default), scripted")]
    backend: String,
    #[arg(long, env = "OLLAMA_HOST", default_value = ian_inference::DEFAULT_HOST)]
    host: String,
    #[arg(long, env = "OLLAMA_MODEL", default_value = ian_inference::DEFAULT_MODEL)]
    model: String,
    /// Per-request timeout for the backend (e.g. 90s, 2m)
    #[arg(long, default_value = "60s", value_parser = parse_timeout)]
    timeout: Duration,
    #[arg(long, default_value_t = 2)]
    max_concurrent_runs: usize,
    /// Ask for tags in parallel with the title
    #[arg(long)]
    concurrent_tags: bool,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Generate one article and store it
    Generate {
        #[arg(long)]
        topic: String,
        /// Category id (e.g. tecnologia, ciencia, deportes, cultura)
        #[arg(long)]
        category: String,
        #[arg(long)]
        tone: Option<String>,
        #[arg(long)]
        language: Option<String>,
        /// Print the generated text without storing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Check whether the backend is reachable
    Status,
    /// List models installed on the backend
    Models,
    /// Send a raw prompt to the backend
    Prompt {
        prompt: String,
        #[arg(long)]
        model: Option<String>,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
}

impl Cli {
    fn inference_config(&self) -> Result<InferenceConfig> {
        Ok(InferenceConfig::default()
            .with_host(&self.host)?
            .with_model(self.model.clone())
            .with_request_timeout(self.timeout)
            .with_max_concurrent_runs(self.max_concurrent_runs)
            .with_concurrent_tags(self.concurrent_tags))
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn generate(
    orchestrator: &ArticleOrchestrator,
    store: &Arc<dyn ArticleStore>,
    topic: &str,
    category_id: &str,
    tone: Option<&str>,
    language: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let category = store
        .find_category(category_id)
        .await?
        .ok_or_else(|| Error::CategoryNotFound(category_id.to_string()))?;

    let mut request = GenerationRequest::new(topic, category.name)?;
    if let Some(tone) = tone {
        request = request.with_tone(tone);
    }
    if let Some(language) = language {
        request = request.with_language(language);
    }

    orchestrator.gate().ensure_ready().await?;

    if dry_run {
        let generated = orchestrator.generate(&request).await?;
        return print_json(&generated);
    }

    let article = orchestrator.run(&request, &category.id).await?;
    print_json(&article)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = cli.inference_config()?;
    let backend = create_backend(&cli.backend, &config)?;
    info!("🧠 Generation backend ready (using {} with model {})", backend.name(), config.model);

    let store = ian_storage::create_storage(&cli.storage, cli.database_url.as_deref()).await?;
    info!("💾 Storage initialized (using {})", cli.storage);

    let orchestrator = ArticleOrchestrator::new(backend.clone(), store.clone(), &config);

    match cli.command {
        Commands::Generate { topic, category, tone, language, dry_run } => {
            generate(
                &orchestrator,
                &store,
                &topic,
                &category,
                tone.as_deref(),
                language.as_deref(),
                dry_run,
            )
            .await?;
        }
        Commands::Status => {
            let available = backend.probe().await;
            print_json(&serde_json::json!({ "available": available, "host": config.host }))?;
        }
        Commands::Models => {
            for model in backend.list_models().await? {
                println!("{}\t{}\t{}", model.name, model.size, model.modified_at.unwrap_or_default());
            }
        }
        Commands::Prompt { prompt, model } => {
            let model = model.unwrap_or_else(|| config.model.clone());
            let response = backend.complete(&model, &prompt).await?;
            println!("{}", response.trim());
        }
        Commands::Serve { addr } => {
            let state = AppState {
                orchestrator: Arc::new(orchestrator),
                backend_host: config.host.clone(),
            };
            ian_web::serve(addr, state).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_timeout("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_timeout("1m 30s").unwrap(), Duration::from_secs(90));
        assert!(parse_timeout("0s").is_err());
        assert!(parse_timeout("45").is_err());
        assert!(parse_timeout("5x").is_err());
        assert!(parse_timeout("").is_err());
    }

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::try_parse_from([
            "ian",
            "--backend",
            "scripted",
            "--timeout",
            "2m",
            "generate",
            "--topic",
            "robots domésticos",
            "--category",
            "tecnologia",
        ])
        .unwrap();

        assert_eq!(cli.backend, "scripted");
        let config = cli.inference_config().unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert!(matches!(cli.command, Commands::Generate { dry_run: false, .. }));
    }

    #[tokio::test]
    async fn test_generate_with_scripted_backend() {
        let config = InferenceConfig::default();
        let backend = create_backend("scripted", &config).unwrap();
        let store = ian_storage::create_storage("memory", None).await.unwrap();
        let orchestrator = ArticleOrchestrator::new(backend, store.clone(), &config);

        generate(&orchestrator, &store, "robots domésticos", "tecnologia", None, None, false)
            .await
            .unwrap();
        let stored = store
            .find_by_slug("los-robots-domsticos-llegan-a-los-hogares")
            .await
            .unwrap();
        assert!(stored.is_some());

        let err = generate(&orchestrator, &store, "robots", "nope", None, None, true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CategoryNotFound(_)));
    }
}
