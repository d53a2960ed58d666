use aivo::{
    api::create_router,
    auth::generate_api_key,
    cli::{output::Output, Cli, Commands},
    db::DatabaseProvider,
    utils::toml_config::{AivoConfig, ConfigError, LogFormat},
    AppState, ProviderId, ProviderRegistry,
};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, &output),
        Some(Commands::GenerateApiKey) => {
            let config = load_config(&cli.config)?;
            init_tracing(&config);

            let db = DatabaseProvider::from_config(&config).create_client().await?;
            let key = generate_api_key(&db).await?;

            output.success("API key created");
            println!("{}", key);
            Ok(())
        }
        Some(Commands::Serve { no_worker }) => serve(&cli.config, !no_worker, &output).await,
        None => serve(&cli.config, true, &output).await,
    }
}

/// Load `aivo.toml`, falling back to built-in defaults when the file is absent
fn load_config(path: &Path) -> anyhow::Result<AivoConfig> {
    match AivoConfig::load(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            eprintln!(
                "Configuration file {} not found, using defaults",
                path.display()
            );
            Ok(AivoConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load {}", path.display())),
    }
}

fn init_tracing(config: &AivoConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "aivo={level},aivo_brain={level},tower_http=info",
            level = config.server.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match config.server.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn show_config(path: &Path, validate: bool, output: &Output) -> anyhow::Result<()> {
    let config = match AivoConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            output.error(&e.to_string());
            return Err(e.into());
        }
    };

    if validate {
        output.success(&format!("{} is valid", path.display()));
    }

    output.header("Server");
    output.kv("address", &format!("{}:{}", config.server.host, config.server.port));
    output.kv("log level", &config.server.log_level);

    output.header("Worker");
    output.kv("enabled", &config.worker.enabled.to_string());
    output.kv("max concurrent jobs", &config.worker.max_concurrent_jobs.to_string());

    output.header("Providers");
    for provider in ProviderId::ALL {
        let provider_config = config.provider(provider);
        let configured = config.resolve_env(&provider_config.api_key_env).is_some();
        let line = format!(
            "{} ({}){}",
            provider,
            provider_config.api_key_env,
            if configured { "" } else { " - key not set" }
        );
        output.list_item(&line);
    }

    Ok(())
}

async fn serve(config_path: &Path, run_worker: bool, output: &Output) -> anyhow::Result<()> {
    let config = Arc::new(load_config(config_path)?);
    init_tracing(&config);
    output.banner();

    let db = Arc::new(
        DatabaseProvider::from_config(&config)
            .create_client()
            .await
            .context("Failed to open database")?,
    );
    tracing::info!(url = %config.database.url, "Database ready");
    output.info(&format!("Database: {}", config.database.url));

    let providers = Arc::new(ProviderRegistry::from_config(&config));
    if providers.available().is_empty() {
        output.warning("No provider has an API key configured; every submission will be rejected");
    }

    let state = AppState::new(config.clone(), db, providers);

    let worker = if run_worker {
        Some(state.research_worker().start())
    } else {
        output.info("Research worker disabled; jobs stay queued");
        None
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    output.success(&format!("Listening on http://{}", addr));
    tracing::info!(%addr, "Server started");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(worker) = worker {
        tracing::info!("Waiting for in-flight research jobs");
        worker.shutdown().await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
