//! memoir-interviewer binary.
//!
//! `serve` runs the HTTP/SSE API. `new` and `resume` drive the interview
//! from the terminal against the same configuration. `list` only reads the
//! store and needs no AI key.

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use memoir_interviewer::adapters::cli::{list_sessions, Console};
use memoir_interviewer::adapters::http::app_router;
use memoir_interviewer::adapters::postgres::MIGRATOR;
use memoir_interviewer::adapters::{
    llm_capabilities, InMemoryInterviewStore, OpenAIConfig, OpenAIProvider,
    PostgresInterviewReader, PostgresInterviewRepository,
};
use memoir_interviewer::application::{InterviewService, TurnOrchestrator};
use memoir_interviewer::config::{AppConfig, ServerConfig};
use memoir_interviewer::domain::foundation::SessionId;
use memoir_interviewer::ports::{InterviewReader, InterviewRepository};

#[derive(Parser)]
#[command(name = "memoir-interviewer")]
#[command(about = "Conversational memoir interviews backed by an LLM")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP/SSE API
    Serve,

    /// Start a new interview in the terminal
    New,

    /// Continue an unfinished interview
    Resume {
        /// Session to continue
        session_id: Uuid,
    },

    /// List stored sessions
    List,
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if server.json_logs() {
        builder.json().init();
    } else {
        builder.init();
    }
}

type Stores = (Arc<dyn InterviewRepository>, Arc<dyn InterviewReader>);

async fn open_stores(config: &AppConfig) -> Result<Stores, Box<dyn Error>> {
    let db = &config.database;
    if !db.is_configured() {
        info!("no database url configured, sessions are kept in memory");
        let store = Arc::new(InMemoryInterviewStore::new());
        return Ok((store.clone(), store));
    }

    let pool = PgPoolOptions::new()
        .min_connections(db.min_connections)
        .max_connections(db.max_connections)
        .acquire_timeout(db.acquire_timeout())
        .idle_timeout(db.idle_timeout())
        .max_lifetime(db.max_lifetime())
        .connect(&db.url)
        .await?;

    if db.run_migrations {
        MIGRATOR.run(&pool).await?;
        info!("migrations applied");
    }

    Ok((
        Arc::new(PostgresInterviewRepository::new(pool.clone())),
        Arc::new(PostgresInterviewReader::new(pool)),
    ))
}

fn build_service(config: &AppConfig, stores: Stores) -> Result<InterviewService, Box<dyn Error>> {
    let ai = &config.ai;
    let api_key = ai.require_api_key()?;

    let provider = OpenAIProvider::new(
        OpenAIConfig::from_secret(api_key)
            .with_base_url(&ai.base_url)
            .with_model(&ai.model)
            .with_temperature(ai.temperature)
            .with_timeout(ai.timeout())
            .with_max_retries(ai.max_retries),
    )?;

    let orchestrator = TurnOrchestrator::with_config(
        llm_capabilities(Arc::new(provider)),
        config.interview.orchestrator(),
    );
    let (repository, reader) = stores;
    Ok(InterviewService::new(
        repository,
        reader,
        orchestrator,
        config.interview.settings(),
    ))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

async fn serve(config: &AppConfig, service: InterviewService) -> Result<(), Box<dyn Error>> {
    let addr = config.server.socket_addr()?;
    let app = app_router(
        service,
        &config.server.cors_origins_list(),
        config.server.request_timeout(),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, model = %config.ai.model, "memoir interviewer listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.server);

    let stores = open_stores(&config).await?;
    if let Command::List = cli.command {
        let (_, reader) = stores;
        list_sessions(reader.as_ref(), &mut std::io::stdout()).await?;
        return Ok(());
    }

    let service = build_service(&config, stores)?;
    if let Command::Serve = cli.command {
        return serve(&config, service).await;
    }

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut console = Console::new(service, input, std::io::stdout());
    match cli.command {
        Command::New => console.run_new().await?,
        Command::Resume { session_id } => {
            console.run_resume(SessionId::from_uuid(session_id)).await?
        }
        Command::List | Command::Serve => {}
    }
    Ok(())
}
