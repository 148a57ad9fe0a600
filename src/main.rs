use clap::Parser as _;
use dotenvy::dotenv;
use indexer::chain::NodeClient;
use indexer::cli::{parse_task_list, ApiOpts, Cli, Commands, GapCmd, JobCmd, RunCmd};
use indexer::client::ApiClient;
use indexer::config::IndexerConfig;
use indexer::error::IndexerError;
use indexer::extract::{ExtractorRegistry, RewardExtractor};
use indexer::scheduler::{JobContext, JobManager, MissingHeightScanner};
use indexer::server::{setup_server, AppState};
use indexer::storage::{Sink, SinkSet};
use indexer::types::{JobConfig, JobId};
use indexer::utils::instrument::Instrumentation;
use indexer::utils::logging::init_logging;
use indexer::IndexerResult;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(run_cmd) => run_daemon(run_cmd).await,
        Commands::Gap { command } => run_gap(command).await,
        Commands::Job { command } => run_job(command).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Error: {err}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run_daemon(run_cmd: RunCmd) -> IndexerResult<()> {
    let config = IndexerConfig::from_yaml_file(&run_cmd.config)
        .map_err(|err| IndexerError::ConfigError(err.to_string()))?;

    let (instrumentation, tracer) = Instrumentation::new(&config.otel)?;
    init_logging(tracer);
    info!("starting indexer daemon");

    let mut sinks = SinkSet::new();
    for sink_config in &config.storage {
        sinks.insert(Sink::connect(&sink_config.name, &sink_config.url).await?);
    }

    let mut registry = ExtractorRegistry::new();
    RewardExtractor::register_all(&mut registry);

    let chain = Arc::new(NodeClient::new(config.node.url.clone(), config.node.token.clone()));
    let manager = JobManager::new(Arc::new(JobContext {
        registry,
        sinks,
        chain,
        scanner: Arc::new(MissingHeightScanner),
        on_extraction_error: config.extraction.on_error,
    }));

    let state = AppState { manager: manager.clone(), auth_token: config.server.auth_token.clone() };
    let (_addr, server) = setup_server(state, config.server.addr()).await?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    manager.shutdown().await;
    if let Err(err) = server.shutdown().await {
        info!(error = %err, "control api task ended abnormally");
    }
    instrumentation.shutdown()?;
    info!("indexer daemon shut down");
    Ok(())
}

fn api_client(opts: &ApiOpts) -> ApiClient {
    ApiClient::new(opts.api.clone(), opts.api_token.clone())
}

#[allow(clippy::print_stdout)]
async fn run_gap(command: GapCmd) -> IndexerResult<()> {
    match command {
        GapCmd::Fill { api, storage, tasks, from, to } => {
            let config = JobConfig {
                from,
                to,
                ..JobConfig::for_storage(storage).with_tasks(parse_task_list(&tasks))
            };
            let id = api_client(&api).gap_fill(&config).await?;
            println!("Created Gap Job: {id}");
        }
        GapCmd::Find { api, storage, from, to } => {
            let config = JobConfig { from, to, ..JobConfig::for_storage(storage) };
            let id = api_client(&api).gap_find(&config).await?;
            println!("Created Gap Job: {id}");
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn run_job(command: JobCmd) -> IndexerResult<()> {
    match command {
        JobCmd::Start { api, id } => {
            api_client(&api).job_start(JobId(id)).await?;
            println!("Started Job: {id}");
        }
        JobCmd::Stop { api, id } => {
            api_client(&api).job_stop(JobId(id)).await?;
            println!("Stopped Job: {id}");
        }
        JobCmd::List { api } => {
            let jobs = api_client(&api).job_list().await?;
            let pretty = serde_json::to_string_pretty(&jobs)?;
            println!("List Jobs:\n{pretty}");
        }
    }
    Ok(())
}
