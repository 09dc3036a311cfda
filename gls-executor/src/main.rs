//! Google Life Sciences executor
//!
//! Stand-alone driver: validates the run settings, submits every task from a
//! task file to the pipelines service, and waits for all of them.

use anyhow::{Context, Result, bail};
use clap::Parser;
use gls_client::{DEFAULT_API_URL, DEFAULT_STORAGE_URL, LifeSciencesClient};
use gls_core::domain::task::{TaskDescription, TaskState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gls_executor::{
    ExecutorAdapter, LifeSciencesAdapter, LifeSciencesJobClient, LocalSession, MonitorConfig,
    PollingMonitor, RemoteJobClient, RunSession, RunSettings,
};

#[derive(Parser)]
#[command(name = "gls-executor")]
#[command(about = "Run tasks on the Google Life Sciences pipelines service", long_about = None)]
struct Args {
    /// Run settings as a JSON document
    #[arg(long)]
    settings: PathBuf,

    /// Tasks to run, as a JSON array
    #[arg(long)]
    tasks: PathBuf,

    /// Generic working directory of the run
    #[arg(long, env = "GLS_WORK_DIR")]
    work_dir: String,

    /// Local directory of auxiliary binaries staged for the tasks
    #[arg(long, default_value = "bin")]
    bin_dir: PathBuf,

    #[arg(long, env = "GLS_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[arg(long, env = "GLS_STORAGE_URL", default_value = DEFAULT_STORAGE_URL)]
    storage_url: String,

    /// OAuth access token sent with every request
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gls_executor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let settings_json = std::fs::read_to_string(&args.settings)
        .with_context(|| format!("Failed to read settings file {}", args.settings.display()))?;
    let settings = RunSettings::from_json_str(&settings_json).context("Invalid settings file")?;

    let tasks_json = std::fs::read_to_string(&args.tasks)
        .with_context(|| format!("Failed to read task file {}", args.tasks.display()))?;
    let tasks: Vec<TaskDescription> =
        serde_json::from_str(&tasks_json).context("Invalid task file")?;

    let monitor_config = load_monitor_config()?;

    let mut http = LifeSciencesClient::with_timeout(
        args.api_url,
        args.storage_url,
        monitor_config.request_timeout,
    )
    .context("Failed to build HTTP client")?;
    if let Some(token) = args.token {
        http = http.with_token(token);
    }
    let client: Arc<dyn RemoteJobClient> = Arc::new(LifeSciencesJobClient::new(http));
    let session = Arc::new(LocalSession::new(args.work_dir));

    let adapter = LifeSciencesAdapter::new(settings, session.clone(), client.clone())
        .with_local_bin_dir(args.bin_dir);
    let config = adapter
        .register()
        .await
        .context("Executor registration failed")?;
    info!(
        "Registered executor for project {} (work dir: {})",
        config.project_id,
        adapter.working_directory()
    );

    let (monitor, controller) = PollingMonitor::new(monitor_config, client);
    let monitor_task = tokio::spawn(monitor.run());

    let mut watches = Vec::with_capacity(tasks.len());
    for task in &tasks {
        let handle = adapter.create_task_handler(task)?;
        watches.push(controller.admit(handle)?);
    }
    info!("Admitted {} task(s)", watches.len());

    let interrupt = controller.clone();
    let interrupted_session = session.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, aborting run");
            interrupted_session.abort("interrupted");
            interrupt.shutdown();
        }
    });

    let mut failed = 0;
    for watch in &mut watches {
        let snapshot = watch.wait().await;
        let exit = snapshot.exit_info.as_ref();
        println!(
            "{}\t{}\texit={}\t{}",
            snapshot.task_id,
            snapshot.state,
            exit.and_then(|e| e.exit_code)
                .map(|code| code.to_string())
                .unwrap_or_else(|| "-".to_string()),
            exit.and_then(|e| e.error_message.as_deref()).unwrap_or("")
        );
        if snapshot.state != TaskState::Succeeded {
            failed += 1;
        }
    }

    controller.shutdown();
    match monitor_task.await.context("Polling monitor panicked")? {
        Ok(()) => info!("Polling monitor finished"),
        Err(e) => {
            error!("Polling monitor error: {}", e);
            return Err(e.into());
        }
    }

    if session.is_aborted() {
        bail!(
            "Run aborted: {}",
            session.abort_reason().unwrap_or_else(|| "unknown reason".to_string())
        );
    }
    if failed > 0 {
        bail!("{} of {} task(s) did not succeed", failed, watches.len());
    }

    Ok(())
}

/// Loads monitor configuration from environment variables with fallback to defaults
fn load_monitor_config() -> Result<MonitorConfig> {
    let config = match MonitorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load monitor config from environment ({}), using defaults", e);
            MonitorConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}
