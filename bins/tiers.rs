//! Operator tool: inspect the tier catalog stored in the configured backend.
//!
//! ```text
//! tiers                 # every tier, catalog order
//! tiers get <name>      # one tier
//! tiers group <group>   # tiers granting a group
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use configs::{AppConfig, LogFormat, StorageBackend};
use dotenvy::dotenv;
use service::storage::{ConfigObjectApi, JsonFileConfigObjects};
use service::{CatalogStore, RetryPolicy, ServiceError, TierService};
use tracing::{error, info};
use uuid::Uuid;

enum Command {
    List,
    Get(String),
    Group(String),
}

fn parse_args() -> anyhow::Result<Command> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => Ok(Command::List),
        [cmd] if cmd == "list" => Ok(Command::List),
        [cmd, name] if cmd == "get" => Ok(Command::Get(name.clone())),
        [cmd, group] if cmd == "group" => Ok(Command::Group(group.clone())),
        _ => Err(anyhow::anyhow!("usage: tiers [list | get <name> | group <group>]")),
    }
}

fn init_logging(format: LogFormat) {
    match format {
        LogFormat::Compact => common::utils::logging::init_logging_default(),
        LogFormat::Json => common::utils::logging::init_logging_json(),
    }
}

async fn build_service(cfg: &AppConfig) -> anyhow::Result<TierService<dyn ConfigObjectApi>> {
    let api: Arc<dyn ConfigObjectApi> = match cfg.storage.backend {
        StorageBackend::File => Arc::new(JsonFileConfigObjects::new(&cfg.storage.path).await?),
    };
    let store = CatalogStore::new(api, &cfg.catalog.namespace, &cfg.catalog.name)
        .with_data_key(&cfg.catalog.data_key);
    let retry = RetryPolicy::new(
        cfg.retry.max_attempts,
        Duration::from_millis(cfg.retry.backoff_base_ms),
        Duration::from_millis(cfg.retry.backoff_max_ms),
    );
    Ok(TierService::new(store).with_retry(retry))
}

async fn run(
    cmd: Command,
    svc: &TierService<dyn ConfigObjectApi>,
) -> Result<serde_json::Value, ServiceError> {
    let value = match cmd {
        Command::List => serde_json::to_value(svc.get_tiers().await?),
        Command::Get(name) => serde_json::to_value(svc.get_tier(&name).await?),
        Command::Group(group) => serde_json::to_value(svc.get_tiers_by_group(&group).await?),
    };
    value.map_err(|e| ServiceError::Storage(e.to_string()))
}

fn exit_code_for(err: &ServiceError) -> ExitCode {
    match err {
        e if e.is_bad_request() => ExitCode::from(2),
        ServiceError::NotFound(_) => ExitCode::from(3),
        _ => ExitCode::FAILURE,
    }
}

fn main() -> ExitCode {
    dotenv().ok();

    let cfg = match AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(event = "config_invalid", error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    init_logging(cfg.logging.format);

    let cmd = match parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    let run_id = Uuid::new_v4();
    info!(
        event = "start",
        %run_id,
        namespace = %cfg.catalog.namespace,
        name = %cfg.catalog.name,
        backend = ?cfg.storage.backend,
        "tier catalog tool starting"
    );

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    rt.block_on(async move {
        let svc = match build_service(&cfg).await {
            Ok(svc) => svc,
            Err(e) => {
                error!(
                    event = "backend_init_failed",
                    error = %e,
                    "cannot open config object backend"
                );
                return ExitCode::FAILURE;
            }
        };
        match run(cmd, &svc).await {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(out) => {
                    println!("{out}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!(event = "encode_failed", error = %e, "cannot encode output");
                    ExitCode::FAILURE
                }
            },
            Err(e) => {
                error!(
                    event = "command_failed",
                    code = e.code(),
                    error = %e,
                    "tier command failed"
                );
                exit_code_for(&e)
            }
        }
    })
}
