mod config;
mod telemetry;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use config::ServiceConfig;
use fleetport_api::domain::DeviceInventoryService;
use fleetport_api::http::{run_http_server, AppState};
use fleetport_domain::{
    AllocationService, DeviceRepository, LicenseLedger, ProvisioningService, RemotePlatform,
};
use fleetport_postgres::{
    MigrationRunner, PostgresClient, PostgresDeviceRepository, PostgresLicenseRepository,
};
use fleetport_remote::ThingsboardPlatform;

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    telemetry::init_telemetry(&config.log_level);

    info!(
        http_host = %config.http_host,
        http_port = config.http_port,
        "Starting fleetport server"
    );

    let postgres_config = config.postgres();
    let postgres_client = match PostgresClient::new(&postgres_config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create PostgreSQL client: {e}");
            std::process::exit(1);
        }
    };

    if config.run_migrations {
        let migration_runner = MigrationRunner::new(
            postgres_config.goose_binary_path.clone(),
            postgres_config.migrations_dir.clone(),
            postgres_config.dsn(),
        );
        if let Err(e) = migration_runner.run_migrations().await {
            error!("Failed to run migrations: {e}");
            std::process::exit(1);
        }
    }

    if let Err(e) = postgres_client.ping().await {
        error!("Failed to reach PostgreSQL: {e}");
        std::process::exit(1);
    }

    let remote_platform: Arc<dyn RemotePlatform> =
        match ThingsboardPlatform::new(config.remote_platform()) {
            Ok(platform) => Arc::new(platform),
            Err(e) => {
                error!("Failed to create remote platform client: {e}");
                std::process::exit(1);
            }
        };

    let license_repository = Arc::new(PostgresLicenseRepository::new(postgres_client.clone()));
    let device_repository: Arc<dyn DeviceRepository> =
        Arc::new(PostgresDeviceRepository::new(postgres_client));

    let ledger = Arc::new(LicenseLedger::new(license_repository));
    let allocation = Arc::new(AllocationService::new(ledger.clone()));
    let provisioning = Arc::new(ProvisioningService::new(
        ledger.clone(),
        remote_platform.clone(),
        device_repository.clone(),
    ));
    let inventory = Arc::new(DeviceInventoryService::new(
        remote_platform,
        ledger.clone(),
    ));

    let state = AppState {
        ledger,
        allocation,
        provisioning,
        inventory,
        device_repository,
    };

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    if let Err(e) = run_http_server(config.http(), state, shutdown_token).await {
        error!("HTTP server error: {e}");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
