mod client;
mod config;
mod conversions;
mod device_repository;
mod license_repository;
mod migrate;
mod models;

pub use client::PostgresClient;
pub use config::PostgresConfig;
pub use device_repository::PostgresDeviceRepository;
pub use license_repository::PostgresLicenseRepository;
pub use migrate::MigrationRunner;
pub use models::{DeviceRow, LicenseBatchRow};
