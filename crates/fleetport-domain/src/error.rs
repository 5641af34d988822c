use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("No license capacity available for tenant: {0}")]
    NoLicenseAvailable(String),

    #[error("License batch not found: {0}")]
    LicenseBatchNotFound(String),

    #[error("Invalid license unit count: {0}")]
    InvalidUnitCount(String),

    #[error("License unit already released for reservation: {0}")]
    UnitAlreadyReleased(String),

    #[error("Reservation contention for tenant: {0}")]
    ReservationContention(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device already exists: {0}")]
    DeviceAlreadyExists(String),

    #[error("Remote device creation failed: {0}")]
    RemoteCreateFailed(String),

    #[error("Remote device assignment failed: {0}")]
    RemoteAssignFailed(String),

    #[error("Remote platform query failed: {0}")]
    RemoteQueryFailed(String),

    #[error("Reconciliation required: {0}")]
    ReconciliationRequired(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
