use crate::board::{CatalogError, FieldErrors, JobId, ServiceError, StoreError};
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Catalog(CatalogError),
    Service(ServiceError),
    Store(StoreError),
    JobNotFound(JobId),
    InvalidApplication(FieldErrors),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Catalog(err) => write!(f, "catalog error: {}", err),
            AppError::Service(err) => write!(f, "service error: {}", err),
            AppError::Store(err) => write!(f, "storage error: {}", err),
            AppError::JobNotFound(id) => write!(f, "job '{}' not found", id),
            AppError::InvalidApplication(errors) => {
                let messages: Vec<&str> = errors.iter().map(|(_, message)| message).collect();
                write!(f, "invalid application: {}", messages.join("; "))
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Catalog(err) => Some(err),
            AppError::Service(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::JobNotFound(_) | AppError::InvalidApplication(_) => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<ServiceError> for AppError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<FieldErrors> for AppError {
    fn from(value: FieldErrors) -> Self {
        Self::InvalidApplication(value)
    }
}
