// Adapters layer: concrete implementations of the domain ports (AWS SDK, SQLite, in-memory).

pub mod credentials;
pub mod glue;
pub mod memory;
pub mod redshift;
pub mod s3;
pub mod sqlite;

use crate::utils::error::EtlError;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use chrono::{DateTime, Utc};

/// Translates any SDK error into `EtlError::ProviderError`, keeping the service error code.
pub(crate) fn sdk_error<E>(service: &str, operation: &str, err: E) -> EtlError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let code = err.code().map(str::to_string);
    let message = match err.message() {
        Some(message) => message.to_string(),
        // dispatch/timeout 錯誤沒有 message，改用完整錯誤鏈
        None => DisplayErrorContext(&err).to_string(),
    };
    EtlError::provider(service, operation, code.as_deref(), message)
}

pub(crate) fn to_utc(secs: i64, nanos: u32) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, nanos)
}
