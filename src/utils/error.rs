use thiserror::Error;

/// 雲端供應商錯誤的分類，依錯誤代碼判斷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    NotFound,
    AlreadyExists,
    AccessDenied,
    Throttling,
    InvalidInput,
    Other,
}

impl ProviderErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "EntityNotFoundException" | "NoSuchKey" | "NoSuchBucket" | "NotFound"
            | "ClusterNotFound" | "ClusterNotFoundFault" => Self::NotFound,
            "AlreadyExistsException" | "BucketAlreadyExists" | "BucketAlreadyOwnedByYou"
            | "IdempotentParameterMismatchException" | "ClusterAlreadyExists"
            | "ClusterAlreadyExistsFault" => Self::AlreadyExists,
            "AccessDenied" | "AccessDeniedException" | "InvalidAccessKeyId"
            | "SignatureDoesNotMatch" | "UnrecognizedClientException"
            | "InvalidClientTokenId" | "ExpiredToken" => Self::AccessDenied,
            "Throttling" | "ThrottlingException" | "SlowDown" | "TooManyRequestsException"
            | "ConcurrentRunsExceededException" => Self::Throttling,
            "InvalidInputException" | "InvalidBucketName" | "InvalidLocationConstraint"
            | "IllegalLocationConstraintException" | "ValidationException"
            | "InvalidParameterValue" | "InvalidParameterCombination" => Self::InvalidInput,
            _ => Self::Other,
        }
    }
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("{service} {operation} failed: [{code}] {message}")]
    ProviderError {
        service: String,
        operation: String,
        code: String,
        message: String,
        kind: ProviderErrorKind,
    },

    #[error("Local source error: {0}")]
    LocalSourceError(#[from] rusqlite::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Workflow step '{step}' failed: {source}")]
    StepError {
        step: String,
        source: Box<EtlError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Provider,
    LocalSource,
    Data,
    Io,
    Configuration,
    Workflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn provider(
        service: &str,
        operation: &str,
        code: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        let code = code.unwrap_or("Unknown").to_string();
        EtlError::ProviderError {
            service: service.to_string(),
            operation: operation.to_string(),
            kind: ProviderErrorKind::from_code(&code),
            code,
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        EtlError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        EtlError::ConfigError {
            message: message.into(),
        }
    }

    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            EtlError::ProviderError { kind, .. } => Some(*kind),
            EtlError::StepError { source, .. } => source.provider_kind(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.provider_kind() == Some(ProviderErrorKind::NotFound)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ProviderError { .. } => ErrorCategory::Provider,
            EtlError::LocalSourceError(_) => ErrorCategory::LocalSource,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::IoError(_) => ErrorCategory::Io,
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::StepError { .. } => ErrorCategory::Workflow,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::ProviderError { kind, .. } => match kind {
                ProviderErrorKind::Throttling => ErrorSeverity::Medium,
                ProviderErrorKind::AccessDenied => ErrorSeverity::Critical,
                _ => ErrorSeverity::High,
            },
            EtlError::LocalSourceError(_) => ErrorSeverity::High,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorSeverity::High,
            EtlError::IoError(_) => ErrorSeverity::Critical,
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorSeverity::Critical,
            EtlError::StepError { source, .. } => source.severity(),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::ProviderError { kind, .. } => match kind {
                ProviderErrorKind::NotFound => {
                    "Check that the bucket, crawler, job or cluster name exists in the configured region".to_string()
                }
                ProviderErrorKind::AlreadyExists => {
                    "The resource already exists; delete it first or pick another name".to_string()
                }
                ProviderErrorKind::AccessDenied => {
                    "Check ACCESS_KEY / ACCESS_SECRET and the IAM permissions of the role".to_string()
                }
                ProviderErrorKind::Throttling => {
                    "The provider is throttling requests; wait a moment and run again".to_string()
                }
                ProviderErrorKind::InvalidInput => {
                    "Check names, regions and S3 paths in the configuration file".to_string()
                }
                ProviderErrorKind::Other => {
                    "Inspect the provider error code and message above".to_string()
                }
            },
            EtlError::LocalSourceError(_) => {
                "Check database.path and that every table in database.tables exists".to_string()
            }
            EtlError::CsvError(_) | EtlError::SerializationError(_) => {
                "The data could not be encoded; inspect the offending table".to_string()
            }
            EtlError::IoError(_) => "Check file paths and permissions".to_string(),
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => {
                "Fix the configuration file and run again".to_string()
            }
            EtlError::ProcessingError { .. } => {
                "Inspect the data returned by the provider".to_string()
            }
            EtlError::StepError { source, .. } => format!(
                "{} (earlier steps are not rolled back)",
                source.recovery_suggestion()
            ),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ProviderError {
                service,
                operation,
                code,
                ..
            } => format!("AWS {} rejected {} ({})", service, operation, code),
            EtlError::LocalSourceError(e) => format!("Could not read the local database: {}", e),
            EtlError::MissingConfigError { field } => {
                format!("Configuration is missing '{}'", field)
            }
            EtlError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration field '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
