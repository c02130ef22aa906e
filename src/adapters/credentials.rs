use crate::domain::ports::{AwsCredentials, CredentialProvider};
use crate::utils::error::{EtlError, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use tracing::{debug, warn};

pub const DEFAULT_ACCESS_KEY_VAR: &str = "ACCESS_KEY";
pub const DEFAULT_SECRET_KEY_VAR: &str = "ACCESS_SECRET";

/// Reads the access/secret key pair from the process environment,
/// loading a `.env` file first when one exists.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    access_key_var: String,
    secret_key_var: String,
    region: Option<String>,
    load_dotenv: bool,
}

impl EnvCredentialProvider {
    pub fn new(region: Option<String>) -> Self {
        Self {
            access_key_var: DEFAULT_ACCESS_KEY_VAR.to_string(),
            secret_key_var: DEFAULT_SECRET_KEY_VAR.to_string(),
            region,
            load_dotenv: true,
        }
    }

    pub fn with_variables(mut self, access_key_var: &str, secret_key_var: &str) -> Self {
        self.access_key_var = access_key_var.to_string();
        self.secret_key_var = secret_key_var.to_string();
        self
    }

    pub fn without_dotenv(mut self) -> Self {
        self.load_dotenv = false;
        self
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn resolve(&self) -> Result<AwsCredentials> {
        if self.load_dotenv {
            match dotenvy::dotenv() {
                Ok(path) => debug!("Loaded environment file {}", path.display()),
                Err(e) if e.not_found() => {}
                Err(e) => return Err(EtlError::config(format!("Failed to read .env file: {}", e))),
            }
        }

        // 缺少金鑰不在本地檢查，第一次呼叫時由 AWS 回報驗證錯誤
        Ok(AwsCredentials {
            access_key: std::env::var(&self.access_key_var).ok(),
            secret_key: std::env::var(&self.secret_key_var).ok(),
            region: self.region.clone(),
        })
    }
}

/// Fixed credentials, mostly for tests and local endpoints.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    credentials: AwsCredentials,
}

impl StaticCredentialProvider {
    pub fn new(access_key: &str, secret_key: &str, region: Option<&str>) -> Self {
        Self {
            credentials: AwsCredentials {
                access_key: Some(access_key.to_string()),
                secret_key: Some(secret_key.to_string()),
                region: region.map(str::to_string),
            },
        }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn resolve(&self) -> Result<AwsCredentials> {
        Ok(self.credentials.clone())
    }
}

/// Builds the shared SDK configuration once per process run.
pub async fn load_sdk_config(
    provider: &dyn CredentialProvider,
    endpoint_url: Option<&str>,
) -> Result<SdkConfig> {
    let resolved = provider.resolve()?;

    if resolved.access_key.is_none() || resolved.secret_key.is_none() {
        warn!("AWS access or secret key is not set; provider calls will fail authentication");
    }

    let credentials = Credentials::new(
        resolved.access_key.unwrap_or_default(),
        resolved.secret_key.unwrap_or_default(),
        None,
        None,
        "tickit-lake",
    );

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).credentials_provider(credentials);

    if let Some(region) = resolved.region {
        debug!("Using AWS region {}", region);
        loader = loader.region(Region::new(region));
    }

    if let Some(url) = endpoint_url {
        debug!("Using custom AWS endpoint {}", url);
        loader = loader.endpoint_url(url);
    }

    Ok(loader.load().await)
}
