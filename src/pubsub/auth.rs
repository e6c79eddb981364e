//! Credential resolution for the REST client.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use google_cloud_auth::credentials::CredentialsFile;
use google_cloud_auth::project::Config;
use google_cloud_auth::token::DefaultTokenSourceProvider;
use google_cloud_token::{TokenSource, TokenSourceProvider};
use tracing::info;

use crate::error::{Error, Result};

static SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/pubsub",
    "https://www.googleapis.com/auth/cloud-platform",
];

/// How requests are authorized.
#[derive(Clone)]
pub enum Auth {
    /// No credentials; used against emulators.
    Anonymous,
    /// OAuth2 bearer tokens minted by a token source.
    Bearer(Arc<dyn TokenSource>),
}

impl Auth {
    /// Resolve credentials.
    ///
    /// An explicit `credentials_path` is loaded as a credentials file and
    /// takes precedence over anything in the environment. Without it,
    /// application default credentials are discovered.
    pub async fn discover(credentials_path: Option<&Path>) -> Result<Self> {
        let config = Config {
            scopes: Some(&SCOPES),
            ..Default::default()
        };

        let provider = match credentials_path {
            Some(path) => {
                let file = load_credentials_file(path).await?;
                info!("Using credentials file {}", path.display());
                DefaultTokenSourceProvider::new_with_credentials(config, Box::new(file)).await
            }
            None => {
                info!("Looking for application default credentials");
                DefaultTokenSourceProvider::new(config).await
            }
        }
        .map_err(|e| Error::Credentials(e.to_string()))?;

        Ok(Auth::Bearer(provider.token_source()))
    }

    /// Value for the `Authorization` header, if any.
    pub async fn authorization(&self) -> Result<Option<String>> {
        match self {
            Auth::Anonymous => Ok(None),
            Auth::Bearer(source) => {
                let token = source
                    .token()
                    .await
                    .map_err(|e| Error::Credentials(format!("token error: {}", e)))?;
                Ok(Some(bearer(token)))
            }
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Anonymous => f.write_str("Anonymous"),
            Auth::Bearer(_) => f.write_str("Bearer(..)"),
        }
    }
}

async fn load_credentials_file(path: &Path) -> Result<CredentialsFile> {
    if !path.is_file() {
        return Err(Error::Credentials(format!(
            "credentials file {} does not exist",
            path.display()
        )));
    }

    CredentialsFile::new_from_file(path.to_string_lossy().into_owned())
        .await
        .map_err(|e| {
            Error::Credentials(format!(
                "failed to load credentials file {}: {}",
                path.display(),
                e
            ))
        })
}

fn bearer(token: String) -> String {
    if token.starts_with("Bearer ") {
        token
    } else {
        format!("Bearer {}", token)
    }
}
