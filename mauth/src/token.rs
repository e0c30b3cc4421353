//! Token sources: where a fresh access token comes from.

use std::time::Duration;

use mcommon::BoxFuture;
use mconfig::{AuthorizationConfig, SecurityConfig};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{AuthError, SecretString};

pub type AuthFuture<'a, T> = BoxFuture<'a, T>;

/// A token as returned by its issuer.
#[derive(Debug)]
pub struct IssuedToken {
    pub access_token: SecretString,
    pub expires_in: Option<Duration>,
    /// Scopes the issuer granted, when it reports them.
    pub scopes: Option<Vec<String>>,
}

impl IssuedToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token),
            expires_in: None,
            scopes: None,
        }
    }

    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }
}

pub trait TokenSource: Send + Sync {
    fn fetch<'a>(&'a self) -> AuthFuture<'a, Result<IssuedToken, AuthError>>;
}

/// Reads a pre-issued bearer token from the environment on every fetch, so a
/// rotated value is picked up on the next renewal.
#[derive(Debug, Clone)]
pub struct EnvTokenSource {
    variable: String,
    expires_in: Option<Duration>,
}

impl EnvTokenSource {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            expires_in: None,
        }
    }

    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }
}

impl TokenSource for EnvTokenSource {
    fn fetch<'a>(&'a self) -> AuthFuture<'a, Result<IssuedToken, AuthError>> {
        Box::pin(async move {
            let value = std::env::var(&self.variable).map_err(|_| {
                AuthError::unauthenticated(format!(
                    "environment variable '{}' is not set",
                    self.variable
                ))
            })?;
            if value.trim().is_empty() {
                return Err(AuthError::unauthenticated(format!(
                    "environment variable '{}' is empty",
                    self.variable
                )));
            }

            let mut token = IssuedToken::new(value);
            token.expires_in = self.expires_in;
            Ok(token)
        })
    }
}

#[derive(Debug)]
pub struct ClientCredentialsSource {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: Option<SecretString>,
    scopes: Vec<String>,
    audience: Option<String>,
}

impl ClientCredentialsSource {
    pub fn new(client: Client, token_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: None,
            scopes: Vec::new(),
            audience: None,
        }
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(secret));
        self
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    fn form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", self.client_id.clone()),
        ];
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.expose().to_string()));
        }
        if !self.scopes.is_empty() {
            form.push(("scope", self.scopes.join(" ")));
        }
        if let Some(audience) = &self.audience {
            form.push(("audience", audience.clone()));
        }
        form
    }

    fn classify_status(status: StatusCode, body: &str) -> AuthError {
        let detail = serde_json::from_str::<TokenErrorBody>(body)
            .ok()
            .map(|parsed| parsed.error)
            .unwrap_or_else(|| format!("status {status}"));

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AuthError::unauthenticated(format!("token endpoint rejected client: {detail}"))
            }
            _ => AuthError::refresh_failed(format!("token endpoint failed: {detail}")),
        }
    }
}

impl TokenSource for ClientCredentialsSource {
    fn fetch<'a>(&'a self) -> AuthFuture<'a, Result<IssuedToken, AuthError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.token_url)
                .form(&self.form())
                .send()
                .await
                .map_err(|err| {
                    AuthError::refresh_failed(format!("token request failed: {}", err.without_url()))
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Self::classify_status(status, &body));
            }

            let parsed: TokenResponseBody = response.json().await.map_err(|err| {
                AuthError::refresh_failed(format!("token response was malformed: {err}"))
            })?;
            if parsed.access_token.is_empty() {
                return Err(AuthError::refresh_failed(
                    "token endpoint returned an empty access token",
                ));
            }

            Ok(IssuedToken {
                access_token: SecretString::new(parsed.access_token),
                expires_in: parsed.expires_in.map(Duration::from_secs),
                scopes: parsed
                    .scope
                    .map(|scope| scope.split_whitespace().map(ToString::to_string).collect()),
            })
        })
    }
}

#[derive(Deserialize)]
struct TokenResponseBody {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorBody {
    error: String,
}

/// Builds the token source an authorization block describes; `None` when the
/// block disables authorization.
pub fn token_source_from_config(
    authorization: &AuthorizationConfig,
    security: &SecurityConfig,
    timeout: Duration,
) -> Result<Option<Box<dyn TokenSource>>, AuthError> {
    match authorization {
        AuthorizationConfig::None => Ok(None),
        AuthorizationConfig::Bearer {
            token_env,
            expires_in,
            ..
        } => {
            let mut source = EnvTokenSource::new(token_env.clone());
            if let Some(seconds) = expires_in {
                source = source.with_expires_in(Duration::from_secs(*seconds));
            }
            Ok(Some(Box::new(source)))
        }
        AuthorizationConfig::Oauth2 {
            token_url,
            client_id,
            client_secret_env,
            scopes,
            audience,
            ..
        } => {
            let client = Client::builder()
                .timeout(timeout)
                .danger_accept_invalid_certs(!security.validate_ssl)
                .build()
                .map_err(|err| {
                    AuthError::unauthenticated(format!("failed to build token client: {err}"))
                })?;

            let mut source = ClientCredentialsSource::new(client, token_url.clone(), client_id.clone())
                .with_scopes(scopes.iter().cloned());
            if let Some(variable) = client_secret_env {
                let secret = std::env::var(variable).map_err(|_| {
                    AuthError::unauthenticated(format!(
                        "environment variable '{variable}' is not set"
                    ))
                })?;
                source = source.with_client_secret(secret);
            }
            if let Some(audience) = audience {
                source = source.with_audience(audience.clone());
            }

            Ok(Some(Box::new(source)))
        }
    }
}
