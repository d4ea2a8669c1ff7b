//! OAuth 2.0 credential handling for the spend provider.
//!
//! `TokenProvider` is the credential cache: it holds the current access token
//! and its expiry, and silently refreshes it through the refresh-token grant
//! when a caller asks for a token near or past expiry. Authorization failures
//! propagate unchanged; there is no retry.

use crate::api::files::{SecretFile, TokenFile};
use crate::api::OAUTH_SCOPES;
use crate::cache::{Clock, FreshnessStamp};
use crate::error::ProviderError;
use crate::{Config, Result};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, RefreshToken,
    Scope, TokenResponse, TokenUrl,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Caches a short-lived authorized handle to the spend provider and
/// revalidates it on expiry.
#[derive(Debug)]
pub(crate) struct TokenProvider {
    secret: SecretFile,
    token_path: PathBuf,
    state: tokio::sync::Mutex<TokenFile>,
    clock: Arc<dyn Clock>,
    stamp: Arc<FreshnessStamp>,
}

impl TokenProvider {
    /// Loads the client secret and the persisted token from the config's
    /// secrets directory.
    pub(crate) async fn load(
        config: &Config,
        clock: Arc<dyn Clock>,
        stamp: Arc<FreshnessStamp>,
    ) -> Result<Self> {
        let secret = SecretFile::load(&config.client_secret_path()).await?;
        let token = TokenFile::load(&config.token_path()).await?;
        Ok(Self {
            secret,
            token_path: config.token_path(),
            state: tokio::sync::Mutex::new(token),
            clock,
            stamp,
        })
    }

    /// Returns a valid access token, refreshing first if the cached one has
    /// aged out. Touches the shared freshness stamp either way.
    pub(crate) async fn token_with_refresh(&self) -> Result<String, ProviderError> {
        let mut token = self.state.lock().await;
        let now = self.clock.now();
        if token.is_expired(now) {
            debug!("access token expired, refreshing");
            let (access, expires_at, rotated_refresh) =
                refresh(&self.secret, token.refresh_token(), now)
                    .await
                    .map_err(ProviderError::Authorization)?;
            token.update(access, expires_at, rotated_refresh);
            token
                .save(&self.token_path)
                .await
                .map_err(ProviderError::Authorization)?;
        }
        self.stamp.touch(now);
        Ok(token.access_token().to_string())
    }
}

/// Exchanges the refresh token for a fresh access token.
async fn refresh(
    secret: &SecretFile,
    refresh_token: &str,
    now: DateTime<Utc>,
) -> Result<(String, DateTime<Utc>, Option<String>)> {
    let client = oauth_client(secret)?;
    let http = http_client()?;
    let response = client
        .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
        .request_async(&http)
        .await
        .context("The OAuth refresh-token exchange was rejected")?;

    let expires_at = now
        + response
            .expires_in()
            .map(|d| Duration::from_std(d).unwrap_or_else(|_| Duration::hours(1)))
            .unwrap_or_else(|| Duration::hours(1));
    Ok((
        response.access_token().secret().to_string(),
        expires_at,
        response.refresh_token().map(|rt| rt.secret().to_string()),
    ))
}

/// Runs the consent flow: prints the authorization URL, reads the pasted code
/// from stdin, exchanges it, and persists the resulting token file.
pub(crate) async fn authorize(config: &Config) -> Result<()> {
    let secret = SecretFile::load(&config.client_secret_path()).await?;
    let client = oauth_client(&secret)?;

    let mut request = client.authorize_url(CsrfToken::new_random);
    for scope in OAUTH_SCOPES {
        request = request.add_scope(Scope::new((*scope).to_string()));
    }
    let (auth_url, _csrf) = request.add_extra_param("access_type", "offline").url();

    info!("Open this URL in your browser and approve access:");
    info!("{auth_url}");
    info!("Then paste the 'code' parameter from the redirect URL here and press enter:");

    let mut code = String::new();
    std::io::stdin()
        .read_line(&mut code)
        .context("Failed to read the authorization code from stdin")?;

    let http = http_client()?;
    let response = client
        .exchange_code(AuthorizationCode::new(code.trim().to_string()))
        .request_async(&http)
        .await
        .context("The OAuth code exchange was rejected")?;

    let now = Utc::now();
    let expires_at = now
        + response
            .expires_in()
            .map(|d| Duration::from_std(d).unwrap_or_else(|_| Duration::hours(1)))
            .unwrap_or_else(|| Duration::hours(1));
    let token = TokenFile::new(
        response.access_token().secret().to_string(),
        response
            .refresh_token()
            .map(|rt| rt.secret().to_string())
            .context("Google did not return a refresh token; revoke access and try again")?,
        expires_at,
    );
    token.save(&config.token_path()).await?;
    info!("Authorization successful, token saved to {}", config.token_path().display());
    Ok(())
}

fn oauth_client(
    secret: &SecretFile,
) -> Result<
    BasicClient<
        oauth2::EndpointSet,
        oauth2::EndpointNotSet,
        oauth2::EndpointNotSet,
        oauth2::EndpointNotSet,
        oauth2::EndpointSet,
    >,
> {
    Ok(BasicClient::new(ClientId::new(secret.client_id().to_string()))
        .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
        .set_auth_uri(AuthUrl::new(secret.auth_uri().to_string()).context("Bad auth URI")?)
        .set_token_uri(TokenUrl::new(secret.token_uri().to_string()).context("Bad token URI")?)
        .set_redirect_uri(
            RedirectUrl::new("http://localhost".to_string()).context("Bad redirect URI")?,
        ))
}

fn http_client() -> Result<reqwest::Client> {
    // Following the oauth2 docs: redirects must be disabled to prevent SSRF
    // through the token endpoint.
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Failed to build the OAuth HTTP client")
}
