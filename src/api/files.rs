//! Serialization structures for the Google OAuth credential files kept in the
//! `.secrets` directory:
//! - `client_secret.json`: OAuth 2.0 client credentials from Google Cloud Console
//! - `token.json`: our own shape for the access/refresh token pair

use crate::{utils, Result};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Represents the structure of the `client_secret.json` file downloaded from
/// Google Cloud Console. The standard format has an "installed" wrapper around
/// the actual credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(super) struct SecretFile {
    installed: InstalledCredentials,
}

impl SecretFile {
    pub(super) async fn load(path: &Path) -> Result<SecretFile> {
        utils::deserialize(path)
            .await
            .context("Unable to read the OAuth client secret file")
    }

    pub(super) fn client_id(&self) -> &str {
        &self.installed.client_id
    }

    pub(super) fn client_secret(&self) -> &str {
        &self.installed.client_secret
    }

    pub(super) fn auth_uri(&self) -> &str {
        &self.installed.auth_uri
    }

    pub(super) fn token_uri(&self) -> &str {
        &self.installed.token_uri
    }
}

/// The actual OAuth credentials nested within `client_secret.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
    auth_uri: String,
    token_uri: String,
}

/// How we save the token information received from Google OAuth. Our own
/// structure rather than Google's, to keep it ergonomic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(super) struct TokenFile {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenFile {
    pub(super) fn new(
        access_token: String,
        refresh_token: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    pub(super) async fn load(path: &Path) -> Result<Self> {
        utils::deserialize(path)
            .await
            .context("Unable to read the OAuth token file, run 'afftrack auth' first")
    }

    /// Saves to `path` with restrictive file permissions.
    pub(super) async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize token")?;
        utils::write(path, json).await?;

        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, Permissions::from_mode(0o600))
                .context("Failed to set token file permissions")?;
        }

        Ok(())
    }

    pub(super) fn access_token(&self) -> &str {
        &self.access_token
    }

    pub(super) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// True when the token has expired or will within five minutes.
    pub(super) fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + Duration::minutes(5)
    }

    pub(super) fn update(
        &mut self,
        access_token: String,
        expires_at: DateTime<Utc>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token;
        self.expires_at = expires_at;
        if let Some(rt) = refresh_token {
            self.refresh_token = rt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn token(expires_at: DateTime<Utc>) -> TokenFile {
        TokenFile::new("abc12".into(), "xyz89".into(), expires_at)
    }

    #[test]
    fn expiry_includes_buffer() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        assert!(token(now + Duration::minutes(4)).is_expired(now));
        assert!(!token(now + Duration::minutes(6)).is_expired(now));
        assert!(token(now - Duration::hours(1)).is_expired(now));
    }

    #[tokio::test]
    async fn save_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("token.json");
        let expires = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        token(expires).save(&path).await.unwrap();
        let loaded = TokenFile::load(&path).await.unwrap();
        assert_eq!(loaded.access_token(), "abc12");
        assert_eq!(loaded.refresh_token(), "xyz89");
    }

    #[tokio::test]
    async fn secret_file_parses_installed_wrapper() {
        let json = r#"
        {
            "installed": {
                "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
                "client_secret": "YOUR_CLIENT_SECRET",
                "redirect_uris": ["http://localhost"],
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        }"#;
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("client_secret.json");
        utils::write(&path, json).await.unwrap();
        let secret = SecretFile::load(&path).await.unwrap();
        assert_eq!(
            secret.client_id(),
            "YOUR_CLIENT_ID.apps.googleusercontent.com"
        );
        assert_eq!(secret.token_uri(), "https://oauth2.googleapis.com/token");
    }
}
