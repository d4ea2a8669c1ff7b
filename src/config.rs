//! Configuration file handling.
//!
//! The configuration file is stored at `$AFFTRACK_HOME/config.json` and holds
//! the spend workbook URL, the reference timezone for calendar-day boundaries,
//! and the authentication file paths. The SQLite database and the `.secrets`
//! directory also live under the home directory.

use crate::db::Db;
use crate::{utils, Result};
use anyhow::{bail, Context};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const APP_NAME: &str = "afftrack";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const TOKEN_JSON: &str = "token.json";
const CONFIG_JSON: &str = "config.json";
const AFFTRACK_SQLITE: &str = "afftrack.sqlite";

/// The calendar day used by the ledger defaults to this UTC offset unless the
/// config says otherwise. Making it configuration rather than a constant keeps
/// day-boundary behavior reproducible in tests.
const DEFAULT_UTC_OFFSET: &str = "+03:00";

/// Represents the app's home directory. Instantiate it with the path to
/// `$AFFTRACK_HOME`; from there it loads `config.json` and provides paths to
/// the other items expected inside the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    spreadsheet_id: String,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the home directory and its contents:
    /// - an initial `config.json` built from `sheet_url` and `utc_offset`
    /// - the `.secrets` directory, into which `secret_file` is moved
    /// - an empty, migrated SQLite database
    pub async fn create(
        dir: impl Into<PathBuf>,
        secret_file: &Path,
        sheet_url: &str,
        utc_offset: Option<&str>,
    ) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the afftrack home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets_dir = root.join(SECRETS);
        utils::make_dir(&secrets_dir).await?;

        // Move the OAuth client credentials file to its default location.
        let secret_destination = secrets_dir.join(CLIENT_SECRET_JSON);
        utils::rename(secret_file, secret_destination).await?;
        let config_path = root.join(CONFIG_JSON);

        let offset = utc_offset.unwrap_or(DEFAULT_UTC_OFFSET);
        parse_offset(offset)?;

        let config_file = ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            sheet_url: sheet_url.to_string(),
            reference_utc_offset: offset.to_string(),
            client_secret_path: None,
            token_path: None,
        };
        config_file.save(&config_path).await?;

        let db_path = root.join(AFFTRACK_SQLITE);
        let db = Db::init(&db_path)
            .await
            .context("Unable to create SQLite DB")?;

        let spreadsheet_id = extract_spreadsheet_id(sheet_url)
            .context("Failed to extract spreadsheet ID from sheet URL")?;

        Ok(Self {
            root,
            secrets: secrets_dir,
            config_path,
            config_file,
            db,
            spreadsheet_id,
            sqlite_path: db_path,
        })
    }

    /// Validates that the home directory and config file exist, loads the
    /// config, and opens the database.
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("afftrack home is missing, run 'afftrack init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        parse_offset(&config_file.reference_utc_offset)?;

        let spreadsheet_id = extract_spreadsheet_id(&config_file.sheet_url)
            .context("Failed to extract spreadsheet ID from sheet URL")?;

        let db_path = root.join(AFFTRACK_SQLITE);
        let db = Db::load(&db_path)
            .await
            .context("Unable to load SQLite DB")?;

        Ok(Self {
            root: root.clone(),
            secrets: root.join(SECRETS),
            config_path,
            config_file,
            db,
            spreadsheet_id,
            sqlite_path: db_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn sheet_url(&self) -> &str {
        &self.config_file.sheet_url
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    /// The timezone whose calendar day partitions revenue records.
    pub fn reference_timezone(&self) -> FixedOffset {
        // Validated at create/load time.
        parse_offset(&self.config_file.reference_utc_offset)
            .unwrap_or_else(|_| FixedOffset::east_opt(0).unwrap())
    }

    pub(crate) fn client_secret_path(&self) -> PathBuf {
        match &self.config_file.client_secret_path {
            Some(path) => path.clone(),
            None => self.secrets.join(CLIENT_SECRET_JSON),
        }
    }

    pub(crate) fn token_path(&self) -> PathBuf {
        match &self.config_file.token_path {
            Some(path) => path.clone(),
            None => self.secrets.join(TOKEN_JSON),
        }
    }
}

/// The serialized form of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct ConfigFile {
    app_name: String,
    config_version: u8,
    /// The URL of the Google Sheet where ad spend is recorded, e.g.
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    sheet_url: String,
    /// UTC offset, e.g. "+03:00", defining the calendar-day boundary.
    reference_utc_offset: String,
    /// Overrides the default `.secrets/client_secret.json` location.
    client_secret_path: Option<PathBuf>,
    /// Overrides the default `.secrets/token.json` location.
    token_path: Option<PathBuf>,
}

impl ConfigFile {
    async fn load(path: &Path) -> Result<Self> {
        let config: ConfigFile = utils::deserialize(path).await?;
        if config.app_name != APP_NAME {
            bail!(
                "Unexpected app_name '{}' in '{}'",
                config.app_name,
                path.display()
            );
        }
        Ok(config)
    }

    async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        utils::write(path, json).await
    }
}

fn parse_offset(offset: &str) -> Result<FixedOffset> {
    FixedOffset::from_str(offset)
        .map_err(|e| anyhow::anyhow!("Invalid UTC offset '{offset}': {e}"))
}

/// Pulls the spreadsheet ID out of a Google Sheets URL: the path segment
/// following `/d/`.
fn extract_spreadsheet_id(sheet_url: &str) -> Result<String> {
    let url = url::Url::parse(sheet_url).with_context(|| format!("Invalid URL '{sheet_url}'"))?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();
    let id = segments
        .iter()
        .position(|s| *s == "d")
        .and_then(|ix| segments.get(ix + 1))
        .filter(|s| !s.is_empty());
    match id {
        Some(id) => Ok((*id).to_string()),
        None => bail!("The URL '{sheet_url}' does not contain a spreadsheet ID"),
    }
}
