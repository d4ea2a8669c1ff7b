//! Implements `SpendSheet` using the `sheets::Client` to read the spend
//! workbook from Google.

use crate::api::{SpendSheet, TokenProvider};
use crate::cache::{Clock, FreshnessStamp};
use crate::error::ProviderError;
use crate::{Config, Result};
use anyhow::Context;
use sheets::types::{DateTimeRenderOption, Dimension, ValueRenderOption};
use sheets::ClientError;
use std::sync::Arc;
use tracing::trace;

/// Reads the spend workbook through the Google Sheets API, taking a fresh
/// client per call so the access token is always current.
#[derive(Debug)]
pub(super) struct GoogleSpendSheet {
    spreadsheet_id: String,
    token_provider: TokenProvider,
}

impl GoogleSpendSheet {
    pub(super) async fn new(
        config: &Config,
        clock: Arc<dyn Clock>,
        stamp: Arc<FreshnessStamp>,
    ) -> Result<Self> {
        let token_provider = TokenProvider::load(config, clock, stamp).await?;
        Ok(Self {
            spreadsheet_id: config.spreadsheet_id().to_string(),
            token_provider,
        })
    }

    /// Creates a sheets client with a refreshed access token.
    ///
    /// Note: The sheets crate wants client_id, client_secret, and redirect_uri,
    /// but API calls only need the access token; we handle refresh ourselves.
    async fn client(&self) -> Result<sheets::Client, ProviderError> {
        let access_token = self.token_provider.token_with_refresh().await?;
        Ok(sheets::Client::new(
            String::new(),
            String::new(),
            String::new(),
            access_token,
            String::new(),
        ))
    }
}

#[async_trait::async_trait]
impl SpendSheet for GoogleSpendSheet {
    async fn sheet_names(&self) -> Result<Vec<String>, ProviderError> {
        trace!("sheet_names");
        let client = self.client().await?;
        let response = client
            .spreadsheets()
            .get(&self.spreadsheet_id, false, &[])
            .await
            .map_err(map_client_error)
            .context("Failed to fetch the spreadsheet's sheet list")
            .map_err(ProviderError::Request)?;
        Ok(response
            .body
            .sheets
            .into_iter()
            .filter_map(|sheet| sheet.properties.map(|p| p.title))
            .collect())
    }

    async fn rows(&self, sheet_name: &str) -> Result<Vec<Vec<String>>, ProviderError> {
        trace!("rows for {sheet_name}");
        let client = self.client().await?;
        let range = format!("{sheet_name}!A:ZZ"); // Get all columns
        let response = client
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                &range,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch {sheet_name} sheet data"))
            .map_err(ProviderError::Request)?;
        Ok(response.body.values)
    }
}

fn map_client_error(e: sheets::ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    Err::<(), ClientError>(e).context(error_name).err().unwrap()
}
