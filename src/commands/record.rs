use crate::commands::Out;
use crate::model::{format_currency, Postback};
use crate::{utils, Config, Result};
use anyhow::Context;
use std::path::Path;

/// Books a postback event into the ledger. The JSON payload comes from `file`
/// when given, otherwise from stdin.
pub async fn record(config: &Config, file: Option<&Path>) -> Result<Out<Postback>> {
    let json = match file {
        Some(path) => utils::read(path).await?,
        None => std::io::read_to_string(std::io::stdin())
            .context("Failed to read the postback payload from stdin")?,
    };
    let postback: Postback =
        serde_json::from_str(&json).context("Failed to parse the postback payload")?;

    super::ledger(config).record_event(&postback).await?;
    Ok(Out::new(
        format!(
            "Recorded {} for buyer '{}'",
            format_currency(postback.amount()),
            postback.buyer_name()
        ),
        postback,
    ))
}
