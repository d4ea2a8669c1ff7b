use crate::cache::SystemClock;
use crate::commands::Out;
use crate::lookup::SpendSheets;
use crate::{api, Config, Mode, Result};
use std::sync::Arc;

/// Runs the OAuth consent flow and stores the resulting token.
pub async fn auth(config: &Config) -> Result<Out<()>> {
    api::authorize(config).await?;
    Ok(Out::new_message("Authorized with Google Sheets"))
}

/// Verifies the stored token by listing the workbook's sheets.
pub async fn auth_verify(config: &Config, mode: Mode) -> Result<Out<Vec<String>>> {
    let sheets = SpendSheets::connect(config, mode, Arc::new(SystemClock)).await?;
    let names = sheets.sheet_names().await?;
    Ok(Out::new(
        format!("Authorization OK, the workbook has {} sheet(s)", names.len()),
        names.as_ref().clone(),
    ))
}
