use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the home directory, config file, secrets directory and an empty
/// database.
pub async fn init(
    home: &Path,
    client_secret: &Path,
    sheet_url: &str,
    utc_offset: Option<&str>,
) -> Result<Out<()>> {
    let config = Config::create(home, client_secret, sheet_url, utc_offset).await?;
    Ok(Out::new_message(format!(
        "Initialized afftrack home at {}, now run 'afftrack auth'",
        config.root().display()
    )))
}
