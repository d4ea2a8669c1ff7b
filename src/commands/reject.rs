use crate::commands::Out;
use crate::model::format_currency;
use crate::{Config, Result};

/// Sets a buyer's manual reject adjustment.
pub async fn reject(config: &Config, buyer: &str, amount: f64) -> Result<Out<()>> {
    super::ledger(config).set_reject(buyer, amount).await?;
    Ok(Out::new_message(format!(
        "Set the reject adjustment for '{buyer}' to {}",
        format_currency(amount)
    )))
}
