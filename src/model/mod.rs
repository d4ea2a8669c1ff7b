mod buyer;
mod money;
mod postback;
mod record;
mod report;
mod spend;

pub use buyer::Buyer;
pub use money::format_currency;
pub(crate) use money::parse_spend_cell;
pub use postback::Postback;
pub use record::RevenueRecord;
pub use report::{BuyerSummary, DailyResult, RangeReport};
pub use spend::{DaySpend, ExpenseTotal};
