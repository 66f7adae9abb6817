mod helpers;
mod price;

pub mod op;

pub use helpers::{clamp_limit, clamp_message_limit, parse_boolean_flag, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use price::{Price, PriceConversionError, CURRENCY_MINOR_UNITS};
