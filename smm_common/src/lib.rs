mod money;

pub mod helpers;
pub mod op;
mod secret;

pub use money::{Money, MoneyConversionError, BASE_CURRENCY_CODE, MICROS_PER_UNIT};
pub use secret::Secret;
