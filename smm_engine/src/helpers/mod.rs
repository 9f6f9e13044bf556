mod codes;
mod pricing;

pub use codes::{
    is_valid_link,
    parse_start_parameter,
    random_promo_code,
    reference_nonce,
    StartParameter,
    PROMO_CODE_LENGTH,
    REFERENCE_NONCE_LENGTH,
};
pub use pricing::{order_cost, PriceError};
