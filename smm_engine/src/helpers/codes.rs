use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;

pub const PROMO_CODE_LENGTH: usize = 8;
pub const REFERENCE_NONCE_LENGTH: usize = 6;

/// A random alphanumeric promo code of [`PROMO_CODE_LENGTH`] characters.
pub fn random_promo_code() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(PROMO_CODE_LENGTH).map(char::from).collect()
}

/// A random lowercase alphanumeric suffix for payment references.
pub fn reference_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERENCE_NONCE_LENGTH)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

static LINK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("The order link pattern is a valid regex"));

/// Order links must be absolute http(s) URLs.
pub fn is_valid_link(link: &str) -> bool {
    LINK_PATTERN.is_match(link.trim())
}

/// What a `/start` deep-link parameter asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartParameter {
    /// A special link. The whole parameter is the promo code to redeem.
    SpecialLink(String),
    /// A referral by the given user id.
    Referral(i64),
    None,
}

pub fn parse_start_parameter(param: &str) -> StartParameter {
    let param = param.trim();
    if param.is_empty() {
        StartParameter::None
    } else if param.contains('_') {
        StartParameter::SpecialLink(param.to_string())
    } else {
        param.parse::<i64>().map(StartParameter::Referral).unwrap_or(StartParameter::None)
    }
}
