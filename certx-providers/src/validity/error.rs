//! Enumerates errors of the validity policy.

use thiserror::Error;
use time::Date;

use crate::common_models::credential_type::ValidityOptionId;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ValidityError {
    #[error("Validity option has neither a month nor a day period")]
    MissingPeriod,
    #[error("Validity option sets both `{months}` months and `{days}` days")]
    AmbiguousPeriod { months: u32, days: u32 },
    #[error("Expiration date is required for non-permanent credentials")]
    ExpirationRequired,
    #[error("Unknown validity option: `{0}`")]
    UnknownValidityOption(ValidityOptionId),
    #[error("Expiration date `{expiration}` is before issued date `{issued}`")]
    ExpirationBeforeIssuance { issued: Date, expiration: Date },
    #[error("Expiration date out of range")]
    DateOutOfRange,
}
