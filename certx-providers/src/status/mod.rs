//! Effective status of a certificate as shown to a verifier.
//!
//! The registry only persists `VALID` and `REVOKED` for issued certificates. Expiry is
//! derived here at presentation time from the expiration date and the current instant,
//! so a certificate the server has not re-examined yet is still reported as expired.

use serde::{Deserialize, Serialize};
use strum::Display;
use time::{macros::time, Date, OffsetDateTime, UtcOffset};

use crate::util::date::parse_date;


/// Persisted status of an issued certificate.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BaseStatus {
    Valid,
    Revoked,
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PresentationStatus {
    Valid,
    Revoked,
    Expired,
    NotFound,
}

impl From<BaseStatus> for PresentationStatus {
    fn from(value: BaseStatus) -> Self {
        match value {
            BaseStatus::Valid => Self::Valid,
            BaseStatus::Revoked => Self::Revoked,
        }
    }
}

/// Last instant at which a certificate expiring on `expiration_date` is still valid.
pub fn end_of_validity(expiration_date: Date, offset: UtcOffset) -> OffsetDateTime {
    expiration_date
        .with_time(time!(23:59:59.999))
        .assume_offset(offset)
}

/// Whether `now` is past the last valid instant. Local time is the offset of `now`.
pub fn is_expired(expiration_date: Option<Date>, now: OffsetDateTime) -> bool {
    expiration_date.is_some_and(|date| now > end_of_validity(date, now.offset()))
}

/// Pure and deterministic: revoked wins over everything, no expiration keeps the base
/// status, otherwise the certificate stays valid through its whole expiration day.
pub fn resolve_status(
    base: BaseStatus,
    expiration_date: Option<Date>,
    now: OffsetDateTime,
) -> PresentationStatus {
    match base {
        BaseStatus::Revoked => PresentationStatus::Revoked,
        BaseStatus::Valid if is_expired(expiration_date, now) => PresentationStatus::Expired,
        BaseStatus::Valid => PresentationStatus::Valid,
    }
}

/// Same as [`resolve_status`] for a date as received from the wire. A malformed date is
/// treated as no expiration.
pub fn resolve_status_raw(
    base: BaseStatus,
    expiration_date: Option<&str>,
    now: OffsetDateTime,
) -> PresentationStatus {
    let expiration_date = expiration_date.and_then(|raw| {
        let parsed = parse_date(raw);
        if parsed.is_none() {
            tracing::warn!(raw, "ignoring malformed expiration date");
        }
        parsed
    });

    resolve_status(base, expiration_date, now)
}
