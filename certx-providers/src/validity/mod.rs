//! Validity periods of credential types and the expiration date arithmetic built on them.
//!
//! A credential type is either permanent, in which case its certificates never carry an
//! expiration date, or it owns a set of named [`ValidityOption`]s. Every call site that
//! turns an issued date plus a chosen option into an expiration date (direct issuance,
//! approval, expiration updates) goes through [`resolve_expiration`].

use time::{Date, Duration, Month};

use crate::common_models::credential_type::{ValidityOption, ValidityOptionId, ValidityPeriod};

use self::error::ValidityError;

pub mod error;
pub mod policy;


/// Outcome of resolving a credential type to its validity rules.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResolvedPeriod {
    pub is_permanent: bool,
    pub options: Vec<ValidityOption>,
}

impl ResolvedPeriod {
    /// Fallback for unknown or deleted credential types: not permanent, no options,
    /// so the caller has to ask for a manual expiration date.
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn permanent() -> Self {
        Self {
            is_permanent: true,
            options: vec![],
        }
    }

    pub fn option(&self, id: &ValidityOptionId) -> Option<&ValidityOption> {
        self.options.iter().find(|option| &option.id == id)
    }

    pub fn requires_manual_expiration(&self) -> bool {
        !self.is_permanent && self.options.is_empty()
    }
}

/// How the caller picked an expiration date.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExpirationChoice {
    /// Derived from a named validity option.
    Option(ValidityOptionId),
    /// Entered directly and decoupled from any option.
    Custom(Date),
}

/// The concrete values persisted alongside a certificate.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResolvedExpiration {
    pub expiration_date: Option<Date>,
    pub validity_option_id: Option<ValidityOptionId>,
}

impl ResolvedExpiration {
    pub fn permanent() -> Self {
        Self::default()
    }
}

/// Adds `period` calendar months or days to `issued_date`.
///
/// Month arithmetic clamps to the last day of the target month, so 2024-02-29 plus
/// 12 months is 2025-02-28.
pub fn compute_expiration(
    issued_date: Date,
    period: ValidityPeriod,
) -> Result<Date, ValidityError> {
    match period {
        ValidityPeriod::Months(months) => add_months(issued_date, months),
        ValidityPeriod::Days(days) => issued_date.checked_add(Duration::days(days.into())),
    }
    .ok_or(ValidityError::DateOutOfRange)
}

fn add_months(date: Date, months: u32) -> Option<Date> {
    let total = i64::from(date.year()) * 12
        + i64::from(u8::from(date.month()) - 1)
        + i64::from(months);

    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = Month::try_from(u8::try_from(total.rem_euclid(12) + 1).ok()?).ok()?;
    let day = date.day().min(time::util::days_in_year_month(year, month));

    Date::from_calendar_date(year, month, day).ok()
}

/// Shared expiration resolution for issuance, approval and expiration updates.
///
/// Permanent types always resolve to no expiration, whatever was chosen.
pub fn resolve_expiration(
    period: &ResolvedPeriod,
    issued_date: Date,
    choice: Option<&ExpirationChoice>,
) -> Result<ResolvedExpiration, ValidityError> {
    if period.is_permanent {
        return Ok(ResolvedExpiration::permanent());
    }

    match choice {
        None => Err(ValidityError::ExpirationRequired),
        Some(ExpirationChoice::Option(id)) => {
            let option = period
                .option(id)
                .ok_or_else(|| ValidityError::UnknownValidityOption(id.to_owned()))?;

            Ok(ResolvedExpiration {
                expiration_date: Some(compute_expiration(issued_date, option.period)?),
                validity_option_id: Some(id.to_owned()),
            })
        }
        Some(ExpirationChoice::Custom(expiration)) => {
            if *expiration < issued_date {
                return Err(ValidityError::ExpirationBeforeIssuance {
                    issued: issued_date,
                    expiration: *expiration,
                });
            }

            Ok(ResolvedExpiration {
                expiration_date: Some(*expiration),
                validity_option_id: None,
            })
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Selection {
    None,
    Option {
        id: ValidityOptionId,
        period: ValidityPeriod,
    },
    Custom(Date),
}

/// Expiration being edited alongside an issued date.
///
/// With an option selected, changing the issued date recomputes the expiration from the
/// same option. A custom date stays frozen whatever the issued date becomes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExpirationSelection {
    issued_date: Date,
    selection: Selection,
}

impl ExpirationSelection {
    pub fn new(issued_date: Date) -> Self {
        Self {
            issued_date,
            selection: Selection::None,
        }
    }

    pub fn issued_date(&self) -> Date {
        self.issued_date
    }

    pub fn set_issued_date(&mut self, issued_date: Date) {
        self.issued_date = issued_date;
    }

    pub fn select_option(&mut self, option: &ValidityOption) {
        self.selection = Selection::Option {
            id: option.id.to_owned(),
            period: option.period,
        };
    }

    pub fn set_custom(&mut self, expiration_date: Date) {
        self.selection = Selection::Custom(expiration_date);
    }

    pub fn clear(&mut self) {
        self.selection = Selection::None;
    }

    pub fn expiration_date(&self) -> Result<Option<Date>, ValidityError> {
        match &self.selection {
            Selection::None => Ok(None),
            Selection::Option { period, .. } => {
                compute_expiration(self.issued_date, *period).map(Some)
            }
            Selection::Custom(date) => Ok(Some(*date)),
        }
    }

    pub fn choice(&self) -> Option<ExpirationChoice> {
        match &self.selection {
            Selection::None => None,
            Selection::Option { id, .. } => Some(ExpirationChoice::Option(id.to_owned())),
            Selection::Custom(date) => Some(ExpirationChoice::Custom(*date)),
        }
    }
}
