use serde::{Deserialize, Serialize};

use super::macros::{impl_display, impl_string_id};
use crate::validity::error::ValidityError;

/// User-chosen at creation, immutable afterwards.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialTypeId(String);
impl_display!(CredentialTypeId);
impl_string_id!(CredentialTypeId);

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidityOptionId(String);
impl_display!(ValidityOptionId);
impl_string_id!(ValidityOptionId);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CredentialType {
    pub id: CredentialTypeId,
    pub name: String,
    pub is_permanent: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidityOption {
    pub id: ValidityOptionId,
    pub credential_type_id: CredentialTypeId,
    pub period: ValidityPeriod,
    pub note: Option<String>,
}

/// Duration of a validity option, in calendar months or calendar days.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidityPeriod {
    Months(u32),
    Days(u32),
}

impl ValidityPeriod {
    /// Builds a period from the wire representation. Zero counts as unset.
    pub fn from_parts(months: Option<u32>, days: Option<u32>) -> Result<Self, ValidityError> {
        match (months.filter(|m| *m > 0), days.filter(|d| *d > 0)) {
            (Some(months), None) => Ok(Self::Months(months)),
            (None, Some(days)) => Ok(Self::Days(days)),
            (None, None) => Err(ValidityError::MissingPeriod),
            (Some(months), Some(days)) => Err(ValidityError::AmbiguousPeriod { months, days }),
        }
    }

    pub fn months(&self) -> Option<u32> {
        match self {
            Self::Months(months) => Some(*months),
            Self::Days(_) => None,
        }
    }

    pub fn days(&self) -> Option<u32> {
        match self {
            Self::Months(_) => None,
            Self::Days(days) => Some(*days),
        }
    }
}

impl std::fmt::Display for ValidityPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Months(1) => write!(f, "1 month"),
            Self::Months(months) => write!(f, "{months} months"),
            Self::Days(1) => write!(f, "1 day"),
            Self::Days(days) => write!(f, "{days} days"),
        }
    }
}
