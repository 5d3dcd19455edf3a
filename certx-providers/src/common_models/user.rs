use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use super::{
    macros::{impl_display, impl_string_id},
    non_blank,
};

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);
impl_display!(UserId);
impl_string_id!(UserId);

#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    User,
    Admin,
    SuperAdmin,
}

impl UserRole {
    /// Administrative roles must carry a chain address.
    pub fn is_administrative(&self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub address: Option<String>,
    pub role: UserRole,
    pub enabled: bool,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum UserValidationError {
    #[error("Missing chain address for role `{0}`")]
    MissingAddress(UserRole),
    #[error("Invalid chain address: `{0}`")]
    InvalidAddress(String),
    #[error("Missing required field: `{0}`")]
    MissingField(&'static str),
}

/// Applies the address rule: required and well-formed for administrative roles,
/// cleared for plain users.
pub fn normalize_address(
    role: UserRole,
    address: Option<&str>,
) -> Result<Option<String>, UserValidationError> {
    if !role.is_administrative() {
        return Ok(None);
    }

    let address = non_blank(address).ok_or(UserValidationError::MissingAddress(role))?;
    if !is_chain_address(address) {
        return Err(UserValidationError::InvalidAddress(address.to_owned()));
    }

    Ok(Some(address.to_owned()))
}

fn is_chain_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
