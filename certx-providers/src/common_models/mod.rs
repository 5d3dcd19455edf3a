pub mod audit;
pub mod certificate;
pub mod credential_type;
pub mod macros;
pub mod user;

/// Returns `None` for absent or whitespace-only input, otherwise the trimmed value.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
