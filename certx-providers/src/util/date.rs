//! Wire formats for calendar dates and instants.

use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};

/// Parses `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp in its own offset.
pub fn parse_date(value: &str) -> Option<Date> {
    let value = value.trim();

    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| OffsetDateTime::parse(value, &Rfc3339).ok().map(|at| at.date()))
}

pub fn parse_instant(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value.trim(), &Rfc3339).ok()
}

pub fn format_date(date: Date) -> String {
    // `[year]-[month]-[day]` cannot fail for dates in the supported range
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

pub fn format_instant(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}
