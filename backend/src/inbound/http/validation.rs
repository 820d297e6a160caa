//! Shared validation helpers for inbound HTTP adapters.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::domain::Error;

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidUuid,
    InvalidDate,
    InvalidTime,
    InvalidTimestamp,
    InvalidValue,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidDate => "invalid_date",
            ErrorCode::InvalidTime => "invalid_time",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidValue => "invalid_value",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

fn invalid_field(field: FieldName, message: String, code: ErrorCode, value: &str) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "value": value,
        "code": code.as_str(),
    }))
}

/// Reject `value` for `field`, listing what would have been accepted.
pub(crate) fn invalid_choice_error(field: FieldName, value: &str, expected: &str) -> Error {
    let name = field.as_str();
    invalid_field(
        field,
        format!("{name} must be one of: {expected}"),
        ErrorCode::InvalidValue,
        value,
    )
}

pub(crate) fn parse_uuid(value: &str, field: FieldName) -> Result<Uuid, Error> {
    let name = field.as_str();
    Uuid::parse_str(value.trim()).map_err(|_| {
        invalid_field(
            field,
            format!("{name} must be a valid UUID"),
            ErrorCode::InvalidUuid,
            value,
        )
    })
}

/// Parse an identifier newtype from its UUID text form.
pub(crate) fn parse_id<T: From<Uuid>>(value: &str, field: FieldName) -> Result<T, Error> {
    parse_uuid(value, field).map(T::from)
}

pub(crate) fn parse_optional_id<T: From<Uuid>>(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<T>, Error> {
    value.map(|raw| parse_id(raw, field)).transpose()
}

/// Parse an ISO 8601 calendar date (`YYYY-MM-DD`).
pub(crate) fn parse_date(value: &str, field: FieldName) -> Result<NaiveDate, Error> {
    let name = field.as_str();
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        invalid_field(
            field,
            format!("{name} must be a date formatted YYYY-MM-DD"),
            ErrorCode::InvalidDate,
            value,
        )
    })
}

/// Parse a wall-clock time as `HH:MM` or `HH:MM:SS`.
pub(crate) fn parse_time(value: &str, field: FieldName) -> Result<NaiveTime, Error> {
    let name = field.as_str();
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| {
            invalid_field(
                field,
                format!("{name} must be a time formatted HH:MM or HH:MM:SS"),
                ErrorCode::InvalidTime,
                value,
            )
        })
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    let name = field.as_str();
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw.trim())
                .map(|timestamp| timestamp.with_timezone(&Utc))
                .map_err(|_| {
                    invalid_field(
                        field,
                        format!("{name} must be an RFC 3339 timestamp"),
                        ErrorCode::InvalidTimestamp,
                        raw,
                    )
                })
        })
        .transpose()
}
