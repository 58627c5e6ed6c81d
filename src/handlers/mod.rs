//! Per-resource HTTP handlers. Bodies are parsed into explicit request
//! structs and validated before any store access.

pub mod admin;
pub mod cascade;
pub mod sclass;
pub mod student;
pub mod subject;
pub mod teacher;

use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};

use crate::error::{ApiError, ApiResult};

/// Boundary checks run after deserialization.
pub trait Validate {
    fn validate(&self) -> ApiResult<()>;
}

/// `Json<T>` that also runs `T::validate`; every rejection is an `ApiError`.
pub struct Valid<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

pub(crate) fn require(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn require_email(value: &str) -> ApiResult<()> {
    require("email", value)?;
    if !value.contains('@') {
        return Err(ApiError::validation("email is not valid"));
    }
    Ok(())
}

/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp, or a naive
/// `YYYY-MM-DDTHH:MM:SS`; only the calendar date is kept.
pub(crate) fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

pub(crate) fn calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date {raw:?}")))
}

/// Body of every `*Login` endpoint.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// Login only needs both fields; an unknown address is answered with 404.
impl Validate for LoginRequest {
    fn validate(&self) -> ApiResult<()> {
        require("email", &self.email)?;
        require("password", &self.password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(parse_calendar_date("2024-05-01"), Some(expected));
        assert_eq!(parse_calendar_date("2024-05-01T09:30:00Z"), Some(expected));
        assert_eq!(parse_calendar_date("2024-05-01T09:30:00.000"), Some(expected));
        assert_eq!(parse_calendar_date("May 1st"), None);
    }

    #[test]
    fn test_login_validation() {
        let ok = LoginRequest { email: "a@x.com".into(), password: "pw".into() };
        assert!(ok.validate().is_ok());
        let bare = LoginRequest { email: "ghost".into(), password: "pw".into() };
        assert!(bare.validate().is_ok());
        let missing = LoginRequest { email: "".into(), password: "pw".into() };
        assert!(matches!(missing.validate(), Err(ApiError::Validation(_))));
        let empty = LoginRequest { email: "a@x.com".into(), password: " ".into() };
        assert!(empty.validate().is_err());
    }
}
