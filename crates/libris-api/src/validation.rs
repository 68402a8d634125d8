//! Field rules for incoming requests and the partial-update validator.

use chrono::{Datelike, Utc};
use serde::Serialize;
use serde_json::Value as Json;

use libris_db::{Fields, Value};
use libris_types::api::{CreateAuthorRequest, CreateBookRequest, UpdateBookRequest};

use crate::error::{ApiError, ApiResult};

const PASSWORD_SPECIALS: &str = "@$!%*?&";

fn invalid(msg: impl Into<String>) -> ApiError {
    ApiError::Validation(msg.into())
}

fn current_year() -> i32 {
    Utc::now().year()
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> ApiResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(invalid(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> ApiResult<()> {
    if email.chars().count() > 100 {
        return Err(invalid("email must be at most 100 characters"));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !domain.chars().any(char::is_whitespace)
                && !local.chars().any(char::is_whitespace)
                && domain
                    .split_once('.')
                    .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(invalid("email is not a valid email address"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> ApiResult<()> {
    check_length("password", password, 8, 128)?;
    let strong = password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if !strong {
        return Err(invalid(
            "Password should contain at least one uppercase letter, one lowercase letter, \
             one digit, and one special character @$!%*?&.",
        ));
    }
    Ok(())
}

pub fn validate_author_name(name: &str) -> ApiResult<()> {
    check_length("name", name, 2, 64)?;
    if !name
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'')
    {
        return Err(invalid(
            "name may only contain letters, spaces, hyphens and apostrophes",
        ));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> ApiResult<()> {
    check_length("title", title, 2, 50)?;
    if !title
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || matches!(c, '-' | '\'' | '.'))
    {
        return Err(invalid(
            "title may only contain letters, spaces, hyphens, apostrophes and periods",
        ));
    }
    Ok(())
}

pub fn validate_published_year(year: i32) -> ApiResult<()> {
    let max = current_year();
    if !(1800..=max).contains(&year) {
        return Err(invalid(format!("published_year must be between 1800 and {max}")));
    }
    Ok(())
}

pub fn validate_new_author(req: &CreateAuthorRequest) -> ApiResult<()> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    validate_author_name(&req.name)?;
    if let Some(biography) = &req.biography {
        check_length("biography", biography, 16, 256)?;
    }
    if let Some(year) = req.birth_year {
        let max = current_year();
        if !(0..=max).contains(&year) {
            return Err(invalid(format!("birth_year must be between 0 and {max}")));
        }
    }
    if let Some(nationality) = &req.nationality {
        check_length("nationality", nationality, 2, 100)?;
    }
    Ok(())
}

pub fn validate_new_book(req: &CreateBookRequest) -> ApiResult<()> {
    validate_title(&req.title)?;
    validate_published_year(req.published_year)
}

/// Columns the caller actually wants to change.
///
/// Fields left unset and fields explicitly set to `null` are dropped; an
/// empty result is rejected so a no-op request never reaches the store.
pub fn update_fields<T: Serialize>(request: &T) -> ApiResult<Fields> {
    let json = serde_json::to_value(request)
        .map_err(|e| ApiError::Internal(format!("cannot inspect update request: {e}")))?;
    let Json::Object(map) = json else {
        return Err(ApiError::NoFieldsToUpdate);
    };

    let mut fields = Fields::new();
    for (column, value) in map {
        if let Some(value) = to_sql(value) {
            fields.set(&column, value);
        }
    }

    if fields.is_empty() {
        return Err(ApiError::NoFieldsToUpdate);
    }
    Ok(fields)
}

fn to_sql(value: Json) -> Option<Value> {
    match value {
        Json::Null => None,
        Json::Bool(b) => Some(Value::Integer(i64::from(b))),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Integer)
            .or_else(|| n.as_f64().map(Value::Real)),
        Json::String(s) => Some(Value::Text(s)),
        other => Some(Value::Text(other.to_string())),
    }
}

/// Rules of the creation request, applied to whatever the update keeps.
pub fn validate_book_update(req: &UpdateBookRequest) -> ApiResult<()> {
    if let Some(title) = &req.title {
        validate_title(title)?;
    }
    if let Some(year) = req.published_year {
        validate_published_year(year)?;
    }
    Ok(())
}
