//! Normalisation of free-text answers collected during a booking.

use chrono::{Datelike, NaiveDate};
use shared::text::escape_markup;
use strsim::normalized_damerau_levenshtein;
use thiserror::Error;
use validator::ValidateEmail;

/// Domains whose near-miss spellings are treated as typos.
pub const COMMON_EMAIL_DOMAINS: [&str; 5] =
    ["gmail.com", "yahoo.com", "hotmail.com", "outlook.com", "aol.com"];

const DOMAIN_TYPO_THRESHOLD: f64 = 0.85;

const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y %B %d",
    "%A %B %d %Y",
];

const YEARLESS_FORMATS: [&str; 4] = ["%B %d %Y", "%b %d %Y", "%d %B %Y", "%d %b %Y"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("The date you provided is in the past. Please provide a future date.")]
    Past,
    #[error("Invalid date format. Please provide a valid date.")]
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmailError {
    #[error("email address is malformed")]
    Syntax,
    #[error("local part and domain cannot be identical")]
    LocalMatchesDomain,
    #[error("email domain seems invalid; did you mean {suggestion}?")]
    SuspectedTypo { suggestion: &'static str },
}

/// Parses a loosely written date and returns it as `YYYY-MM-DD`. Dates before `today`
/// are rejected.
pub fn standardize_date(raw: &str, today: NaiveDate) -> Result<String, DateError> {
    let cleaned = clean_date_text(raw);
    if cleaned.is_empty() {
        return Err(DateError::Invalid);
    }

    let parsed = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
        .or_else(|| {
            let with_year = format!("{cleaned} {}", today.year());
            YEARLESS_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&with_year, fmt).ok())
        })
        .ok_or(DateError::Invalid)?;

    if parsed < today {
        return Err(DateError::Past);
    }
    Ok(parsed.format("%Y-%m-%d").to_string())
}

fn clean_date_text(raw: &str) -> String {
    raw.replace(',', " ")
        .split_whitespace()
        .filter(|token| !token.eq_ignore_ascii_case("on") && !token.eq_ignore_ascii_case("the"))
        .map(strip_ordinal)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_ordinal(token: &str) -> &str {
    let lower = token.to_ascii_lowercase();
    for suffix in ["st", "nd", "rd", "th"] {
        if lower.ends_with(suffix) {
            let head = &token[..token.len() - suffix.len()];
            if !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()) {
                return head;
            }
        }
    }
    token
}

/// Strips everything but digits; accepts exactly ten of them.
pub fn normalize_contact_number(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    (digits.len() == 10).then_some(digits)
}

/// Returns the address with its domain lower-cased.
///
/// Syntax is checked by `validator`, which accepts internationalised domains and
/// bracketed IP literals. On top of that the local part must be a dot-atom and a
/// named domain must have at least two labels.
pub fn validate_email(raw: &str) -> Result<String, EmailError> {
    let trimmed = raw.trim();
    if !trimmed.validate_email() {
        return Err(EmailError::Syntax);
    }
    let (local, domain) = trimmed.rsplit_once('@').ok_or(EmailError::Syntax)?;
    let ip_literal = domain.starts_with('[');
    if local.starts_with('.')
        || local.ends_with('.')
        || local.contains("..")
        || (!ip_literal && !domain.contains('.'))
    {
        return Err(EmailError::Syntax);
    }
    let domain = domain.to_lowercase();

    let domain_label = domain.split('.').next().unwrap_or_default();
    if local.to_lowercase() == domain_label {
        return Err(EmailError::LocalMatchesDomain);
    }

    for common in COMMON_EMAIL_DOMAINS {
        if domain != common && normalized_damerau_levenshtein(&domain, common) > DOMAIN_TYPO_THRESHOLD
        {
            return Err(EmailError::SuspectedTypo { suggestion: common });
        }
    }

    Ok(format!("{local}@{domain}"))
}

/// HTML-escapes user text before it is stored.
pub fn sanitize_input(raw: &str) -> String {
    escape_markup(raw)
}

/// Capitalises the first letter of every alphabetic run and lower-cases the rest.
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_alpha = false;
    for c in raw.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
#[path = "tests/validate_tests.rs"]
mod tests;
