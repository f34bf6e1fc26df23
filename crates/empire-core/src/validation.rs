//! Field validation applied at the API boundary.
//!
//! Every function returns the normalised value to store, so callers never
//! persist the raw input.

use url::Url;

use crate::error::{Error, Result};

/// Longest accepted comment, counted in characters after trimming.
pub const COMMENT_MAX_CHARS: usize = 1000;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;

const NAME_STRIPPED: &[char] = &['<', '>', '&', '"', '\''];

/// Trim a comment body and check it is 1..=`max_chars` characters.
pub fn comment_body(raw: &str, max_chars: usize) -> Result<String> {
    let body = raw.trim();
    let len = body.chars().count();
    if len == 0 {
        return Err(Error::validation("Comment content must not be empty"));
    }
    if len > max_chars {
        return Err(Error::validation(format!(
            "Comment content must be at most {max_chars} characters"
        )));
    }
    Ok(body.to_string())
}

/// Strip markup characters from a display name and check its length.
pub fn profile_name(raw: &str) -> Result<String> {
    let stripped: String = raw.chars().filter(|c| !NAME_STRIPPED.contains(c)).collect();
    let name = stripped.trim();
    let len = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(Error::validation(format!(
            "Full name must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

/// Accept only absolute `http`/`https` URLs.
pub fn http_url(field: &str, raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())
        .map_err(|_| Error::validation(format!("{field} must be a valid URL")))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(Error::validation(format!(
            "{field} must use http or https, not {other}"
        ))),
    }
}

/// Upper-case a promotion code and restrict it to `[A-Z0-9_-]{3,32}`.
pub fn promotion_code(raw: &str) -> Result<String> {
    let code = raw.trim().to_ascii_uppercase();
    let valid_chars = code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !(3..=32).contains(&code.len()) || !valid_chars {
        return Err(Error::validation(
            "Promotion code must be 3-32 characters of A-Z, 0-9, '_' or '-'",
        ));
    }
    Ok(code)
}

/// Lower-case a category slug and restrict it to `[a-z0-9-]`.
pub fn slug(raw: &str) -> Result<String> {
    let slug = raw.trim().to_ascii_lowercase();
    let valid = !slug.is_empty()
        && slug.len() <= 64
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(Error::validation(
            "Slug must be 1-64 characters of a-z, 0-9 or '-'",
        ));
    }
    Ok(slug)
}

/// Trim a required text field and bound its length.
pub fn required_text(field: &str, raw: &str, max_chars: usize) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    if text.chars().count() > max_chars {
        return Err(Error::validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(text.to_string())
}

/// Prices and money bounds: finite and non-negative.
pub fn money(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(value)
}

/// Lower-case and sanity-check an email address.
pub fn email(raw: &str) -> Result<String> {
    let email = raw.trim().to_ascii_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
        && !email.contains(char::is_whitespace);
    if !valid {
        return Err(Error::validation("Email address is invalid"));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_length_boundaries() {
        let exact = "a".repeat(1000);
        assert_eq!(comment_body(&exact, COMMENT_MAX_CHARS).unwrap().len(), 1000);

        let over = "a".repeat(1001);
        assert!(comment_body(&over, COMMENT_MAX_CHARS).is_err());

        assert!(comment_body("", COMMENT_MAX_CHARS).is_err());
        assert!(comment_body("   \n\t ", COMMENT_MAX_CHARS).is_err());
    }

    #[test]
    fn comment_length_counts_characters_after_trim() {
        let padded = format!("  {}  ", "é".repeat(1000));
        assert!(comment_body(&padded, COMMENT_MAX_CHARS).is_ok());
        assert_eq!(comment_body("  hi  ", COMMENT_MAX_CHARS).unwrap(), "hi");
    }

    #[test]
    fn profile_name_strips_markup() {
        assert_eq!(
            profile_name("  <b>Nguyen & \"Van\" A</b> ").unwrap(),
            "bNguyen  Van A/b"
        );
        assert!(profile_name("a").is_err());
        assert!(profile_name("<>").is_err());
        assert!(profile_name(&"x".repeat(51)).is_err());
        assert!(profile_name(&"x".repeat(50)).is_ok());
    }

    #[test]
    fn avatar_must_be_http() {
        assert!(http_url("avatar_url", "https://cdn.example.com/a.png").is_ok());
        assert!(http_url("avatar_url", "http://example.com/a.png").is_ok());
        assert!(http_url("avatar_url", "javascript:alert(1)").is_err());
        assert!(http_url("avatar_url", "ftp://example.com/a.png").is_err());
        assert!(http_url("avatar_url", "/relative/a.png").is_err());
    }

    #[test]
    fn promotion_code_is_upper_cased() {
        assert_eq!(promotion_code(" tet2025 ").unwrap(), "TET2025");
        assert!(promotion_code("ab").is_err());
        assert!(promotion_code("SALE 50").is_err());
    }

    #[test]
    fn slugs() {
        assert_eq!(slug("Streaming-Services").unwrap(), "streaming-services");
        assert!(slug("-bad").is_err());
        assert!(slug("with space").is_err());
    }

    #[test]
    fn emails() {
        assert_eq!(email(" Alice@Example.com ").unwrap(), "alice@example.com");
        assert!(email("alice").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("alice@localhost").is_err());
    }

    #[test]
    fn money_rejects_negative_and_nan() {
        assert!(money("price_usd", 0.0).is_ok());
        assert!(money("price_usd", -0.01).is_err());
        assert!(money("price_usd", f64::NAN).is_err());
    }
}
