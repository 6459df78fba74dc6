use chrono::{DateTime, Utc};
use rand::Rng;

/// One-time code width, in decimal digits.
pub const CODE_LEN: usize = 6;

/// Uniform 6-digit code from the thread-local CSPRNG. Leading zeros are kept,
/// so "004217" is a valid code.
pub fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{:06}", n)
}

/// Checks a submitted code against the stored one. Fails closed: no stored
/// code, unparseable expiry, or an expiry in the past all reject.
pub fn code_is_valid(
    stored_code: Option<&str>,
    stored_expiry: Option<&str>,
    submitted: &str,
    now: DateTime<Utc>,
) -> bool {
    let (Some(code), Some(expiry)) = (stored_code, stored_expiry) else {
        return false;
    };
    let Ok(expires_at) = DateTime::parse_from_rfc3339(expiry) else {
        return false;
    };
    if now >= expires_at {
        return false;
    }
    code == submitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn exact_match_within_window_passes() {
        let now = Utc::now();
        let expiry = (now + Duration::minutes(5)).to_rfc3339();
        assert!(code_is_valid(Some("123456"), Some(&expiry), "123456", now));
    }

    #[test]
    fn wrong_code_fails() {
        let now = Utc::now();
        let expiry = (now + Duration::minutes(5)).to_rfc3339();
        assert!(!code_is_valid(Some("123456"), Some(&expiry), "123457", now));
    }

    #[test]
    fn expired_code_fails() {
        let now = Utc::now();
        let expiry = (now - Duration::seconds(1)).to_rfc3339();
        assert!(!code_is_valid(Some("123456"), Some(&expiry), "123456", now));
    }

    #[test]
    fn absent_code_fails_closed() {
        let now = Utc::now();
        let expiry = (now + Duration::minutes(5)).to_rfc3339();
        assert!(!code_is_valid(None, Some(&expiry), "123456", now));
        assert!(!code_is_valid(Some("123456"), None, "123456", now));
        assert!(!code_is_valid(Some("123456"), Some("not a date"), "123456", now));
    }
}
