use rand::rngs::OsRng;
use rand::Rng;

use crate::config::{DUMMY_OTP, OTP_LENGTH};

/// Minimum digits a phone number must have after normalization.
pub const MIN_PHONE_DIGITS: usize = 10;

/// Keeps digits only.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

pub fn is_valid_phone(normalized: &str) -> bool {
    normalized.len() >= MIN_PHONE_DIGITS
}

/// A random code of `OTP_LENGTH` digits with no leading zero, or the fixed dummy code.
pub fn generate_code(allow_dummy: bool) -> String {
    if allow_dummy {
        return DUMMY_OTP.to_string();
    }
    let min = 10u32.pow(OTP_LENGTH - 1);
    let max = 10u32.pow(OTP_LENGTH);
    OsRng.gen_range(min..max).to_string()
}

/// Whether `code` is the dummy code and dummy codes are accepted.
pub fn is_dummy(code: &str, allow_dummy: bool) -> bool {
    allow_dummy && code == DUMMY_OTP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+91 98765-43210"), "919876543210");
        assert_eq!(normalize_phone("(987) 654 3210"), "9876543210");
        assert!(!is_valid_phone(&normalize_phone("12345")));
        assert!(is_valid_phone(&normalize_phone("98765 43210")));
    }

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code(false);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn test_dummy_code() {
        assert_eq!(generate_code(true), "123456");
        assert!(is_dummy("123456", true));
        assert!(!is_dummy("123456", false));
        assert!(!is_dummy("654321", true));
    }
}
