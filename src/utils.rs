use rand::Rng;

/// Number of digits kept for a local mobile number.
const LOCAL_PHONE_DIGITS: usize = 9;

/// Reduces a phone number to digits and keeps the local 9-digit part.
///
/// `"+51904031408"` and `"51904031408"` both become `"904031408"`. Inputs with
/// nine digits or fewer are returned as their digits, without validation.
pub fn normalize_phone(input: &str) -> String {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= LOCAL_PHONE_DIGITS {
        return digits;
    }
    digits[digits.len() - LOCAL_PHONE_DIGITS..].to_string()
}

/// Six-digit numeric code used for password recovery.
pub fn generate_verification_code() -> String {
    rand::rng().random_range(100_000..1_000_000).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_country_code() {
        assert_eq!(normalize_phone("+51904031408"), "904031408");
        assert_eq!(normalize_phone("51904031408"), "904031408");
    }

    #[test]
    fn local_number_is_unchanged() {
        assert_eq!(normalize_phone("904031408"), "904031408");
    }

    #[test]
    fn short_input_passes_through() {
        assert_eq!(normalize_phone("12345"), "12345");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn non_digits_are_dropped() {
        assert_eq!(normalize_phone("+51 (904) 031-408"), "904031408");
        assert_eq!(normalize_phone("abc"), "");
    }

    #[test]
    fn verification_code_has_six_digits() {
        for _ in 0..100 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
