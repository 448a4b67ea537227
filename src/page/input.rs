//! Input field cleanup

/// Strip everything but ASCII digits from a phone number
///
/// Returns `None` when the value is already clean so callers can skip the
/// rewrite and leave the caret where it is.
pub fn sanitize_phone(input: &str) -> Option<String> {
    if input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(input.chars().filter(char::is_ascii_digit).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_value_untouched() {
        assert_eq!(sanitize_phone("5145550199"), None);
        assert_eq!(sanitize_phone(""), None);
    }

    #[test]
    fn test_strips_formatting() {
        assert_eq!(
            sanitize_phone("(514) 555-0199").as_deref(),
            Some("5145550199")
        );
        assert_eq!(sanitize_phone("+1 514").as_deref(), Some("1514"));
        assert_eq!(sanitize_phone("abc").as_deref(), Some(""));
    }

    #[test]
    fn test_non_ascii_digits_removed() {
        // Arabic-Indic digits are not accepted
        assert_eq!(sanitize_phone("٥١٤").as_deref(), Some(""));
    }
}
