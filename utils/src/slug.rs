//! URL slug rules.
//!
//! A slug is a non-empty ASCII string of letters, digits, `-` and `_`, at
//! most [`MAX_SLUG_LEN`] bytes long.

pub const MAX_SLUG_LEN: usize = 32;

/// Returns `true` when `value` is a well-formed slug.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_SLUG_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_slugs() {
        assert!(is_valid_slug("breakfast"));
        assert!(is_valid_slug("gluten-free"));
        assert!(is_valid_slug("main_course_2"));
    }

    #[test]
    fn rejects_empty_and_unsafe() {
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("two words"));
        assert!(!is_valid_slug("a/b"));
        assert!(!is_valid_slug("завтрак"));
    }

    #[test]
    fn rejects_overlong() {
        let long = "a".repeat(MAX_SLUG_LEN + 1);
        assert!(!is_valid_slug(&long));
        assert!(is_valid_slug(&long[..MAX_SLUG_LEN]));
    }
}
