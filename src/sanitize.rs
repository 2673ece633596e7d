//! Output cleanup for generated text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MARKUP_NOISE: Regex = Regex::new(r"[#*]").expect("Invalid markup noise pattern");
}

/// Remove every `#` and `*`, then trim surrounding whitespace
pub fn clean(text: &str) -> String {
    MARKUP_NOISE.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clean_markdown_emphasis() {
        assert_eq!(clean("**Bold** #Name#"), "Bold Name");
    }

    #[test]
    fn test_clean_empty() {
        assert_eq!(clean(""), "");
    }

    #[test]
    fn test_clean_only_noise() {
        assert_eq!(clean("  ### *** \n"), "");
    }

    #[test]
    fn test_clean_keeps_inner_whitespace() {
        assert_eq!(
            clean("## Name: Aria\n\n**Background:** A sailor."),
            "Name: Aria\n\nBackground: A sailor."
        );
    }

    proptest! {
        #[test]
        fn prop_clean_is_idempotent(s in ".*") {
            let once = clean(&s);
            prop_assert_eq!(clean(&once), once);
        }

        #[test]
        fn prop_clean_removes_noise(s in "[a-z#* \t\n]{0,64}") {
            let out = clean(&s);
            prop_assert!(!out.contains('#'));
            prop_assert!(!out.contains('*'));
            prop_assert_eq!(out.trim(), out.as_str());
        }
    }
}
