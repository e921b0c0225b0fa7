use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating S3 bucket names
    /// 3-63 characters, lowercase letters, digits, dots and hyphens,
    /// starting and ending with a letter or digit
    /// - Valid: "photos", "my-app.uploads", "a1b"
    /// - Invalid: "ab", "-photos", "photos-", "Photos", "photo_bucket"
    pub static ref BUCKET_NAME_REGEX: Regex =
        Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").unwrap();

    /// Regex for `{name}` placeholders in path templates. Any braced name
    /// matches so that misspelled placeholders are reported, not copied.
    pub static ref PLACEHOLDER_REGEX: Regex = Regex::new(r"\{([^{}]+)\}").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_name_regex_valid() {
        assert!(BUCKET_NAME_REGEX.is_match("photos"));
        assert!(BUCKET_NAME_REGEX.is_match("my-app.uploads"));
        assert!(BUCKET_NAME_REGEX.is_match("a1b"));
        assert!(BUCKET_NAME_REGEX.is_match(&"a".repeat(63)));
    }

    #[test]
    fn test_bucket_name_regex_invalid() {
        assert!(!BUCKET_NAME_REGEX.is_match("ab")); // too short
        assert!(!BUCKET_NAME_REGEX.is_match(&"a".repeat(64))); // too long
        assert!(!BUCKET_NAME_REGEX.is_match("-photos")); // starts with hyphen
        assert!(!BUCKET_NAME_REGEX.is_match("photos-")); // ends with hyphen
        assert!(!BUCKET_NAME_REGEX.is_match("Photos")); // uppercase
        assert!(!BUCKET_NAME_REGEX.is_match("photo_bucket")); // underscore
    }

    #[test]
    fn test_placeholder_regex_captures_names() {
        let names: Vec<&str> = PLACEHOLDER_REGEX
            .captures_iter("{class}/{id_partition}/{style}.jpg")
            .map(|c| c.get(1).unwrap().as_str())
            .collect();
        assert_eq!(names, vec!["class", "id_partition", "style"]);
    }

    #[test]
    fn test_placeholder_regex_matches_any_braced_name() {
        let names: Vec<&str> = PLACEHOLDER_REGEX
            .captures_iter("{Style}/{id2}/{file-name}/{}")
            .map(|c| c.get(1).unwrap().as_str())
            .collect();
        assert_eq!(names, vec!["Style", "id2", "file-name"]);
    }
}
