//! Target-to-filename matching
//!
//! A target selects a candidate file when either:
//!
//! - the candidate's final path segment equals the target exactly, or
//! - the candidate's final path segment is a generated name with at least seven `-` separated
//!   tokens and its "sign" (token 5, a dash, and token 6 up to its first `.`) equals the target.
//!
//! For example `ISR-03-44-nb-sbyq1-9g931q103q-utt.wav` has the sign `9g931q103q-utt`.
//!
//! ```
//! use common::matcher::matches;
//!
//! assert!(matches("foo.wav", "/a/b/foo.wav"));
//! assert!(matches("9g931q103q-utt", "/data/ISR-03-44-nb-sbyq1-9g931q103q-utt.wav"));
//! assert!(!matches("foo.wav", "/a/b/bar.wav"));
//! ```

/// Final segment of a path, splitting on both `/` and `\`.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Sign embedded in a generated file name, as `(prefix, suffix)`.
///
/// The key itself is `prefix + "-" + suffix`; it is returned in two parts so callers can compare
/// without allocating. Trailing empty tokens do not count, so `a-b-c-d-e-f-` has no sign.
pub fn sign(file_name: &str) -> Option<(&str, &str)> {
    let mut tokens = file_name.split('-');
    let prefix = tokens.nth(5)?;
    let last = tokens.next()?;
    if last.is_empty() && tokens.all(str::is_empty) {
        return None;
    }
    let suffix = last.split('.').next().unwrap_or(last);
    Some((prefix, suffix))
}

/// Sign key of a generated file name, e.g. `9g931q103q-utt`.
pub fn sign_key(file_name: &str) -> Option<String> {
    sign(file_name).map(|(prefix, suffix)| format!("{prefix}-{suffix}"))
}

fn sign_matches(target: &str, file_name: &str) -> bool {
    match sign(file_name) {
        Some((prefix, suffix)) => {
            target.len() == prefix.len() + 1 + suffix.len()
                && target.starts_with(prefix)
                && target[prefix.len()..].starts_with('-')
                && target.ends_with(suffix)
        }
        None => false,
    }
}

/// Match a target against an already extracted file name.
pub fn matches_name(target: &str, file_name: &str) -> bool {
    target == file_name || sign_matches(target, file_name)
}

/// Match a target against a full candidate path.
pub fn matches(target: &str, candidate_path: &str) -> bool {
    matches_name(target, file_name(candidate_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGN_TOKENS: usize = 7;
    const SIGNED: &str = "ISR-03-44-nb-sbyq1-9g931q103q-utt.wav";

    #[test]
    fn file_name_splits_on_both_separators() {
        assert_eq!(file_name("/a/b/foo.wav"), "foo.wav");
        assert_eq!(file_name("C:\\data\\foo.wav"), "foo.wav");
        assert_eq!(file_name("mixed/dir\\foo.wav"), "foo.wav");
        assert_eq!(file_name("foo.wav"), "foo.wav");
        assert_eq!(file_name("/a/b/"), "");
    }

    #[test]
    fn exact_rule() {
        assert!(matches("foo.wav", "/a/b/foo.wav"));
        assert!(!matches("foo.wav", "/a/b/bar.wav"));
        assert!(!matches("foo", "/a/b/foo.wav"));
        // directories in the path are not considered
        assert!(!matches("b", "/a/b/foo.wav"));
    }

    #[test]
    fn sign_rule() {
        assert_eq!(sign(SIGNED), Some(("9g931q103q", "utt")));
        assert_eq!(sign_key(SIGNED).as_deref(), Some("9g931q103q-utt"));
        assert!(matches("9g931q103q-utt", &format!("/data/x/{SIGNED}")));
        assert!(matches(SIGNED, &format!("/data/x/{SIGNED}")));
        assert!(!matches("9g931q103q", &format!("/data/x/{SIGNED}")));
        assert!(!matches("sbyq1-9g931q103q", &format!("/data/x/{SIGNED}")));
    }

    #[test]
    fn sign_rule_uses_seventh_token_even_with_more_tokens() {
        let name = "a-b-c-d-e-key-tail.x-more-tokens.wav";
        assert_eq!(sign(name), Some(("key", "tail")));
        assert!(matches_name("key-tail", name));
    }

    #[test]
    fn sign_suffix_without_extension() {
        assert_eq!(sign("a-b-c-d-e-f-g"), Some(("f", "g")));
        assert_eq!(sign("a-b-c-d-e-f-.wav"), Some(("f", "")));
        assert!(matches_name("f-", "a-b-c-d-e-f-.wav"));
    }

    #[test]
    fn trailing_dashes_are_not_tokens() {
        assert_eq!(sign("a-b-c-d-e-f-"), None);
        assert_eq!(sign("a-b-c-d-e-f---"), None);
        assert!(!matches_name("f-", "a-b-c-d-e-f-"));
        // an empty token followed by a real one still counts
        assert_eq!(sign("a-b-c-d-e-f--g"), Some(("f", "")));
        assert!(matches_name("f-", "a-b-c-d-e-f--g"));
    }

    #[test]
    fn fewer_than_seven_tokens_never_sign_match() {
        let name = "03-44-nb-sbyq1-9g931q103q-utt.wav";
        assert_eq!(name.split('-').count(), SIGN_TOKENS - 1);
        assert_eq!(sign(name), None);
        assert!(!matches("9g931q103q-utt", name));
        assert!(!matches("sbyq1-9g931q103q", name));
    }

    #[test]
    fn sign_is_taken_from_file_name_only() {
        // dashes in directory names must not contribute tokens
        let path = "/a-b-c-d-e/x-key/tail.wav";
        assert!(!matches("key-tail", path));
    }

    #[test]
    fn empty_target_matches_nothing_real() {
        assert!(!matches("", "/a/b/foo.wav"));
        assert!(!matches("", &format!("/a/{SIGNED}")));
    }

    #[test]
    fn deterministic_regardless_of_order() {
        let candidates = [
            format!("/x/{SIGNED}"),
            "/x/foo.wav".to_string(),
            "/y/9g931q103q-utt".to_string(),
        ];
        let forward: Vec<bool> = candidates
            .iter()
            .map(|c| matches("9g931q103q-utt", c))
            .collect();
        let mut backward: Vec<bool> = candidates
            .iter()
            .rev()
            .map(|c| matches("9g931q103q-utt", c))
            .collect();
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(forward, vec![true, false, true]);
    }
}
