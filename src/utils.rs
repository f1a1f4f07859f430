use std::sync::OnceLock;

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

fn debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| {
        debug_setting(
            std::env::var("GIT_AUTHORSHIP_DEBUG").ok().as_deref(),
            cfg!(debug_assertions),
        )
    })
}

/// `1`/`true` force logging on and `0`/`false` force it off; otherwise debug builds log
fn debug_setting(value: Option<&str>, debug_build: bool) -> bool {
    match value {
        Some(v) if v == "1" || v.eq_ignore_ascii_case("true") => true,
        Some(v) if v == "0" || v.eq_ignore_ascii_case("false") => false,
        _ => debug_build,
    }
}

/// Print a diagnostic line to stderr when `GIT_AUTHORSHIP_DEBUG=1`, or in
/// debug builds unless it is set to `0`
pub fn debug_log(msg: &str) {
    if debug_enabled() {
        eprintln!("\x1b[1;33m[git-authorship]\x1b[0m {}", msg);
    }
}

/// Shorten a commit sha for display
pub fn short_sha(sha: &str) -> &str {
    if sha.len() > 7 { &sha[..7] } else { sha }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_setting() {
        assert!(debug_setting(Some("1"), false));
        assert!(debug_setting(Some("TRUE"), false));
        assert!(!debug_setting(Some("0"), true));
        assert!(!debug_setting(Some("false"), true));
        assert!(debug_setting(None, true));
        assert!(!debug_setting(None, false));
        assert!(debug_setting(Some("yes"), true));
        assert!(!debug_setting(Some("yes"), false));
    }

    #[test]
    fn test_short_sha() {
        assert_eq!(
            short_sha("0123456789abcdef0123456789abcdef01234567"),
            "0123456"
        );
        assert_eq!(short_sha("abc"), "abc");
    }
}
