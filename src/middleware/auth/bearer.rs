//! `Authorization: Bearer <token>` の抽出 (gate 共通の前処理)

/// Extract the bearer credential from a raw `Authorization` header value.
///
/// Total and side-effect free: anything that is not `<Bearer> <ws> <token>` yields `None`.
/// The scheme is matched case-insensitively; whitespace around the token is trimmed.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    let (scheme, rest) = header?.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Bearer abc123", "abc123")]
    #[case("Bearer   abc123", "abc123")]
    #[case("Bearer abc123  ", "abc123")]
    #[case("bearer xyz", "xyz")]
    #[case("BEARER xyz", "xyz")]
    #[case("Bearer\tabc", "abc")]
    #[case("Bearer a.b.c", "a.b.c")]
    fn extracts_token(#[case] header: &str, #[case] expected: &str) {
        assert_eq!(extract_bearer(Some(header)), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("Bearer")]
    #[case("Bearer ")]
    #[case("Bearer    ")]
    #[case("Basic dXNlcjpwYXNz")]
    #[case("Bearerabc")]
    #[case(" Bearer abc")]
    #[case("Token abc")]
    #[case("abc123")]
    fn rejects_non_bearer_values(#[case] header: &str) {
        assert_eq!(extract_bearer(Some(header)), None);
    }

    #[test]
    fn absent_header_is_empty() {
        assert_eq!(extract_bearer(None), None);
    }
}
