//! `WWW-Authenticate` challenge parsing

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};
use std::collections::HashMap;

/// `name=token` or `name="quoted \" string"`
static AUTH_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z0-9_\-]+)\s*=\s*(?:"((?:[^"\\]|\\.)*)"|([^\s,"]+))"#)
        .expect("auth-param pattern is valid")
});

pub const DISCOVERY_PARAM: &str = "webauthz_discovery_uri";

/// A `Bearer` challenge that advertises Webauthz support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebauthzChallenge {
    pub realm: Option<String>,
    pub scope: Option<String>,
    pub discovery_uri: String,
}

/// Parse a single `WWW-Authenticate` value.
///
/// Returns `None` for other schemes and for Bearer challenges without a
/// discovery URI.
pub fn parse_challenge(value: &str) -> Option<WebauthzChallenge> {
    let value = value.trim();
    let (scheme, rest) = value.split_once(char::is_whitespace).unwrap_or((value, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let mut params: HashMap<String, String> = AUTH_PARAM
        .captures_iter(rest)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = match (caps.get(2), caps.get(3)) {
                (Some(quoted), _) => unescape(quoted.as_str()),
                (None, Some(token)) => token.as_str().to_string(),
                _ => return None,
            };
            Some((name, value))
        })
        .collect();

    let discovery_uri = params.remove(DISCOVERY_PARAM).filter(|uri| !uri.is_empty())?;

    Some(WebauthzChallenge {
        realm: params.remove("realm"),
        scope: params.remove("scope"),
        discovery_uri,
    })
}

/// First Webauthz challenge among all `WWW-Authenticate` headers.
pub fn find_challenge(headers: &HeaderMap) -> Option<WebauthzChallenge> {
    headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(parse_challenge)
}

fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_quoted_and_token_params() {
        let challenge = parse_challenge(
            r#"Bearer realm="Example Realm", scope=read, webauthz_discovery_uri="https://as.test/webauthz.json""#,
        )
        .expect("should parse");

        assert_eq!(challenge.realm.as_deref(), Some("Example Realm"));
        assert_eq!(challenge.scope.as_deref(), Some("read"));
        assert_eq!(challenge.discovery_uri, "https://as.test/webauthz.json");
    }

    #[test]
    fn test_parse_escaped_quotes() {
        let challenge = parse_challenge(
            r#"bearer realm="say \"hi\"", webauthz_discovery_uri=https://as.test/d"#,
        )
        .expect("should parse");
        assert_eq!(challenge.realm.as_deref(), Some(r#"say "hi""#));
        assert_eq!(challenge.discovery_uri, "https://as.test/d");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(parse_challenge(r#"Basic realm="x", webauthz_discovery_uri="https://as.test/d""#).is_none());
        assert!(parse_challenge("").is_none());
    }

    #[test]
    fn test_rejects_bearer_without_discovery() {
        assert!(parse_challenge(r#"Bearer realm="x", scope="y""#).is_none());
        assert!(parse_challenge(r#"Bearer webauthz_discovery_uri="""#).is_none());
    }

    #[test]
    fn test_find_challenge_skips_unrelated_headers() {
        let mut headers = HeaderMap::new();
        headers.append(WWW_AUTHENTICATE, HeaderValue::from_static(r#"Basic realm="legacy""#));
        headers.append(
            WWW_AUTHENTICATE,
            HeaderValue::from_static(r#"Bearer realm="r", webauthz_discovery_uri="https://as.test/d""#),
        );

        let challenge = find_challenge(&headers).expect("bearer challenge present");
        assert_eq!(challenge.realm.as_deref(), Some("r"));
    }
}
