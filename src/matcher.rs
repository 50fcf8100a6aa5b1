//! Request matching logic.
//!
//! Matches intercepted requests against the entries of a scenario file.

use crate::model::{Matcher, RequestDescriptor};
use crate::Body;
use http::Request;

/// Find the first entry whose criteria match the request.
///
/// Entries are scanned in file order. `None` means no entry matched, which is
/// not an error.
pub fn find_match<'a>(entries: &'a [Matcher], request: &Request<Body>) -> Option<&'a Matcher> {
    entries.iter().find(|entry| matches(&entry.request, request))
}

/// Whether a request satisfies every criterion of a descriptor.
pub fn matches(rule: &RequestDescriptor, request: &Request<Body>) -> bool {
    matches_method(rule, request)
        && matches_headers(rule, request)
        && matches_params(rule, request)
        && matches_body(rule, request)
}

fn matches_method(rule: &RequestDescriptor, request: &Request<Body>) -> bool {
    rule.method
        .as_ref()
        .map(|method| method.eq_ignore_ascii_case(request.method().as_str()))
        .unwrap_or(true)
}

fn matches_headers(rule: &RequestDescriptor, request: &Request<Body>) -> bool {
    rule.headers.iter().all(|header| {
        let mut values = request.headers().get_all(header.name.as_str()).iter();
        match &header.value {
            Some(expected) => {
                values.any(|v| v.to_str().map(|v| v == expected.as_str()).unwrap_or(false))
            }
            None => values.next().is_some(),
        }
    })
}

fn matches_params(rule: &RequestDescriptor, request: &Request<Body>) -> bool {
    if rule.params.is_empty() {
        return true;
    }
    let query = request.uri().query().unwrap_or("");
    rule.params
        .iter()
        .all(|(name, expected)| query_parameter(query, name).as_deref() == Some(expected.as_str()))
}

fn matches_body(rule: &RequestDescriptor, request: &Request<Body>) -> bool {
    match &rule.body {
        Some(pattern) => pattern.is_full_match(&String::from_utf8_lossy(request.body())),
        None => true,
    }
}

/// First decoded value of a query parameter.
fn query_parameter(query: &str, name: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BodyPattern, Header, NetworkError, RequestResult, ResponseDescriptor};
    use crate::NetworkErrorKind;

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Vec::new())
            .unwrap()
    }

    fn entry(rule: RequestDescriptor, code: u16) -> Matcher {
        Matcher::new(rule, ResponseDescriptor::new(code, ""))
    }

    fn code_of(entry: Option<&Matcher>) -> Option<u16> {
        match entry.map(|e| &e.result) {
            Some(RequestResult::Response(response)) => Some(response.code),
            _ => None,
        }
    }

    #[test]
    fn test_empty_rule_matches_anything() {
        let rule = RequestDescriptor::default();
        assert!(matches(&rule, &request("GET", "http://api.test/")));
        assert!(matches(&rule, &request("DELETE", "http://api.test/x?y=z")));
    }

    #[test]
    fn test_method_matching_is_case_insensitive() {
        let rule = RequestDescriptor {
            method: Some("post".to_string()),
            ..Default::default()
        };
        assert!(matches(&rule, &request("POST", "http://api.test/users")));
        assert!(!matches(&rule, &request("GET", "http://api.test/users")));
    }

    #[test]
    fn test_header_matching() {
        let rule = RequestDescriptor {
            headers: vec![Header::new("Accept", "application/json")],
            ..Default::default()
        };

        let req = Request::builder()
            .uri("http://api.test/")
            .header("accept", "text/html")
            .header("accept", "application/json")
            .body(Vec::new())
            .unwrap();
        assert!(matches(&rule, &req));

        let req = Request::builder()
            .uri("http://api.test/")
            .header("accept", "text/html")
            .body(Vec::new())
            .unwrap();
        assert!(!matches(&rule, &req));

        assert!(!matches(&rule, &request("GET", "http://api.test/")));
    }

    #[test]
    fn test_header_without_value_requires_presence() {
        let rule = RequestDescriptor {
            headers: vec![Header {
                name: "Authorization".to_string(),
                value: None,
            }],
            ..Default::default()
        };
        let req = Request::builder()
            .uri("http://api.test/")
            .header("Authorization", "Bearer token")
            .body(Vec::new())
            .unwrap();
        assert!(matches(&rule, &req));
        assert!(!matches(&rule, &request("GET", "http://api.test/")));
    }

    #[test]
    fn test_query_matching() {
        let mut rule = RequestDescriptor::default();
        rule.params.insert("page".to_string(), "1".to_string());
        rule.params.insert("q".to_string(), "John Doe".to_string());

        assert!(matches(
            &rule,
            &request("GET", "http://api.test/users?q=John%20Doe&page=1")
        ));
        assert!(matches(
            &rule,
            &request("GET", "http://api.test/users?page=1&q=John+Doe&extra=yes")
        ));
        assert!(!matches(&rule, &request("GET", "http://api.test/users?page=2&q=John+Doe")));
        assert!(!matches(&rule, &request("GET", "http://api.test/users?page=1")));
        assert!(!matches(&rule, &request("GET", "http://api.test/users")));
    }

    #[test]
    fn test_body_matching_is_anchored() {
        let rule = RequestDescriptor {
            body: Some(BodyPattern::new(r#"\{"id": *\d+\}"#).unwrap()),
            ..Default::default()
        };

        let req = Request::builder()
            .method("POST")
            .uri("http://api.test/users")
            .body(br#"{"id": 42}"#.to_vec())
            .unwrap();
        assert!(matches(&rule, &req));

        let req = Request::builder()
            .method("POST")
            .uri("http://api.test/users")
            .body(br#"prefix {"id": 42}"#.to_vec())
            .unwrap();
        assert!(!matches(&rule, &req));
    }

    #[test]
    fn test_missing_body_matches_as_empty_string() {
        let rule = RequestDescriptor {
            body: Some(BodyPattern::new(".*").unwrap()),
            ..Default::default()
        };
        assert!(matches(&rule, &request("GET", "http://api.test/")));

        let rule = RequestDescriptor {
            body: Some(BodyPattern::new(".+").unwrap()),
            ..Default::default()
        };
        assert!(!matches(&rule, &request("GET", "http://api.test/")));
    }

    #[test]
    fn test_first_match_wins() {
        let specific = RequestDescriptor {
            method: Some("GET".to_string()),
            ..Default::default()
        };
        let entries = vec![
            entry(
                RequestDescriptor {
                    method: Some("PUT".to_string()),
                    ..Default::default()
                },
                500,
            ),
            entry(specific, 201),
            entry(RequestDescriptor::default(), 200),
        ];

        let req = request("GET", "http://api.test/");
        assert_eq!(code_of(find_match(&entries, &req)), Some(201));

        let req = request("DELETE", "http://api.test/");
        assert_eq!(code_of(find_match(&entries, &req)), Some(200));
    }

    #[test]
    fn test_no_match() {
        let entries = vec![entry(
            RequestDescriptor {
                method: Some("POST".to_string()),
                ..Default::default()
            },
            200,
        )];
        assert!(find_match(&entries, &request("GET", "http://api.test/")).is_none());
        assert!(find_match(&[], &request("GET", "http://api.test/")).is_none());
    }

    #[test]
    fn test_error_entry_is_selected_like_any_other() {
        let entries = vec![Matcher::new(
            RequestDescriptor::default(),
            NetworkError::new(NetworkErrorKind::TimedOut, Some("timeout".to_string())),
        )];
        let found = find_match(&entries, &request("GET", "http://api.test/")).unwrap();
        assert!(matches!(found.result, RequestResult::Error(_)));
    }

    #[test]
    fn test_criteria_order_does_not_matter() {
        let req = Request::builder()
            .uri("http://api.test/?a=1&b=2")
            .header("X-One", "1")
            .header("X-Two", "2")
            .body(Vec::new())
            .unwrap();

        let forward = RequestDescriptor {
            headers: vec![Header::new("X-One", "1"), Header::new("X-Two", "2")],
            params: [("a", "1"), ("b", "2")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        };
        let mut reversed = forward.clone();
        reversed.headers.reverse();

        assert!(matches(&forward, &req));
        assert!(matches(&reversed, &req));
        assert_eq!(matches(&forward, &req), matches(&forward, &req));
    }
}
