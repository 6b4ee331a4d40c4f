use std::collections::HashMap;

use url::form_urlencoded;

use crate::models::CallbackResult;

/// Decodes a query string into a map. Repeated keys keep the last value; a
/// leading `?` is tolerated.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let query = query.strip_prefix('?').unwrap_or(query);

    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Pulls the provider's callback parameters out of the popup's query string.
/// Unrelated parameters are ignored.
pub fn extract(query: &str) -> CallbackResult {
    let mut params = parse_query(query);

    CallbackResult {
        code: params.remove("code"),
        state: params.remove("state"),
        error: params.remove("error"),
        error_description: params.remove("error_description"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_success_params() {
        let result = extract("?code=abc123&state=xyz789");
        assert_eq!(result.code.as_deref(), Some("abc123"));
        assert_eq!(result.state.as_deref(), Some("xyz789"));
        assert!(result.error.is_none());
        assert!(result.error_description.is_none());
    }

    #[test]
    fn test_extract_decodes_values() {
        let result = extract("error=access_denied&error_description=User%20declined+access");
        assert_eq!(result.error.as_deref(), Some("access_denied"));
        assert_eq!(
            result.error_description.as_deref(),
            Some("User declined access")
        );
    }

    #[test]
    fn test_last_duplicate_wins() {
        let result = extract("code=first&state=s&code=second");
        assert_eq!(result.code.as_deref(), Some("second"));
    }

    #[test]
    fn test_unknown_and_empty() {
        assert_eq!(extract(""), CallbackResult::default());
        assert_eq!(extract("?"), CallbackResult::default());

        let result = extract("expires_in=299&code=&foo");
        assert_eq!(result.code.as_deref(), Some(""));
        assert!(result.state.is_none());
    }

    #[test]
    fn test_extract_is_idempotent() {
        let query = "state=s%2Fx&code=c&code=d&error_description=oops";
        assert_eq!(extract(query), extract(query));
    }
}
