use std::collections::{BTreeMap, HashMap};

/// Parse query parameters from a URI string
///
/// Handles URL decoding and returns a HashMap of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
///
/// # Example
/// ```
/// use socialhub::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/posts/?hashtag=%23rust&page=2");
/// assert_eq!(params.get("hashtag"), Some(&"#rust".to_string()));
/// assert_eq!(params.get("page"), Some(&"2".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&').filter(|p| !p.is_empty()) {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                let encoded_value = param[eq_idx + 1..].replace('+', " ");
                let decoded = urlencoding::decode(&encoded_value)
                    .map(|v| v.into_owned())
                    .unwrap_or(encoded_value);
                params.insert(key.to_string(), decoded);
            } else {
                // Flag parameter without value
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

/// Get a filter value; blank values mean "no filter".
pub fn get_filter<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|s| s.as_str())
        .filter(|s| !s.is_empty())
}

/// Get a strictly positive integer parameter, `None` when absent or invalid.
pub fn get_positive_int(params: &HashMap<String, String>, key: &str) -> Option<usize> {
    params
        .get(key)
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
}

/// Rebuild a request-relative link with the given parameters.
pub fn build_link(path: &str, params: &BTreeMap<String, String>) -> String {
    if params.is_empty() {
        return path.to_string();
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", path, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_decodes() {
        let params = parse_query_params("/profiles/?first_name=Mary+Ann&gender=Male&flag");
        assert_eq!(params.get("first_name").unwrap(), "Mary Ann");
        assert_eq!(params.get("gender").unwrap(), "Male");
        assert_eq!(params.get("flag").unwrap(), "");
    }

    #[test]
    fn no_query_means_no_params() {
        assert!(parse_query_params("/posts/").is_empty());
        assert!(parse_query_params("/posts/?").is_empty());
    }

    #[test]
    fn blank_filters_are_ignored() {
        let params = parse_query_params("/posts/?hashtag=&title=rust");
        assert_eq!(get_filter(&params, "hashtag"), None);
        assert_eq!(get_filter(&params, "title"), Some("rust"));
        assert_eq!(get_filter(&params, "missing"), None);
    }

    #[test]
    fn positive_ints_only() {
        let params = parse_query_params("/?a=3&b=0&c=-1&d=x");
        assert_eq!(get_positive_int(&params, "a"), Some(3));
        assert_eq!(get_positive_int(&params, "b"), None);
        assert_eq!(get_positive_int(&params, "c"), None);
        assert_eq!(get_positive_int(&params, "d"), None);
    }

    #[test]
    fn links_encode_values() {
        let mut params = BTreeMap::new();
        assert_eq!(build_link("/posts/", &params), "/posts/");

        params.insert("hashtag".to_string(), "#rust".to_string());
        params.insert("page".to_string(), "2".to_string());
        assert_eq!(build_link("/posts/", &params), "/posts/?hashtag=%23rust&page=2");
    }
}
