use serde::Deserialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pagination {
    /// One request.
    #[default]
    None,
    /// Numbered pages; stops on an empty or short page.
    PageParam,
    /// Follows `rel="next"` in the `Link` response header.
    LinkHeader,
}

/// Extracts the `rel="next"` target of a `Link` header.
pub fn parse_next_link(header: &str) -> Option<String> {
    header
        .split(',')
        .find(|part| part.contains("rel=\"next\""))
        .and_then(|part| part.split(';').next())
        .map(|url| url.trim().trim_start_matches('<').trim_end_matches('>').to_string())
        .filter(|url| !url.is_empty())
}

/// Number of records carried by a response body, as used to detect the last page.
pub fn record_count(body: &serde_json::Value) -> usize {
    match body {
        serde_json::Value::Null => 0,
        serde_json::Value::Array(items) => items.len(),
        serde_json::Value::Object(map) if map.is_empty() => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_next_among_relations() {
        let header = r#"<https://api.example.com/items?page=1>; rel="prev", <https://api.example.com/items?page=3>; rel="next", <https://api.example.com/items?page=9>; rel="last""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.example.com/items?page=3")
        );
    }

    #[test]
    fn no_next_relation() {
        assert_eq!(parse_next_link(r#"<https://x/items?page=1>; rel="prev""#), None);
        assert_eq!(parse_next_link(""), None);
    }

    #[test]
    fn counts_records() {
        assert_eq!(record_count(&json!([])), 0);
        assert_eq!(record_count(&json!({})), 0);
        assert_eq!(record_count(&json!([{"a": 1}, {"a": 2}])), 2);
        assert_eq!(record_count(&json!({"a": 1})), 1);
    }
}
