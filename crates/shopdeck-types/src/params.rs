use serde::{Deserialize, Serialize};

/// Session parameters consumed from the page location query. All optional;
/// absence of `shop`/`host` while embedded is itself a diagnostic condition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionParams {
    pub shop: Option<String>,
    pub host: Option<String>,
    pub id_token: Option<String>,
    pub embedded: bool,
}

impl SessionParams {
    pub fn from_query_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "shop" => params.shop = non_empty(value),
                "host" => params.host = non_empty(value),
                "id_token" => params.id_token = non_empty(value),
                "embedded" => params.embedded = matches!(value.as_str(), "1" | "true"),
                _ => {}
            }
        }
        params
    }

    /// Required parameters that are absent even though the client believes it
    /// is running embedded.
    pub fn missing_embedded_params(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.embedded {
            if self.shop.is_none() {
                missing.push("shop");
            }
            if self.host.is_none() {
                missing.push("host");
            }
        }
        missing
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &[(&str, &str)]) -> SessionParams {
        SessionParams::from_query_pairs(
            query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn parses_full_query() {
        let params = parse(&[
            ("shop", "acme.example.com"),
            ("host", "aG9zdA"),
            ("id_token", "tok"),
            ("embedded", "1"),
        ]);
        assert_eq!(params.shop.as_deref(), Some("acme.example.com"));
        assert_eq!(params.host.as_deref(), Some("aG9zdA"));
        assert!(params.embedded);
        assert!(params.missing_embedded_params().is_empty());
    }

    #[test]
    fn missing_host_while_embedded_is_flagged() {
        let params = parse(&[("shop", "acme.example.com"), ("embedded", "1")]);
        assert_eq!(params.missing_embedded_params(), vec!["host"]);
    }

    #[test]
    fn nothing_is_required_outside_the_embed() {
        let params = parse(&[]);
        assert!(!params.embedded);
        assert!(params.missing_embedded_params().is_empty());
    }

    #[test]
    fn empty_values_count_as_absent() {
        let params = parse(&[("shop", "  "), ("embedded", "true")]);
        assert_eq!(params.missing_embedded_params(), vec!["shop", "host"]);
    }
}
