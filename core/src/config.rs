//! Serializable client defaults.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::decoder::ResponseDecoder;

/// Client defaults as read from a configuration file. Applied with
/// `Client::from_config`, which validates method and header values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub method: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, Vec<String>>,
    pub content_type: Option<String>,
    pub decoder: ResponseDecoder,
    pub timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::error::Error;
    use crate::options::Options;

    #[test]
    fn missing_fields_take_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"base_url": "http://h"}"#).unwrap();
        assert_eq!(config.base_url, "http://h");
        assert_eq!(config.decoder, ResponseDecoder::Json);
        assert!(config.headers.is_empty());
        assert_eq!(config.timeout_ms, None);
    }

    #[test]
    fn config_applies_to_client() {
        let config: ClientConfig = serde_json::from_str(
            r#"{
                "base_url": "http://h/api",
                "method": "post",
                "headers": {"X-Env": "test"},
                "query": {"v": ["1", "2"]},
                "content_type": "application/json",
                "decoder": "xml",
                "timeout_ms": 1500
            }"#,
        )
        .unwrap();

        let client = Client::from_config(config).unwrap();
        assert_eq!(client.decoder(), ResponseDecoder::Xml);

        let req = client.new_request_with_options("/x", Options::new()).unwrap();
        assert_eq!(req.method(), http::Method::POST);
        assert_eq!(req.uri(), "http://h/api/x?v=1&v=2");
        assert_eq!(req.headers()["x-env"], "test");
        assert_eq!(req.headers()["content-type"], "application/json");
    }

    #[test]
    fn invalid_header_is_rejected() {
        let config = ClientConfig {
            headers: BTreeMap::from([("bad key".to_string(), "v".to_string())]),
            ..ClientConfig::default()
        };
        assert!(matches!(Client::from_config(config), Err(Error::InvalidHeader(_))));
    }
}
