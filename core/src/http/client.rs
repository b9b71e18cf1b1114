use rand::prelude::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;

use crate::Credentials;

/// Shared `reqwest::Client` carrying the collector's default headers.
///
/// Credentials are applied once at construction; every request then goes out
/// with the same opaque token/cookie set the caller provided. Compression
/// negotiation (gzip/brotli) is left to reqwest so bodies arrive decoded.
pub struct HttpClient {
    inner: Client,
    default_headers: HeaderMap,
    user_agents: Vec<&'static str>,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(
        timeout_seconds: u64,
        credentials: &Credentials,
        custom_headers: &[(String, String)],
    ) -> Self {
        let timeout = Duration::from_secs(timeout_seconds);

        let inner = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .expect("failed to build reqwest client");

        let mut default_headers = HeaderMap::new();
        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let credential_pairs = [
            ("User-Agent", &credentials.user_agent),
            ("Referer", &credentials.referer),
            ("X-Csrf-Token", &credentials.csrf_token),
            ("Cookie", &credentials.cookie),
        ];
        for (key, val) in credential_pairs {
            if val.is_empty() {
                continue;
            }
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(val),
            ) {
                default_headers.insert(name, value);
            }
        }

        for (key, val) in custom_headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(val),
            ) {
                default_headers.insert(name, value);
            }
        }

        // Fallback pool used only when the caller supplies no User-Agent.
        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) \
             Gecko/20100101 Firefox/120.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_0) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        ];

        Self {
            inner,
            default_headers,
            user_agents,
            timeout,
        }
    }

    pub async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        let mut req = self.inner.get(url).timeout(self.timeout);

        for (name, value) in self.default_headers.iter() {
            req = req.header(name, value);
        }

        if !self.default_headers.contains_key(reqwest::header::USER_AGENT) {
            req = req.header(reqwest::header::USER_AGENT, self.random_user_agent());
        }

        req.send().await
    }

    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::rng();
        *self.user_agents.choose(&mut rng).unwrap_or(&"Mozilla/5.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_become_default_headers() {
        let credentials = Credentials {
            user_agent: "test-agent".to_string(),
            referer: "https://bugcrowd.com/acme".to_string(),
            csrf_token: "tok".to_string(),
            cookie: "sess=abc".to_string(),
        };
        let client = HttpClient::new(5, &credentials, &[]);

        assert_eq!(
            client.default_headers.get("user-agent").unwrap(),
            "test-agent"
        );
        assert_eq!(client.default_headers.get("x-csrf-token").unwrap(), "tok");
        assert_eq!(client.default_headers.get("cookie").unwrap(), "sess=abc");
    }

    #[test]
    fn empty_credentials_send_no_credential_headers() {
        let client = HttpClient::new(5, &Credentials::default(), &[]);
        assert!(client.default_headers.get("x-csrf-token").is_none());
        assert!(client.default_headers.get("cookie").is_none());
        assert!(client.default_headers.get("user-agent").is_none());
    }

    #[test]
    fn custom_headers_override_defaults() {
        let extra = vec![("Accept".to_string(), "application/json".to_string())];
        let client = HttpClient::new(5, &Credentials::default(), &extra);
        assert_eq!(
            client.default_headers.get("accept").unwrap(),
            "application/json"
        );
    }
}
