//! OAuth 1.0a request signing (HMAC-SHA1), as required by the v1.1 REST API
//! for user-context calls.

use crate::config::TwitterCredentials;
use crate::error::TwitterError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::{distr::Alphanumeric, Rng};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";
const NONCE_LEN: usize = 32;

/// RFC 3986 unreserved characters are the only ones left as-is.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, OAUTH_ENCODE_SET).to_string()
}

/// Encoded `key=value` pairs sorted by key then value, joined with `&`.
pub fn parameter_string(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&parameter_string(params))
    )
}

#[derive(Clone)]
pub struct OAuthSigner {
    consumer_key: String,
    consumer_secret: String,
    token: String,
    token_secret: String,
}

impl OAuthSigner {
    pub fn new(credentials: &TwitterCredentials) -> Self {
        Self {
            consumer_key: credentials.api_key.clone(),
            consumer_secret: credentials.api_secret.clone(),
            token: credentials.access_token.clone(),
            token_secret: credentials.access_secret.clone(),
        }
    }

    /// `Authorization` header for a request with a fresh nonce and timestamp.
    /// `url` must not carry a query string; query and form parameters go in
    /// `params`.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String, TwitterError> {
        let nonce: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp();
        self.authorization_header_with(method, url, params, &nonce, timestamp)
    }

    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String, TwitterError> {
        let mut oauth_params = self.oauth_params(nonce, timestamp);

        let mut all_params = params.to_vec();
        all_params.extend(oauth_params.iter().cloned());
        let signature = self.signature(method, url, &all_params)?;
        oauth_params.push(("oauth_signature".to_string(), signature));

        let fields = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {fields}"))
    }

    /// Base64 HMAC-SHA1 signature over the full parameter set (request
    /// parameters plus the `oauth_*` protocol parameters).
    pub fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String, TwitterError> {
        let key = format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(&self.token_secret)
        );
        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| TwitterError::Signing(e.to_string()))?;
        mac.update(signature_base_string(method, url, params).as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    fn oauth_params(&self, nonce: &str, timestamp: i64) -> Vec<(String, String)> {
        vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            (
                "oauth_signature_method".to_string(),
                SIGNATURE_METHOD.to_string(),
            ),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), self.token.clone()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Worked example from Twitter's "Creating a signature" documentation.
    const URL: &str = "https://api.twitter.com/1.1/statuses/update.json";
    const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const TIMESTAMP: i64 = 1318622958;

    fn signer() -> OAuthSigner {
        OAuthSigner::new(&TwitterCredentials {
            api_key: "xvz1evFS4wEEPTGEFPHBog".to_string(),
            api_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".to_string(),
            access_token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            access_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".to_string(),
        })
    }

    fn request_params() -> Vec<(String, String)> {
        vec![
            (
                "status".to_string(),
                "Hello Ladies + Gentlemen, a signed OAuth request!".to_string(),
            ),
            ("include_entities".to_string(), "true".to_string()),
        ]
    }

    fn all_params() -> Vec<(String, String)> {
        let mut params = request_params();
        params.extend(signer().oauth_params(NONCE, TIMESTAMP));
        params
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("An encoded string!"), "An%20encoded%20string%21");
        assert_eq!(percent_encode("Dogs, Cats & Mice"), "Dogs%2C%20Cats%20%26%20Mice");
        assert_eq!(percent_encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(percent_encode("☃"), "%E2%98%83");
        assert_eq!(percent_encode("https://x/?a=b"), "https%3A%2F%2Fx%2F%3Fa%3Db");
    }

    #[test]
    fn test_parameter_string_sorted_and_encoded() {
        assert_eq!(
            parameter_string(&all_params()),
            "include_entities=true&oauth_consumer_key=xvz1evFS4wEEPTGEFPHBog\
             &oauth_nonce=kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg\
             &oauth_signature_method=HMAC-SHA1&oauth_timestamp=1318622958\
             &oauth_token=370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb\
             &oauth_version=1.0\
             &status=Hello%20Ladies%20%2B%20Gentlemen%2C%20a%20signed%20OAuth%20request%21"
        );
    }

    #[test]
    fn test_signature_base_string_prefix() {
        let base = signature_base_string("post", URL, &all_params());
        assert!(base.starts_with(
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&include_entities%3Dtrue%26"
        ));
    }

    #[test]
    fn test_signature_matches_documented_example() {
        let signature = signer().signature("POST", URL, &all_params()).unwrap();
        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_authorization_header_with() {
        let header = signer()
            .authorization_header_with("POST", URL, &request_params(), NONCE, TIMESTAMP)
            .unwrap();
        assert!(header.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\", "));
        assert!(header.contains("oauth_timestamp=\"1318622958\""));
        assert!(header.ends_with("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(!header.contains("status="));
    }

    #[test]
    fn test_authorization_header_uses_fresh_nonce() {
        let signer = signer();
        let first = signer.authorization_header("GET", URL, &[]).unwrap();
        let second = signer.authorization_header("GET", URL, &[]).unwrap();
        assert!(first.starts_with("OAuth "));
        assert_ne!(first, second);
    }
}
