//! HMAC-SHA256 request signing for the Volcengine visual API.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::credentials::Credentials;

type HmacSha256 = Hmac<Sha256>;

/// API host. Also the signed `host` header value.
pub const VISUAL_HOST: &str = "visual.volcengineapi.com";
/// Signing region.
pub const REGION: &str = "cn-north-1";
/// Signing service.
pub const SERVICE: &str = "cv";
/// API version query parameter.
pub const API_VERSION: &str = "2022-08-31";
/// Headers covered by the signature, in canonical order.
pub const SIGNED_HEADERS: &str = "content-type;host;x-content-sha256;x-date";

/// The two actions of the asynchronous text-to-image protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Submit a generation task.
    SubmitTask,
    /// Poll a task for its result.
    GetResult,
}

impl Action {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitTask => "CVSync2AsyncSubmitTask",
            Self::GetResult => "CVSync2AsyncGetResult",
        }
    }

    /// Canonical query string.
    #[must_use]
    pub fn query(&self) -> String {
        format!("Action={}&Version={API_VERSION}", self.as_str())
    }
}

/// Headers to attach to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `X-Date`.
    pub x_date: String,
    /// `X-Content-Sha256`.
    pub content_sha256: String,
    /// `Authorization`.
    pub authorization: String,
    /// `X-Security-Token`, when a session token is configured.
    pub security_token: Option<String>,
}

impl SignedHeaders {
    /// Header name/value pairs, `Content-Type` included.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("Content-Type", "application/json".to_string()),
            ("X-Date", self.x_date.clone()),
            ("X-Content-Sha256", self.content_sha256.clone()),
            ("Authorization", self.authorization.clone()),
        ];
        if let Some(token) = &self.security_token {
            pairs.push(("X-Security-Token", token.clone()));
        }
        pairs
    }
}

/// Lower-case hex SHA-256.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac(key: &[u8], data: &str) -> Vec<u8> {
    // HMAC accepts keys of any length, so this never fails.
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// `kSigning = HMAC(HMAC(HMAC(HMAC(sk, date), region), service), "request")`.
#[must_use]
pub fn signing_key(secret_key: &str, date: &str) -> Vec<u8> {
    let k_date = hmac(secret_key.as_bytes(), date);
    let k_region = hmac(&k_date, REGION);
    let k_service = hmac(&k_region, SERVICE);
    hmac(&k_service, "request")
}

/// The canonical request for a JSON POST to `/`.
#[must_use]
pub fn canonical_request(action: Action, body_hash: &str, x_date: &str) -> String {
    let canonical_headers = format!(
        "content-type:application/json\nhost:{VISUAL_HOST}\nx-content-sha256:{body_hash}\nx-date:{x_date}\n"
    );
    [
        "POST",
        "/",
        action.query().as_str(),
        canonical_headers.as_str(),
        SIGNED_HEADERS,
        body_hash,
    ]
    .join("\n")
}

/// Signs `body` for `action` at time `now`.
#[must_use]
pub fn sign(credentials: &Credentials, action: Action, body: &str, now: DateTime<Utc>) -> SignedHeaders {
    let date = now.format("%Y%m%d").to_string();
    let x_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let body_hash = sha256_hex(body.as_bytes());

    let canonical = canonical_request(action, &body_hash, &x_date);
    let scope = format!("{date}/{REGION}/{SERVICE}/request");
    let string_to_sign = [
        "HMAC-SHA256",
        x_date.as_str(),
        scope.as_str(),
        sha256_hex(canonical.as_bytes()).as_str(),
    ]
    .join("\n");

    let key = signing_key(&credentials.secret_key, &date);
    let signature = hex::encode(hmac(&key, &string_to_sign));

    SignedHeaders {
        authorization: format!(
            "HMAC-SHA256 Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
            credentials.access_key
        ),
        x_date,
        content_sha256: body_hash,
        security_token: credentials.session_token.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BODY: &str = r#"{"req_key":"jimeng_t2i_v40","prompt":"a cat","width":1024,"height":1024,"return_url":true}"#;

    fn creds() -> Credentials {
        Credentials::new("AKLTtestaccesskey0001", "testsecretkey0000000000000000000")
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap()
    }

    #[test]
    fn test_body_hash() {
        assert_eq!(
            sha256_hex(BODY.as_bytes()),
            "6cc7784f54e4c9567a770a7adde787017069d2a588a7fe3a7a306403885b4f1a"
        );
    }

    #[test]
    fn test_canonical_request_hash() {
        let hash = sha256_hex(BODY.as_bytes());
        let canonical = canonical_request(Action::SubmitTask, &hash, "20240501T123045Z");
        assert!(canonical.starts_with("POST\n/\nAction=CVSync2AsyncSubmitTask&Version=2022-08-31\n"));
        assert!(canonical.contains("x-date:20240501T123045Z\n\ncontent-type;host"));
        assert_eq!(
            sha256_hex(canonical.as_bytes()),
            "c19ff647aa7faad714f5f2e134bbee7048422f53b66fffec323091de18bdc790"
        );
    }

    #[test]
    fn test_signing_key() {
        assert_eq!(
            hex::encode(signing_key("testsecretkey0000000000000000000", "20240501")),
            "38f738f7f67092636582db66281e56c671b1e6896cf0952100b75db8edb18389"
        );
    }

    #[test]
    fn test_authorization_header() {
        let headers = sign(&creds(), Action::SubmitTask, BODY, at());
        assert_eq!(headers.x_date, "20240501T123045Z");
        assert_eq!(
            headers.authorization,
            "HMAC-SHA256 Credential=AKLTtestaccesskey0001/20240501/cn-north-1/cv/request, \
             SignedHeaders=content-type;host;x-content-sha256;x-date, \
             Signature=941a5c7281529c5aea17b78f1bb81b27034a5c7e1b8d1da0ff637f7f0fd2cb15"
        );
        assert!(headers.security_token.is_none());
        assert_eq!(headers.pairs().len(), 4);
    }

    #[test]
    fn test_session_token_header() {
        let creds = creds().with_session_token("tok");
        let headers = sign(&creds, Action::GetResult, "{}", at());
        assert_eq!(headers.pairs().last().unwrap(), &("X-Security-Token", "tok".to_string()));
        assert_eq!(Action::GetResult.query(), "Action=CVSync2AsyncGetResult&Version=2022-08-31");
    }
}
