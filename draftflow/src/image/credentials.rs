//! Access/secret key resolution for the signed image backend.
//!
//! Users paste keys in many shapes: plain fields, `ak=...;sk=...` strings,
//! JSON blobs, and base64 of any of those. Extraction is an ordered list of
//! pure rules tried against the raw text and up to two base64-decoded forms.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::config::ProviderConfig;

/// Environment variables holding the access key, in priority order.
pub const ACCESS_KEY_ENV: [&str; 2] = ["VOLC_ACCESS_KEY_ID", "VOLCENGINE_ACCESS_KEY_ID"];
/// Environment variables holding the secret key, in priority order.
pub const SECRET_KEY_ENV: [&str; 2] = ["VOLC_SECRET_ACCESS_KEY", "VOLCENGINE_SECRET_ACCESS_KEY"];
/// Environment variables holding an optional session token.
pub const SESSION_TOKEN_ENV: [&str; 3] =
    ["VOLC_SESSION_TOKEN", "VOLC_SECURITY_TOKEN", "X_SECURITY_TOKEN"];

const ACCESS_KEY_JSON_FIELDS: [&str; 5] = ["ak", "accessKeyId", "access_key_id", "accessKey", "AK"];
const SECRET_KEY_JSON_FIELDS: [&str; 5] =
    ["sk", "secret", "secretKey", "secretAccessKey", "SECRET_ACCESS_KEY"];

/// Maximum base64 rounds tried on a candidate.
const MAX_DECODE_ROUNDS: usize = 2;

/// A complete access/secret key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Access key id.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Optional STS session token.
    pub session_token: Option<String>,
}

impl Credentials {
    /// Creates a pair without session token.
    #[must_use]
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: None,
        }
    }

    /// Attaches a session token.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Where a resolved pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// The `ak`/`sk` settings, used verbatim.
    Config,
    /// Pulled out of the `apiKey`/`ak`/`sk` settings by the loose rules.
    Extracted,
    /// Environment variables.
    Environment,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Extracted => write!(f, "config (extracted)"),
            Self::Environment => write!(f, "environment"),
        }
    }
}

type Rule = fn(&str) -> Option<String>;

fn regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn ak_prefix(text: &str) -> Option<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    regex(&RE, r"AKL[T0-9A-Za-z][0-9A-Za-z\-_=]{10,64}")?
        .find(text)
        .map(|m| m.as_str().to_string())
}

fn ak_key_value(text: &str) -> Option<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    regex(
        &RE,
        r"(?i)(?:^|[;&,\s])(?:ak|access[_-]?key(?:[_-]?id)?)[:=]([A-Za-z0-9\-_=]{8,128})",
    )?
    .captures(text)
    .map(|c| c[1].to_string())
}

fn ak_json(text: &str) -> Option<String> {
    json_field(text, &ACCESS_KEY_JSON_FIELDS)
}

fn ak_bare(text: &str) -> Option<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    regex(&RE, r"^[A-Za-z0-9\-_=]{16,128}$")?
        .is_match(text)
        .then(|| text.to_string())
}

fn sk_json(text: &str) -> Option<String> {
    json_field(text, &SECRET_KEY_JSON_FIELDS)
}

fn sk_key_value(text: &str) -> Option<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    regex(
        &RE,
        r"(?i)(?:^|[;&,\s])(?:sk|secret(?:[_-]?access)?[_-]?key)[:=]([A-Za-z0-9._+\-/=]{20,128})",
    )?
    .captures(text)
    .map(|c| c[1].to_string())
}

fn sk_bare(text: &str) -> Option<String> {
    static HEX: OnceLock<Option<Regex>> = OnceLock::new();
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    let hex = regex(&HEX, r"(?i)^[0-9a-f]{32,64}$")?;
    let token = regex(&TOKEN, r"^[A-Za-z0-9._+\-/=]{20,128}$")?;
    (hex.is_match(text) || token.is_match(text)).then(|| text.to_string())
}

fn json_field(text: &str, fields: &[&str]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    fields.iter().find_map(|f| {
        value
            .get(*f)?
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Removes control and other non-printable characters, then trims.
fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

fn decode_base64(text: &str) -> Option<String> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact).ok()?;
    let decoded = sanitize(&String::from_utf8(bytes).ok()?);
    (!decoded.is_empty() && decoded != text).then_some(decoded)
}

/// The raw text followed by up to two base64-decoded forms.
fn variants(raw: &str) -> Vec<String> {
    let mut out = vec![sanitize(raw)];
    for _ in 0..MAX_DECODE_ROUNDS {
        let Some(next) = out.last().and_then(|last| decode_base64(last)) else {
            break;
        };
        out.push(next);
    }
    out.retain(|v| !v.is_empty());
    out
}

/// Tries the structured rules on the raw text, then on each decoded form.
///
/// The bare-token rule runs only after every structured rule missed, so an
/// encoded blob never shadows a fragment found in its decoded text.
fn extract(raw: &str, structured: &[Rule], bare: Option<Rule>) -> Option<String> {
    let variants = variants(raw);
    variants
        .iter()
        .find_map(|v| structured.iter().find_map(|rule| rule(v.as_str())))
        .or_else(|| bare.and_then(|rule| variants.iter().find_map(|v| rule(v.as_str()))))
}

/// Loosely extracts an access key.
///
/// `allow_bare` accepts a plain token; only set it for text that is known to
/// hold an access key, never for a combined API key.
#[must_use]
pub fn extract_access_key(raw: &str, allow_bare: bool) -> Option<String> {
    let bare: Option<Rule> = if allow_bare { Some(ak_bare) } else { None };
    extract(raw, &[ak_prefix, ak_key_value, ak_json], bare)
}

/// Loosely extracts a secret key.
#[must_use]
pub fn extract_secret_key(raw: &str) -> Option<String> {
    extract(raw, &[sk_json, sk_key_value], Some(sk_bare))
}

fn looks_plain(value: &str) -> bool {
    !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ':' | ';' | '&' | ',' | '{' | '"'))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolves credentials from settings, then from the process environment.
#[must_use]
pub fn resolve(settings: &ProviderConfig) -> Option<(Credentials, CredentialSource)> {
    resolve_with(settings, |key| std::env::var(key).ok())
}

/// Resolves credentials using `env` for variable lookup.
///
/// The first complete pair wins: verbatim settings, then loose extraction
/// from the settings, then the environment.
pub fn resolve_with<F>(settings: &ProviderConfig, env: F) -> Option<(Credentials, CredentialSource)>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| env(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
    };
    let session_token = lookup(&SESSION_TOKEN_ENV);
    let finish = |ak: String, sk: String, source: CredentialSource| {
        let mut creds = Credentials::new(ak, sk);
        creds.session_token = session_token.clone();
        Some((creds, source))
    };

    let ak_field = non_blank(settings.ak.as_deref());
    let sk_field = non_blank(settings.sk.as_deref());
    let api_key = non_blank(settings.api_key.as_deref());

    if let (Some(ak), Some(sk)) = (ak_field, sk_field) {
        if looks_plain(ak) && looks_plain(sk) {
            return finish(ak.to_string(), sk.to_string(), CredentialSource::Config);
        }
    }

    let ak = ak_field
        .and_then(|a| extract_access_key(a, true))
        .or_else(|| api_key.and_then(|k| extract_access_key(k, false)));
    let sk = sk_field
        .and_then(extract_secret_key)
        .or_else(|| api_key.and_then(extract_secret_key));
    if let (Some(ak), Some(sk)) = (ak, sk) {
        return finish(ak, sk, CredentialSource::Extracted);
    }

    match (lookup(&ACCESS_KEY_ENV), lookup(&SECRET_KEY_ENV)) {
        (Some(ak), Some(sk)) => finish(ak, sk, CredentialSource::Environment),
        _ => None,
    }
}
