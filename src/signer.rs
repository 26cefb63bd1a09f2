//! Secure-link token generation and signed URL assembly.
//!
//! The token is `MD5(expiry + path + secret + ip)` in URL-safe base64 without
//! padding, which is what nginx's `secure_link_md5` recomputes on the edge.

use std::fmt;
use std::str::FromStr;

use base64_simd::URL_SAFE_NO_PAD;
use md5::{Digest, Md5};

use crate::error::SignError;

/// Where the token lands in the final URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// `<scheme>://<host>/secure=...<path>`. Lets the edge match every
    /// resource under `path` with one token (HLS playlists and their chunks).
    Path,
    /// `<scheme>://<host><path>?secure=...`
    #[default]
    QueryString,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Path => "path",
            Format::QueryString => "querystring",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = SignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "path" => Ok(Format::Path),
            "querystring" => Ok(Format::QueryString),
            _ => Err(SignError::UnknownFormat(s.to_string())),
        }
    }
}

/// Everything needed to sign one CDN resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    pub format: Format,
    pub scheme: String,
    /// CDN resource hostname without scheme, e.g. `cdn.example.com`.
    pub hostname: String,
    pub path: String,
    pub secret_key: String,
    /// Unix seconds after which the edge rejects the URL.
    pub expiry: Option<u64>,
    pub client_ip: Option<String>,
}

impl SigningRequest {
    pub fn new(hostname: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            format: Format::default(),
            scheme: "http".to_string(),
            hostname: hostname.into(),
            path: "/".to_string(),
            secret_key: secret_key.into(),
            expiry: None,
            client_ip: None,
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_expiry(mut self, expiry: Option<u64>) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_client_ip(mut self, client_ip: Option<String>) -> Self {
        self.client_ip = client_ip;
        self
    }

    fn client_ip(&self) -> Option<&str> {
        self.client_ip.as_deref().filter(|ip| !ip.is_empty())
    }
}

/// A finished signed URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignedUrl(String);

impl SignedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SignedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SignedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns everything before the first `?`.
pub fn strip_query(s: &str) -> &str {
    match s.find('?') {
        Some(pos) => &s[..pos],
        None => s,
    }
}

/// Prepends the leading slash when missing, then drops any query string.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    if !path.starts_with('/') {
        out.push('/');
    }
    out.push_str(path);
    out.truncate(strip_query(&out).len());
    out
}

/// The exact string that gets hashed: expiry, path, secret, ip, no separators.
pub fn token_key(req: &SigningRequest) -> String {
    let path = normalize_path(&req.path);
    let expiry = req.expiry.map(|e| e.to_string()).unwrap_or_default();
    let ip = req.client_ip().unwrap_or("");

    let mut key =
        String::with_capacity(expiry.len() + path.len() + req.secret_key.len() + ip.len());
    key.push_str(&expiry);
    key.push_str(&path);
    key.push_str(&req.secret_key);
    key.push_str(ip);
    key
}

/// Bare token value (the part after `secure=`).
pub fn token(req: &SigningRequest) -> Result<String, SignError> {
    validate(req)?;
    Ok(digest_token(&token_key(req)))
}

/// Builds the signed URL for `req`.
pub fn sign(req: &SigningRequest) -> Result<SignedUrl, SignError> {
    let hostname = validate(req)?;
    let path = normalize_path(&req.path);
    let token = digest_token(&token_key(req));

    let mut params = format!("secure={token}");
    if let Some(expiry) = req.expiry {
        params.push_str(&format!("&expires={expiry}"));
    }
    if let Some(ip) = req.client_ip() {
        params.push_str(&format!("&ip={ip}"));
    }

    let url = match req.format {
        Format::Path => format!("{}://{hostname}/{params}{path}", req.scheme),
        Format::QueryString => format!("{}://{hostname}{path}?{params}", req.scheme),
    };

    tracing::debug!(
        hostname,
        path = %path,
        format = %req.format,
        expires = ?req.expiry,
        "signed url"
    );

    Ok(SignedUrl(url))
}

fn validate(req: &SigningRequest) -> Result<&str, SignError> {
    let hostname = strip_query(&req.hostname);
    if hostname.is_empty() {
        return Err(SignError::EmptyHostname);
    }
    if req.secret_key.is_empty() {
        return Err(SignError::EmptySecretKey);
    }
    Ok(hostname)
}

/// Standard base64 with `+/` swapped for `-_` and padding dropped is the
/// URL-safe no-pad alphabet.
fn digest_token(token_key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(token_key.as_bytes());
    let hash = hasher.finalize();
    URL_SAFE_NO_PAD.encode_to_string(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64_simd::STANDARD;

    const TOKEN: &str = "13UShqpVn0pkzv_f7UzLLg";

    fn photo_request() -> SigningRequest {
        SigningRequest::new("example.com", "123abc")
            .with_path("images/photo.png")
            .with_expiry(Some(1546300800))
            .with_client_ip(Some("1.3.2.2".to_string()))
    }

    #[test]
    fn querystring_reference_vector() {
        let url = sign(&photo_request()).unwrap();
        assert_eq!(
            url.as_str(),
            format!(
                "http://example.com/images/photo.png?secure={TOKEN}&expires=1546300800&ip=1.3.2.2"
            )
        );
    }

    #[test]
    fn path_reference_vector() {
        let url = sign(&photo_request().with_format(Format::Path)).unwrap();
        assert_eq!(
            url.as_str(),
            format!(
                "http://example.com/secure={TOKEN}&expires=1546300800&ip=1.3.2.2/images/photo.png"
            )
        );
    }

    #[test]
    fn token_key_ordering() {
        assert_eq!(
            token_key(&photo_request()),
            "1546300800/images/photo.png123abc1.3.2.2"
        );
        assert_eq!(token(&photo_request()).unwrap(), TOKEN);
    }

    #[test]
    fn token_matches_substituted_standard_base64() {
        let key = token_key(&photo_request());
        let digest = Md5::digest(key.as_bytes());
        let substituted = STANDARD
            .encode_to_string(digest)
            .replace('+', "-")
            .replace('/', "_")
            .replace('=', "")
            .replace('\n', "");
        assert_eq!(digest_token(&key), substituted);
    }

    #[test]
    fn signing_is_deterministic() {
        let req = photo_request().with_scheme("https");
        assert_eq!(sign(&req).unwrap(), sign(&req).unwrap());
    }

    #[test]
    fn normalized_path_resigns_identically() {
        let raw = photo_request();
        let normalized = photo_request().with_path(normalize_path(&raw.path));
        assert_eq!(normalized.path, "/images/photo.png");
        assert_eq!(token_key(&raw), token_key(&normalized));
        assert_eq!(sign(&raw).unwrap(), sign(&normalized).unwrap());
    }

    #[test]
    fn query_strings_are_stripped() {
        let req = SigningRequest::new("example.com?x=1", "123abc").with_path("/a?b=2");
        assert_eq!(token_key(&req), "/a123abc");
        assert_eq!(
            sign(&req).unwrap().as_str(),
            "http://example.com/a?secure=1xGZCIt-FFDQjXSpv5C-1w"
        );
    }

    #[test]
    fn format_moves_token_but_keeps_value() {
        let qs = sign(&photo_request()).unwrap().into_string();
        let path = sign(&photo_request().with_format(Format::Path))
            .unwrap()
            .into_string();
        assert_ne!(qs, path);
        let needle = format!("secure={TOKEN}&");
        assert!(qs.contains(&needle));
        assert!(path.starts_with(&format!("http://example.com/{needle}")));
    }

    #[test]
    fn optional_fields_omitted() {
        let req = SigningRequest::new("example.com", "123abc").with_path("/images/photo.png");
        assert_eq!(token_key(&req), "/images/photo.png123abc");

        let url = sign(&req).unwrap().into_string();
        assert_eq!(
            url,
            "http://example.com/images/photo.png?secure=FwPveXgI3S31-tCVPBFtqw"
        );
        assert!(!url.contains("&expires="));
        assert!(!url.contains("&ip="));
    }

    #[test]
    fn expiry_only() {
        let req = photo_request().with_client_ip(None);
        assert_eq!(token_key(&req), "1546300800/images/photo.png123abc");
        assert_eq!(
            sign(&req).unwrap().as_str(),
            "http://example.com/images/photo.png?secure=Ymna_KI277QEX5wh1u_pEQ&expires=1546300800"
        );
    }

    #[test]
    fn empty_ip_is_absent() {
        let req = photo_request()
            .with_expiry(None)
            .with_client_ip(Some(String::new()));
        assert_eq!(token_key(&req), "/images/photo.png123abc");
        assert!(!sign(&req).unwrap().as_str().contains("&ip="));
    }

    #[test]
    fn default_path_is_root() {
        let req = SigningRequest::new("cdn.example.com", "123abc").with_format(Format::Path);
        assert_eq!(token_key(&req), "/123abc");
        assert_eq!(
            sign(&req).unwrap().as_str(),
            "http://cdn.example.com/secure=mMLZ7RdvCaiFIYVvCdlQpQ/"
        );
    }

    #[test]
    fn empty_path_becomes_root() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("?only=query"), "/");
        assert_eq!(normalize_path("files/a.html?v=1"), "/files/a.html");
    }

    #[test]
    fn rejects_empty_inputs() {
        assert_eq!(
            sign(&SigningRequest::new("", "123abc")),
            Err(SignError::EmptyHostname)
        );
        assert_eq!(
            sign(&SigningRequest::new("?x=1", "123abc")),
            Err(SignError::EmptyHostname)
        );
        assert_eq!(
            sign(&SigningRequest::new("example.com", "")),
            Err(SignError::EmptySecretKey)
        );
        assert_eq!(
            token(&SigningRequest::new("example.com", "")),
            Err(SignError::EmptySecretKey)
        );
    }

    #[test]
    fn format_parsing() {
        assert_eq!("path".parse::<Format>(), Ok(Format::Path));
        assert_eq!("QueryString".parse::<Format>(), Ok(Format::QueryString));
        assert_eq!(
            "header".parse::<Format>(),
            Err(SignError::UnknownFormat("header".to_string()))
        );
        assert_eq!(Format::default().to_string(), "querystring");
    }

    #[test]
    fn signs_from_many_threads() {
        let req = photo_request();
        let expected = sign(&req).unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| sign(&req).unwrap())).collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), expected);
            }
        });
    }
}
