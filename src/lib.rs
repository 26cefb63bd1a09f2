//! Signed URLs for CDN resources guarded by a secure-link module.
//!
//! ```
//! use urlsign::{sign, Format, SigningRequest};
//!
//! let req = SigningRequest::new("example.com", "123abc")
//!     .with_path("images/photo.png")
//!     .with_expiry(Some(1546300800))
//!     .with_client_ip(Some("1.3.2.2".to_string()))
//!     .with_format(Format::Path);
//!
//! assert_eq!(
//!     sign(&req).unwrap().as_str(),
//!     "http://example.com/secure=13UShqpVn0pkzv_f7UzLLg&expires=1546300800&ip=1.3.2.2/images/photo.png"
//! );
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod signer;

pub use error::{ConfigError, SignError};
pub use signer::{sign, token, token_key, Format, SignedUrl, SigningRequest};
