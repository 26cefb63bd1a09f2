/// Reasons the signer refuses a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignError {
    #[error("Resource hostname not given.")]
    EmptyHostname,

    #[error("URL Signing Key not given.")]
    EmptySecretKey,

    #[error("Unknown format {0:?}, expected \"path\" or \"querystring\"")]
    UnknownFormat(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {var} from {path}: {source}")]
    SecretFile {
        var: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
}
