use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use urlsign::config;
use urlsign::logging;
use urlsign::{sign, Format, SigningRequest};

/// Generate a secure-link signed URL for a CDN resource.
///
/// Example: urlsign -r example.com -p images/photo.png -k 123abc -e 1546300800 -i 1.3.2.2 -f path
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Token placement: "path" or "querystring"
    #[arg(short, long, default_value = "querystring")]
    format: Format,

    /// CDN resource hostname without scheme, e.g. cdn.example.com
    #[arg(short, long)]
    resource: Option<String>,

    /// File path of the resource, part of the token key. For HLS pass the
    /// directory so every chunk is covered
    #[arg(short, long, default_value = "/")]
    path: String,

    /// URL signing key (falls back to URL_SIGNING_KEY / URL_SIGNING_KEY_FILE)
    #[arg(short, long)]
    key: Option<String>,

    /// URL scheme, http or https
    #[arg(short, long, default_value = "http")]
    scheme: String,

    /// Expiry as a unix timestamp
    #[arg(short, long)]
    expires: Option<u64>,

    /// Client IP allowed to use the URL
    #[arg(short, long)]
    ip: Option<String>,
}

fn main() -> ExitCode {
    logging::init_logging();
    config::load_dotenv();

    let args = Cli::parse();

    let key = match config::resolve_signing_key(args.key) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let hostname = args.resource.filter(|r| !r.is_empty());

    let mut missing = Vec::new();
    if hostname.is_none() {
        missing.push("Resource hostname not given.");
    }
    if key.is_none() {
        missing.push("URL Signing Key not given.");
    }
    let (Some(hostname), Some(key)) = (hostname, key) else {
        Cli::command()
            .error(ErrorKind::MissingRequiredArgument, missing.join(" "))
            .exit();
    };

    let req = SigningRequest::new(hostname, key)
        .with_format(args.format)
        .with_scheme(args.scheme)
        .with_path(args.path)
        .with_expiry(args.expires)
        .with_client_ip(args.ip);

    match sign(&req) {
        Ok(url) => {
            println!("{url}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
