//! Resource URL hardening

use url::Url;

/// Upgrade a plain-HTTP resource URL to HTTPS.
///
/// Only the scheme is touched; host, path and query are preserved. Strings
/// that do not parse as URLs but still start with `http:` (for example
/// catalog entries with unescaped spaces) get a textual prefix swap.
pub fn secure_url(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Ok(mut parsed) = Url::parse(trimmed) {
        if parsed.scheme() == "http" && parsed.set_scheme("https").is_ok() {
            return parsed.to_string();
        }
        return trimmed.to_string();
    }

    match trimmed.strip_prefix("http:") {
        Some(rest) => format!("https:{rest}"),
        None => trimmed.to_string(),
    }
}
