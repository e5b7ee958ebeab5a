/// Host and root-domain helpers for Tab Grouper
use url::Url;

/// Extract the root domain of a URL
///
/// The root domain is the host with its leftmost label dropped when the host
/// has more than two labels. It is only used to decide whether a navigation
/// stayed on the same site, so it does not consult a public suffix list.
///
/// Examples:
/// - https://www.google.com/search → google.com
/// - https://google.com → google.com
/// - https://a.b.example.com → b.example.com
/// - http://localhost:3000 → localhost
pub fn root_domain(url: &str) -> Option<String> {
    let hostname = extract_hostname(url)?;

    // Special cases: localhost and IP addresses
    if hostname == "localhost" || is_ip_address(&hostname) {
        return Some(hostname);
    }

    let parts: Vec<&str> = hostname.split('.').collect();
    if parts.len() > 2 {
        Some(parts[1..].join("."))
    } else {
        Some(hostname)
    }
}

/// Extract the lowercase hostname (no port) from a URL string
pub fn extract_hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let hostname = parsed.host_str()?.to_lowercase();

    if hostname.is_empty() {
        None
    } else {
        Some(hostname)
    }
}

/// Host as the browser reports `URL.host`: hostname plus a non-default port
pub fn host_with_port(url: &Url) -> Option<String> {
    let hostname = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", hostname, port),
        None => hostname.to_string(),
    })
}

/// Check if a string looks like an IP address
fn is_ip_address(s: &str) -> bool {
    if s.starts_with('[') {
        return true;
    }
    s.chars().next().map_or(false, |c| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_digit() || c == '.')
}
