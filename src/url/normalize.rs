use crate::UrlError;
use url::Url;

/// Scheme given to protocol-relative references (`//host/path`)
const DEFAULT_SCHEME: &str = "https";

/// Resolves a resource reference found in page markup to an absolute URL
///
/// # Resolution Rules
///
/// 1. Already absolute (`http://`, `https://`) → passed through
/// 2. Protocol-relative (`//cdn.example.com/x.js`) → `https:` prepended
/// 3. Path-absolute (`/sb/x.js`) → site origin prepended
/// 4. Anything else relative → resolved against the site origin
///
/// # Examples
///
/// ```
/// use sb_harvest::url::resolve_resource_url;
/// use url::Url;
///
/// let origin = Url::parse("https://www.example.com/").unwrap();
/// let url = resolve_resource_url("//cdn.example.com/sounds.js", &origin).unwrap();
/// assert_eq!(url.as_str(), "https://cdn.example.com/sounds.js");
/// ```
pub fn resolve_resource_url(href: &str, origin: &Url) -> Result<Url, UrlError> {
    let href = href.trim();

    if href.is_empty() {
        return Err(UrlError::Parse("empty resource reference".to_string()));
    }

    let parsed = if href.starts_with("http://") || href.starts_with("https://") {
        Url::parse(href)
    } else if let Some(rest) = href.strip_prefix("//") {
        Url::parse(&format!("{}://{}", DEFAULT_SCHEME, rest))
    } else {
        origin.join(href)
    };
    let resolved = parsed.map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return Err(UrlError::InvalidScheme(resolved.scheme().to_string()));
    }

    Ok(resolved)
}

/// Returns the origin (`scheme://host[:port]/`) of a URL
pub fn site_origin(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let origin = url.origin().ascii_serialization();
    Url::parse(&format!("{}/", origin)).map_err(|e| UrlError::Parse(e.to_string()))
}

/// Builds the URL of a listing page
///
/// Page 1 is the bare listing URL; page n appends `page/<n>/`.
pub fn listing_page_url(listing_url: &str, page: u32) -> String {
    if page <= 1 {
        return listing_url.to_string();
    }

    let base = listing_url.trim_end_matches('/');
    format!("{}/page/{}/", base, page)
}
