//! Slugs and human-readable names derived from URLs and titles

use crate::UrlError;
use url::Url;

/// Maximum length of a directory slug
const MAX_SLUG_LEN: usize = 50;

/// Turns a title into a filesystem-safe directory name
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a single
/// hyphen, trims hyphens from both ends and caps the result at 50 characters.
///
/// # Examples
///
/// ```
/// use sb_harvest::url::slugify;
///
/// assert_eq!(slugify("  Amy's Soundboard!  "), "amy-s-soundboard");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    // Everything pushed is ASCII, so byte truncation is safe
    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}

/// Derives an item id and display title from a detail page URL
///
/// The id is the last non-empty path segment; the title is that segment split on
/// `-`/`_` with each word title-cased.
///
/// # Examples
///
/// ```
/// use sb_harvest::url::identity_from_url;
///
/// let (id, title) = identity_from_url("https://example.com/sb/amy-soundboard/").unwrap();
/// assert_eq!(id, "amy-soundboard");
/// assert_eq!(title, "Amy Soundboard");
/// ```
pub fn identity_from_url(url_str: &str) -> Result<(String, String), UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .ok_or_else(|| UrlError::MissingSegment(url_str.to_string()))?
        .to_string();

    let title = segment
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");

    Ok((segment, title))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
