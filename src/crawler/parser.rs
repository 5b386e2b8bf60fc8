//! HTML parser for soundboard listing and detail pages
//!
//! Parsing is pure: markup in, records out. Fetching the two scripts a detail
//! page depends on is done by [`crate::crawler::parse_detail`], which drives the
//! parser methods below around the fetches.

use crate::crawler::records::{
    is_safe_asset_name, AssetRef, Author, Category, ListingRecord, Thumbnail, TitleLink,
    ASSET_EXTENSION,
};
use crate::url::resolve_resource_url;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

/// Prefix stripped from an article's `id` attribute
const POST_ID_PREFIX: &str = "post-";

/// Used when the behavior script has no recognizable base path
pub const DEFAULT_BASE_PATH: &str = "/sb/sounds/";

/// Container holding the soundboard buttons on a detail page
const BUTTON_CONTAINER: &str = "#soundboard";

/// Ids and labels that mark the "stop all" control
const STOP_IDS: &[&str] = &["stop", "stop-all", "stopall"];
const STOP_LABEL: &str = "stop all";

/// Absolute URLs of the two scripts a detail page needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailResources {
    pub sounds_url: Url,
    pub behavior_url: Url,
}

/// Capability to turn site markup into records
pub trait PageParser: Send + Sync {
    /// Parses a listing page into records, in document order
    fn parse_listing(&self, html: &str) -> Vec<ListingRecord>;

    /// Finds the sounds and behavior script URLs on a detail page
    fn detail_resources(&self, html: &str) -> Result<DetailResources, String>;

    /// Extracts the audio base path from the behavior script, with a fallback
    fn extract_base_path(&self, script: &str) -> String;

    /// Turns the detail page's buttons into assets
    fn parse_assets(&self, html: &str, base_path: &str) -> Result<Vec<AssetRef>, String>;
}

/// Parser for WordPress-style soundboard listings and their board pages
#[derive(Debug, Clone)]
pub struct SoundboardParser {
    origin: Url,
}

impl SoundboardParser {
    /// Creates a parser resolving relative references against `origin`
    pub fn new(origin: Url) -> Self {
        Self { origin }
    }
}

impl PageParser for SoundboardParser {
    fn parse_listing(&self, html: &str) -> Vec<ListingRecord> {
        let document = Html::parse_document(html);
        let Ok(article_selector) = Selector::parse("article") else {
            return Vec::new();
        };

        document
            .select(&article_selector)
            .map(parse_article)
            .collect()
    }

    fn detail_resources(&self, html: &str) -> Result<DetailResources, String> {
        let document = Html::parse_document(html);
        let script_selector = Selector::parse("script[src]").map_err(|e| e.to_string())?;

        let mut sounds = None;
        let mut behavior = None;

        for element in document.select(&script_selector) {
            let Some(src) = element.value().attr("src") else {
                continue;
            };
            let name = script_file_name(src);

            if sounds.is_none() && is_named_script(name, "sounds") {
                sounds = Some(src);
            } else if behavior.is_none() && is_named_script(name, "behavior") {
                behavior = Some(src);
            }
        }

        let sounds = sounds.ok_or_else(|| "sounds script not found".to_string())?;
        let behavior = behavior.ok_or_else(|| "behavior script not found".to_string())?;

        Ok(DetailResources {
            sounds_url: resolve_resource_url(sounds, &self.origin).map_err(|e| e.to_string())?,
            behavior_url: resolve_resource_url(behavior, &self.origin)
                .map_err(|e| e.to_string())?,
        })
    }

    fn extract_base_path(&self, script: &str) -> String {
        extract_base_path(script)
    }

    fn parse_assets(&self, html: &str, base_path: &str) -> Result<Vec<AssetRef>, String> {
        let document = Html::parse_document(html);
        let container_selector = Selector::parse(BUTTON_CONTAINER).map_err(|e| e.to_string())?;
        let button_selector = Selector::parse("button").map_err(|e| e.to_string())?;

        let container = document
            .select(&container_selector)
            .next()
            .ok_or_else(|| format!("button container {} not found", BUTTON_CONTAINER))?;

        let mut assets = Vec::new();
        let mut seen = HashSet::new();
        for button in container.select(&button_selector) {
            let label = element_text(button);

            if is_stop_control(button, &label) {
                continue;
            }

            let Some(remote_name) = button
                .value()
                .attr("id")
                .map(str::trim)
                .filter(|id| !id.is_empty())
            else {
                tracing::debug!("Skipping button without id: {:?}", label);
                continue;
            };

            if !is_safe_asset_name(remote_name) {
                tracing::debug!("Skipping button with unusable id {:?}", remote_name);
                continue;
            }

            // One asset per file name
            if !seen.insert(remote_name) {
                tracing::debug!("Skipping duplicate button id {:?}", remote_name);
                continue;
            }

            assets.push(AssetRef {
                position_id: assets.len() as u32 + 1,
                label,
                remote_name: remote_name.to_string(),
                remote_path: format!("{}{}.{}", base_path, remote_name, ASSET_EXTENSION),
                local_relative_path: None,
            });
        }

        Ok(assets)
    }
}

/// Extracts the base path preceding the `+ sound` concatenation in a behavior script
///
/// Looks for a quoted string immediately followed by `+ sound`, e.g.
/// `audio.src = "/sb/sounds/amy/" + sound + ".mp3";`. Falls back to
/// [`DEFAULT_BASE_PATH`] when nothing matches.
///
/// # Examples
///
/// ```
/// use sb_harvest::crawler::extract_base_path;
///
/// let js = r#"var a = new Audio('/sb/sounds/amy/' + sound + '.mp3');"#;
/// assert_eq!(extract_base_path(js), "/sb/sounds/amy/");
/// assert_eq!(extract_base_path("play();"), "/sb/sounds/");
/// ```
pub fn extract_base_path(script: &str) -> String {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

    let pattern = PATTERN.get_or_init(|| Regex::new(r#"["']([^"'\r\n]+)["']\s*\+\s*sound\b"#).ok());

    pattern
        .as_ref()
        .and_then(|re| re.captures(script))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string())
}

/// Builds a listing record from one `<article>` element
fn parse_article(article: ElementRef<'_>) -> ListingRecord {
    let id = article
        .value()
        .attr("id")
        .and_then(|id| id.strip_prefix(POST_ID_PREFIX))
        .map(str::to_string)
        .filter(|id| !id.is_empty());

    let title = select_first(article, ".entry-title a")
        .map(|a| TitleLink {
            text: non_empty(element_text(a)),
            url: attr(a, "href"),
        })
        .unwrap_or_default();

    let author = select_first(article, ".entry-author a")
        .map(|a| Author {
            name: non_empty(element_text(a)),
            url: attr(a, "href"),
        })
        .unwrap_or_default();

    let categories = select_all(article, ".entry-categories a")
        .into_iter()
        .map(|a| Category {
            name: non_empty(element_text(a)),
            url: attr(a, "href"),
        })
        .collect();

    let thumbnail = select_first(article, ".entry-thumbnail img").map(|img| Thumbnail {
        url: attr(img, "src"),
        alt: attr(img, "alt"),
        width: attr(img, "width"),
        height: attr(img, "height"),
    });

    ListingRecord {
        id,
        title,
        detail_url: select_first(article, ".continue-reading").and_then(|a| attr(a, "href")),
        date: non_empty(joined_text(article, ".entry-date a")),
        author,
        categories,
        thumbnail,
        excerpt: non_empty(joined_text(article, ".entry-excerpt p")),
    }
}

/// File name of a script reference, without query or fragment
fn script_file_name(src: &str) -> &str {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    path.rsplit('/').next().unwrap_or(path)
}

fn is_named_script(file_name: &str, stem: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower.starts_with(stem) && lower.ends_with(".js")
}

fn is_stop_control(button: ElementRef<'_>, label: &str) -> bool {
    let element = button.value();

    let id_matches = element
        .attr("id")
        .map(|id| STOP_IDS.contains(&id.trim().to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    let class_matches = element.classes().any(|c| c.eq_ignore_ascii_case("stop-all"));
    let label_matches = label.eq_ignore_ascii_case(STOP_LABEL);

    id_matches || class_matches || label_matches
}

fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Concatenated text of every match, trimmed
fn joined_text(scope: ElementRef<'_>, css: &str) -> String {
    select_all(scope, css)
        .into_iter()
        .map(|el| el.text().collect::<String>())
        .collect::<String>()
        .trim()
        .to_string()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> SoundboardParser {
        SoundboardParser::new(Url::parse("https://www.example.com/").unwrap())
    }

    const LISTING: &str = r#"
        <html><body>
        <article id="post-10" class="post">
            <h2 class="entry-title"><a href="https://www.example.com/sb/amy/">Amy Soundboard</a></h2>
            <span class="entry-date"><a href="/2020/03/">March 1, 2020</a></span>
            <span class="entry-author"><a href="/author/bob/">Bob</a></span>
            <span class="entry-categories">
                <a href="/category/tv/">TV</a>
                <a href="/category/cartoons/">Cartoons</a>
            </span>
            <div class="entry-thumbnail">
                <img src="/img/amy.jpg" alt="Amy" width="150" height="120">
            </div>
            <div class="entry-excerpt"><p>All of Amy's lines.</p></div>
            <a class="continue-reading" href="https://www.example.com/sb/amy/">Continue</a>
        </article>
        <article id="post-11" class="post">
            <h2 class="entry-title"><a href="https://www.example.com/sb/bob/">Bob Soundboard</a></h2>
            <a class="continue-reading" href="https://www.example.com/sb/bob/">Continue</a>
        </article>
        </body></html>
    "#;

    const DETAIL: &str = r#"
        <html><head>
            <script src="/sb/js/jquery.js"></script>
            <script src="//cdn.example.com/sb/amy/sounds.js?ver=3"></script>
            <script src="/sb/amy/behavior.js"></script>
        </head><body>
        <div id="soundboard">
            <button id="hello">Hello there</button>
            <button>No id here</button>
            <button id="stop">Stop All</button>
            <button id="bye">Goodbye</button>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_listing_ids_in_document_order() {
        let records = parser().parse_listing(LISTING);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_deref(), Some("10"));
        assert_eq!(records[1].id.as_deref(), Some("11"));
    }

    #[test]
    fn test_listing_fields() {
        let records = parser().parse_listing(LISTING);
        let amy = &records[0];

        assert_eq!(amy.title.text.as_deref(), Some("Amy Soundboard"));
        assert_eq!(
            amy.title.url.as_deref(),
            Some("https://www.example.com/sb/amy/")
        );
        assert_eq!(
            amy.detail_url.as_deref(),
            Some("https://www.example.com/sb/amy/")
        );
        assert_eq!(amy.date.as_deref(), Some("March 1, 2020"));
        assert_eq!(amy.author.name.as_deref(), Some("Bob"));
        assert_eq!(amy.categories.len(), 2);
        assert_eq!(amy.categories[1].name.as_deref(), Some("Cartoons"));

        let thumb = amy.thumbnail.as_ref().unwrap();
        assert_eq!(thumb.url.as_deref(), Some("/img/amy.jpg"));
        assert_eq!(thumb.width.as_deref(), Some("150"));
        assert_eq!(thumb.height.as_deref(), Some("120"));
        assert_eq!(amy.excerpt.as_deref(), Some("All of Amy's lines."));
    }

    #[test]
    fn test_listing_missing_optional_fields() {
        let records = parser().parse_listing(LISTING);
        let bob = &records[1];

        assert!(bob.thumbnail.is_none());
        assert!(bob.excerpt.is_none());
        assert!(bob.date.is_none());
        assert!(bob.categories.is_empty());
        assert_eq!(bob.author, Author::default());
    }

    #[test]
    fn test_listing_without_prefix_has_no_id() {
        let html = r#"
            <article id="page-3"><h2 class="entry-title"><a href="/a">A</a></h2></article>
            <article><h2 class="entry-title"><a href="/b">B</a></h2></article>
        "#;
        let records = parser().parse_listing(html);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.id.is_none()));
    }

    #[test]
    fn test_listing_empty_page() {
        let records = parser().parse_listing("<html><body><p>Nothing found</p></body></html>");
        assert!(records.is_empty());
    }

    #[test]
    fn test_detail_resources_resolved() {
        let resources = parser().detail_resources(DETAIL).unwrap();
        assert_eq!(
            resources.sounds_url.as_str(),
            "https://cdn.example.com/sb/amy/sounds.js?ver=3"
        );
        assert_eq!(
            resources.behavior_url.as_str(),
            "https://www.example.com/sb/amy/behavior.js"
        );
    }

    #[test]
    fn test_detail_resources_missing_behavior() {
        let html = r#"<script src="/sb/amy/sounds.js"></script>"#;
        let err = parser().detail_resources(html).unwrap_err();
        assert!(err.contains("behavior"));
    }

    #[test]
    fn test_detail_resources_missing_sounds() {
        let html = r#"<script src="/sb/amy/behavior.js"></script>"#;
        let err = parser().detail_resources(html).unwrap_err();
        assert!(err.contains("sounds"));
    }

    #[test]
    fn test_parse_assets_skips_stop_and_unnamed() {
        let assets = parser().parse_assets(DETAIL, "/sb/sounds/amy/").unwrap();

        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].position_id, 1);
        assert_eq!(assets[0].remote_name, "hello");
        assert_eq!(assets[0].label, "Hello there");
        assert_eq!(assets[0].remote_path, "/sb/sounds/amy/hello.mp3");
        assert_eq!(assets[1].position_id, 2);
        assert_eq!(assets[1].remote_name, "bye");
        assert!(assets.iter().all(|a| a.local_relative_path.is_none()));
    }

    #[test]
    fn test_parse_assets_skips_unsafe_ids() {
        let html = r#"
            <div id="soundboard">
                <button id="../../x">Up</button>
                <button id="a/b">Nested</button>
                <button id="..">Parent</button>
                <button id="ok-1">Fine</button>
            </div>
        "#;
        let assets = parser().parse_assets(html, "/s/").unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].remote_name, "ok-1");
        assert_eq!(assets[0].position_id, 1);
        assert_eq!(assets[0].relative_path(), "assets/ok-1.mp3");
    }

    #[test]
    fn test_parse_assets_keeps_first_of_duplicate_ids() {
        let html = r#"
            <div id="soundboard">
                <button id="hey">Hey</button>
                <button id="hey">Hey again</button>
                <button id="ho">Ho</button>
            </div>
        "#;
        let assets = parser().parse_assets(html, "/s/").unwrap();
        let names: Vec<_> = assets.iter().map(|a| a.remote_name.as_str()).collect();
        assert_eq!(names, vec!["hey", "ho"]);
        assert_eq!(assets[0].label, "Hey");
        assert_eq!(assets[1].position_id, 2);
    }

    #[test]
    fn test_parse_assets_stop_by_class_or_label() {
        let html = r#"
            <div id="soundboard">
                <button id="halt" class="btn stop-all">Halt</button>
                <button id="quiet">STOP ALL</button>
                <button id="yes">Yes</button>
            </div>
        "#;
        let assets = parser().parse_assets(html, "/s/").unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].remote_name, "yes");
        assert_eq!(assets[0].position_id, 1);
    }

    #[test]
    fn test_parse_assets_ignores_buttons_outside_container() {
        let html = r#"
            <button id="menu">Menu</button>
            <div id="soundboard"><button id="one">One</button></div>
        "#;
        let assets = parser().parse_assets(html, "/s/").unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].remote_name, "one");
    }

    #[test]
    fn test_parse_assets_requires_container() {
        let result = parser().parse_assets("<button id=\"x\">X</button>", "/s/");
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_base_path_double_quotes() {
        let js = r#"function play(sound) { new Audio("https://cdn.example.com/amy/" + sound + ".mp3").play(); }"#;
        assert_eq!(extract_base_path(js), "https://cdn.example.com/amy/");
    }

    #[test]
    fn test_extract_base_path_requires_sound_token() {
        let js = r#"var x = "/not/this/" + other + ".mp3";"#;
        assert_eq!(extract_base_path(js), DEFAULT_BASE_PATH);
    }

    #[test]
    fn test_extract_base_path_first_match_wins() {
        let js = r#"a = '/first/' + sound; b = '/second/' + sound;"#;
        assert_eq!(extract_base_path(js), "/first/");
    }

    #[test]
    fn test_extract_base_path_empty_script() {
        assert_eq!(extract_base_path(""), DEFAULT_BASE_PATH);
    }

    #[test]
    fn test_script_file_name() {
        assert_eq!(script_file_name("/a/b/sounds.js?v=1"), "sounds.js");
        assert_eq!(script_file_name("behavior.js#x"), "behavior.js");
        assert_eq!(script_file_name("https://x.com/"), "");
    }
}
