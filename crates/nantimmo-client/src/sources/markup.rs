use nantimmo_core::error::AppError;
use scraper::{ElementRef, Selector};
use url::Url;

/// Compile a CSS selector.
pub(crate) fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::ParseError(format!("Invalid selector `{css}`: {e}")))
}

/// Parse an extractor's index URL, which doubles as the base for relative links.
pub(crate) fn base_url(index_url: &str) -> Result<Url, AppError> {
    Url::parse(index_url)
        .map_err(|e| AppError::ConfigError(format!("Invalid index URL '{index_url}': {e}")))
}

/// Element text with whitespace collapsed; `None` when blank.
pub(crate) fn text_of(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Text of the first descendant matching `selector`.
pub(crate) fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).next().and_then(text_of)
}

/// Trimmed attribute value; `None` when absent or blank.
pub(crate) fn attr_of(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Resolve a possibly relative link against the page URL.
///
/// Values that cannot be joined are kept as scraped.
pub(crate) fn resolve(base: &Url, raw: &str) -> String {
    base.join(raw)
        .map(String::from)
        .unwrap_or_else(|_| raw.to_string())
}

/// Pull the image URL out of an inline `background-image` style.
///
/// Accepts `url(x)`, `url('x')`, `url("x")` and the padded `url( 'x' )`
/// form some agency themes emit. A quoted value ends at its closing quote,
/// so parentheses inside it are kept.
pub fn background_image_url(style: &str) -> Option<String> {
    let start = style.find("url(")? + "url(".len();
    let rest = style[start..].trim_start();

    let inner = match rest.chars().next()? {
        quote @ ('\'' | '"') => {
            let quoted = &rest[1..];
            &quoted[..quoted.find(quote)?]
        }
        _ => &rest[..rest.find(')')?],
    };

    let inner = inner.trim();
    (!inner.is_empty()).then(|| inner.to_string())
}
