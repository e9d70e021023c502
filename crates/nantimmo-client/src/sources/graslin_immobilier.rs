use nantimmo_core::error::AppError;
use nantimmo_core::models::ListingDraft;
use nantimmo_core::report::{CardOutcome, SkipReason, SourceReport};
use nantimmo_core::traits::SiteExtractor;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::markup::{
    attr_of, background_image_url, base_url, first_text, resolve, selector, text_of,
};

pub const SITE: &str = "Graslin Immobilier";
pub const INDEX_URL: &str = "https://graslin-immobilier.com/acheter-de-lancien/";

const LINK: &str = "a.content";

/// Graslin Immobilier sale listings.
///
/// Rentals share the card markup and are excluded by the `.location` class.
/// Photos are set as an inline `background-image` on the card link, and
/// each characteristic is an `li` whose unit sits in an `i.suffixe`.
pub struct GraslinImmobilier {
    index_url: String,
    base: Url,
    card: Selector,
    link: Selector,
    info: Selector,
    category: Selector,
    title: Selector,
    item: Selector,
    value: Selector,
    suffix: Selector,
}

impl GraslinImmobilier {
    pub fn new() -> Result<Self, AppError> {
        Self::with_index_url(INDEX_URL)
    }

    pub fn with_index_url(index_url: &str) -> Result<Self, AppError> {
        Ok(Self {
            index_url: index_url.to_string(),
            base: base_url(index_url)?,
            card: selector("article.item.bien:not(.location)")?,
            link: selector(LINK)?,
            info: selector("div.info")?,
            category: selector("span")?,
            title: selector("h3.titre")?,
            item: selector("li")?,
            value: selector("span.value")?,
            suffix: selector("i.suffixe")?,
        })
    }

    fn parse_card(&self, card: ElementRef<'_>) -> CardOutcome {
        let link = card
            .select(&self.link)
            .next()
            .ok_or(SkipReason::MissingNode(LINK))?;

        let url = attr_of(link, "href").map(|href| resolve(&self.base, &href));
        // Only the link is resolved; the image URL is the dedup key and is
        // stored as scraped.
        let image_url = attr_of(link, "style")
            .as_deref()
            .and_then(background_image_url);

        let mut draft = ListingDraft {
            title_separator: " - ",
            url,
            image_url,
            ..ListingDraft::default()
        };

        if let Some(info) = card.select(&self.info).next() {
            draft.description = first_text(info, &self.category);
            draft.title_parts.push(first_text(info, &self.title));
            self.read_characteristics(info, &mut draft);
        }

        Ok(draft)
    }

    /// Sort each `li` value into price, surface or extra title part.
    fn read_characteristics(&self, info: ElementRef<'_>, draft: &mut ListingDraft) {
        for item in info.select(&self.item) {
            let Some(value) = item.select(&self.value).next() else {
                continue;
            };
            let text = text_of(value);
            let suffix = value.select(&self.suffix).next().and_then(text_of);

            match suffix.as_deref() {
                Some(unit) if unit.contains('€') => draft.price_text = text,
                Some(unit) if unit.contains("m²") || unit.contains("m2") => {
                    draft.surface_text = text.clone();
                    draft.title_parts.push(text);
                }
                _ => {
                    if text.is_some() {
                        draft.title_parts.push(text);
                    }
                }
            }
        }
    }
}

impl SiteExtractor for GraslinImmobilier {
    fn site(&self) -> &str {
        SITE
    }

    fn index_url(&self) -> &str {
        &self.index_url
    }

    fn extract(&self, html: &str) -> SourceReport {
        let document = Html::parse_document(html);
        let cards = document.select(&self.card).map(|card| self.parse_card(card));
        SourceReport::from_cards(SITE, cards)
    }
}
