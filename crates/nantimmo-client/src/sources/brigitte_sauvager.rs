use nantimmo_core::error::AppError;
use nantimmo_core::models::ListingDraft;
use nantimmo_core::report::{CardOutcome, SkipReason, SourceReport};
use nantimmo_core::traits::SiteExtractor;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::markup::{attr_of, base_url, first_text, resolve, selector};

pub const SITE: &str = "Brigitte Sauvager";
pub const INDEX_URL: &str = "https://www.brigitte-sauvager.com/appartements-a-vendre-a-nantes";

const LINK: &str = "a[href]";

/// Brigitte Sauvager apartment listings.
///
/// Cards are bootstrap `col-md-4` columns. The site has no title field, so
/// the title is built from location and surface.
pub struct BrigitteSauvager {
    index_url: String,
    base: Url,
    card: Selector,
    link: Selector,
    image: Selector,
    location: Selector,
    presentation: Selector,
    surface: Selector,
    price: Selector,
}

impl BrigitteSauvager {
    pub fn new() -> Result<Self, AppError> {
        Self::with_index_url(INDEX_URL)
    }

    pub fn with_index_url(index_url: &str) -> Result<Self, AppError> {
        Ok(Self {
            index_url: index_url.to_string(),
            base: base_url(index_url)?,
            card: selector("div.col-md-4")?,
            link: selector(LINK)?,
            image: selector("img[src]")?,
            location: selector("p.localisation")?,
            presentation: selector("p.presentation")?,
            surface: selector("p.surface")?,
            // The price paragraph is the only one without a class.
            price: selector("p:not([class])")?,
        })
    }

    fn parse_card(&self, card: ElementRef<'_>) -> CardOutcome {
        let link = card
            .select(&self.link)
            .next()
            .and_then(|a| attr_of(a, "href"))
            .ok_or(SkipReason::MissingNode(LINK))?;

        // Kept as scraped: stored image URLs are the dedup keys.
        let image = card
            .select(&self.image)
            .next()
            .and_then(|img| attr_of(img, "src"));

        let location = first_text(card, &self.location);
        let surface = first_text(card, &self.surface);

        Ok(ListingDraft {
            title_parts: vec![location, surface.clone()],
            title_separator: ", ",
            price_text: first_text(card, &self.price),
            description: first_text(card, &self.presentation),
            url: Some(resolve(&self.base, &link)),
            image_url: image,
            surface_text: surface,
        })
    }
}

impl SiteExtractor for BrigitteSauvager {
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
