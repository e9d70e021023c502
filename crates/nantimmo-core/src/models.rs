use chrono::{NaiveDate, NaiveDateTime};

/// Raw, not-yet-normalized output of an extractor for one listing card.
///
/// Sites map their markup onto these fields differently. Sources without a
/// single title field provide several `title_parts`, joined with the site's
/// own separator at normalization time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingDraft {
    pub title_parts: Vec<Option<String>>,
    pub title_separator: &'static str,
    pub price_text: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub surface_text: Option<String>,
}

/// One normalized real-estate advertisement.
///
/// `image_url` is the deduplication key. `price_numeric` and `square_meters`
/// are derived from the text fields and have no setters of their own.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Listing {
    pub site: String,
    pub title: Option<String>,
    pub price_text: Option<String>,
    pub price_numeric: Option<i64>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub square_meters: Option<i32>,
    pub scraped_date: NaiveDate,
}

impl Listing {
    /// Complete a draft into a canonical listing.
    ///
    /// `scraped_date` is the run date, shared by every listing of a run.
    pub fn normalize(site: &str, draft: ListingDraft, scraped_date: NaiveDate) -> Self {
        let title = join_title_parts(&draft.title_parts, draft.title_separator);
        let price_numeric = draft.price_text.as_deref().and_then(digits_to_int::<i64>);
        let square_meters = draft.surface_text.as_deref().and_then(digits_to_int::<i32>);

        Self {
            site: site.to_string(),
            title,
            price_text: draft.price_text,
            price_numeric,
            description: draft.description,
            url: draft.url,
            image_url: draft.image_url,
            square_meters,
            scraped_date,
        }
    }
}

/// A listing as read back from the store, with its store-assigned fields.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredListing {
    pub id: i64,
    #[serde(flatten)]
    pub listing: Listing,
    pub created_at: Option<NaiveDateTime>,
}

/// Concatenate every ASCII digit of `text`, in order, and parse the result.
///
/// Returns `None` when there are no digits or the number does not fit `T`.
/// `"345 000 €"` → `345000`, `"1.2M"` → `12`.
pub fn digits_to_int<T: std::str::FromStr>(text: &str) -> Option<T> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Join the non-empty parts with `separator`; `None` if nothing is left.
pub fn join_title_parts(parts: &[Option<String>], separator: &str) -> Option<String> {
    let present: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if present.is_empty() {
        None
    } else {
        Some(present.join(separator))
    }
}
