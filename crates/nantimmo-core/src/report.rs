use std::fmt;

use crate::models::ListingDraft;

/// Why a listing card was skipped by an extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A node the card cannot do without was absent (the selector is kept).
    MissingNode(&'static str),
    /// The node was there but its content could not be used.
    Malformed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingNode(selector) => write!(f, "missing node `{selector}`"),
            SkipReason::Malformed(detail) => write!(f, "malformed card: {detail}"),
        }
    }
}

/// Result of extracting a single card.
pub type CardOutcome = Result<ListingDraft, SkipReason>;

/// A card that was skipped, with its position on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCard {
    pub index: usize,
    pub reason: SkipReason,
}

/// What one extractor got out of one listing page.
#[derive(Debug, Clone, Default)]
pub struct SourceReport {
    pub site: String,
    pub cards_found: usize,
    pub drafts: Vec<ListingDraft>,
    pub skipped: Vec<SkippedCard>,
}

impl SourceReport {
    /// Aggregate per-card outcomes, in page order.
    pub fn from_cards(site: &str, cards: impl IntoIterator<Item = CardOutcome>) -> Self {
        let mut report = Self {
            site: site.to_string(),
            ..Self::default()
        };

        for (index, outcome) in cards.into_iter().enumerate() {
            report.cards_found += 1;
            match outcome {
                Ok(draft) => report.drafts.push(draft),
                Err(reason) => report.skipped.push(SkippedCard { index, reason }),
            }
        }

        report
    }
}
