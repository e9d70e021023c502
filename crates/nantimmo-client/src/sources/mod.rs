//! Per-agency listing extractors.
//!
//! Each agency gets its own [`SiteExtractor`] implementation. To add a site,
//! add a module here and register it in [`default_sources`].

pub mod brigitte_sauvager;
pub mod graslin_immobilier;
mod markup;

use nantimmo_core::error::AppError;
use nantimmo_core::traits::SiteExtractor;

pub use brigitte_sauvager::BrigitteSauvager;
pub use graslin_immobilier::GraslinImmobilier;
pub use markup::background_image_url;

/// Every agency scraped by a regular run, in scraping order.
pub fn default_sources() -> Result<Vec<Box<dyn SiteExtractor>>, AppError> {
    Ok(vec![
        Box::new(BrigitteSauvager::new()?),
        Box::new(GraslinImmobilier::new()?),
    ])
}
