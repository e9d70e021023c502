pub mod fetcher;
pub mod sources;

pub use fetcher::{HttpConfig, ReqwestFetcher};
pub use sources::{BrigitteSauvager, GraslinImmobilier, default_sources};
