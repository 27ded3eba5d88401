//! Descriptor retrieval and the effective POM model: fetch, verify, parse,
//! walk parents, import BOMs, substitute properties.

mod effective;
mod error;
mod fetcher;
mod interpolate;
mod parse;

pub use effective::extension_for_type;
pub use error::{CycleError, CycleKind, ParseError, PomError};
pub use fetcher::PomFetcher;
