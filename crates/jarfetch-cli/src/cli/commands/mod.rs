//! CLI command handlers, one file per command.

mod checksum;
mod path;
mod resolve;

pub use checksum::run_checksum;
pub use path::run_path;
pub use resolve::run_resolve;
#[cfg(test)]
pub(crate) use resolve::parse_pin;
