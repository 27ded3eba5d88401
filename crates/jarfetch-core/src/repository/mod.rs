//! Ordered repository chain: the local cache first, then remote repositories
//! in configured order. A path is served by the first source that has it.

mod chain;
mod error;
mod remote;
mod snapshot;
mod transport;

pub use chain::{Fetched, Origin, RepositoryChain};
pub use error::{RepositoryError, RepositoryFailure, RepositoryUrlError, TransportError};
pub use remote::{Credentials, RemoteRepository, MAVEN_CENTRAL};
pub use transport::{CurlTransport, Transport, TransportOptions};

#[cfg(test)]
pub(crate) use chain::tests::MapTransport;
