//! HTTP surface: hyper connection handling, matchit routing and the JSON
//! envelopes every endpoint shares.

pub mod request;
pub mod response;
pub mod router;
#[allow(clippy::module_inception)]
pub mod server;

pub use router::{Router, RouterError};
pub use server::Server;
