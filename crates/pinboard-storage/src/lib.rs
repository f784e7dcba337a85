pub mod signing;
pub mod store;

pub use signing::{LinkError, UrlSigner};
pub use store::LocalObjectStore;
