pub mod client;
pub mod error;
pub mod traits;
pub mod wire;

pub use client::OmdbClient;
pub use error::ProviderError;
pub use traits::MetadataProvider;
