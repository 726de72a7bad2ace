//! Remote object store access

pub mod client;
pub mod errors;
pub mod pages;
pub mod retry;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::S3Store;
pub use errors::RemoteError;
pub use pages::pages;
pub use retry::RetryPolicy;
pub use types::*;
