//! Object-storage façade for fuzzer binaries, seed corpora, configs, and
//! crash corpora, plus the S3 backend and an in-memory fake for tests.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod facade;
pub mod fake;
pub mod s3;
pub mod traits;
pub mod validate;

pub use config::ObjectStorageSettings;
pub use facade::GatewayStorage;
pub use s3::S3ObjectStore;
pub use traits::ObjectStore;
