//! Spotify history transform - shared modules for all binaries.

#[cfg(feature = "aws")]
pub mod aws;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod safety;
pub mod storage;
#[cfg(test)]
pub mod test_utils;
