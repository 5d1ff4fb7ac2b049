//! Shared AWS plumbing for the S3 and Glue backends.
//!
//! The SDK is async-only. The job itself is strictly sequential, so each
//! backend drives its client through one private current-thread runtime.

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use tokio::runtime::Runtime;
use tracing::info;

/// Loaded SDK configuration plus the runtime used to block on SDK futures.
#[derive(Clone)]
pub struct AwsContext {
    runtime: Arc<Runtime>,
    config: SdkConfig,
}

impl AwsContext {
    /// Resolve credentials and region from the standard provider chain, with
    /// an optional region override.
    pub fn load(region: Option<&str>) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let config = runtime.block_on(loader.load());
        info!(
            "Loaded AWS config (region: {})",
            config.region().map(|r| r.as_ref()).unwrap_or("<unset>")
        );

        Ok(Self {
            runtime: Arc::new(runtime),
            config,
        })
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub(crate) fn runtime(&self) -> Arc<Runtime> {
        Arc::clone(&self.runtime)
    }
}
