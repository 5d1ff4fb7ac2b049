//! S3-backed object store.
//!
//! Blocking wrapper over `aws-sdk-s3`; every call runs to completion on the
//! context's runtime before returning.

use std::sync::Arc;

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::{ObjectStore, StorageError};
use crate::aws::AwsContext;

pub struct S3ObjectStore {
    client: Client,
    runtime: Arc<Runtime>,
}

impl S3ObjectStore {
    /// Build a client from the shared context. A custom endpoint (MinIO,
    /// LocalStack) switches to path-style addressing.
    pub fn new(ctx: &AwsContext, endpoint_url: Option<&str>) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(ctx.config());
        if let Some(endpoint) = endpoint_url {
            let endpoint = endpoint.trim_end_matches('/');
            info!("Using custom S3 endpoint: {}", endpoint);
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            runtime: ctx.runtime(),
        }
    }
}

/// `CopySource` is `{bucket}/{key}` with the key URL-encoded per segment.
fn copy_source(bucket: &str, key: &str) -> String {
    let encoded: Vec<_> = key.split('/').map(urlencoding::encode).collect();
    format!("{}/{}", bucket, encoded.join("/"))
}

impl ObjectStore for S3ObjectStore {
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.runtime.block_on(async {
            let mut keys = Vec::new();
            let mut continuation_token: Option<String> = None;

            loop {
                let mut req = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
                if let Some(token) = continuation_token.take() {
                    req = req.continuation_token(token);
                }

                let resp = req.send().await.map_err(|e| {
                    StorageError::Backend(format!("list {bucket}/{prefix}: {}", DisplayErrorContext(&e)))
                })?;

                for obj in resp.contents() {
                    if let Some(key) = obj.key() {
                        keys.push(key.to_string());
                    }
                }

                if resp.is_truncated() == Some(true) {
                    continuation_token = resp.next_continuation_token().map(str::to_string);
                } else {
                    break;
                }
            }

            debug!(bucket, prefix, count = keys.len(), "Listed S3 objects");
            Ok::<_, StorageError>(keys)
        })
    }

    fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.runtime.block_on(async {
            let resp = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| {
                    if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                        StorageError::not_found(bucket, key)
                    } else {
                        StorageError::Backend(format!("get {bucket}/{key}: {}", DisplayErrorContext(&e)))
                    }
                })?;

            let bytes = resp
                .body
                .collect()
                .await
                .map_err(|e| StorageError::Backend(format!("read body for {bucket}/{key}: {e}")))?
                .into_bytes()
                .to_vec();
            Ok::<_, StorageError>(bytes)
        })
    }

    fn write(&self, bucket: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.runtime
            .block_on(
                self.client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .body(ByteStream::from(data.to_vec()))
                    .send(),
            )
            .map_err(|e| StorageError::Backend(format!("put {bucket}/{key}: {}", DisplayErrorContext(&e))))?;
        Ok(())
    }

    fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), StorageError> {
        self.runtime
            .block_on(
                self.client
                    .copy_object()
                    .copy_source(copy_source(src_bucket, src_key))
                    .bucket(dst_bucket)
                    .key(dst_key)
                    .send(),
            )
            .map_err(|e| {
                StorageError::Backend(format!(
                    "copy {src_bucket}/{src_key} -> {dst_bucket}/{dst_key}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.runtime
            .block_on(self.client.delete_object().bucket(bucket).key(key).send())
            .map_err(|e| StorageError::Backend(format!("delete {bucket}/{key}: {}", DisplayErrorContext(&e))))?;
        Ok(())
    }
}
