//! Glue-backed catalog job service.

use std::sync::Arc;

use aws_sdk_glue::error::DisplayErrorContext;
use aws_sdk_glue::operation::RequestId;
use aws_sdk_glue::types::CrawlerState;
use aws_sdk_glue::Client;
use tokio::runtime::Runtime;

use super::{CatalogJobService, JobServiceError, JobState, StartConfirmation};
use crate::aws::AwsContext;

/// Glue crawlers as catalog jobs. Only `RUNNING` counts as running; ready,
/// stopping and unknown states are all treated as idle.
pub struct GlueCrawlerService {
    client: Client,
    runtime: Arc<Runtime>,
}

impl GlueCrawlerService {
    pub fn new(ctx: &AwsContext) -> Self {
        Self {
            client: Client::new(ctx.config()),
            runtime: ctx.runtime(),
        }
    }
}

impl CatalogJobService for GlueCrawlerService {
    fn get_status(&self, job_name: &str) -> Result<JobState, JobServiceError> {
        let result = self
            .runtime
            .block_on(self.client.get_crawler().name(job_name).send());

        match result {
            Ok(output) => {
                let state = output.crawler().and_then(|c| c.state());
                if matches!(state, Some(CrawlerState::Running)) {
                    Ok(JobState::Running)
                } else {
                    Ok(JobState::Idle)
                }
            }
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_entity_not_found_exception()) =>
            {
                Err(JobServiceError::NotFound(job_name.to_string()))
            }
            Err(e) => Err(JobServiceError::Lookup(format!(
                "get_crawler {job_name}: {}",
                DisplayErrorContext(&e)
            ))),
        }
    }

    fn start(&self, job_name: &str) -> Result<StartConfirmation, JobServiceError> {
        let output = self
            .runtime
            .block_on(self.client.start_crawler().name(job_name).send())
            .map_err(|e| {
                JobServiceError::Start(format!(
                    "start_crawler {job_name}: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(StartConfirmation {
            job_name: job_name.to_string(),
            request_id: output.request_id().map(str::to_string),
        })
    }
}
