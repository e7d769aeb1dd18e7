//! An authenticated, validated connection to one model.

use planlink_auth::authenticate;
use planlink_connection::{ApiClient, ConnectionContext, Endpoints, RetryPolicy};
use planlink_protocol::constants::MAX_CHUNK_MB;
use planlink_tasks::{ActionExecutor, DEFAULT_RETRY_COUNT, PollConfig, TaskResult, download_with};
use planlink_transfer::{
    DownloadOptions, DownloadedObject, UploadOutcome, UploadSource, download_object, upload,
};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::settings::AuthSettings;

/// Entry point for callers: authenticates once, then uploads files, runs
/// actions and downloads their results against a single model.
#[derive(Debug)]
pub struct Session {
    settings: AuthSettings,
    ctx: ConnectionContext,
    retry_count: u32,
    chunk_size_mb: u32,
    download: DownloadOptions,
    poll: PollConfig,
}

impl Session {
    /// Authenticates and checks that the token is accepted for the model.
    ///
    /// A token the model never accepts yields
    /// [`Error::ConnectionUnusable`].
    pub async fn connect(
        settings: &AuthSettings,
        endpoints: Endpoints,
        workspace_id: &str,
        model_id: &str,
    ) -> Result<Self> {
        Self::connect_with(
            settings,
            ApiClient::new(endpoints)?,
            workspace_id,
            model_id,
            RetryPolicy::token_warmup(),
        )
        .await
    }

    /// [`connect`](Self::connect) with a prepared client and validation policy.
    pub async fn connect_with(
        settings: &AuthSettings,
        api: ApiClient,
        workspace_id: &str,
        model_id: &str,
        validation: RetryPolicy,
    ) -> Result<Self> {
        let token = authenticate(
            &api,
            &settings.certificate,
            &settings.private_key,
            settings.passphrase.clone(),
        )
        .await?;

        let ctx = ConnectionContext::new(api, token, workspace_id, model_id)
            .with_validation_policy(validation);
        if ctx.validate().await.is_none() {
            return Err(Error::ConnectionUnusable {
                workspace_id: workspace_id.to_string(),
                model_id: model_id.to_string(),
            });
        }
        info!(workspace = workspace_id, model = model_id, "session ready");

        Ok(Self {
            settings: settings.clone(),
            ctx,
            retry_count: DEFAULT_RETRY_COUNT,
            chunk_size_mb: MAX_CHUNK_MB,
            download: DownloadOptions::default(),
            poll: PollConfig::default(),
        })
    }

    /// Submission and export attempts per action.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_chunk_size_mb(mut self, chunk_size_mb: u32) -> Self {
        self.chunk_size_mb = chunk_size_mb;
        self
    }

    pub fn with_download_options(mut self, options: DownloadOptions) -> Self {
        self.download = options;
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.ctx
    }

    /// Uploads `source` into model file `file_id`.
    pub async fn upload(
        &self,
        file_id: &str,
        source: impl Into<UploadSource>,
    ) -> Result<UploadOutcome> {
        Ok(upload(&self.ctx, file_id, self.chunk_size_mb, source.into()).await?)
    }

    /// Runs an action; a failed task is an error.
    pub async fn execute_action(&self, action_id: &str) -> Result<TaskResult> {
        Ok(self.executor().execute(action_id).await?)
    }

    /// Runs an action and returns its result even when the task failed.
    pub async fn run_action(&self, action_id: &str) -> Result<TaskResult> {
        Ok(self.executor().run(action_id).await?)
    }

    /// Runs export `action_id` and returns its normalized content.
    pub async fn download(&self, action_id: &str) -> Result<Vec<u8>> {
        Ok(download_with(
            &self.ctx,
            action_id,
            &self.download,
            RetryPolicy::transport(self.retry_count),
            self.poll,
        )
        .await?)
    }

    /// Fetches a stored model file as is.
    pub async fn download_object(&self, object_id: &str) -> Result<DownloadedObject> {
        Ok(download_object(&self.ctx, object_id, &self.download).await?)
    }

    /// Obtains a fresh token with the original settings and swaps it in
    /// once the model accepts it.
    pub async fn reauthenticate(&mut self) -> Result<()> {
        let token = authenticate(
            self.ctx.api(),
            &self.settings.certificate,
            &self.settings.private_key,
            self.settings.passphrase.clone(),
        )
        .await?;

        let mut candidate = self.ctx.clone();
        candidate.set_token(token);
        match candidate.validate().await {
            Some(token) => {
                self.ctx.set_token(token);
                info!("token rotated");
                Ok(())
            }
            None => {
                warn!("new token not accepted, keeping the previous one");
                Err(Error::ConnectionUnusable {
                    workspace_id: self.ctx.workspace_id().to_string(),
                    model_id: self.ctx.model_id().to_string(),
                })
            }
        }
    }

    fn executor(&self) -> ActionExecutor<'_> {
        ActionExecutor::new(&self.ctx)
            .with_retry_count(self.retry_count)
            .with_poll_config(self.poll)
            .with_download_options(self.download)
    }
}
