use crate::error::ClientError;
use crate::server::types::ApiResponse;
use crate::types::{JobConfig, JobId, JobSummary};
use serde::de::DeserializeOwned;
use url::Url;

/// Client for the daemon's control API, used by the CLI front-end.
///
/// Errors are surfaced immediately; retry policy belongs to the caller.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base: Url, token: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), base, token }
    }

    pub async fn job_start(&self, id: JobId) -> Result<(), ClientError> {
        self.post::<()>(&format!("jobs/{id}/start"), None).await?;
        Ok(())
    }

    pub async fn job_stop(&self, id: JobId) -> Result<(), ClientError> {
        self.post::<()>(&format!("jobs/{id}/stop"), None).await?;
        Ok(())
    }

    pub async fn job_list(&self) -> Result<Vec<JobSummary>, ClientError> {
        let resp = self.get::<Vec<JobSummary>>("jobs").await?;
        resp.data.ok_or_else(|| ClientError::Api("job list response had no data".into()))
    }

    pub async fn gap_fill(&self, config: &JobConfig) -> Result<JobId, ClientError> {
        self.submit("gaps/fill", config).await
    }

    pub async fn gap_find(&self, config: &JobConfig) -> Result<JobId, ClientError> {
        self.submit("gaps/find", config).await
    }

    async fn submit(&self, path: &str, config: &JobConfig) -> Result<JobId, ClientError> {
        let body = serde_json::to_value(config)
            .map_err(|err| ClientError::Api(format!("encoding job config: {err}")))?;
        let resp = self.post::<JobId>(path, Some(body)).await?;
        resp.data.ok_or_else(|| ClientError::Api("submission response had no job id".into()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ClientError> {
        let url = self.url(path)?;
        let mut req = self.http.get(url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        Self::decode(req.send().await?).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse<T>, ClientError> {
        let url = self.url(path)?;
        let mut req = self.http.post(url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        Self::decode(req.send().await?).await
    }

    async fn decode<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<ApiResponse<T>, ClientError> {
        let status = resp.status();
        let parsed: ApiResponse<T> = resp
            .json()
            .await
            .map_err(|_| ClientError::Api(format!("control api returned {status}")))?;
        if !parsed.success {
            let message =
                parsed.message.unwrap_or_else(|| format!("control api returned {status}"));
            return Err(ClientError::Api(message));
        }
        Ok(parsed)
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|err| ClientError::Api(format!("invalid api path {path:?}: {err}")))
    }
}
