//! Blocking client for the CipherStudio REST API.
//! CipherStudio REST API 的阻塞式用戶端。

use std::time::Duration;

use cipherstudio_workspace::{FileRecord, ProjectId, RecordId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::BearerToken;
use crate::store::{
    FileDraft, FilePatch, FileStore, NewProject, ProjectDetail, ProjectSummary, StoreError,
};

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct RawDetail {
    project: Option<ProjectSummary>,
    #[serde(default)]
    files: Vec<FileRecord>,
}

/// [`FileStore`] talking to the REST persistence service.
/// 透過 REST 儲存服務運作的 [`FileStore`]。
#[derive(Debug)]
pub struct RestFileStore {
    agent: ureq::Agent,
    base_url: String,
    token: Option<BearerToken>,
}

impl RestFileStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("cipherstudio/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<BearerToken>) -> Self {
        self.token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        let request = self
            .agent
            .request(method, url)
            .set("Accept", "application/json");
        match &self.token {
            Some(token) => request.set("Authorization", &token.header_value()),
            None => request,
        }
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, StoreError> {
        let url = self.url(segments);
        debug!(%url, "GET");
        read_json(&url, self.request("GET", &url).call())
    }

    fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        segments: &[&str],
        body: &B,
    ) -> Result<T, StoreError> {
        let url = self.url(segments);
        debug!(%url, method, "sending");
        read_json(&url, self.request(method, &url).send_json(body))
    }

    fn delete(&self, segments: &[&str]) -> Result<(), StoreError> {
        let url = self.url(segments);
        debug!(%url, "DELETE");
        self.request("DELETE", &url)
            .call()
            .map(|_| ())
            .map_err(|err| map_error(&url, err))
    }
}

impl FileStore for RestFileStore {
    fn list_projects(&self, user_id: &str) -> Result<Vec<ProjectSummary>, StoreError> {
        self.get(&["projects", user_id])
    }

    fn create_project(&mut self, project: &NewProject) -> Result<ProjectSummary, StoreError> {
        self.send("POST", &["projects"], project)
    }

    fn delete_project(&mut self, id: &ProjectId) -> Result<(), StoreError> {
        self.delete(&["projects", id.as_str()])
    }

    fn project_detail(&self, id: &ProjectId) -> Result<ProjectDetail, StoreError> {
        let raw: RawDetail = self.get(&["projects", "detail", id.as_str()])?;
        let project = raw
            .project
            .ok_or_else(|| StoreError::ProjectNotFound(id.clone()))?;
        Ok(ProjectDetail {
            project,
            files: raw.files,
        })
    }

    fn create_file(&mut self, draft: &FileDraft) -> Result<FileRecord, StoreError> {
        self.send("POST", &["files"], draft)
    }

    fn update_file(&mut self, id: &RecordId, patch: &FilePatch) -> Result<FileRecord, StoreError> {
        let updated: Option<FileRecord> = self.send("PUT", &["files", id.as_str()], patch)?;
        updated.ok_or_else(|| StoreError::FileNotFound(id.clone()))
    }

    fn delete_file(&mut self, id: &RecordId) -> Result<(), StoreError> {
        self.delete(&["files", id.as_str()])
    }
}

fn read_json<T: DeserializeOwned>(
    url: &str,
    response: Result<ureq::Response, ureq::Error>,
) -> Result<T, StoreError> {
    let response = response.map_err(|err| map_error(url, err))?;
    response.into_json().map_err(|source| StoreError::Decode {
        url: url.to_string(),
        source,
    })
}

fn map_error(url: &str, err: ureq::Error) -> StoreError {
    match err {
        ureq::Error::Status(status, response) => {
            let fallback = response.status_text().to_string();
            let message = response
                .into_json::<ErrorBody>()
                .ok()
                .and_then(|body| body.error.or(body.message))
                .unwrap_or(fallback);
            StoreError::Status {
                url: url.to_string(),
                status,
                message,
            }
        }
        ureq::Error::Transport(transport) => StoreError::Transport {
            url: url.to_string(),
            message: transport.to_string(),
        },
    }
}
