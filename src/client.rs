//! Async HTTP client for the AccuLynx REST API.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{CreateLeadRequest, Customer, Job, JobMessage, Lead, LeadHistory, PaymentRequest};
use crate::query::{JobQuery, MAX_PAGE_START_INDEX};
use crate::repository::JobSource;
use futures::stream::{self, Stream, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

#[derive(Deserialize)]
struct JobPage {
    #[serde(default)]
    items: Vec<Job>,
}

#[derive(Deserialize)]
struct CustomerPage {
    customers: Vec<Customer>,
}

// ============================================================================
// Uploads
// ============================================================================

/// A document for `POST /jobs/{id}/documents`.
#[derive(Clone, Debug)]
pub struct DocumentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub folder_id: Option<String>,
    pub description: Option<String>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        DocumentUpload {
            file_name: file_name.into(),
            bytes: bytes.into(),
            folder_id: None,
            description: None,
        }
    }

    /// Read `path` and use its final component as the file name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let (file_name, bytes) = read_upload(path.as_ref()).await?;
        Ok(Self::new(file_name, bytes))
    }

    pub fn with_folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn into_form(self) -> Result<Form> {
        let mut form = Form::new().part("file", file_part(self.file_name, self.bytes)?);
        if let Some(folder_id) = self.folder_id {
            form = form.text("folderId", folder_id);
        }
        if let Some(description) = self.description {
            form = form.text("description", description);
        }
        Ok(form)
    }
}

/// A photo or video for `POST /jobs/{id}/photos-videos`.
#[derive(Clone, Debug)]
pub struct MediaUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub tag_ids: Vec<String>,
    pub description: Option<String>,
}

impl MediaUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        MediaUpload {
            file_name: file_name.into(),
            bytes: bytes.into(),
            tag_ids: Vec::new(),
            description: None,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let (file_name, bytes) = read_upload(path.as_ref()).await?;
        Ok(Self::new(file_name, bytes))
    }

    pub fn with_tag_ids<I, S>(mut self, tag_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_ids = tag_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn into_form(self) -> Result<Form> {
        let mut form = Form::new().part("file", file_part(self.file_name, self.bytes)?);
        if !self.tag_ids.is_empty() {
            form = form.text("tagIds", self.tag_ids.join(","));
        }
        if let Some(description) = self.description {
            form = form.text("description", description);
        }
        Ok(form)
    }
}

async fn read_upload(path: &Path) -> Result<(String, Vec<u8>)> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::Validation {
            message: format!("upload path has no file name: {}", path.display()),
            status: None,
        })?
        .to_string();
    let bytes = tokio::fs::read(path).await?;
    Ok((file_name, bytes))
}

fn file_part(file_name: String, bytes: Vec<u8>) -> Result<Part> {
    if file_name.trim().is_empty() {
        return Err(Error::Validation {
            message: "upload requires a file name".to_string(),
            status: None,
        });
    }
    let content_type = mime_guess::from_path(&file_name)
        .first_or_octet_stream()
        .to_string();
    Ok(Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(&content_type)?)
}

// ============================================================================
// Client
// ============================================================================

/// Client for the AccuLynx v2 API.
///
/// Cloning is cheap; clones share the connection pool.
///
/// # Example
///
/// ```no_run
/// use acculynx::{AccuLynxClient, ClientConfig, JobQuery};
///
/// # async fn run() -> acculynx::Result<()> {
/// let client = AccuLynxClient::new(ClientConfig::new("api-key"))?;
/// let jobs = client.get_jobs(&JobQuery::page(25, 0)).await?;
/// println!("{} jobs on the first page", jobs.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct AccuLynxClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl AccuLynxClient {
    /// # Errors
    /// `Error::Config` if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| Error::Config(format!("api key is not a valid header value: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        debug!("AccuLynx client configured for {}", config.base_url);
        Ok(AccuLynxClient { http, config })
    }

    /// Build from `ACCULYNX_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    // ------------------------------------------------------------------------
    // Jobs
    // ------------------------------------------------------------------------

    /// `GET /jobs`. A response without `items` is an empty page.
    pub async fn get_jobs(&self, query: &JobQuery) -> Result<Vec<Job>> {
        let request = self.http.get(self.url("/jobs")).query(&query.to_query_pairs());
        let page: JobPage = self.send(request).await?;
        debug!(
            "Fetched {} jobs at index {}",
            page.items.len(),
            query.page_start_index
        );
        Ok(page.items)
    }

    /// Every job matching `query`, page by page from its start index.
    ///
    /// Ends at the first empty page or when the next start index would reach
    /// the API ceiling of 100 000. The first failed page ends the stream
    /// with that error.
    pub fn jobs_stream(&self, query: JobQuery) -> impl Stream<Item = Result<Job>> + '_ {
        stream::try_unfold(Some(query), move |next| async move {
            let Some(query) = next else {
                return Ok::<_, Error>(None);
            };
            let jobs = self.get_jobs(&query).await?;
            if jobs.is_empty() {
                return Ok(None);
            }

            let start = query.page_start_index.saturating_add(query.page_size);
            let next = (query.page_size > 0 && start < MAX_PAGE_START_INDEX)
                .then(|| query.at_page(start));
            Ok(Some((stream::iter(jobs.into_iter().map(Ok::<Job, Error>)), next)))
        })
        .try_flatten()
    }

    /// `GET /jobs/{id}`, optionally expanding `includes`.
    pub async fn get_job(&self, job_id: &str, includes: &[&str]) -> Result<Job> {
        let mut request = self.http.get(self.url(&format!("/jobs/{}", job_id)));
        if !includes.is_empty() {
            request = request.query(&[("includes", includes.join(","))]);
        }
        self.send(request).await
    }

    /// `POST /jobs/{id}/messages`.
    pub async fn create_job_message(&self, job_id: &str, message: impl Into<String>) -> Result<Value> {
        let body = JobMessage {
            message: message.into(),
        };
        let request = self
            .http
            .post(self.url(&format!("/jobs/{}/messages", job_id)))
            .json(&body);
        self.send(request).await
    }

    /// `POST /jobs/{id}/payments/received`.
    pub async fn create_payment_received(&self, job_id: &str, payment: &PaymentRequest) -> Result<Value> {
        let request = self
            .http
            .post(self.url(&format!("/jobs/{}/payments/received", job_id)))
            .json(payment);
        self.send(request).await
    }

    /// `POST /jobs/{id}/payments/paid`.
    pub async fn create_payment_paid(&self, job_id: &str, payment: &PaymentRequest) -> Result<Value> {
        let request = self
            .http
            .post(self.url(&format!("/jobs/{}/payments/paid", job_id)))
            .json(payment);
        self.send(request).await
    }

    /// Multipart `POST /jobs/{id}/documents`.
    pub async fn upload_document(&self, job_id: &str, upload: DocumentUpload) -> Result<Value> {
        let form = upload.into_form()?;
        let request = self
            .http
            .post(self.url(&format!("/jobs/{}/documents", job_id)))
            .multipart(form);
        self.send(request).await
    }

    /// Multipart `POST /jobs/{id}/photos-videos`.
    pub async fn upload_photo_or_video(&self, job_id: &str, upload: MediaUpload) -> Result<Value> {
        let form = upload.into_form()?;
        let request = self
            .http
            .post(self.url(&format!("/jobs/{}/photos-videos", job_id)))
            .multipart(form);
        self.send(request).await
    }

    // ------------------------------------------------------------------------
    // Leads and customers
    // ------------------------------------------------------------------------

    /// `POST /leads` on the v1 API.
    pub async fn create_lead(&self, lead: &CreateLeadRequest) -> Result<Lead> {
        let url = format!("{}/leads", self.config.v1_base_url());
        self.send(self.http.post(url).json(lead)).await
    }

    /// `GET /leads/{id}/history`.
    pub async fn get_lead_history(&self, lead_id: &str, includes: &[&str]) -> Result<Vec<LeadHistory>> {
        let mut request = self.http.get(self.url(&format!("/leads/{}/history", lead_id)));
        if !includes.is_empty() {
            request = request.query(&[("includes", includes.join(","))]);
        }
        self.send(request).await
    }

    /// `GET /customers`.
    pub async fn get_customers(&self, limit: u32, offset: u32) -> Result<Vec<Customer>> {
        let request = self
            .http
            .get(self.url("/customers"))
            .query(&[("limit", limit), ("offset", offset)]);
        let page: CustomerPage = self.send(request).await?;
        Ok(page.customers)
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            let err = Error::from_status(status.as_u16(), &body);
            debug!("AccuLynx request failed: {}", err);
            return Err(err);
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl JobSource for AccuLynxClient {
    async fn fetch_page(&self, page_size: u32, page_start_index: u32) -> Result<Vec<Job>> {
        self.get_jobs(&JobQuery::page(page_size, page_start_index))
            .await
    }

    async fn fetch_job(&self, id: &str) -> Result<Option<Job>> {
        match self.get_job(id, &[]).await {
            Ok(job) => Ok(Some(job)),
            Err(Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
