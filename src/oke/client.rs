/// Container Engine for Kubernetes API client
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;
use url::Url;

use super::models::*;
use crate::config::ApiConfig;
use crate::error::{OkeError, OkeResult};

const API_VERSION: &str = "20180222";
const WORK_REQUEST_HEADER: &str = "opc-work-request-id";

/// Remote control-plane operations used by okectl
///
/// Mutating calls return the id of the work request that tracks them.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    async fn create_cluster(&self, request: &CreateClusterRequest) -> OkeResult<String>;

    async fn delete_cluster(&self, cluster_id: &str) -> OkeResult<String>;

    async fn create_node_pool(&self, request: &CreateNodePoolRequest) -> OkeResult<String>;

    async fn delete_node_pool(&self, node_pool_id: &str) -> OkeResult<String>;

    async fn get_node_pool(&self, node_pool_id: &str) -> OkeResult<NodePool>;

    async fn get_work_request(&self, work_request_id: &str) -> OkeResult<WorkRequest>;

    /// Issue a kubeconfig and copy its bytes into `sink`, returning the byte count
    async fn create_kubeconfig(
        &self,
        cluster_id: &str,
        request: &CreateKubeconfigRequest,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> OkeResult<u64>;
}

/// HTTP implementation of [`ContainerEngine`]
#[derive(Clone)]
pub struct ContainerEngineClient {
    client: Client,
    base_url: Url,
}

impl ContainerEngineClient {
    /// Create a new Container Engine API client
    pub fn new(config: &ApiConfig) -> OkeResult<Self> {
        let base_url = config.endpoint_url()?;

        let mut headers = header::HeaderMap::new();
        if let Some(token) = &config.auth_token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| OkeError::InvalidConfig("Invalid auth token format".to_string()))?,
            );
        }
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("okectl/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Build `<endpoint>/20180222/<segments...>`, escaping each segment
    fn url(&self, segments: &[&str]) -> OkeResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                OkeError::InvalidConfig(format!(
                    "Endpoint cannot be used as a base URL: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push(API_VERSION)
            .extend(segments);
        Ok(url)
    }

    /// Make a GET request to the API
    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> OkeResult<T> {
        let url = self.url(segments)?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// POST a body and return the work request tracking it
    async fn post_tracked<T: Serialize>(
        &self,
        segments: &[&str],
        body: &T,
        operation: &str,
    ) -> OkeResult<String> {
        let url = self.url(segments)?;
        debug!("POST {}", url);

        let response = self.client.post(url).json(body).send().await?;
        let response = Self::check_status(response).await?;
        Self::work_request_id(&response, operation)
    }

    /// DELETE a resource and return the work request tracking it
    async fn delete_tracked(&self, segments: &[&str], operation: &str) -> OkeResult<String> {
        let url = self.url(segments)?;
        debug!("DELETE {}", url);

        let response = self.client.delete(url).send().await?;
        let response = Self::check_status(response).await?;
        Self::work_request_id(&response, operation)
    }

    fn work_request_id(response: &Response, operation: &str) -> OkeResult<String> {
        response
            .headers()
            .get(WORK_REQUEST_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| OkeError::MissingWorkRequestId(operation.to_string()))
    }

    /// Handle API response, checking for errors
    async fn check_status(response: Response) -> OkeResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        Err(Self::api_error(status.as_u16(), &error_text))
    }

    fn api_error(status: u16, body: &str) -> OkeError {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(error) => OkeError::Api {
                status,
                code: error.code,
                message: error.message,
            },
            Err(_) => OkeError::Api {
                status,
                code: "Unknown".to_string(),
                message: body.to_string(),
            },
        }
    }
}

#[async_trait]
impl ContainerEngine for ContainerEngineClient {
    async fn create_cluster(&self, request: &CreateClusterRequest) -> OkeResult<String> {
        self.post_tracked(&["clusters"], request, "create cluster")
            .await
    }

    async fn delete_cluster(&self, cluster_id: &str) -> OkeResult<String> {
        self.delete_tracked(&["clusters", cluster_id], "delete cluster")
            .await
    }

    async fn create_node_pool(&self, request: &CreateNodePoolRequest) -> OkeResult<String> {
        self.post_tracked(&["nodePools"], request, "create node pool")
            .await
    }

    async fn delete_node_pool(&self, node_pool_id: &str) -> OkeResult<String> {
        self.delete_tracked(&["nodePools", node_pool_id], "delete node pool")
            .await
    }

    async fn get_node_pool(&self, node_pool_id: &str) -> OkeResult<NodePool> {
        self.get(&["nodePools", node_pool_id]).await
    }

    async fn get_work_request(&self, work_request_id: &str) -> OkeResult<WorkRequest> {
        self.get(&["workRequests", work_request_id]).await
    }

    async fn create_kubeconfig(
        &self,
        cluster_id: &str,
        request: &CreateKubeconfigRequest,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> OkeResult<u64> {
        let url = self.url(&["clusters", cluster_id, "kubeconfig", "content"])?;
        debug!("POST {}", url);

        let response = self.client.post(url).json(request).send().await?;
        let response = Self::check_status(response).await?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        Ok(written)
    }
}
