use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{BulkResponse, DocumentStore};
use crate::config::StoreConfig;
use crate::error::{PipelineError, Result};
use crate::writers::mapping::IndexMapping;

/// Elasticsearch REST client for the handful of endpoints the loader uses.
pub struct ElasticsearchStore {
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

impl ElasticsearchStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        }
    }

    /// Turns a non-2xx response into a protocol error carrying the body.
    async fn ensure_success(endpoint: String, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(PipelineError::BulkProtocol {
            endpoint,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl DocumentStore for ElasticsearchStore {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        let endpoint = self.endpoint(index);
        let response = self
            .authorize(self.client.head(&endpoint))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Self::ensure_success(endpoint, response).await.map(|_| false),
        }
    }

    async fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<()> {
        let endpoint = self.endpoint(index);
        debug!(%endpoint, fields = mapping.len(), "Creating index");

        let response = self
            .authorize(self.client.put(&endpoint))
            .json(&mapping.to_create_body())
            .send()
            .await?;

        Self::ensure_success(endpoint, response).await?;
        Ok(())
    }

    async fn bulk(&self, body: String) -> Result<BulkResponse> {
        let endpoint = self.endpoint("_bulk");
        let response = self
            .authorize(self.client.post(&endpoint))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;

        let response = Self::ensure_success(endpoint, response).await?;
        Ok(response.json::<BulkResponse>().await?)
    }

    async fn count(&self, index: &str) -> Result<u64> {
        let endpoint = self.endpoint(&format!("{}/_count", index));
        let response = self
            .authorize(self.client.get(&endpoint))
            .send()
            .await?;

        let response = Self::ensure_success(endpoint, response).await?;
        Ok(response.json::<CountResponse>().await?.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn store_at(url: String) -> ElasticsearchStore {
        let config = StoreConfig {
            url,
            timeout_secs: 5,
            ..StoreConfig::default()
        };
        ElasticsearchStore::new(&config).unwrap()
    }

    /// Answers a single HTTP request with `status_line` and `body`.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            // Headers, then as much body as Content-Length announces
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_bulk_server_error_is_protocol_error() {
        let (url, server) = serve_once(
            "HTTP/1.1 500 Internal Server Error",
            r#"{"error":"cluster_block_exception"}"#,
        )
        .await;
        let store = store_at(url);

        let result = store.bulk("{\"index\":{\"_index\":\"trips\"}}\n{}\n".to_string()).await;
        server.await.unwrap();

        match result {
            Err(PipelineError::BulkProtocol { endpoint, status, body }) => {
                assert!(endpoint.ends_with("/_bulk"));
                assert_eq!(status, 500);
                assert!(body.contains("cluster_block_exception"));
            }
            other => panic!("expected a protocol error, got {:?}", other.map(|r| r.items.len())),
        }
    }

    #[tokio::test]
    async fn test_create_index_unauthorized_is_protocol_error() {
        let (url, server) = serve_once(
            "HTTP/1.1 401 Unauthorized",
            r#"{"error":"security_exception"}"#,
        )
        .await;
        let store = store_at(url);

        let mapping = IndexMapping::from_fields([("value", crate::writers::mapping::FieldType::Float)]);
        let result = store.create_index("trips", &mapping).await;
        server.await.unwrap();

        assert!(matches!(
            result,
            Err(PipelineError::BulkProtocol { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_refused_connection_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let result = store_at(url).bulk(String::new()).await;

        assert!(matches!(result, Err(PipelineError::Http(_))));
    }

    #[test]
    fn test_endpoint_joining() {
        let config = StoreConfig {
            url: "http://localhost:9200/".to_string(),
            ..StoreConfig::default()
        };
        let store = ElasticsearchStore::new(&config).unwrap();

        assert_eq!(store.endpoint("_bulk"), "http://localhost:9200/_bulk");
        assert_eq!(
            store.endpoint("/nyc_yellow_taxi_trips/_count"),
            "http://localhost:9200/nyc_yellow_taxi_trips/_count"
        );
    }
}
