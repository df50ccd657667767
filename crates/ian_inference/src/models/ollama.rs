use std::fmt;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use ian_core::{Error, GenerationBackend, ModelInfo, Result};
use crate::InferenceConfig;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    modified_at: Option<String>,
}

/// Client for a local Ollama server (`/api/generate`, `/api/tags`).
pub struct OllamaBackend {
    client: Client,
    host: String,
    probe_timeout: Duration,
}

impl fmt::Debug for OllamaBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaBackend")
            .field("client", &"<reqwest::Client>")
            .field("host", &self.host)
            .finish()
    }
}

impl OllamaBackend {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let client = Client::builder()
            .no_proxy()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            probe_timeout: config.connect_timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

/// Transport problems are transient, anything else means the backend
/// answered and we could not use the answer.
fn map_http_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::BackendUnavailable(format!("request timed out: {}", error))
    } else if error.is_connect() || error.is_request() {
        Error::BackendUnavailable(format!("connection error: {}", error))
    } else if error.is_decode() {
        Error::BackendError(format!("malformed response: {}", error))
    } else {
        Error::BackendError(format!("HTTP error: {}", error))
    }
}

async fn error_from_status(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    Error::BackendError(format!("status {}: {}", status, message.trim()))
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, model: &str, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.host))
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            return Err(error_from_status(response).await);
        }

        let body: GenerateResponse = response.json().await.map_err(map_http_error)?;
        if let Some(error) = body.error {
            return Err(Error::BackendError(error));
        }
        Ok(body.response)
    }

    async fn probe(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.host))
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Ollama probe at {} failed: {}", self.host, e);
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.host))
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            return Err(error_from_status(response).await);
        }

        let tags: TagsResponse = response.json().await.map_err(map_http_error)?;
        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelInfo {
                name: m.name,
                size: m.size,
                modified_at: m.modified_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::{get, post}, Json, Router};
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fake_ollama() -> Router {
        Router::new()
            .route(
                "/api/generate",
                post(|Json(body): Json<Value>| async move {
                    if body["model"] == "llama2" && body["stream"] == false {
                        (StatusCode::OK, Json(json!({ "response": "  Robots en casa\n", "done": true })))
                    } else {
                        (
                            StatusCode::NOT_FOUND,
                            Json(json!({ "error": format!("model '{}' not found", body["model"].as_str().unwrap_or("")) })),
                        )
                    }
                }),
            )
            .route(
                "/api/tags",
                get(|| async {
                    Json(json!({
                        "models": [
                            { "name": "llama2:latest", "size": 3825819519u64, "modified_at": "2024-01-01T00:00:00Z" },
                            { "name": "mistral:latest", "size": 4109865159u64 }
                        ]
                    }))
                }),
            )
    }

    async fn closed_port() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn backend(host: String) -> OllamaBackend {
        let config = InferenceConfig::default().with_host(&host).unwrap();
        OllamaBackend::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_complete_returns_raw_text() {
        let backend = backend(serve(fake_ollama()).await);
        let text = backend.complete("llama2", "Genera un título").await.unwrap();
        assert_eq!(text, "  Robots en casa\n");
    }

    #[tokio::test]
    async fn test_unknown_model_is_backend_error() {
        let backend = backend(serve(fake_ollama()).await);
        let err = backend.complete("nope", "hola").await.unwrap_err();
        assert!(matches!(err, Error::BackendError(_)));
        assert!(err.to_string().contains("model 'nope' not found"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let backend = backend(closed_port().await);
        let err = backend.complete("llama2", "hola").await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
        assert!(!backend.probe().await);
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "response": "tarde" }))
            }),
        );
        let host = serve(router).await;
        let config = InferenceConfig::default()
            .with_host(&host)
            .unwrap()
            .with_request_timeout(Duration::from_millis(200));
        let backend = OllamaBackend::new(&config).unwrap();

        let err = backend.complete("llama2", "hola").await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_probe_and_list_models() {
        let backend = backend(serve(fake_ollama()).await);
        assert!(backend.probe().await);

        let models = backend.list_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "llama2:latest");
        assert_eq!(models[0].modified_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(models[1].modified_at, None);
    }

    #[tokio::test]
    async fn test_probe_is_false_on_error_status() {
        let router = Router::new().route("/api/tags", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let backend = backend(serve(router).await);
        assert!(!backend.probe().await);
    }
}
