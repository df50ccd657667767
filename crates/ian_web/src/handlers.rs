use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use ian_core::{Article, Category, Error, ErrorKind, GenerationRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateArticleBody {
    pub topic: Option<String>,
    pub category_id: Option<String>,
    pub tone: Option<String>,
}

/// A stored article with its category embedded.
#[derive(Debug, Serialize)]
pub struct GeneratedArticleResponse {
    #[serde(flatten)]
    pub article: Article,
    pub category: Category,
}

#[derive(Debug, Deserialize)]
pub struct TestPromptBody {
    pub model: Option<String>,
    pub prompt: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn generation_error(err: &Error) -> Response {
    let (status, message) = match err.kind() {
        ErrorKind::InvalidRequest => (StatusCode::BAD_REQUEST, "El tema y la categoría son requeridos"),
        ErrorKind::CategoryNotFound => (StatusCode::NOT_FOUND, "Categoría no encontrada"),
        ErrorKind::BackendUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Error al generar artículo. Verifica que Ollama esté corriendo.",
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Error al generar artículo."),
    };
    (status, Json(json!({ "error": message, "details": err.to_string() }))).into_response()
}

// POST /api/articles/generate
pub async fn generate_article(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateArticleBody>,
) -> Response {
    let (Some(topic), Some(category_id)) = (
        non_blank(body.topic.as_deref()),
        non_blank(body.category_id.as_deref()),
    ) else {
        return generation_error(&Error::InvalidRequest("topic and categoryId are required".to_string()));
    };

    let orchestrator = &state.orchestrator;
    let category = match orchestrator.store().find_category(category_id).await {
        Ok(Some(category)) => category,
        Ok(None) => return generation_error(&Error::CategoryNotFound(category_id.to_string())),
        Err(e) => return generation_error(&e),
    };

    if let Err(e) = orchestrator.gate().ensure_ready().await {
        return generation_error(&e);
    }

    let mut request = match GenerationRequest::new(topic, category.name.clone()) {
        Ok(request) => request,
        Err(e) => return generation_error(&e),
    };
    if let Some(tone) = non_blank(body.tone.as_deref()) {
        request = request.with_tone(tone);
    }

    match orchestrator.run(&request, &category.id).await {
        Ok(article) => (
            StatusCode::CREATED,
            Json(GeneratedArticleResponse { article, category }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error generating article: {}", e);
            generation_error(&e)
        }
    }
}

// GET /api/ollama/status
pub async fn backend_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let available = state.orchestrator.backend().probe().await;
    Json(json!({ "available": available }))
}

// GET /api/ollama/info
pub async fn backend_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.orchestrator.backend().list_models().await {
        Ok(models) => Json(json!({
            "available": true,
            "models": models
                .iter()
                .map(|m| json!({ "name": m.name, "size": m.size, "modified": m.modified_at }))
                .collect::<Vec<_>>(),
            "currentModel": state.orchestrator.model(),
            "host": state.backend_host,
        })),
        Err(e) => {
            tracing::warn!("Could not list backend models: {}", e);
            Json(json!({
                "available": false,
                "error": "No se pudo conectar con Ollama. Asegúrate de que esté corriendo.",
                "host": state.backend_host,
            }))
        }
    }
}

// POST /api/ollama/test
pub async fn test_prompt(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TestPromptBody>,
) -> Response {
    let Some(prompt) = non_blank(body.prompt.as_deref()) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "El prompt es requerido" }))).into_response();
    };
    let model = non_blank(body.model.as_deref()).unwrap_or(state.orchestrator.model());

    let started = Instant::now();
    match state.orchestrator.backend().complete(model, prompt).await {
        Ok(response) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "response": response,
                "model": model,
                "duration": started.elapsed().as_millis() as u64,
            })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Error al generar respuesta. Verifica que el modelo esté disponible.",
                "details": e.to_string(),
            })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use ian_inference::models::{Reply, ScriptedBackend};
    use ian_inference::prompts::PromptKind;
    use ian_inference::{ArticleOrchestrator, InferenceConfig};
    use ian_storage::MemoryStorage;
    use crate::create_app;

    fn app(backend: Arc<ScriptedBackend>) -> axum::Router {
        let store = Arc::new(MemoryStorage::with_default_categories());
        let orchestrator = ArticleOrchestrator::new(backend, store, &InferenceConfig::default());
        create_app(AppState {
            orchestrator: Arc::new(orchestrator),
            backend_host: "http://localhost:11434".to_string(),
        })
    }

    async fn call(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_generate_article() {
        let backend = Arc::new(ScriptedBackend::newsroom());
        let (status, body) = call(
            app(backend),
            "POST",
            "/api/articles/generate",
            Some(json!({ "topic": "robots domésticos", "categoryId": "tecnologia" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["slug"], "los-robots-domsticos-llegan-a-los-hogares");
        assert_eq!(body["generatedBy"], "ai");
        assert_eq!(body["published"], false);
        assert_eq!(body["tags"].as_array().unwrap().len(), 5);
        assert_eq!(body["categoryId"], "tecnologia");
        assert_eq!(body["category"]["name"], "Tecnología");
        assert_eq!(body["category"]["slug"], "tecnologia");
    }

    #[tokio::test]
    async fn test_generate_requires_topic_and_category() {
        let backend = Arc::new(ScriptedBackend::newsroom());
        let (status, body) = call(
            app(backend.clone()),
            "POST",
            "/api/articles/generate",
            Some(json!({ "topic": "  ", "categoryId": "tecnologia" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "El tema y la categoría son requeridos");
        assert_eq!(backend.complete_calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_unknown_category() {
        let (status, _) = call(
            app(Arc::new(ScriptedBackend::newsroom())),
            "POST",
            "/api/articles/generate",
            Some(json!({ "topic": "fútbol", "categoryId": "politica" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_category_is_404_even_with_backend_down() {
        let backend = Arc::new(ScriptedBackend::newsroom());
        backend.set_available(false);
        let (status, body) = call(
            app(backend.clone()),
            "POST",
            "/api/articles/generate",
            Some(json!({ "topic": "fútbol", "categoryId": "politica" })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Categoría no encontrada");
        assert_eq!(backend.complete_calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_with_backend_down() {
        let backend = Arc::new(ScriptedBackend::newsroom());
        backend.set_available(false);
        let (status, _) = call(
            app(backend.clone()),
            "POST",
            "/api/articles/generate",
            Some(json!({ "topic": "fútbol", "categoryId": "deportes" })),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(backend.complete_calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_backend_error_is_500() {
        let backend = Arc::new(
            ScriptedBackend::newsroom().script(PromptKind::Content, Reply::Fail("out of memory".to_string())),
        );
        let (status, body) = call(
            app(backend),
            "POST",
            "/api/articles/generate",
            Some(json!({ "topic": "fútbol", "categoryId": "deportes" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["details"].as_str().unwrap().contains("out of memory"));
    }

    #[tokio::test]
    async fn test_status_and_info() {
        let backend = Arc::new(ScriptedBackend::newsroom());
        let (status, body) = call(app(backend.clone()), "GET", "/api/ollama/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available"], true);

        let (_, body) = call(app(backend), "GET", "/api/ollama/info", None).await;
        assert_eq!(body["available"], true);
        assert_eq!(body["currentModel"], "llama2");
        assert_eq!(body["models"][0]["name"], "scripted");
    }

    #[tokio::test]
    async fn test_prompt_endpoint() {
        let backend = Arc::new(ScriptedBackend::newsroom());
        let (status, body) = call(
            app(backend.clone()),
            "POST",
            "/api/ollama/test",
            Some(json!({ "prompt": "Hola" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["response"], "Respuesta de prueba");
        assert_eq!(body["model"], "llama2");

        let (status, _) = call(app(backend), "POST", "/api/ollama/test", Some(json!({ "model": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
