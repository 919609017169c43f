//! Servidor web Axum para etiquetar sentenças e inspecionar o Viterbi do HMM

use std::env;
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use pos_core::{
    corpus::{demo_corpus, demo_sentences, load_parallel_files, read_parallel},
    evaluation::evaluate,
    hmm::ModelSummary,
    viterbi::ViterbiStep,
    Evaluation, PosError, PosTagger, TaggedWord, TaggerConfig,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Maior número de palavras aceito por requisição (somando todas as sentenças)
const MAX_TOKENS: usize = 5_000;

/// Estado compartilhado da aplicação
struct AppState {
    tagger: PosTagger,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    summary: ModelSummary,
    demo: Vec<&'static str>,
}

#[derive(Deserialize)]
struct TagRequest {
    text: String,
    /// Inclui os passos do Viterbi na resposta
    #[serde(default)]
    trace: bool,
}

#[derive(Serialize)]
struct TagResponse {
    tagged: Vec<TaggedWord>,
    rendered: String,
    total_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    best_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    steps: Option<Vec<ViterbiStep>>,
}

/// Corpus de teste no mesmo formato dos arquivos: uma sentença (ou linha de
/// tags) por linha.
#[derive(Deserialize)]
struct EvaluateRequest {
    sentences: String,
    tags: String,
}

#[derive(Serialize)]
struct EvaluateResponse {
    #[serde(flatten)]
    evaluation: Evaluation,
    accuracy: f64,
}

/// Erro de requisição com o status HTTP correspondente
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: err.to_string() }
    }
}

fn check_token_limit(tokens: usize) -> Result<(), ApiError> {
    if tokens > MAX_TOKENS {
        return Err(ApiError {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: format!("Texto com {} palavras; o limite é {}", tokens, MAX_TOKENS),
        });
    }
    Ok(())
}

impl From<PosError> for ApiError {
    fn from(err: PosError) -> Self {
        let status = match &err {
            PosError::ExhaustedFrontier { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PosError::MalformedInput { .. }
            | PosError::ReservedTag { .. }
            | PosError::CorpusMisaligned { .. }
            | PosError::InvalidConfig(_)
            | PosError::Json(_) => StatusCode::BAD_REQUEST,
            PosError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, message: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let tagger = load_tagger(|key| env::var(key).ok())?;
    let state = Arc::new(AppState { tagger });

    let addr = env::var("POS_WEB_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Servidor POS iniciado em http://{}", addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Treina o modelo a partir das variáveis de ambiente:
///
/// - `POS_TRAIN_SENTENCES` / `POS_TRAIN_TAGS`: corpus paralelo (as duas ou
///   nenhuma; sem elas, usa o corpus de demonstração)
/// - `POS_CONFIG`: arquivo JSON de [`TaggerConfig`]
/// - `POS_UNSEEN_PENALTY`: sobrescreve a penalidade do arquivo
fn load_tagger(var: impl Fn(&str) -> Option<String>) -> Result<PosTagger, PosError> {
    let mut config = match var("POS_CONFIG") {
        Some(path) => TaggerConfig::from_json_file(path)?,
        None => TaggerConfig::default(),
    };
    if let Some(raw) = var("POS_UNSEEN_PENALTY") {
        let penalty: f64 = raw
            .trim()
            .parse()
            .map_err(|_| PosError::InvalidConfig(format!("POS_UNSEEN_PENALTY inválida: {:?}", raw)))?;
        config = config.with_unseen_penalty(penalty);
    }

    let corpus = match (var("POS_TRAIN_SENTENCES"), var("POS_TRAIN_TAGS")) {
        (Some(sentences), Some(tags)) => {
            info!(%sentences, %tags, "treinando com arquivos");
            load_parallel_files(sentences, tags)?
        }
        (None, None) => demo_corpus(),
        _ => {
            return Err(PosError::InvalidConfig(
                "POS_TRAIN_SENTENCES e POS_TRAIN_TAGS precisam ser definidas juntas".to_string(),
            ))
        }
    };

    let tagger = PosTagger::train(&corpus, &config)?;
    let summary = tagger.summary();
    info!(
        sentences = corpus.len(),
        tags = summary.tags.len(),
        vocabulary = summary.vocabulary_size,
        unseen_penalty = summary.unseen_penalty,
        "modelo treinado"
    );
    Ok(tagger)
}

fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/model", get(model_handler))
        .route("/demo-texts", get(demo_texts_handler))
        .route("/tag", post(tag_handler))
        .route("/evaluate", post(evaluate_handler))
        .layer(cors)
        .with_state(state)
}

/// Página principal HTML
async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let template = IndexTemplate {
        summary: state.tagger.summary(),
        demo: demo_sentences(),
    };
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!(error = %e, "falha ao renderizar a página");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn model_handler(State(state): State<Arc<AppState>>) -> Json<ModelSummary> {
    Json(state.tagger.summary())
}

/// Sentenças de demonstração fora do corpus de treino
async fn demo_texts_handler() -> impl IntoResponse {
    let texts: Vec<serde_json::Value> = demo_sentences()
        .iter()
        .map(|text| serde_json::json!({ "text": text }))
        .collect();
    Json(texts)
}

async fn tag_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TagRequest>,
) -> Result<Json<TagResponse>, ApiError> {
    let tokens = req.text.split_whitespace().count();
    if tokens == 0 {
        return Err(ApiError::bad_request("Texto vazio"));
    }
    check_token_limit(tokens)?;

    // Viterbi é síncrono: roda fora das threads do runtime
    let response = tokio::task::spawn_blocking(move || tag_text(&state.tagger, &req.text, req.trace))
        .await
        .map_err(ApiError::internal)??;

    info!(tokens = response.total_tokens, trace = response.steps.is_some(), "sentença etiquetada");
    Ok(Json(response))
}

fn tag_text(tagger: &PosTagger, text: &str, trace: bool) -> Result<TagResponse, PosError> {
    if trace {
        let result = tagger.trace(text)?;
        return Ok(TagResponse {
            rendered: PosTagger::render(&result.tagged),
            total_tokens: result.tagged.len(),
            best_score: Some(result.best_score),
            steps: Some(result.steps),
            tagged: result.tagged,
        });
    }

    let tagged = tagger.tag(text)?;
    Ok(TagResponse {
        rendered: PosTagger::render(&tagged),
        total_tokens: tagged.len(),
        best_score: None,
        steps: None,
        tagged,
    })
}

async fn evaluate_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let examples = read_parallel(req.sentences.as_bytes(), req.tags.as_bytes())?;
    if examples.is_empty() {
        return Err(ApiError::bad_request("Nenhuma sentença para avaliar"));
    }
    check_token_limit(examples.iter().map(|e| e.len()).sum())?;

    let evaluation = tokio::task::spawn_blocking(move || evaluate(&state.tagger, &examples))
        .await
        .map_err(ApiError::internal)??;

    info!(sentences = evaluation.sentences, accuracy = evaluation.accuracy(), "avaliação concluída");
    Ok(Json(EvaluateResponse { accuracy: evaluation.accuracy(), evaluation }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let tagger = PosTagger::train(&demo_corpus(), &TaggerConfig::default()).unwrap();
        app(Arc::new(AppState { tagger }))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_index_lists_tags() {
        let response = test_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("det"));
        assert!(html.contains("The cat saw the dog ."));
        // A resposta de /tag é inserida como texto, nunca como HTML
        assert!(html.contains("textContent"));
        assert!(!html.contains("innerHTML"));
    }

    #[tokio::test]
    async fn test_model_summary() {
        let response = test_app()
            .oneshot(Request::builder().uri("/model").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["start_tag"], "#");
        assert_eq!(body["unseen_penalty"], -100.0);
        assert!(body["tags"].as_array().unwrap().iter().any(|t| t == "det"));
    }

    #[tokio::test]
    async fn test_demo_texts() {
        let response = test_app()
            .oneshot(Request::builder().uri("/demo-texts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body.as_array().unwrap().len(), demo_sentences().len());
    }

    #[tokio::test]
    async fn test_tag_sentence() {
        let response = test_app()
            .oneshot(post_json("/tag", serde_json::json!({ "text": "The dog saw the cat ." })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["rendered"], "the/det dog/n saw/vd the/det cat/n ./.");
        assert_eq!(body["total_tokens"], 6);
        assert!(body.get("steps").is_none());
    }

    #[tokio::test]
    async fn test_tag_with_trace() {
        let response = test_app()
            .oneshot(post_json("/tag", serde_json::json!({ "text": "The dog saw the cat .", "trace": true })))
            .await
            .unwrap();
        let body = json_body(response).await;
        let steps = body["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[0]["word"], "the");
        assert_eq!(steps[0]["best_tag"], "det");
    }

    #[tokio::test]
    async fn test_empty_text_is_bad_request() {
        let response = test_app()
            .oneshot(post_json("/tag", serde_json::json!({ "text": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Texto vazio");
    }

    #[tokio::test]
    async fn test_evaluate_counts() {
        let response = test_app()
            .oneshot(post_json(
                "/evaluate",
                serde_json::json!({
                    "sentences": "The dog saw the cat .\n",
                    "tags": "DET N VD DET V .\n",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["total"], 6);
        assert_eq!(body["correct"], 5);
        assert_eq!(body["wrong"], 1);
    }

    #[tokio::test]
    async fn test_evaluate_length_mismatch() {
        let response = test_app()
            .oneshot(post_json(
                "/evaluate",
                serde_json::json!({ "sentences": "the dog", "tags": "det" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tag_rejects_too_many_tokens() {
        let text = "the ".repeat(MAX_TOKENS + 1);
        let response = test_app()
            .oneshot(post_json("/tag", serde_json::json!({ "text": text, "trace": true })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let text = "the ".repeat(MAX_TOKENS);
        let response = test_app()
            .oneshot(post_json("/tag", serde_json::json!({ "text": text })))
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_evaluate_rejects_too_many_tokens() {
        let response = test_app()
            .oneshot(post_json(
                "/evaluate",
                serde_json::json!({
                    "sentences": "the ".repeat(MAX_TOKENS + 1),
                    "tags": "det ".repeat(MAX_TOKENS + 1),
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_load_tagger_from_env() {
        let tagger = load_tagger(|key| (key == "POS_UNSEEN_PENALTY").then(|| "-7.5".to_string())).unwrap();
        assert_eq!(tagger.summary().unseen_penalty, -7.5);

        let err = load_tagger(|key| (key == "POS_UNSEEN_PENALTY").then(|| "muito".to_string())).unwrap_err();
        assert!(matches!(err, PosError::InvalidConfig(_)));

        let err = load_tagger(|key| (key == "POS_UNSEEN_PENALTY").then(|| "5".to_string())).unwrap_err();
        assert!(matches!(err, PosError::InvalidConfig(_)));
    }

    #[test]
    fn test_load_tagger_requires_both_training_files() {
        let err = load_tagger(|key| (key == "POS_TRAIN_SENTENCES").then(|| "s.txt".to_string())).unwrap_err();
        assert!(matches!(err, PosError::InvalidConfig(_)));

        let err = load_tagger(|key| (key == "POS_TRAIN_TAGS").then(|| "t.txt".to_string())).unwrap_err();
        assert!(matches!(err, PosError::InvalidConfig(_)));
    }

    #[test]
    fn test_load_tagger_reads_config_file() {
        let path = std::env::temp_dir().join(format!("pos-web-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "unseen_penalty": -12.0 }"#).unwrap();
        let path_str = path.to_string_lossy().to_string();

        let tagger = load_tagger(|key| (key == "POS_CONFIG").then(|| path_str.clone())).unwrap();
        assert_eq!(tagger.summary().unseen_penalty, -12.0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_exhausted_frontier_maps_to_422() {
        let err = ApiError::from(PosError::ExhaustedFrontier { position: 1 });
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.into_response().status().is_client_error());
    }
}
