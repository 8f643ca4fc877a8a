use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::advice::{AdviceGenerator, AdviceRequest, AdviceResponse};
use crate::detection::{DetectionResponse, Detector};
use crate::error::AppError;

const IMAGE_FIELD: &str = "image";

pub struct AppState {
    pub advisor: Arc<AdviceGenerator>,
    pub detector: Arc<Detector>,
}

pub fn create_router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/get-advice", post(advice_handler))
        .route("/detect", post(detect_handler))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

async fn root_handler() -> &'static str {
    "BhoomiAI Backend is Running Successfully 🚀"
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

async fn advice_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdviceRequest>,
) -> Json<AdviceResponse> {
    log::info!(
        "💬 Advice request in '{}' ({} chars)",
        request.lang(),
        request.message().len()
    );
    Json(state.advisor.advise(request.message(), request.lang()).await)
}

async fn detect_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionResponse>, AppError> {
    if !state.detector.model_loaded() {
        log::warn!("⚠️ No classifier loaded, answering in simulation mode");
        return Ok(Json(state.detector.simulate()));
    }

    let multipart = multipart.map_err(|rejection| {
        log::warn!("⚠️ Rejected upload: {}", rejection);
        AppError::MissingImage
    })?;
    let image_data = read_image_field(multipart)
        .await?
        .ok_or(AppError::MissingImage)?;

    log::info!("📸 Received image upload ({} bytes)", image_data.len());

    let detector = state.detector.clone();
    let response = tokio::task::spawn_blocking(move || detector.detect(&image_data))
        .await
        .map_err(|e| AppError::Internal(format!("Inference task failed: {}", e)))??;

    Ok(Json(response))
}

async fn read_image_field(mut multipart: Multipart) -> Result<Option<Vec<u8>>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field.bytes().await?;
            return Ok(Some(bytes.to_vec()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::testing::{FailingGenerator, TaggingTranslator};
    use crate::advice::{TextGenerator, GENERATION_DISABLED, GENERATION_FAILED};
    use crate::catalog::DiseaseCatalog;
    use crate::detection::testing::{FailingClassifier, FixedClassifier};
    use crate::model::{Classifier, Prediction};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    const BOUNDARY: &str = "leafboundary";

    fn app(
        classifier: Option<Arc<dyn Classifier>>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Router {
        app_with_limit(classifier, generator, 1024 * 1024)
    }

    fn app_with_limit(
        classifier: Option<Arc<dyn Classifier>>,
        generator: Option<Arc<dyn TextGenerator>>,
        body_limit_bytes: usize,
    ) -> Router {
        let state = AppState {
            advisor: Arc::new(AdviceGenerator::new(Arc::new(TaggingTranslator), generator)),
            detector: Arc::new(Detector::new(classifier, Arc::new(DiseaseCatalog::builtin()))),
        };
        create_router(state, body_limit_bytes)
    }

    fn loaded_app() -> Router {
        app(
            Some(Arc::new(FixedClassifier(Prediction {
                class_id: 2,
                confidence: 0.97,
            })) as Arc<dyn Classifier>),
            None,
        )
    }

    fn multipart_request(field: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"leaf.jpg\"\r\n",
                field
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri("/detect")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn advice_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/get-advice")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_liveness() {
        let response = loaded_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("Running"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = loaded_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "OK");
    }

    #[tokio::test]
    async fn test_detect_with_model() {
        let response = loaded_app()
            .oneshot(multipart_request("image", b"jpeg bytes"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["class_id"], 2);
        assert_eq!(body["disease"], "Tomato Yellow Leaf Curl Virus");
        assert_eq!(
            body["recommendations"],
            serde_json::json!(["Use virus-free seedlings", "Control whiteflies"])
        );
        assert!(body.get("note").is_none());
    }

    #[tokio::test]
    async fn test_detect_missing_image_field() {
        let response = loaded_app()
            .oneshot(multipart_request("photo", b"jpeg bytes"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No image uploaded");
    }

    #[tokio::test]
    async fn test_detect_upload_over_body_limit() {
        let classifier = Arc::new(FixedClassifier(Prediction {
            class_id: 0,
            confidence: 0.9,
        })) as Arc<dyn Classifier>;

        let response = app_with_limit(Some(classifier), None, 1024)
            .oneshot(multipart_request("image", &[0xAB; 8 * 1024]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_ne!(json_body(response).await["error"], "No image uploaded");
    }

    #[tokio::test]
    async fn test_detect_not_multipart() {
        let request = Request::builder()
            .method("POST")
            .uri("/detect")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = loaded_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_detect_classifier_failure() {
        let response = app(Some(Arc::new(FailingClassifier) as Arc<dyn Classifier>), None)
            .oneshot(multipart_request("image", b"jpeg bytes"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["error"],
            "Inference failed: graph execution failed"
        );
    }

    #[tokio::test]
    async fn test_detect_simulation_mode() {
        let names = [
            "Tomato Target Spot",
            "Tomato Mosaic Virus",
            "Tomato Yellow Leaf Curl Virus",
            "Healthy",
        ];

        for _ in 0..20 {
            let response = app(None, None)
                .oneshot(multipart_request("image", b"jpeg bytes"))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            assert!(names.contains(&body["disease"].as_str().unwrap()));
            let confidence = body["confidence"].as_f64().unwrap();
            assert!((0.88..=0.99).contains(&confidence), "confidence {}", confidence);
            assert_eq!(body["note"], "SIMULATION MODE");
        }
    }

    #[tokio::test]
    async fn test_detect_simulation_without_upload() {
        let request = Request::builder()
            .method("POST")
            .uri("/detect")
            .body(Body::empty())
            .unwrap();

        let response = app(None, None).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["note"], "SIMULATION MODE");
    }

    #[tokio::test]
    async fn test_advice_generation_disabled() {
        let response = loaded_app()
            .oneshot(advice_request(json!({ "message": "my tomato leaves curl", "lang": "te" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["answer"], format!("[te] {}", GENERATION_DISABLED));
        assert_eq!(body["lang_code"], "te-IN");
    }

    #[tokio::test]
    async fn test_advice_null_message() {
        let response = loaded_app()
            .oneshot(advice_request(json!({ "message": null, "lang": "te" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["answer"], format!("[te] {}", GENERATION_DISABLED));
        assert_eq!(body["lang_code"], "te-IN");
    }

    #[tokio::test]
    async fn test_advice_generation_failure() {
        let response = app(None, Some(Arc::new(FailingGenerator) as Arc<dyn TextGenerator>))
            .oneshot(advice_request(json!({ "message": "soil is sandy" })))
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["answer"], format!("[en] {}", GENERATION_FAILED));
        assert_eq!(body["lang_code"], "en-IN");
    }
}
