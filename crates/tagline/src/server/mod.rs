//! HTTP surface of the tagging service.

mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{any, get};
use axum::Router;
use tagline_core::{Config, TaggingPipeline};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// State shared by every request. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TaggingPipeline>,
}

impl AppState {
    pub fn new(pipeline: TaggingPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Largest accepted request body. Base64 expands the image by 4/3, plus room
/// for the JSON envelope.
fn body_limit(config: &Config) -> usize {
    let image_bytes = config.limits.max_payload_mb as usize * 1024 * 1024;
    image_bytes / 3 * 4 + 64 * 1024
}

/// Build the router with all routes and middleware.
pub fn router(state: AppState, config: &Config) -> Router {
    let mut router = Router::new()
        .route("/", any(handlers::tag_image))
        .route(
            "/hello-world",
            get(handlers::hello_world).post(handlers::hello_world),
        )
        .layer(DefaultBodyLimit::max(body_limit(config)))
        .layer(TraceLayer::new_for_http());

    if config.server.cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(pipeline: TaggingPipeline, config: &Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {e}"))?;

    let app = router(AppState::new(pipeline), config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use base64::Engine;
    use http_body_util::BodyExt;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tagline_core::{
        Caption, Captioner, DecodedImage, PipelineError, StopWords, ZeroShotClassifier,
    };
    use tower::ServiceExt;

    struct FakeCaptioner {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Captioner for FakeCaptioner {
        fn name(&self) -> &str {
            "fake"
        }

        async fn caption(
            &self,
            _image: &DecodedImage,
            deterministic: bool,
        ) -> Result<Caption, PipelineError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if deterministic {
                Ok("a red square".to_string())
            } else {
                Ok(format!("a red square number {n}"))
            }
        }
    }

    struct FakeClassifier;

    impl ZeroShotClassifier for FakeClassifier {
        fn name(&self) -> &str {
            "fake"
        }

        fn classify(&self, _: &DynamicImage, labels: &[String]) -> Result<Vec<f32>, PipelineError> {
            Ok(vec![1.0 / labels.len() as f32; labels.len()])
        }
    }

    struct BrokenClassifier;

    impl ZeroShotClassifier for BrokenClassifier {
        fn name(&self) -> &str {
            "broken"
        }

        fn classify(&self, _: &DynamicImage, _: &[String]) -> Result<Vec<f32>, PipelineError> {
            Err(PipelineError::Model {
                message: "session lost".to_string(),
            })
        }
    }

    fn app_with(classifier: Arc<dyn ZeroShotClassifier>) -> Router {
        let mut config = Config::default();
        config.caption.total_captions = 2;
        let pipeline = TaggingPipeline::new(
            Arc::new(FakeCaptioner {
                calls: AtomicU32::new(0),
            }),
            classifier,
            StopWords::for_language("english").unwrap(),
            &config,
        );
        router(AppState::new(pipeline), &config)
    }

    fn app() -> Router {
        app_with(Arc::new(FakeClassifier))
    }

    fn red_pixel_png() -> String {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([255, 0, 0])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
    }

    fn request(method: &str, uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_hello_world() {
        for method in ["GET", "POST"] {
            let response = app()
                .oneshot(request(method, "/hello-world", Body::empty()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_string(response).await, handlers::HELLO_WORLD);
        }
    }

    #[tokio::test]
    async fn test_post_image_returns_report() {
        let body = serde_json::json!({ "image": red_pixel_png() }).to_string();
        let response = app().oneshot(request("POST", "/", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["captions"], serde_json::json!(["a red square"]));
        let english_cap = json["english_cap"].as_array().unwrap();
        assert_eq!(english_cap.len(), 3);
        assert_eq!(english_cap[2], "a red square");

        let tags = json["tags"].as_array().unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t[0].as_str().unwrap()).collect();
        assert!(names.contains(&"red"));
        assert!(names.contains(&"square"));
        let total: f64 = tags.iter().map(|t| t[1].as_f64().unwrap()).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_get_with_body_is_accepted() {
        let body = serde_json::json!({ "image": red_pixel_png() }).to_string();
        let response = app().oneshot(request("GET", "/", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_image_key_is_400() {
        for body in ["{}", r#"{"img": "abc"}"#] {
            let response = app().oneshot(request("POST", "/", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(body_string(response).await.contains("image"));
        }
    }

    #[tokio::test]
    async fn test_array_body_is_400() {
        let wrapped = serde_json::json!([red_pixel_png()]).to_string();
        for body in [wrapped.as_str(), "[]"] {
            let response = app()
                .oneshot(request("POST", "/", body.to_string()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_invalid_base64_is_400() {
        let response = app()
            .oneshot(request("POST", "/", r#"{"image": "not-valid-base64!!"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let response = app()
            .oneshot(request("POST", "/", "{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_other_methods_rejected() {
        let response = app()
            .oneshot(request("PUT", "/", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, handlers::METHOD_NOT_ACCEPTED);
    }

    #[tokio::test]
    async fn test_model_failure_is_500() {
        let body = serde_json::json!({ "image": red_pixel_png() }).to_string();
        let response = app_with(Arc::new(BrokenClassifier))
            .oneshot(request("POST", "/", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response)
            .await
            .starts_with("Internal server error:"));
    }

    #[test]
    fn test_body_limit_covers_base64_expansion() {
        let config = Config::default();
        assert!(body_limit(&config) > 20 * 1024 * 1024 / 3 * 4);
    }
}
