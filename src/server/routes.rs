use crate::{
    error::StyleError,
    models::{Preferences, StyleHint},
    proxy::Proxy,
};
use actix_web::{http::Method, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct RecommendBody {
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    preferences: Option<Preferences>,
}

#[derive(Debug, Deserialize)]
struct GenerateBody {
    #[serde(default)]
    original_image_url: String,
    #[serde(default)]
    hairstyle_id: String,
    #[serde(default)]
    style: Option<StyleHint>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/recommendations")
            .route(web::post().to(recommendations))
            .route(web::method(Method::OPTIONS).to(preflight)),
    )
    .service(
        web::resource("/api/generate")
            .route(web::post().to(generate))
            .route(web::method(Method::OPTIONS).to(preflight)),
    )
    .service(
        web::resource("/api/tasks/{task_id}")
            .route(web::get().to(task_status))
            .route(web::method(Method::OPTIONS).to(preflight)),
    );
}

async fn recommendations(
    proxy: web::Data<Proxy>,
    body: web::Json<RecommendBody>,
) -> Result<HttpResponse, StyleError> {
    let body = body.into_inner();
    let list = proxy
        .request_recommendations(&body.image_url, body.preferences.as_ref())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "recommendations": list })))
}

async fn generate(
    proxy: web::Data<Proxy>,
    body: web::Json<GenerateBody>,
) -> Result<HttpResponse, StyleError> {
    let handle = proxy
        .request_generation(
            &body.original_image_url,
            &body.hairstyle_id,
            body.style.as_ref(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(handle))
}

async fn task_status(
    proxy: web::Data<Proxy>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, StyleError> {
    let status = proxy.poll_job_status(&task_id).await?;
    Ok(HttpResponse::Ok().json(status))
}

async fn preflight() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{Result, StyleError},
        models::{ImageRef, JobHandle, JobStatus, Preferences, StyleHint, SuggestionList},
        proxy::Proxy,
        server,
        upstream::{GenerationService, RecommendationService, Upstreams},
    };
    use actix_web::{http::StatusCode, test, web, App};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Down;

    #[async_trait]
    impl RecommendationService for Down {
        fn name(&self) -> &str {
            "down"
        }

        async fn recommend(
            &self,
            _image: &ImageRef,
            _preferences: Option<&Preferences>,
        ) -> Result<SuggestionList> {
            Err(StyleError::upstream(503, "recommendation service unavailable"))
        }
    }

    #[async_trait]
    impl GenerationService for Down {
        fn name(&self) -> &str {
            "down"
        }

        async fn start(
            &self,
            _image: &ImageRef,
            _hairstyle_id: &str,
            _hint: Option<&StyleHint>,
        ) -> Result<JobHandle> {
            Err(StyleError::ParseFailure("expected JSON".into()))
        }

        async fn status(&self, _job_id: &str) -> Result<JobStatus> {
            Err(StyleError::upstream(404, "no such prediction"))
        }
    }

    macro_rules! app {
        ($proxy:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($proxy))
                    .wrap(server::cors_headers())
                    .configure(server::configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_recommendations_from_catalog() {
        let app = app!(Proxy::new(Upstreams::mock()));
        let req = test::TestRequest::post()
            .uri("/api/recommendations")
            .set_json(json!({ "image_url": "Zm9v", "preferences": { "length": "short" } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["recommendations"].as_array().map(Vec::len), Some(6));
    }

    #[actix_web::test]
    async fn test_missing_fields_are_400() {
        let app = app!(Proxy::new(Upstreams::mock()));

        for (uri, payload) in [
            ("/api/recommendations", json!({})),
            ("/api/recommendations", json!({ "image_url": "  " })),
            ("/api/generate", json!({ "original_image_url": "Zm9v" })),
            ("/api/generate", json!({ "hairstyle_id": "1" })),
        ] {
            let req = test::TestRequest::post()
                .uri(uri)
                .set_json(payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let body: Value = test::read_body_json(resp).await;
            assert!(body["error"].as_str().unwrap().contains("is required"));
        }
    }

    #[actix_web::test]
    async fn test_malformed_json_is_400() {
        let app = app!(Proxy::new(Upstreams::mock()));
        let req = test::TestRequest::post()
            .uri("/api/generate")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn test_generate_and_poll() {
        let app = app!(Proxy::new(Upstreams::mock()));
        let req = test::TestRequest::post()
            .uri("/api/generate")
            .set_json(json!({ "original_image_url": "https://x/me.jpg", "hairstyle_id": "2" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["result_image_url"], "https://x/me.jpg");
        assert_eq!(body["status"], "completed");

        let task = body["task_id"].as_str().unwrap().to_string();
        let req = test::TestRequest::get()
            .uri(&format!("/api/tasks/{}", task))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["task_id"], task.as_str());
    }

    #[actix_web::test]
    async fn test_upstream_errors_map_to_status() {
        let down = Arc::new(Down);
        let app = app!(Proxy::with_services(down.clone(), down));

        let req = test::TestRequest::post()
            .uri("/api/recommendations")
            .set_json(json!({ "image_url": "https://x/me.jpg" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("recommendation service unavailable"));

        let req = test::TestRequest::post()
            .uri("/api/generate")
            .set_json(json!({ "original_image_url": "https://x/me.jpg", "hairstyle_id": "1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let req = test::TestRequest::get().uri("/api/tasks/abc").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_preflight() {
        let app = app!(Proxy::new(Upstreams::mock()));
        let req = test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/api/generate")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(resp.headers().contains_key("access-control-allow-methods"));
    }
}
