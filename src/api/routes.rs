use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    create_course, get_course, health, list_courses, login, method_not_allowed, route_not_found,
    AppState,
};
use super::middleware::{catch_handler_panics, limit_body_size, logging_middleware};
use super::openapi::ApiDoc;
use crate::config::{AllowedOrigins, Config, CorsConfig, RateLimitConfig};
use crate::errors::normalize_errors;
use crate::metrics;
use crate::models::course::LEVELS;
use crate::pagination::{resolve_pagination, PaginationPolicy};
use crate::rate_limit::{credential_limiter, enforce_rate_limit, general_limiter, RateLimiter};
use crate::sanitize::{sanitize_request, SanitizeSettings};
use crate::validation::{validate_request, RequestSchemas, Schema};

/// Response headers browsers may read cross-origin
const EXPOSED_HEADERS: &[&str] = &[
    "x-total-count",
    "x-total-pages",
    "x-current-page",
    "x-has-next",
    "x-has-prev",
    "x-limit",
    "x-offset",
    "x-next-offset",
    "x-prev-offset",
    "link",
    "ratelimit-limit",
    "ratelimit-remaining",
    "ratelimit-reset",
    "retry-after",
    "x-request-id",
];

/// The limiters a router enforces, shared with the purge job
#[derive(Debug, Clone)]
pub struct RateLimiters {
    pub general: Arc<RateLimiter>,
    pub credentials: Arc<RateLimiter>,
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            general: Arc::new(general_limiter(&config.general)),
            credentials: Arc::new(credential_limiter(&config.credentials)),
        }
    }

    pub fn all(&self) -> Vec<Arc<RateLimiter>> {
        vec![self.general.clone(), self.credentials.clone()]
    }
}

pub fn course_list_policy(config: &Config) -> PaginationPolicy {
    PaginationPolicy::from_config(&config.pagination)
        .sort_fields(&["createdAt", "title", "language", "level"])
        .filter_keys(&["language", "level", "published"])
        .search_fields(&["title", "description"])
}

fn create_course_schemas(max_body_bytes: usize) -> RequestSchemas {
    RequestSchemas::new().max_body_bytes(max_body_bytes).body(
        Schema::object()
            .field("title", Schema::string().trim().min_len(3).max_len(200))
            .optional("description", Schema::string().trim().max_len(2000))
            .field("language", Schema::string().trim().min_len(2).max_len(8))
            .field("level", Schema::string().one_of(LEVELS))
            .with_default("published", Schema::boolean(), json!(false)),
    )
}

fn course_id_schemas() -> RequestSchemas {
    RequestSchemas::new().params(Schema::object().field("id", Schema::string().uuid()))
}

fn login_schemas(max_body_bytes: usize) -> RequestSchemas {
    RequestSchemas::new().max_body_bytes(max_body_bytes).body(
        Schema::object()
            .field("email", Schema::string().trim().email())
            .field("password", Schema::string().min_len(1)),
    )
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = match &config.allowed_origins {
        AllowedOrigins::Any => AllowOrigin::from(Any),
        AllowedOrigins::List(list) => AllowOrigin::list(
            list.iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        ),
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(
            EXPOSED_HEADERS
                .iter()
                .map(|name| HeaderName::from_static(*name))
                .collect::<Vec<_>>(),
        )
}

pub fn create_router(state: AppState, config: &Config, limiters: &RateLimiters) -> Router {
    let course_policy = Arc::new(course_list_policy(config));
    let max_body_bytes = config.limits.max_body_bytes;

    Router::new()
        // Health check
        .route("/health", get(health))
        // Metrics endpoint (Prometheus)
        .route("/metrics", get(metrics::metrics_handler))
        // Courses
        .route(
            "/api/courses",
            get(list_courses).route_layer(middleware::from_fn_with_state(
                course_policy,
                resolve_pagination,
            )),
        )
        .route(
            "/api/courses",
            post(create_course).route_layer(middleware::from_fn_with_state(
                Arc::new(create_course_schemas(max_body_bytes)),
                validate_request,
            )),
        )
        .route(
            "/api/courses/:id",
            get(get_course).route_layer(middleware::from_fn_with_state(
                Arc::new(course_id_schemas()),
                validate_request,
            )),
        )
        // Credentials: the stricter limiter runs before validation
        .route(
            "/api/auth/login",
            post(login)
                .route_layer(middleware::from_fn_with_state(
                    Arc::new(login_schemas(max_body_bytes)),
                    validate_request,
                ))
                .route_layer(middleware::from_fn_with_state(
                    limiters.credentials.clone(),
                    enforce_rate_limit,
                )),
        )
        // OpenAPI documentation
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        // Request pipeline, innermost first
        .layer(middleware::from_fn_with_state(
            SanitizeSettings { max_body_bytes },
            sanitize_request,
        ))
        .layer(middleware::from_fn_with_state(
            limiters.general.clone(),
            enforce_rate_limit,
        ))
        .layer(middleware::from_fn_with_state(max_body_bytes, limit_body_size))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(middleware::from_fn(catch_handler_panics))
        .layer(middleware::from_fn(normalize_errors))
        // Observability and transport (order matters: logging -> metrics -> compression -> cors -> trace)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics::middleware::track_metrics))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config.cors))
        .layer(TraceLayer::new_for_http())
        // Add shared state
        .with_state(state)
}
