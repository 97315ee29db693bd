use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{Authenticator, Session};
use crate::errors::{AppError, DataError, ErrorResponse, OperationalError};
use crate::models::{Course, NewCourse};
use crate::pagination::{Paginated, Pagination, PaginationMeta};
use crate::store::{CourseStore, ListQuery};
use crate::validation::{ValidBody, ValidParams};

lazy_static::lazy_static! {
    static ref START_TIME: Instant = Instant::now();
}

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub courses: Arc<dyn CourseStore>,
    pub authenticator: Arc<dyn Authenticator>,
}

/// Generic success wrapper
#[derive(Debug, Serialize, ToSchema)]
#[aliases(CourseResponse = ApiResponse<Course>, SessionResponse = ApiResponse<Session>)]
pub struct ApiResponse<T> {
    /// Always true; failures use the error envelope
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Paginated course listing, as documented
#[derive(Debug, Serialize, ToSchema)]
pub struct CourseListResponse {
    pub success: bool,
    pub data: Vec<Course>,
    pub pagination: PaginationMeta,
}

/// Listing query parameters
#[derive(Debug, IntoParams)]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ListParams {
    /// Page number, starting at 1
    pub page: Option<u64>,
    /// Items per page (clamped to the configured maximum)
    pub limit: Option<u64>,
    /// Items to skip; takes precedence over `page`
    pub offset: Option<u64>,
    /// One of createdAt, title, language, level
    pub sort_by: Option<String>,
    /// asc or desc (default desc)
    pub sort_order: Option<String>,
    /// Case-insensitive match on title and description
    pub search: Option<String>,
    pub language: Option<String>,
    pub level: Option<String>,
    pub published: Option<bool>,
}

/// Route parameters for a single course
#[derive(Debug, Deserialize)]
pub struct CourseParams {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = serde_json::Value)
    )
)]
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "course-api",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": START_TIME.elapsed().as_secs(),
    }))
}

/// List courses, one page at a time
#[utoipa::path(
    get,
    path = "/api/courses",
    tag = "courses",
    params(ListParams),
    responses(
        (status = 200, description = "One page of courses; navigation in X-* and Link headers", body = CourseListResponse),
        (status = 400, description = "Malformed pagination parameters", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse)
    )
)]
pub async fn list_courses(
    State(state): State<AppState>,
    Pagination(descriptor): Pagination,
) -> Result<Paginated<Course>, AppError> {
    let page = state.courses.list(&ListQuery::from(&descriptor)).await?;
    info!(
        "Listed courses: page={}, limit={}, total={}",
        descriptor.page, descriptor.limit, page.total
    );
    Ok(Paginated::new(page.items, &descriptor, page.total))
}

/// Get a course by id
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    tag = "courses",
    params(
        ("id" = Uuid, Path, description = "Course UUID")
    ),
    responses(
        (status = 200, description = "Course found", body = CourseResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    ValidParams(params): ValidParams<CourseParams>,
) -> Result<Json<ApiResponse<Course>>, AppError> {
    match state.courses.get(params.id).await {
        Ok(course) => Ok(Json(ApiResponse::success(course))),
        Err(DataError::RecordNotFound) => Err(OperationalError::not_found("Course not found").into()),
        Err(err) => Err(err.into()),
    }
}

/// Create a course
#[utoipa::path(
    post,
    path = "/api/courses",
    tag = "courses",
    request_body = NewCourse,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "A course with this title exists", body = ErrorResponse),
        (status = 413, description = "Body too large", body = ErrorResponse)
    )
)]
pub async fn create_course(
    State(state): State<AppState>,
    ValidBody(new): ValidBody<NewCourse>,
) -> Result<impl IntoResponse, AppError> {
    let course = state.courses.create(new).await?;
    info!("Created course: id={}, title={}", course.id, course.title);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(course))))
}

/// Exchange credentials for a session token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = SessionResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidBody(credentials): ValidBody<LoginRequest>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let session = state
        .authenticator
        .authenticate(&credentials.email, &credentials.password)
        .await?;
    info!("Login succeeded for {}", session.email);
    Ok(Json(ApiResponse::success(session)))
}

/// Fallback for unmatched routes
pub async fn route_not_found(request: Request) -> AppError {
    info!("No route for {} {}", request.method(), request.uri().path());
    OperationalError::not_found("Route not found").into()
}

/// Fallback for known paths hit with an unsupported method
pub async fn method_not_allowed(request: Request) -> AppError {
    info!("No {} handler for {}", request.method(), request.uri().path());
    OperationalError::method_not_allowed(request.method().as_str()).into()
}
