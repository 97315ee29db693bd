use utoipa::OpenApi;

use crate::api::handlers::{
    CourseListResponse, CourseResponse, LoginRequest, SessionResponse,
};
use crate::auth::Session;
use crate::errors::{ErrorDetail, ErrorResponse};
use crate::models::{Course, NewCourse};
use crate::pagination::{PaginationMeta, SortOrder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Course Authoring API",
        version = "0.1.0",
        description = "Backend for authoring language courses. Every failure is reported in one error envelope; listings support page- and offset-based pagination with navigation headers.",
        contact(
            name = "Course Authoring API",
        )
    ),
    paths(
        crate::api::handlers::health,
        crate::api::handlers::list_courses,
        crate::api::handlers::get_course,
        crate::api::handlers::create_course,
        crate::api::handlers::login,
    ),
    components(
        schemas(
            Course,
            NewCourse,
            CourseResponse,
            CourseListResponse,
            PaginationMeta,
            SortOrder,
            LoginRequest,
            Session,
            SessionResponse,
            ErrorResponse,
            ErrorDetail,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "courses", description = "Course listing, retrieval and creation"),
        (name = "auth", description = "Credential exchange"),
    )
)]
pub struct ApiDoc;
