// src/routes.rs

use axum::{
    Json, Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::{
    handlers::{admin, answer, auth, package, question},
    models::{
        package::CreatePackageRequest,
        question::{AuthorKind, QuestionStatus, QuestionType, ReviewQuestionRequest},
        student_answer::GradeAnswerRequest,
    },
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, staff_middleware},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        question::list_question_types,
        answer::grade_answer,
        answer::regrade_answer,
        package::create_package,
        admin::review_question,
    ),
    components(schemas(
        QuestionType,
        QuestionStatus,
        AuthorKind,
        ReviewQuestionRequest,
        GradeAnswerRequest,
        CreatePackageRequest,
    ))
)]
pub struct ApiDoc;

/// Assembles the main application router.
///
/// * Public: auth, question type registry, OpenAPI document.
/// * Authenticated: reading questions and packages, submitting answers.
/// * Staff (teacher or admin): authoring, grading, packages.
/// * Admin: question review and teacher verification.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let question_routes = Router::new()
        .route("/{id}", get(question::get_question))
        .merge(
            Router::new()
                .route(
                    "/",
                    get(question::list_questions).post(question::create_question),
                )
                .route(
                    "/{id}",
                    put(question::update_question).delete(question::delete_question),
                )
                .layer(middleware::from_fn(staff_middleware)),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let answer_routes = Router::new()
        .route("/", post(answer::submit_answers))
        .route("/mine", get(answer::my_answers))
        .merge(
            Router::new()
                .route("/review", get(answer::review_queue))
                .route("/{id}/grade", put(answer::grade_answer))
                .route("/{id}/regrade", put(answer::regrade_answer))
                .layer(middleware::from_fn(staff_middleware)),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let package_routes = Router::new()
        .route("/{id}", get(package::get_package))
        .merge(
            Router::new()
                .route("/", get(package::list_packages).post(package::create_package))
                .layer(middleware::from_fn(staff_middleware)),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/questions/{id}/review", put(admin::review_question))
        .route("/teachers", get(admin::list_teachers))
        .route(
            "/teachers/{id}/verification",
            put(admin::set_teacher_verification),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .route("/api/question-types", get(question::list_question_types))
        .nest("/api/questions", question_routes)
        .nest("/api/answers", answer_routes)
        .nest("/api/packages", package_routes)
        .nest("/api/admin", admin_routes)
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
