// src/handlers/package.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        package::{CreatePackageRequest, PackageDetail, QuestionPackage},
        question::{Question, QuestionStatus},
    },
    store::QUESTION_COLUMNS,
    utils::{html::clean_html, jwt::Claims},
};

const PACKAGE_SELECT: &str = r#"
    SELECT p.id, p.name, p.description, p.created_by,
           COUNT(i.question_id) AS question_count, p.created_at
    FROM question_packages p
    LEFT JOIN question_package_items i ON i.package_id = p.id
"#;

/// Creates a package from existing question ids, kept in the given order.
/// Staff only.
#[utoipa::path(
    post,
    path = "/api/packages",
    request_body = CreatePackageRequest,
    responses(
        (status = 201, description = "Package created"),
        (status = 400, description = "Invalid payload or unknown question ids")
    )
)]
pub async fn create_package(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePackageRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let created_by = claims.user_id()?;

    let mut tx = pool.begin().await.map_err(|e| {
        tracing::error!("Failed to begin transaction: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE id = ANY($1)")
        .bind(&payload.question_ids)
        .fetch_one(&mut *tx)
        .await?;
    if known != payload.question_ids.len() as i64 {
        return Err(AppError::BadRequest(
            "Package references unknown questions".to_string(),
        ));
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO question_packages (name, description, created_by)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(clean_html(payload.name.trim()))
    .bind(payload.description.as_deref().map(clean_html))
    .bind(created_by)
    .fetch_one(&mut *tx)
    .await?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO question_package_items (package_id, question_id, position) ");
    builder.push_values(
        payload.question_ids.iter().enumerate(),
        |mut row, (position, question_id)| {
            row.push_bind(id)
                .push_bind(*question_id)
                .push_bind(position as i32);
        },
    );
    builder.build().execute(&mut *tx).await?;

    tx.commit().await?;

    tracing::info!(package_id = id, questions = payload.question_ids.len(), "Package created");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Lists all packages with their question counts.
pub async fn list_packages(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let sql = format!("{PACKAGE_SELECT} GROUP BY p.id ORDER BY p.id DESC");
    let packages = sqlx::query_as::<_, QuestionPackage>(&sql)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list packages: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(packages))
}

/// Returns a package with the public view of its questions.
/// Students only see the ACTIVE ones.
pub async fn get_package(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("{PACKAGE_SELECT} WHERE p.id = $1 GROUP BY p.id");
    let package = sqlx::query_as::<_, QuestionPackage>(&sql)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Package not found".to_string()))?;

    let sql = format!(
        r#"
        SELECT {QUESTION_COLUMNS}
        FROM questions
        JOIN question_package_items i ON i.question_id = questions.id
        WHERE i.package_id = $1
        ORDER BY i.position
        "#
    );
    let questions = sqlx::query_as::<_, Question>(&sql)
        .bind(id)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load package {} questions: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    let staff = claims.role()?.is_staff();
    let questions = questions
        .iter()
        .filter(|q| staff || q.status == QuestionStatus::Active)
        .map(Question::to_public)
        .collect();

    Ok(Json(PackageDetail { package, questions }))
}
