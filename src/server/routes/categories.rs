use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    db::{
        queries::{categories, questions},
        Category, Question,
    },
    server::{app::AppState, error::ApiError},
};

use super::ApiResponse;

#[derive(Serialize)]
struct CategoriesResponse {
    success: bool,
    categories: Vec<String>,
}

#[derive(Serialize)]
struct CategoryQuestionsResponse {
    success: bool,
    questions: Vec<Question>,
    total_questions: usize,
    categories: Vec<Category>,
    current_category: i64,
}

async fn get_categories(State(pool): State<SqlitePool>) -> ApiResponse<Json<CategoriesResponse>> {
    let categories = categories::get_category_types(&pool).await?;
    Ok(Json(CategoriesResponse {
        success: true,
        categories,
    }))
}

async fn questions_for_category(
    State(pool): State<SqlitePool>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResponse<Json<CategoryQuestionsResponse>> {
    // a non-numeric id can't name a category
    let Path(id) = id.map_err(|_| ApiError::NotFound)?;
    let questions = questions::get_questions_for_category(&pool, id).await?;
    if questions.is_empty() {
        return Err(ApiError::NotFound);
    }
    let categories = categories::get_all_categories(&pool).await?;
    Ok(Json(CategoryQuestionsResponse {
        success: true,
        total_questions: questions.len(),
        questions,
        categories,
        current_category: id,
    }))
}

pub fn category_router(state: AppState) -> Router {
    Router::new()
        .route("/categories", get(get_categories))
        .route("/categories/{id}/questions", get(questions_for_category))
        .with_state(state)
}
