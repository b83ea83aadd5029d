use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{
    db::{
        queries::{categories, questions},
        NewQuestion, Question,
    },
    server::{
        app::{AppState, PageSize},
        deserializers::{deserialize_lenient_i64, deserialize_lenient_string, deserialize_present},
        error::ApiError,
    },
    telemetry::{QUESTIONS_CREATED, QUESTIONS_DELETED},
};

use super::ApiResponse;

#[derive(Deserialize)]
struct Pagination {
    page: Option<i64>,
}

#[derive(Deserialize, Debug, PartialEq)]
struct SearchRequest {
    #[serde(rename = "searchTerm")]
    search_term: String,
}

/// Body of a create request. Every field is optional here so that a missing
/// or mistyped one is reported as unprocessable rather than as a malformed body.
#[derive(Deserialize, Debug, Default, PartialEq)]
struct QuestionPayload {
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    question: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    answer: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    category: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    difficulty: Option<i64>,
}

impl QuestionPayload {
    fn validate(self) -> Result<NewQuestion, ApiError> {
        match self {
            QuestionPayload {
                question: Some(question),
                answer: Some(answer),
                category: Some(category),
                difficulty: Some(difficulty),
            } => Ok(NewQuestion {
                question,
                answer,
                category,
                difficulty,
            }),
            _ => Err(ApiError::UnprocessableEntity),
        }
    }
}

// `POST /questions` serves both search and creation, told apart by the presence of `searchTerm`
#[derive(Deserialize, Debug)]
struct QuestionsBody {
    #[serde(rename = "searchTerm", default, deserialize_with = "deserialize_present")]
    search_term: Option<Value>,
    #[serde(flatten)]
    payload: QuestionPayload,
}

#[derive(Debug, PartialEq)]
enum QuestionsRequest {
    Search(String),
    Create(QuestionPayload),
}

impl TryFrom<QuestionsBody> for QuestionsRequest {
    type Error = ApiError;

    fn try_from(body: QuestionsBody) -> Result<Self, Self::Error> {
        match body.search_term {
            Some(Value::String(term)) => Ok(QuestionsRequest::Search(term)),
            // a search was asked for, just not with something to search by
            Some(_) => Err(ApiError::UnprocessableEntity),
            None => Ok(QuestionsRequest::Create(body.payload)),
        }
    }
}

#[derive(Serialize)]
struct QuestionsPage {
    success: bool,
    questions: Vec<Question>,
    total_questions: i64,
    categories: Vec<String>,
}

#[derive(Serialize)]
struct SearchResults {
    success: bool,
    questions: Vec<Question>,
    total_question: usize,
}

#[derive(Serialize)]
struct Deleted {
    success: bool,
    deleted: u64,
}

#[derive(Serialize)]
struct Created {
    success: bool,
}

/// `(limit, offset)` for a 1-based page, `None` when no such page can exist.
fn page_bounds(page: i64, per_page: i64) -> Option<(i64, i64)> {
    if page < 1 || per_page < 1 {
        return None;
    }
    let offset = (page - 1).checked_mul(per_page)?;
    Some((per_page, offset))
}

async fn list_questions(
    State(pool): State<SqlitePool>,
    State(PageSize(per_page)): State<PageSize>,
    pagination: Result<Query<Pagination>, QueryRejection>,
) -> ApiResponse<Json<QuestionsPage>> {
    // an unparsable page number is treated as no page number at all
    let page = pagination
        .ok()
        .and_then(|Query(pagination)| pagination.page)
        .unwrap_or(1);
    let (limit, offset) = page_bounds(page, per_page).ok_or(ApiError::NotFound)?;

    let questions = questions::get_questions_page(&pool, limit, offset).await?;
    if questions.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(QuestionsPage {
        success: true,
        questions,
        total_questions: questions::count_questions(&pool).await?,
        categories: categories::get_category_types(&pool).await?,
    }))
}

async fn delete_question(
    State(pool): State<SqlitePool>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResponse<Json<Deleted>> {
    let Path(id) = id.map_err(|_| ApiError::NotFound)?;
    questions::delete_question(&pool, id).await?;
    QUESTIONS_DELETED.inc();
    tracing::info!("Deleted question {id}");
    Ok(Json(Deleted {
        success: true,
        deleted: 1,
    }))
}

async fn create_question(pool: &SqlitePool, payload: QuestionPayload) -> ApiResponse<Json<Created>> {
    let new_question = payload.validate()?;
    let id = questions::create_question(pool, &new_question).await?;
    QUESTIONS_CREATED.inc();
    tracing::info!("Created question {id} in category {}", new_question.category);
    Ok(Json(Created { success: true }))
}

async fn search_questions(pool: &SqlitePool, term: &str) -> ApiResponse<Json<SearchResults>> {
    let questions = questions::search_questions(pool, term).await?;
    if questions.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(SearchResults {
        success: true,
        total_question: questions.len(),
        questions,
    }))
}

async fn create_or_search(
    State(pool): State<SqlitePool>,
    body: Result<Json<QuestionsBody>, JsonRejection>,
) -> ApiResponse<Response> {
    let Json(body) = body?;
    match QuestionsRequest::try_from(body)? {
        QuestionsRequest::Search(term) => Ok(search_questions(&pool, &term).await?.into_response()),
        QuestionsRequest::Create(payload) => {
            Ok(create_question(&pool, payload).await?.into_response())
        }
    }
}

async fn search(
    State(pool): State<SqlitePool>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResponse<Json<SearchResults>> {
    let Json(SearchRequest { search_term }) = body?;
    search_questions(&pool, &search_term).await
}

pub fn questions_router(state: AppState) -> Router {
    Router::new()
        .route("/questions", get(list_questions).post(create_or_search))
        .route("/questions/search", post(search))
        .route("/questions/{id}", delete(delete_question))
        .with_state(state)
}
