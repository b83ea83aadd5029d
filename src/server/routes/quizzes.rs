use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_option_number_from_string;
use sqlx::SqlitePool;

use crate::{
    db::{queries::questions, Question},
    server::{app::AppState, deserializers::deserialize_ids},
    telemetry::QUIZ_QUESTIONS_SERVED,
};

use super::ApiResponse;

/// Category type the web client sends when the player picks "ALL".
const ALL_CATEGORIES: &str = "click";

#[derive(Deserialize, Debug)]
struct QuizCategory {
    // irrelevant for the "ALL" sentinel, where the client may leave it out
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    id: Option<i64>,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, PartialEq)]
enum QuizScope {
    AllCategories,
    Category(i64),
    // a concrete category without an id matches nothing
    Unmatched,
}

impl QuizCategory {
    fn scope(&self) -> QuizScope {
        match self.id {
            _ if self.kind == ALL_CATEGORIES => QuizScope::AllCategories,
            Some(id) => QuizScope::Category(id),
            None => QuizScope::Unmatched,
        }
    }
}

#[derive(Deserialize, Debug)]
struct QuizRequest {
    #[serde(default, deserialize_with = "deserialize_ids")]
    previous_questions: Vec<i64>,
    quiz_category: QuizCategory,
}

#[derive(Serialize)]
struct NextQuestion {
    success: bool,
    // absent once every candidate has been asked
    #[serde(skip_serializing_if = "Option::is_none")]
    question: Option<Question>,
}

async fn next_question(
    State(pool): State<SqlitePool>,
    body: Result<Json<QuizRequest>, JsonRejection>,
) -> ApiResponse<Json<NextQuestion>> {
    let Json(request) = body?;
    let category = match request.quiz_category.scope() {
        QuizScope::AllCategories => None,
        QuizScope::Category(id) => Some(id),
        QuizScope::Unmatched => {
            tracing::debug!("Quiz category {:?} has no id", request.quiz_category.kind);
            return Ok(Json(NextQuestion {
                success: true,
                question: None,
            }));
        }
    };
    let candidates =
        questions::get_quiz_candidates(&pool, category, &request.previous_questions).await?;

    let question = candidates.choose(&mut rand::thread_rng()).cloned();
    match &question {
        Some(question) => {
            let label = category.map_or_else(|| "all".to_owned(), |id| id.to_string());
            QUIZ_QUESTIONS_SERVED.with_label_values(&[label.as_str()]).inc();
            tracing::debug!(
                "Serving question {} after {} previous",
                question.id,
                request.previous_questions.len()
            );
        }
        None => tracing::debug!("Quiz exhausted for category {category:?}"),
    }
    Ok(Json(NextQuestion {
        success: true,
        question,
    }))
}

pub fn quizzes_router(state: AppState) -> Router {
    Router::new()
        .route("/quizzes", post(next_question))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> QuizRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn click_sentinel_drops_category_filter() {
        let request = request(r#"{"previous_questions": [], "quiz_category": {"type": "click", "id": 0}}"#);
        assert_eq!(request.quiz_category.scope(), QuizScope::AllCategories);
    }

    #[test]
    fn click_sentinel_needs_no_id() {
        for json in [
            r#"{"quiz_category": {"type": "click", "id": null}}"#,
            r#"{"quiz_category": {"type": "click"}}"#,
        ] {
            assert_eq!(request(json).quiz_category.scope(), QuizScope::AllCategories);
        }
    }

    #[test]
    fn zero_id_is_a_category_like_any_other() {
        let request = request(r#"{"quiz_category": {"type": "Science", "id": 0}}"#);
        assert_eq!(request.quiz_category.scope(), QuizScope::Category(0));
    }

    #[test]
    fn named_category_without_id_matches_nothing() {
        let request = request(r#"{"quiz_category": {"type": "Science", "id": null}}"#);
        assert_eq!(request.quiz_category.scope(), QuizScope::Unmatched);
    }

    #[test]
    fn string_category_id_is_accepted() {
        let request = request(r#"{"previous_questions": [4, 9], "quiz_category": {"type": "Art", "id": "2"}}"#);
        assert_eq!(request.quiz_category.scope(), QuizScope::Category(2));
        assert_eq!(request.previous_questions, vec![4, 9]);
    }

    #[test]
    fn missing_previous_questions_is_empty() {
        let request = request(r#"{"quiz_category": {"type": "Science", "id": 1}}"#);
        assert!(request.previous_questions.is_empty());
    }

    #[test]
    fn quiz_category_is_required() {
        assert!(serde_json::from_str::<QuizRequest>(r#"{"previous_questions": []}"#).is_err());
    }
}
