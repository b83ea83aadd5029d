use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq)]
pub struct Question {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: i64,
    pub difficulty: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question: String,
    pub answer: String,
    pub category: i64,
    pub difficulty: i64,
}

const SELECT_QUESTIONS: &str = "SELECT id, question, answer, category, difficulty FROM questions";

pub async fn count_questions(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions")
        .fetch_one(pool)
        .await
}

pub async fn get_all_questions(pool: &SqlitePool) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(&format!("{SELECT_QUESTIONS} ORDER BY id"))
        .fetch_all(pool)
        .await
}

pub async fn get_questions_page(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(&format!("{SELECT_QUESTIONS} ORDER BY id LIMIT ?1 OFFSET ?2"))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn get_question_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Question> {
    sqlx::query_as::<_, Question>(&format!("{SELECT_QUESTIONS} WHERE id = ?1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn get_questions_for_category(
    pool: &SqlitePool,
    category: i64,
) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(&format!("{SELECT_QUESTIONS} WHERE category = ?1 ORDER BY id"))
        .bind(category)
        .fetch_all(pool)
        .await
}

/// Case-insensitive substring match on the question text. `%` and `_` in
/// `term` match themselves. Folding happens here rather than in SQL because
/// SQLite's `lower()` only folds ASCII.
pub async fn search_questions(pool: &SqlitePool, term: &str) -> sqlx::Result<Vec<Question>> {
    let term = term.to_lowercase();
    let questions = get_all_questions(pool).await?;
    Ok(questions
        .into_iter()
        .filter(|q| q.question.to_lowercase().contains(&term))
        .collect())
}

/// Questions a quiz may still ask: optionally limited to `category`, never one
/// of `exclude`.
pub async fn get_quiz_candidates(
    pool: &SqlitePool,
    category: Option<i64>,
    exclude: &[i64],
) -> sqlx::Result<Vec<Question>> {
    let mut query = QueryBuilder::<Sqlite>::new(SELECT_QUESTIONS);
    query.push(" WHERE 1 = 1");
    if let Some(category) = category {
        query.push(" AND category = ").push_bind(category);
    }
    if !exclude.is_empty() {
        query.push(" AND id NOT IN (");
        let mut ids = query.separated(", ");
        for id in exclude {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");
    }
    query.push(" ORDER BY id");
    query.build_query_as::<Question>().fetch_all(pool).await
}

pub async fn create_question(pool: &SqlitePool, new_question: &NewQuestion) -> sqlx::Result<i64> {
    let mut conn = pool.acquire().await?;

    let id = sqlx::query(
        r#"
INSERT INTO questions (question, answer, category, difficulty) VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(&new_question.question)
    .bind(&new_question.answer)
    .bind(new_question.category)
    .bind(new_question.difficulty)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn delete_question(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    get_question_by_id(pool, id).await?;
    let mut conn = pool.acquire().await?;

    sqlx::query(
        r#"
DELETE FROM questions WHERE questions.id = ?1
        "#,
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn import_questions(pool: &SqlitePool, questions: Vec<Question>) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    for question in questions {
        sqlx::query(
            r#"
INSERT INTO questions (id, question, answer, category, difficulty) VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(id) DO UPDATE SET
    question = excluded.question,
    answer = excluded.answer,
    category = excluded.category,
    difficulty = excluded.difficulty
            "#,
        )
        .bind(question.id)
        .bind(question.question)
        .bind(question.answer)
        .bind(question.category)
        .bind(question.difficulty)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}
