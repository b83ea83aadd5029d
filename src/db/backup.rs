//! CSV snapshots of the trivia tables, one file per table.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::Path;

use super::queries::categories::{get_all_categories, import_categories};
use super::queries::questions::{get_all_questions, import_questions};
use super::{Category, Question};

const CATEGORIES_FILE: &str = "categories.csv";
const QUESTIONS_FILE: &str = "questions.csv";

fn write_to(path: &Path, data: Vec<impl Serialize>) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    for line in data {
        wtr.serialize(line)?;
    }
    wtr.flush()?;
    Ok(())
}

fn read_from<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let mut rdr =
        csv::Reader::from_path(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut out = Vec::new();
    for record in rdr.deserialize() {
        let record: T = record?;
        out.push(record);
    }
    Ok(out)
}

pub async fn export_data(pool: &SqlitePool, dir: &Path) -> anyhow::Result<()> {
    let categories = get_all_categories(pool).await?;
    let questions = get_all_questions(pool).await?;
    if !dir.exists() {
        std::fs::create_dir_all(dir)?
    }
    tracing::info!(
        "Exporting {} categories and {} questions to {}",
        categories.len(),
        questions.len(),
        dir.display()
    );
    write_to(&dir.join(CATEGORIES_FILE), categories)?;
    write_to(&dir.join(QUESTIONS_FILE), questions)?;
    Ok(())
}

/// Upserts by id. Categories go first so questions can reference them.
pub async fn import_data(pool: &SqlitePool, dir: &Path) -> anyhow::Result<()> {
    let categories: Vec<Category> = read_from(&dir.join(CATEGORIES_FILE))?;
    let questions: Vec<Question> = read_from(&dir.join(QUESTIONS_FILE))?;
    tracing::info!(
        "Importing {} categories and {} questions from {}",
        categories.len(),
        questions.len(),
        dir.display()
    );
    import_categories(pool, categories).await?;
    import_questions(pool, questions).await?;
    Ok(())
}
