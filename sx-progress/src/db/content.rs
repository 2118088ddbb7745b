//! Course content import
//!
//! Courses are authored as TOML documents: a course holds units, units hold
//! lessons, lessons hold challenges. Each level carries an optional `order`
//! key; when omitted the position in the document is used.
//!
//! ```toml
//! title = "Spanish"
//! language = "es"
//!
//! [[units]]
//! title = "Basics"
//!
//! [[units.lessons]]
//! title = "Greetings"
//!
//! [[units.lessons.challenges]]
//! kind = "SELECT"
//! question = "Which one of these is \"hello\"?"
//! ```

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{Error, Result};

/// Challenge kinds the lesson player understands
pub const CHALLENGE_KINDS: &[&str] = &["SELECT", "ASSIST", "FILL_BLANK", "MATCH", "REORDER"];

#[derive(Debug, Clone, Deserialize)]
pub struct CourseDocument {
    pub title: String,
    pub language: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub units: Vec<UnitDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitDocument {
    pub title: String,
    pub order: Option<i64>,
    #[serde(default)]
    pub lessons: Vec<LessonDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LessonDocument {
    pub title: String,
    pub order: Option<i64>,
    #[serde(default)]
    pub challenges: Vec<ChallengeDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeDocument {
    pub kind: String,
    pub question: String,
    pub order: Option<i64>,
}

fn default_public() -> bool {
    true
}

/// Ordering key: explicit `order`, else 1-based position
fn order_of(explicit: Option<i64>, index: usize) -> i64 {
    explicit.unwrap_or(index as i64 + 1)
}

impl CourseDocument {
    /// Parse and validate a TOML course document
    pub fn from_toml(source: &str) -> Result<Self> {
        let document: CourseDocument =
            toml::from_str(source).map_err(|e| Error::CourseDocument(e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::CourseDocument("course title is empty".to_string()));
        }

        for unit in &self.units {
            if unit.title.trim().is_empty() {
                return Err(Error::CourseDocument(format!(
                    "unit in course '{}' has an empty title",
                    self.title
                )));
            }
            for lesson in &unit.lessons {
                if lesson.title.trim().is_empty() {
                    return Err(Error::CourseDocument(format!(
                        "lesson in unit '{}' has an empty title",
                        unit.title
                    )));
                }
                for challenge in &lesson.challenges {
                    if !CHALLENGE_KINDS.contains(&challenge.kind.as_str()) {
                        return Err(Error::CourseDocument(format!(
                            "unknown challenge kind '{}' in lesson '{}'",
                            challenge.kind, lesson.title
                        )));
                    }
                    if challenge.question.trim().is_empty() {
                        return Err(Error::CourseDocument(format!(
                            "challenge in lesson '{}' has an empty question",
                            lesson.title
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Summary of an imported course
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportedCourse {
    pub course_id: i64,
    pub units: usize,
    pub lessons: usize,
    pub challenges: usize,
}

/// Insert a whole content tree in one transaction
pub async fn import_course(pool: &SqlitePool, document: &CourseDocument) -> Result<ImportedCourse> {
    document.validate()?;

    let mut tx = pool.begin().await?;

    let course_id: i64 = sqlx::query_scalar(
        "INSERT INTO courses (title, language, is_public) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(&document.title)
    .bind(&document.language)
    .bind(document.is_public)
    .fetch_one(&mut *tx)
    .await?;

    let mut imported = ImportedCourse {
        course_id,
        units: 0,
        lessons: 0,
        challenges: 0,
    };

    for (unit_index, unit) in document.units.iter().enumerate() {
        let unit_id: i64 = sqlx::query_scalar(
            "INSERT INTO units (course_id, title, unit_order) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(course_id)
        .bind(&unit.title)
        .bind(order_of(unit.order, unit_index))
        .fetch_one(&mut *tx)
        .await?;
        imported.units += 1;

        for (lesson_index, lesson) in unit.lessons.iter().enumerate() {
            let lesson_id: i64 = sqlx::query_scalar(
                "INSERT INTO lessons (unit_id, title, lesson_order) VALUES (?, ?, ?) RETURNING id",
            )
            .bind(unit_id)
            .bind(&lesson.title)
            .bind(order_of(lesson.order, lesson_index))
            .fetch_one(&mut *tx)
            .await?;
            imported.lessons += 1;

            for (challenge_index, challenge) in lesson.challenges.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO challenges (lesson_id, kind, question, challenge_order) VALUES (?, ?, ?, ?)",
                )
                .bind(lesson_id)
                .bind(&challenge.kind)
                .bind(&challenge.question)
                .bind(order_of(challenge.order, challenge_index))
                .execute(&mut *tx)
                .await?;
                imported.challenges += 1;
            }
        }
    }

    tx.commit().await?;

    info!(
        course_id,
        units = imported.units,
        lessons = imported.lessons,
        challenges = imported.challenges,
        "Imported course '{}'",
        document.title
    );

    Ok(imported)
}
