// src/store.rs

//! Persistence seam for questions and answers.
//!
//! The scoring flow in [`crate::submission`] only talks to [`QuestionStore`];
//! Postgres is the production implementation.

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};

use crate::{
    assessment::grading::AnswerGrade,
    models::{
        question::{Author, NewQuestion, Question, QuestionStatus},
        student_answer::{NewStudentAnswer, StudentAnswer},
    },
};

pub(crate) const QUESTION_COLUMNS: &str = "id, text, type, subject_id, points, max_points, grade, round, \
     is_auto_scored, status, author_kind, author_id, body, review_comment, created_at, updated_at";

pub(crate) const ANSWER_COLUMNS: &str = "id, student_id, question_id, answer, is_correct, points, \
     part_points, needs_review, graded_by, answered_at, updated_at";

#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Persists a validated question. Its initial status follows from the author.
    async fn save_question(
        &self,
        author: Author,
        question: &NewQuestion,
    ) -> Result<Question, sqlx::Error>;

    async fn load_question(&self, id: i64) -> Result<Option<Question>, sqlx::Error>;

    /// Returns `None` when the student already has an answer for the question.
    async fn save_answer(
        &self,
        answer: &NewStudentAnswer,
    ) -> Result<Option<StudentAnswer>, sqlx::Error>;

    async fn load_answer(&self, id: i64) -> Result<Option<StudentAnswer>, sqlx::Error>;

    /// Replaces the grading columns only while they still equal `previous`.
    /// Returns `None` if the answer is gone or was graded in the meantime.
    async fn record_grade(
        &self,
        answer_id: i64,
        previous: &AnswerGrade,
        grade: &AnswerGrade,
        graded_by: i64,
    ) -> Result<Option<StudentAnswer>, sqlx::Error>;
}

#[async_trait]
impl QuestionStore for PgPool {
    async fn save_question(
        &self,
        author: Author,
        question: &NewQuestion,
    ) -> Result<Question, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO questions
                (text, type, subject_id, points, max_points, grade, round,
                 is_auto_scored, status, author_kind, author_id, body)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {QUESTION_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Question>(&sql)
            .bind(&question.text)
            .bind(question.question_type())
            .bind(&question.subject_id)
            .bind(question.points)
            .bind(question.max_points)
            .bind(question.grade)
            .bind(question.round)
            .bind(question.is_auto_scored)
            .bind(QuestionStatus::initial_for(author.kind))
            .bind(author.kind)
            .bind(author.user_id)
            .bind(Json(&question.body))
            .fetch_one(self)
            .await
    }

    async fn load_question(&self, id: i64) -> Result<Option<Question>, sqlx::Error> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1");
        sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .fetch_optional(self)
            .await
    }

    async fn save_answer(
        &self,
        answer: &NewStudentAnswer,
    ) -> Result<Option<StudentAnswer>, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO student_answers
                (student_id, question_id, answer, is_correct, points, part_points, needs_review)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (student_id, question_id) DO NOTHING
            RETURNING {ANSWER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, StudentAnswer>(&sql)
            .bind(answer.student_id)
            .bind(answer.question_id)
            .bind(Json(&answer.answer))
            .bind(answer.grade.is_correct)
            .bind(answer.grade.points)
            .bind(answer.grade.part_points.as_ref().map(Json))
            .bind(answer.grade.needs_review)
            .fetch_optional(self)
            .await
    }

    async fn load_answer(&self, id: i64) -> Result<Option<StudentAnswer>, sqlx::Error> {
        let sql = format!("SELECT {ANSWER_COLUMNS} FROM student_answers WHERE id = $1");
        sqlx::query_as::<_, StudentAnswer>(&sql)
            .bind(id)
            .fetch_optional(self)
            .await
    }

    async fn record_grade(
        &self,
        answer_id: i64,
        previous: &AnswerGrade,
        grade: &AnswerGrade,
        graded_by: i64,
    ) -> Result<Option<StudentAnswer>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE student_answers
            SET is_correct = $2, points = $3, part_points = $4, needs_review = $5,
                graded_by = $6, updated_at = NOW()
            WHERE id = $1
              AND is_correct IS NOT DISTINCT FROM $7
              AND points IS NOT DISTINCT FROM $8
              AND part_points IS NOT DISTINCT FROM $9
              AND needs_review = $10
            RETURNING {ANSWER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, StudentAnswer>(&sql)
            .bind(answer_id)
            .bind(grade.is_correct)
            .bind(grade.points)
            .bind(grade.part_points.as_ref().map(Json))
            .bind(grade.needs_review)
            .bind(graded_by)
            .bind(previous.is_correct)
            .bind(previous.points)
            .bind(previous.part_points.as_ref().map(Json))
            .bind(previous.needs_review)
            .fetch_optional(self)
            .await
    }
}
