use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{Answer, Exam, Question},
    repositories::{plain_index, unique_index},
};

const EXAMS_COLLECTION: &str = "exams";
const QUESTIONS_COLLECTION: &str = "questions";
const ANSWERS_COLLECTION: &str = "answers";

/// Exams together with their questions and answers.
#[async_trait]
pub trait ExamRepository: Send + Sync {
    async fn create_exam(&self, exam: Exam) -> AppResult<Exam>;
    async fn find_exam(&self, id: i64) -> AppResult<Option<Exam>>;
    async fn list_exams(&self, lesson_ids: &[i64], active_only: bool) -> AppResult<Vec<Exam>>;
    async fn update_exam(&self, exam: Exam) -> AppResult<Exam>;
    async fn delete_exam(&self, id: i64) -> AppResult<()>;
    async fn count_active_exams(&self) -> AppResult<u64>;

    async fn create_question(&self, question: Question) -> AppResult<Question>;
    async fn find_question(&self, id: i64) -> AppResult<Option<Question>>;
    /// Ordered by `order`, then id.
    async fn list_questions(&self, exam_id: i64, active_only: bool) -> AppResult<Vec<Question>>;
    async fn update_question(&self, question: Question) -> AppResult<Question>;
    async fn delete_question(&self, id: i64) -> AppResult<()>;
    async fn delete_questions_by_exam(&self, exam_id: i64) -> AppResult<u64>;
    async fn count_questions(&self, exam_id: i64) -> AppResult<u64>;

    async fn create_answer(&self, answer: Answer) -> AppResult<Answer>;
    async fn find_answer(&self, id: i64) -> AppResult<Option<Answer>>;
    /// Ordered by `order`, then id.
    async fn list_answers(&self, question_ids: &[i64], active_only: bool) -> AppResult<Vec<Answer>>;
    async fn update_answer(&self, answer: Answer) -> AppResult<Answer>;
    async fn delete_answer(&self, id: i64) -> AppResult<()>;
    async fn delete_answers_by_questions(&self, question_ids: &[i64]) -> AppResult<u64>;

    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoExamRepository {
    db: Database,
    exams: Collection<Exam>,
    questions: Collection<Question>,
    answers: Collection<Answer>,
}

impl MongoExamRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            exams: db.get_collection(EXAMS_COLLECTION),
            questions: db.get_collection(QUESTIONS_COLLECTION),
            answers: db.get_collection(ANSWERS_COLLECTION),
        }
    }
}

#[async_trait]
impl ExamRepository for MongoExamRepository {
    async fn create_exam(&self, mut exam: Exam) -> AppResult<Exam> {
        exam.id = self.db.next_id(EXAMS_COLLECTION).await?;
        self.exams.insert_one(&exam).await?;
        Ok(exam)
    }

    async fn find_exam(&self, id: i64) -> AppResult<Option<Exam>> {
        Ok(self.exams.find_one(doc! { "id": id }).await?)
    }

    async fn list_exams(&self, lesson_ids: &[i64], active_only: bool) -> AppResult<Vec<Exam>> {
        let mut filter = doc! { "lesson_id": { "$in": lesson_ids } };
        if active_only {
            filter.insert("is_active", true);
        }
        let cursor = self.exams.find(filter).sort(doc! { "id": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_exam(&self, exam: Exam) -> AppResult<Exam> {
        let result = self.exams.replace_one(doc! { "id": exam.id }, &exam).await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Exam {} not found", exam.id)));
        }
        Ok(exam)
    }

    async fn delete_exam(&self, id: i64) -> AppResult<()> {
        let result = self.exams.delete_one(doc! { "id": id }).await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound(format!("Exam {} not found", id)));
        }
        Ok(())
    }

    async fn count_active_exams(&self) -> AppResult<u64> {
        Ok(self.exams.count_documents(doc! { "is_active": true }).await?)
    }

    async fn create_question(&self, mut question: Question) -> AppResult<Question> {
        question.id = self.db.next_id(QUESTIONS_COLLECTION).await?;
        self.questions.insert_one(&question).await?;
        Ok(question)
    }

    async fn find_question(&self, id: i64) -> AppResult<Option<Question>> {
        Ok(self.questions.find_one(doc! { "id": id }).await?)
    }

    async fn list_questions(&self, exam_id: i64, active_only: bool) -> AppResult<Vec<Question>> {
        let mut filter = doc! { "exam_id": exam_id };
        if active_only {
            filter.insert("is_active", true);
        }
        let cursor = self
            .questions
            .find(filter)
            .sort(doc! { "order": 1, "id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_question(&self, question: Question) -> AppResult<Question> {
        let result = self
            .questions
            .replace_one(doc! { "id": question.id }, &question)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Question {} not found", question.id)));
        }
        Ok(question)
    }

    async fn delete_question(&self, id: i64) -> AppResult<()> {
        let result = self.questions.delete_one(doc! { "id": id }).await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound(format!("Question {} not found", id)));
        }
        Ok(())
    }

    async fn delete_questions_by_exam(&self, exam_id: i64) -> AppResult<u64> {
        let result = self
            .questions
            .delete_many(doc! { "exam_id": exam_id })
            .await?;
        Ok(result.deleted_count)
    }

    async fn count_questions(&self, exam_id: i64) -> AppResult<u64> {
        Ok(self
            .questions
            .count_documents(doc! { "exam_id": exam_id })
            .await?)
    }

    async fn create_answer(&self, mut answer: Answer) -> AppResult<Answer> {
        answer.id = self.db.next_id(ANSWERS_COLLECTION).await?;
        self.answers.insert_one(&answer).await?;
        Ok(answer)
    }

    async fn find_answer(&self, id: i64) -> AppResult<Option<Answer>> {
        Ok(self.answers.find_one(doc! { "id": id }).await?)
    }

    async fn list_answers(&self, question_ids: &[i64], active_only: bool) -> AppResult<Vec<Answer>> {
        let mut filter = doc! { "question_id": { "$in": question_ids } };
        if active_only {
            filter.insert("is_active", true);
        }
        let cursor = self
            .answers
            .find(filter)
            .sort(doc! { "order": 1, "id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_answer(&self, answer: Answer) -> AppResult<Answer> {
        let result = self
            .answers
            .replace_one(doc! { "id": answer.id }, &answer)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Answer {} not found", answer.id)));
        }
        Ok(answer)
    }

    async fn delete_answer(&self, id: i64) -> AppResult<()> {
        let result = self.answers.delete_one(doc! { "id": id }).await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound(format!("Answer {} not found", id)));
        }
        Ok(())
    }

    async fn delete_answers_by_questions(&self, question_ids: &[i64]) -> AppResult<u64> {
        let result = self
            .answers
            .delete_many(doc! { "question_id": { "$in": question_ids } })
            .await?;
        Ok(result.deleted_count)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        self.exams
            .create_index(unique_index(doc! { "id": 1 }, "id_unique"))
            .await?;
        self.exams
            .create_index(plain_index(doc! { "lesson_id": 1 }, "lesson_id"))
            .await?;
        self.questions
            .create_index(unique_index(doc! { "id": 1 }, "id_unique"))
            .await?;
        self.questions
            .create_index(plain_index(doc! { "exam_id": 1, "order": 1 }, "exam_order"))
            .await?;
        self.answers
            .create_index(unique_index(doc! { "id": 1 }, "id_unique"))
            .await?;
        self.answers
            .create_index(plain_index(doc! { "question_id": 1, "order": 1 }, "question_order"))
            .await?;

        log::info!("Created indexes for exam collections");
        Ok(())
    }
}
