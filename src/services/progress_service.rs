use std::sync::Arc;

use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{domain::LessonProgress, dto::request::ProgressUpdateRequest},
    repositories::{LessonRepository, ProgressRepository},
    services::access_service::AccessGate,
};

pub struct ProgressService {
    progress: Arc<dyn ProgressRepository>,
    lessons: Arc<dyn LessonRepository>,
    gate: Arc<AccessGate>,
}

impl ProgressService {
    pub fn new(
        progress: Arc<dyn ProgressRepository>,
        lessons: Arc<dyn LessonRepository>,
        gate: Arc<AccessGate>,
    ) -> Self {
        Self {
            progress,
            lessons,
            gate,
        }
    }

    /// Existing progress for the pair, or a fresh zeroed record.
    pub async fn get_or_create(&self, user_id: i64, lesson_id: i64) -> AppResult<LessonProgress> {
        if let Some(progress) = self.progress.find(user_id, lesson_id).await? {
            return Ok(progress);
        }

        match self
            .progress
            .create(LessonProgress::start(user_id, lesson_id))
            .await
        {
            Ok(progress) => Ok(progress),
            // Lost a race with a concurrent first access; the winner's record is the one to use.
            Err(AppError::AlreadyExists(_)) => self
                .progress
                .find(user_id, lesson_id)
                .await?
                .ok_or_else(|| {
                    AppError::InternalError(format!(
                        "Progress for user {} on lesson {} vanished",
                        user_id, lesson_id
                    ))
                }),
            Err(err) => Err(err),
        }
    }

    pub async fn update(
        &self,
        user_id: i64,
        lesson_id: i64,
        request: ProgressUpdateRequest,
    ) -> AppResult<LessonProgress> {
        request.validate()?;

        let lesson = self
            .lessons
            .find_by_id(lesson_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Lesson not found".to_string()))?;
        self.gate.ensure_access(user_id, lesson.subject_id).await?;

        let mut progress = self.get_or_create(user_id, lesson.id).await?;
        progress.apply(request.watch_time, request.completed);
        self.progress.save(progress).await
    }
}
