use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{ExamAttempt, RequestStatus, User, UserRole},
        dto::{
            request::ListQuery,
            response::{
                DashboardStats, PageInfo, Paginated, ProfileStats, ProfileView, StudentListItem,
                StudentProfileStats, StudentProfileView, StudentSubjectProgress, SubjectProgressView,
                UserDto,
            },
        },
    },
    repositories::{
        CatalogRepository, ExamAttemptRepository, ExamRepository, LessonRepository,
        ProgressRepository, SubscriptionRepository, UserRepository,
    },
    services::subscription_service::SubscriptionService,
};

const RECENT_LIMIT: usize = 5;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}

fn overall_stats(attempts: Vec<ExamAttempt>) -> ProfileStats {
    let overall = if attempts.is_empty() {
        0.0
    } else {
        round2(attempts.iter().map(|a| a.score).sum::<f64>() / attempts.len() as f64)
    };

    ProfileStats {
        exams_taken: attempts.len() as u64,
        overall_success_percentage: overall,
        last_result: attempts.into_iter().max_by_key(|a| (a.submitted_at, a.id)),
    }
}

/// Best score and the time of the latest submission.
fn best_and_latest(attempts: &[ExamAttempt]) -> (f64, Option<DateTime<Utc>>) {
    let best = attempts.iter().map(|a| a.score).fold(0.0, f64::max);
    let latest = attempts.iter().map(|a| a.submitted_at).max();
    (round2(best), latest)
}

/// Most common year among the subscribed subjects; ties go to the lower id.
fn dominant_year(year_ids: &[i64]) -> Option<i64> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for id in year_ids {
        *counts.entry(*id).or_default() += 1;
    }
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(id, _)| id)
}

fn matches_student(user: &User, term: &str) -> bool {
    [&user.username, &user.full_name, &user.email, &user.phone_number]
        .iter()
        .any(|field| field.to_lowercase().contains(term))
}

/// Student profiles plus the admin dashboard and student management.
pub struct ProfileService {
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    catalog: Arc<dyn CatalogRepository>,
    lessons: Arc<dyn LessonRepository>,
    exams: Arc<dyn ExamRepository>,
    attempts: Arc<dyn ExamAttemptRepository>,
    progress: Arc<dyn ProgressRepository>,
    subscription_service: Arc<SubscriptionService>,
}

impl ProfileService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        catalog: Arc<dyn CatalogRepository>,
        lessons: Arc<dyn LessonRepository>,
        exams: Arc<dyn ExamRepository>,
        attempts: Arc<dyn ExamAttemptRepository>,
        progress: Arc<dyn ProgressRepository>,
        subscription_service: Arc<SubscriptionService>,
    ) -> Self {
        Self {
            users,
            subscriptions,
            catalog,
            lessons,
            exams,
            attempts,
            progress,
            subscription_service,
        }
    }

    pub async fn profile(&self, user: User) -> AppResult<ProfileView> {
        let grants = self.subscriptions.active_for_user(user.id).await?;
        let subject_ids: Vec<i64> = grants.iter().map(|g| g.subject_id).collect();
        let mut subjects = self.catalog.find_subjects(&subject_ids).await?;
        subjects.sort_by_key(|s| s.id);

        let academic_year = match subjects.first() {
            Some(subject) => self.catalog.find_year(subject.academic_year_id).await?,
            None => None,
        };

        let attempts = self.attempts.list_for_user(user.id).await?;

        let mut subject_views = Vec::with_capacity(subjects.len());
        for subject in &subjects {
            let lesson_ids: Vec<i64> = self
                .lessons
                .list_by_subject(subject.id, false)
                .await?
                .iter()
                .map(|l| l.id)
                .collect();
            let lessons_completed = self
                .progress
                .list_for_lessons(user.id, &lesson_ids)
                .await?
                .iter()
                .filter(|p| p.is_completed)
                .count() as u64;

            let exam_ids: Vec<i64> = self
                .exams
                .list_exams(&lesson_ids, false)
                .await?
                .iter()
                .map(|e| e.id)
                .collect();
            let subject_attempts: Vec<&ExamAttempt> = attempts
                .iter()
                .filter(|a| exam_ids.contains(&a.exam_id))
                .collect();
            let passed = subject_attempts.iter().filter(|a| a.is_passed).count();

            subject_views.push(SubjectProgressView {
                id: subject.id,
                name: subject.name.clone(),
                lessons_completed,
                exams_attempted: subject_attempts.len() as u64,
                success_percentage: percentage(passed, subject_attempts.len()),
            });
        }

        Ok(ProfileView {
            user: UserDto::from(user),
            academic_year,
            subjects: subject_views,
            stats: overall_stats(attempts),
        })
    }

    /// Admin view of a student: lesson progress per subscribed subject and exam results.
    pub async fn student_profile(&self, user_id: i64) -> AppResult<StudentProfileView> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        if user.role != UserRole::Student {
            return Err(AppError::ValidationError("User is not a student".to_string()));
        }
        self.describe_student(user).await
    }

    /// One profile row per student account, newest first.
    pub async fn students_report(&self) -> AppResult<Vec<StudentProfileView>> {
        let students = self.users.list_students().await?;
        let mut report = Vec::with_capacity(students.len());
        for student in students {
            report.push(self.describe_student(student).await?);
        }
        Ok(report)
    }

    async fn describe_student(&self, user: User) -> AppResult<StudentProfileView> {
        let grants = self.subscriptions.active_for_user(user.id).await?;
        let subject_ids: Vec<i64> = grants.iter().map(|g| g.subject_id).collect();
        let subjects = self.catalog.find_subjects(&subject_ids).await?;

        let mut completed_lessons = 0u64;
        let mut total_lessons = 0u64;
        let mut subject_views = Vec::with_capacity(grants.len());
        for grant in &grants {
            let Some(subject) = subjects.iter().find(|s| s.id == grant.subject_id) else {
                continue;
            };
            let lesson_ids: Vec<i64> = self
                .lessons
                .list_by_subject(subject.id, true)
                .await?
                .iter()
                .map(|l| l.id)
                .collect();
            let completed = self
                .progress
                .list_for_lessons(user.id, &lesson_ids)
                .await?
                .iter()
                .filter(|p| p.is_completed)
                .count();

            completed_lessons += completed as u64;
            total_lessons += lesson_ids.len() as u64;
            subject_views.push(StudentSubjectProgress {
                id: subject.id,
                name: subject.name.clone(),
                subscription_date: grant.created_at,
                progress_percentage: percentage(completed, lesson_ids.len()),
            });
        }

        let year_ids: Vec<i64> = subjects.iter().map(|s| s.academic_year_id).collect();
        let year_id = match dominant_year(&year_ids) {
            Some(id) => Some(id),
            None => self
                .subscriptions
                .list_requests(None)
                .await?
                .into_iter()
                .find(|r| r.user_id == user.id)
                .map(|r| r.academic_year_id),
        };
        let academic_year = match year_id {
            Some(id) => self.catalog.find_year(id).await?.map(|y| y.name),
            None => None,
        };

        let attempts = self.attempts.list_for_user(user.id).await?;
        let (best_score, last_activity) = best_and_latest(&attempts);
        let summary = overall_stats(attempts);

        Ok(StudentProfileView {
            user: UserDto::from(user),
            academic_year,
            stats: StudentProfileStats {
                exams_taken: summary.exams_taken,
                overall_success_percentage: summary.overall_success_percentage,
                best_score,
                completed_lessons,
                total_lessons,
                overall_progress_percentage: percentage(
                    completed_lessons as usize,
                    total_lessons as usize,
                ),
                last_activity,
            },
            subjects: subject_views,
        })
    }

    pub async fn dashboard(&self) -> AppResult<DashboardStats> {
        let recent_registrations = self
            .users
            .list_students()
            .await?
            .into_iter()
            .take(RECENT_LIMIT)
            .map(UserDto::from)
            .collect();

        let recent = self
            .subscriptions
            .list_requests(None)
            .await?
            .into_iter()
            .take(RECENT_LIMIT)
            .collect();
        let recent_requests = self.subscription_service.describe(recent).await?;

        Ok(DashboardStats {
            total_students: self.users.count_students(None).await?,
            active_students: self.users.count_students(Some(true)).await?,
            pending_requests: self
                .subscriptions
                .count_requests(Some(RequestStatus::Pending))
                .await?,
            active_subjects: self.catalog.count_active_subjects().await?,
            active_lessons: self.lessons.count_active().await?,
            active_exams: self.exams.count_active_exams().await?,
            total_revenue: round2(self.subscriptions.approved_revenue().await?),
            recent_registrations,
            recent_requests,
        })
    }

    pub async fn list_students(&self, query: &ListQuery) -> AppResult<Paginated<StudentListItem>> {
        let mut students = self.users.list_students().await?;
        if let Some(term) = query.search_term() {
            students.retain(|user| matches_student(user, &term));
        }

        let total = students.len() as u64;
        let page: Vec<User> = students
            .into_iter()
            .skip(query.offset())
            .take(query.per_page() as usize)
            .collect();

        let mut items = Vec::with_capacity(page.len());
        for user in page {
            let active_subscriptions = self.subscriptions.active_for_user(user.id).await?.len() as u64;
            items.push(StudentListItem {
                user: UserDto::from(user),
                active_subscriptions,
            });
        }

        Ok(Paginated {
            items,
            pagination: PageInfo::new(query.page(), query.per_page(), total),
        })
    }

    /// Flips a student's active flag. Admin accounts cannot be toggled.
    pub async fn toggle_student(&self, user_id: i64) -> AppResult<UserDto> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if user.role != UserRole::Student {
            return Err(AppError::ValidationError(
                "Only student accounts can be toggled".to_string(),
            ));
        }

        user.is_active = !user.is_active;
        let user = self.users.update(user).await?;
        log::info!("Student {} is now {}", user.id, if user.is_active { "active" } else { "inactive" });
        Ok(UserDto::from(user))
    }
}
