#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::RwLock;

use nursopedia_server::{
    app_state::{AppState, Repositories},
    config::Config,
    errors::{AppError, AppResult},
    models::domain::{
        AcademicYear, ActiveSubscription, Answer, Exam, ExamAttempt, Lesson, LessonProgress,
        Notification, Question, RequestStatus, ReviewDecision, Subject, SubscriptionRequest, User,
        UserRole,
    },
    repositories::{
        CatalogRepository, ExamAttemptRepository, ExamRepository, LessonRepository,
        NotificationRepository, ProgressRepository, SubscriptionRepository, UserRepository,
    },
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    years: BTreeMap<i64, AcademicYear>,
    subjects: BTreeMap<i64, Subject>,
    lessons: BTreeMap<i64, Lesson>,
    exams: BTreeMap<i64, Exam>,
    questions: BTreeMap<i64, Question>,
    answers: BTreeMap<i64, Answer>,
    attempts: BTreeMap<i64, ExamAttempt>,
    progress: BTreeMap<i64, LessonProgress>,
    requests: BTreeMap<i64, SubscriptionRequest>,
    grants: BTreeMap<i64, ActiveSubscription>,
    notifications: BTreeMap<i64, Notification>,
}

fn next_key<T>(table: &BTreeMap<i64, T>) -> i64 {
    table.keys().next_back().map_or(1, |id| id + 1)
}

fn newest_first<T: Clone>(table: &BTreeMap<i64, T>, keep: impl Fn(&T) -> bool) -> Vec<T> {
    table.values().rev().filter(|v| keep(v)).cloned().collect()
}

/// Every repository over one set of tables, so multi-table units of work see each other.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    fail_notifications: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes every notification insert fail from now on.
    pub fn fail_notification_writes(&self) {
        self.fail_notifications.store(true, Ordering::SeqCst);
    }

    fn notifications_down(&self) -> AppResult<()> {
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("notifications unavailable".to_string()));
        }
        Ok(())
    }

    pub async fn grants(&self) -> Vec<ActiveSubscription> {
        self.tables.read().await.grants.values().cloned().collect()
    }

    pub async fn attempts(&self) -> Vec<ExamAttempt> {
        self.tables.read().await.attempts.values().cloned().collect()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.tables.read().await.notifications.values().cloned().collect()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, mut user: User) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(AppError::AlreadyExists("Username or email already exists".to_string()));
        }
        user.id = next_key(&tables.users);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_many(&self, ids: &[i64]) -> AppResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn list_students(&self) -> AppResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.users, |u| u.role == UserRole::Student))
    }

    async fn count_students(&self, active: Option<bool>) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.role == UserRole::Student)
            .filter(|u| active.map_or(true, |a| u.is_active == a))
            .count() as u64)
    }

    async fn update(&self, user: User) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user)
            }
            None => Err(AppError::NotFound(format!("User {} not found", user.id))),
        }
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn create_year(&self, mut year: AcademicYear) -> AppResult<AcademicYear> {
        let mut tables = self.tables.write().await;
        year.id = next_key(&tables.years);
        tables.years.insert(year.id, year.clone());
        Ok(year)
    }

    async fn find_year(&self, id: i64) -> AppResult<Option<AcademicYear>> {
        Ok(self.tables.read().await.years.get(&id).cloned())
    }

    async fn list_years(&self, active_only: bool) -> AppResult<Vec<AcademicYear>> {
        let tables = self.tables.read().await;
        Ok(tables
            .years
            .values()
            .filter(|y| !active_only || y.is_active)
            .cloned()
            .collect())
    }

    async fn create_subject(&self, mut subject: Subject) -> AppResult<Subject> {
        let mut tables = self.tables.write().await;
        subject.id = next_key(&tables.subjects);
        tables.subjects.insert(subject.id, subject.clone());
        Ok(subject)
    }

    async fn find_subject(&self, id: i64) -> AppResult<Option<Subject>> {
        Ok(self.tables.read().await.subjects.get(&id).cloned())
    }

    async fn find_subjects(&self, ids: &[i64]) -> AppResult<Vec<Subject>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subjects
            .values()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn find_subject_by_name(&self, academic_year_id: i64, name: &str) -> AppResult<Option<Subject>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subjects
            .values()
            .find(|s| s.academic_year_id == academic_year_id && s.name == name)
            .cloned())
    }

    async fn list_subjects(&self, academic_year_id: Option<i64>, active_only: bool) -> AppResult<Vec<Subject>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subjects
            .values()
            .filter(|s| academic_year_id.map_or(true, |y| s.academic_year_id == y))
            .filter(|s| !active_only || s.is_active)
            .cloned()
            .collect())
    }

    async fn update_subject(&self, subject: Subject) -> AppResult<Subject> {
        let mut tables = self.tables.write().await;
        match tables.subjects.get_mut(&subject.id) {
            Some(existing) => {
                *existing = subject.clone();
                Ok(subject)
            }
            None => Err(AppError::NotFound(format!("Subject {} not found", subject.id))),
        }
    }

    async fn delete_subject(&self, id: i64) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .subjects
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Subject {} not found", id)))
    }

    async fn count_active_subjects(&self) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.subjects.values().filter(|s| s.is_active).count() as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl LessonRepository for InMemoryStore {
    async fn create(&self, mut lesson: Lesson) -> AppResult<Lesson> {
        let mut tables = self.tables.write().await;
        lesson.id = next_key(&tables.lessons);
        tables.lessons.insert(lesson.id, lesson.clone());
        Ok(lesson)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Lesson>> {
        Ok(self.tables.read().await.lessons.get(&id).cloned())
    }

    async fn list_by_subject(&self, subject_id: i64, active_only: bool) -> AppResult<Vec<Lesson>> {
        let tables = self.tables.read().await;
        let mut lessons: Vec<Lesson> = tables
            .lessons
            .values()
            .filter(|l| l.subject_id == subject_id && (!active_only || l.is_active))
            .cloned()
            .collect();
        lessons.sort_by_key(|l| (l.lesson_order, l.id));
        Ok(lessons)
    }

    async fn update(&self, lesson: Lesson) -> AppResult<Lesson> {
        let mut tables = self.tables.write().await;
        match tables.lessons.get_mut(&lesson.id) {
            Some(existing) => {
                *existing = lesson.clone();
                Ok(lesson)
            }
            None => Err(AppError::NotFound(format!("Lesson {} not found", lesson.id))),
        }
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .lessons
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Lesson {} not found", id)))
    }

    async fn count_by_subject(&self, subject_id: i64) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.lessons.values().filter(|l| l.subject_id == subject_id).count() as u64)
    }

    async fn count_active(&self) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.lessons.values().filter(|l| l.is_active).count() as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ExamRepository for InMemoryStore {
    async fn create_exam(&self, mut exam: Exam) -> AppResult<Exam> {
        let mut tables = self.tables.write().await;
        exam.id = next_key(&tables.exams);
        tables.exams.insert(exam.id, exam.clone());
        Ok(exam)
    }

    async fn find_exam(&self, id: i64) -> AppResult<Option<Exam>> {
        Ok(self.tables.read().await.exams.get(&id).cloned())
    }

    async fn list_exams(&self, lesson_ids: &[i64], active_only: bool) -> AppResult<Vec<Exam>> {
        let tables = self.tables.read().await;
        Ok(tables
            .exams
            .values()
            .filter(|e| lesson_ids.contains(&e.lesson_id) && (!active_only || e.is_active))
            .cloned()
            .collect())
    }

    async fn update_exam(&self, exam: Exam) -> AppResult<Exam> {
        let mut tables = self.tables.write().await;
        match tables.exams.get_mut(&exam.id) {
            Some(existing) => {
                *existing = exam.clone();
                Ok(exam)
            }
            None => Err(AppError::NotFound(format!("Exam {} not found", exam.id))),
        }
    }

    async fn delete_exam(&self, id: i64) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .exams
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Exam {} not found", id)))
    }

    async fn count_active_exams(&self) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.exams.values().filter(|e| e.is_active).count() as u64)
    }

    async fn create_question(&self, mut question: Question) -> AppResult<Question> {
        let mut tables = self.tables.write().await;
        question.id = next_key(&tables.questions);
        tables.questions.insert(question.id, question.clone());
        Ok(question)
    }

    async fn find_question(&self, id: i64) -> AppResult<Option<Question>> {
        Ok(self.tables.read().await.questions.get(&id).cloned())
    }

    async fn list_questions(&self, exam_id: i64, active_only: bool) -> AppResult<Vec<Question>> {
        let tables = self.tables.read().await;
        let mut questions: Vec<Question> = tables
            .questions
            .values()
            .filter(|q| q.exam_id == exam_id && (!active_only || q.is_active))
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.order, q.id));
        Ok(questions)
    }

    async fn update_question(&self, question: Question) -> AppResult<Question> {
        let mut tables = self.tables.write().await;
        match tables.questions.get_mut(&question.id) {
            Some(existing) => {
                *existing = question.clone();
                Ok(question)
            }
            None => Err(AppError::NotFound(format!("Question {} not found", question.id))),
        }
    }

    async fn delete_question(&self, id: i64) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .questions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Question {} not found", id)))
    }

    async fn delete_questions_by_exam(&self, exam_id: i64) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.questions.len();
        tables.questions.retain(|_, q| q.exam_id != exam_id);
        Ok((before - tables.questions.len()) as u64)
    }

    async fn count_questions(&self, exam_id: i64) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.questions.values().filter(|q| q.exam_id == exam_id).count() as u64)
    }

    async fn create_answer(&self, mut answer: Answer) -> AppResult<Answer> {
        let mut tables = self.tables.write().await;
        answer.id = next_key(&tables.answers);
        tables.answers.insert(answer.id, answer.clone());
        Ok(answer)
    }

    async fn find_answer(&self, id: i64) -> AppResult<Option<Answer>> {
        Ok(self.tables.read().await.answers.get(&id).cloned())
    }

    async fn list_answers(&self, question_ids: &[i64], active_only: bool) -> AppResult<Vec<Answer>> {
        let tables = self.tables.read().await;
        let mut answers: Vec<Answer> = tables
            .answers
            .values()
            .filter(|a| question_ids.contains(&a.question_id) && (!active_only || a.is_active))
            .cloned()
            .collect();
        answers.sort_by_key(|a| (a.order, a.id));
        Ok(answers)
    }

    async fn update_answer(&self, answer: Answer) -> AppResult<Answer> {
        let mut tables = self.tables.write().await;
        match tables.answers.get_mut(&answer.id) {
            Some(existing) => {
                *existing = answer.clone();
                Ok(answer)
            }
            None => Err(AppError::NotFound(format!("Answer {} not found", answer.id))),
        }
    }

    async fn delete_answer(&self, id: i64) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .answers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Answer {} not found", id)))
    }

    async fn delete_answers_by_questions(&self, question_ids: &[i64]) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.answers.len();
        tables.answers.retain(|_, a| !question_ids.contains(&a.question_id));
        Ok((before - tables.answers.len()) as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ExamAttemptRepository for InMemoryStore {
    async fn count(&self, user_id: i64, exam_id: i64) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .values()
            .filter(|a| a.user_id == user_id && a.exam_id == exam_id)
            .count() as u64)
    }

    async fn find_first(&self, user_id: i64, exam_id: i64) -> AppResult<Option<ExamAttempt>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .values()
            .filter(|a| a.user_id == user_id && a.exam_id == exam_id)
            .min_by_key(|a| a.attempt_number)
            .cloned())
    }

    async fn insert(&self, mut attempt: ExamAttempt) -> AppResult<Option<ExamAttempt>> {
        let mut tables = self.tables.write().await;
        let taken = tables.attempts.values().any(|a| {
            a.user_id == attempt.user_id
                && a.exam_id == attempt.exam_id
                && a.attempt_number == attempt.attempt_number
        });
        if taken {
            return Ok(None);
        }
        attempt.id = next_key(&tables.attempts);
        tables.attempts.insert(attempt.id, attempt.clone());
        Ok(Some(attempt))
    }

    async fn list_for_exam(&self, user_id: i64, exam_id: i64) -> AppResult<Vec<ExamAttempt>> {
        let tables = self.tables.read().await;
        let mut attempts: Vec<ExamAttempt> = tables
            .attempts
            .values()
            .filter(|a| a.user_id == user_id && a.exam_id == exam_id)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.attempt_number);
        Ok(attempts)
    }

    async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<ExamAttempt>> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.attempts, |a| a.user_id == user_id))
    }

    async fn delete_by_exams(&self, exam_ids: &[i64]) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.attempts.len();
        tables.attempts.retain(|_, a| !exam_ids.contains(&a.exam_id));
        Ok((before - tables.attempts.len()) as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryStore {
    async fn find(&self, user_id: i64, lesson_id: i64) -> AppResult<Option<LessonProgress>> {
        let tables = self.tables.read().await;
        Ok(tables
            .progress
            .values()
            .find(|p| p.user_id == user_id && p.lesson_id == lesson_id)
            .cloned())
    }

    async fn create(&self, mut progress: LessonProgress) -> AppResult<LessonProgress> {
        let mut tables = self.tables.write().await;
        if tables
            .progress
            .values()
            .any(|p| p.user_id == progress.user_id && p.lesson_id == progress.lesson_id)
        {
            return Err(AppError::AlreadyExists("Progress already recorded".to_string()));
        }
        progress.id = next_key(&tables.progress);
        tables.progress.insert(progress.id, progress.clone());
        Ok(progress)
    }

    async fn save(&self, progress: LessonProgress) -> AppResult<LessonProgress> {
        let mut tables = self.tables.write().await;
        match tables.progress.get_mut(&progress.id) {
            Some(existing) => {
                *existing = progress.clone();
                Ok(progress)
            }
            None => Err(AppError::NotFound(format!("Progress {} not found", progress.id))),
        }
    }

    async fn list_for_lessons(&self, user_id: i64, lesson_ids: &[i64]) -> AppResult<Vec<LessonProgress>> {
        let tables = self.tables.read().await;
        Ok(tables
            .progress
            .values()
            .filter(|p| p.user_id == user_id && lesson_ids.contains(&p.lesson_id))
            .cloned()
            .collect())
    }

    async fn delete_by_lesson(&self, lesson_id: i64) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.progress.len();
        tables.progress.retain(|_, p| p.lesson_id != lesson_id);
        Ok((before - tables.progress.len()) as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn create_many(&self, notifications: Vec<Notification>) -> AppResult<u64> {
        self.notifications_down()?;
        let mut tables = self.tables.write().await;
        let count = notifications.len() as u64;
        for mut notification in notifications {
            notification.id = next_key(&tables.notifications);
            tables.notifications.insert(notification.id, notification);
        }
        Ok(count)
    }

    async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.notifications, |n| n.user_id == user_id))
    }

    async fn set_read(&self, id: i64, user_id: i64, is_read: bool) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.notifications.get_mut(&id) {
            Some(n) if n.user_id == user_id => {
                n.is_read = is_read;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: i64) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for n in tables.notifications.values_mut() {
            if n.user_id == user_id && !n.is_read {
                n.is_read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete(&self, id: i64, user_id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.notifications.get(&id) {
            Some(n) if n.user_id == user_id => {
                tables.notifications.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_all(&self, user_id: i64) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.notifications.len();
        tables.notifications.retain(|_, n| n.user_id != user_id);
        Ok((before - tables.notifications.len()) as u64)
    }

    async fn count_unread(&self, user_id: i64) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn create_registration(
        &self,
        mut user: User,
        mut request: SubscriptionRequest,
    ) -> AppResult<(User, SubscriptionRequest)> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(AppError::AlreadyExists("Username or email already exists".to_string()));
        }
        user.id = next_key(&tables.users);
        request.id = next_key(&tables.requests);
        request.user_id = user.id;
        tables.users.insert(user.id, user.clone());
        tables.requests.insert(request.id, request.clone());
        Ok((user, request))
    }

    async fn find_request(&self, id: i64) -> AppResult<Option<SubscriptionRequest>> {
        Ok(self.tables.read().await.requests.get(&id).cloned())
    }

    async fn find_pending_for_user(&self, user_id: i64) -> AppResult<Option<SubscriptionRequest>> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.requests, |r| r.user_id == user_id && r.is_pending())
            .into_iter()
            .next())
    }

    async fn list_requests(&self, status: Option<RequestStatus>) -> AppResult<Vec<SubscriptionRequest>> {
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.requests, |r| status.map_or(true, |s| r.status == s)))
    }

    async fn count_requests(&self, status: Option<RequestStatus>) -> AppResult<u64> {
        Ok(self.list_requests(status).await?.len() as u64)
    }

    async fn set_receipt(&self, request_id: i64, receipt_url: &str) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let request = tables
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("Subscription request {} not found", request_id)))?;
        request.payment_receipt_url = Some(receipt_url.to_string());
        Ok(())
    }

    async fn approved_revenue(&self) -> AppResult<f64> {
        let tables = self.tables.read().await;
        Ok(tables
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::Approved)
            .map(|r| r.total_amount)
            .sum())
    }

    async fn apply_review(&self, decision: ReviewDecision) -> AppResult<Option<SubscriptionRequest>> {
        self.notifications_down()?;
        let mut tables = self.tables.write().await;

        let request = match tables.requests.get_mut(&decision.request_id) {
            Some(request) if request.is_pending() => {
                request.status = decision.status;
                request.reviewed_by = Some(decision.reviewed_by);
                request.reviewed_at = Some(decision.reviewed_at);
                request.admin_notes = Some(decision.admin_notes.clone());
                request.clone()
            }
            _ => return Ok(None),
        };

        if decision.activate_user {
            let user = tables
                .users
                .get_mut(&decision.user_id)
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", decision.user_id)))?;
            user.is_active = true;
        }

        for grant in decision.grants {
            let exists = tables
                .grants
                .values()
                .any(|g| g.user_id == grant.user_id && g.subject_id == grant.subject_id);
            if exists {
                continue;
            }
            let id = next_key(&tables.grants);
            tables.grants.insert(id, ActiveSubscription { id, ..grant });
        }

        let id = next_key(&tables.notifications);
        tables
            .notifications
            .insert(id, Notification { id, ..decision.notification });

        Ok(Some(request))
    }

    async fn has_active(&self, user_id: i64, subject_id: i64) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .grants
            .values()
            .any(|g| g.user_id == user_id && g.subject_id == subject_id && g.is_active))
    }

    async fn active_for_user(&self, user_id: i64) -> AppResult<Vec<ActiveSubscription>> {
        let tables = self.tables.read().await;
        Ok(tables
            .grants
            .values()
            .filter(|g| g.user_id == user_id && g.is_active)
            .cloned()
            .collect())
    }

    async fn active_user_ids_for_subject(&self, subject_id: i64) -> AppResult<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .grants
            .values()
            .filter(|g| g.subject_id == subject_id && g.is_active)
            .map(|g| g.user_id)
            .collect())
    }

    async fn count_active_for_subject(&self, subject_id: i64) -> AppResult<u64> {
        Ok(self.active_user_ids_for_subject(subject_id).await?.len() as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        mongo_conn_string: "mongodb://localhost:27017".to_string(),
        mongo_db_name: "nursopedia-test".to_string(),
        web_server_host: "127.0.0.1".to_string(),
        web_server_port: 8080,
        jwt_secret: SecretString::from("integration_test_secret_key_0123456789".to_string()),
        jwt_expiration_hours: 168,
        reset_token_expiration_hours: 1,
        upload_dir: std::env::temp_dir()
            .join("nursopedia-test-receipts")
            .to_string_lossy()
            .into_owned(),
        receipt_url_prefix: "/static/receipts".to_string(),
        payment_number: "01000000000".to_string(),
        captcha_secret: None,
        captcha_verify_url: "http://localhost/verify".to_string(),
        admin_seed: None,
        app_env: "test".to_string(),
    }
}

pub fn repositories(store: &Arc<InMemoryStore>) -> Repositories {
    Repositories {
        users: store.clone(),
        catalog: store.clone(),
        lessons: store.clone(),
        exams: store.clone(),
        attempts: store.clone(),
        progress: store.clone(),
        subscriptions: store.clone(),
        notifications: store.clone(),
    }
}

/// Application state over a fresh in-memory store.
pub fn app() -> (AppState, Arc<InMemoryStore>) {
    let store = InMemoryStore::new();
    let state = AppState::assemble(test_config(), None, repositories(&store), None);
    (state, store)
}
