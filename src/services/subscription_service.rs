use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use chrono::Utc;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{
            ActiveSubscription, Notification, RequestStatus, ReviewDecision, SubscriptionRequest,
            User,
        },
        dto::{
            request::ListQuery,
            response::{PageInfo, Paginated, SubjectSummary, SubscriptionRequestView, UserDto},
        },
    },
    repositories::{CatalogRepository, SubscriptionRepository, UserRepository},
};

pub const ALREADY_REVIEWED: &str = "Request has already been reviewed";
const DEFAULT_REJECTION_NOTE: &str = "Request rejected";

/// Admin review of subscription requests.
pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    users: Arc<dyn UserRepository>,
    catalog: Arc<dyn CatalogRepository>,
}

fn matches_search(user: Option<&UserDto>, term: &str) -> bool {
    let Some(user) = user else {
        return false;
    };
    [&user.username, &user.full_name, &user.email, &user.phone_number]
        .iter()
        .any(|field| field.to_lowercase().contains(term))
}

impl SubscriptionService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        users: Arc<dyn UserRepository>,
        catalog: Arc<dyn CatalogRepository>,
    ) -> Self {
        Self {
            subscriptions,
            users,
            catalog,
        }
    }

    /// Attaches the requesting user and the selected subjects to each request.
    pub async fn describe(&self, requests: Vec<SubscriptionRequest>) -> AppResult<Vec<SubscriptionRequestView>> {
        let user_ids: Vec<i64> = requests
            .iter()
            .map(|r| r.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let subject_ids: Vec<i64> = requests
            .iter()
            .flat_map(|r| r.selected_subjects.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let users: HashMap<i64, User> = self
            .users
            .find_many(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let subjects: HashMap<i64, SubjectSummary> = self
            .catalog
            .find_subjects(&subject_ids)
            .await?
            .iter()
            .map(|s| (s.id, SubjectSummary::from(s)))
            .collect();

        Ok(requests
            .into_iter()
            .map(|request| SubscriptionRequestView {
                user: users.get(&request.user_id).cloned().map(UserDto::from),
                subjects: request
                    .selected_subjects
                    .iter()
                    .filter_map(|id| subjects.get(id).cloned())
                    .collect(),
                request,
            })
            .collect())
    }

    pub async fn list_requests(&self, query: &ListQuery) -> AppResult<Paginated<SubscriptionRequestView>> {
        let status = match query.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(value) => Some(RequestStatus::parse(value).ok_or_else(|| {
                AppError::ValidationError(format!("Unknown status '{}'", value))
            })?),
        };

        let requests = self.subscriptions.list_requests(status).await?;
        let mut views = self.describe(requests).await?;

        if let Some(term) = query.search_term() {
            views.retain(|view| matches_search(view.user.as_ref(), &term));
        }

        let total = views.len() as u64;
        let items = views
            .into_iter()
            .skip(query.offset())
            .take(query.per_page() as usize)
            .collect();

        Ok(Paginated {
            items,
            pagination: PageInfo::new(query.page(), query.per_page(), total),
        })
    }

    async fn pending_request(&self, request_id: i64) -> AppResult<SubscriptionRequest> {
        let request = self
            .subscriptions
            .find_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription request not found".to_string()))?;

        if !request.is_pending() {
            return Err(AppError::ValidationError(ALREADY_REVIEWED.to_string()));
        }
        Ok(request)
    }

    /// Approves a pending request: activates the student and grants each selected subject.
    pub async fn approve(
        &self,
        request_id: i64,
        reviewer: &User,
        notes: Option<String>,
    ) -> AppResult<SubscriptionRequest> {
        let request = self.pending_request(request_id).await?;

        let decision = ReviewDecision {
            request_id,
            user_id: request.user_id,
            status: RequestStatus::Approved,
            reviewed_by: reviewer.id,
            reviewed_at: Utc::now(),
            admin_notes: notes.unwrap_or_default(),
            activate_user: true,
            grants: request
                .selected_subjects
                .iter()
                .map(|subject_id| ActiveSubscription::grant(request.user_id, *subject_id, request_id))
                .collect(),
            notification: Notification::subscription_approved(request.user_id),
        };

        let approved = self
            .subscriptions
            .apply_review(decision)
            .await?
            .ok_or_else(|| AppError::ValidationError(ALREADY_REVIEWED.to_string()))?;

        log::info!(
            "Subscription request {} approved by {} ({} subjects)",
            request_id,
            reviewer.id,
            approved.selected_subjects.len()
        );
        Ok(approved)
    }

    /// Rejects a pending request. The student's account stays as it is.
    pub async fn reject(
        &self,
        request_id: i64,
        reviewer: &User,
        notes: Option<String>,
    ) -> AppResult<SubscriptionRequest> {
        let request = self.pending_request(request_id).await?;

        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_NOTE.to_string());

        let decision = ReviewDecision {
            request_id,
            user_id: request.user_id,
            status: RequestStatus::Rejected,
            reviewed_by: reviewer.id,
            reviewed_at: Utc::now(),
            notification: Notification::subscription_rejected(request.user_id, &notes),
            admin_notes: notes,
            activate_user: false,
            grants: Vec::new(),
        };

        let rejected = self
            .subscriptions
            .apply_review(decision)
            .await?
            .ok_or_else(|| AppError::ValidationError(ALREADY_REVIEWED.to_string()))?;

        log::info!("Subscription request {} rejected by {}", request_id, reviewer.id);
        Ok(rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(username: &str, full_name: &str, phone: &str) -> UserDto {
        let mut user = User::test_student(1, username);
        user.full_name = full_name.to_string();
        user.phone_number = phone.to_string();
        user.into()
    }

    #[test]
    fn test_search_matches_any_contact_field() {
        let user = dto("amal_h", "Amal Hassan", "01012345678");

        assert!(matches_search(Some(&user), "hassan"));
        assert!(matches_search(Some(&user), "amal_h@"));
        assert!(matches_search(Some(&user), "2345"));
        assert!(!matches_search(Some(&user), "mona"));
        assert!(!matches_search(None, "amal"));
    }
}
