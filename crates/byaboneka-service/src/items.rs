//! Item reporting.
//!
//! Lost items arrive with their three verification questions and get their
//! keyword set derived at insert; found items carry optional cooperative
//! binding and capped image URLs. Publication enqueues background matching;
//! a full queue never bounces the publisher.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use byaboneka_core::analyzer::extract_keywords;
use byaboneka_core::error::{DomainError, FieldError};
use byaboneka_core::secrets::build_secret_set;
use byaboneka_core::trust::Tier;
use byaboneka_core::types::*;
use byaboneka_core::validation;

use crate::fraud::FraudGate;
use crate::queue::MatchQueue;
use crate::{audit, store_err, Actor, DynStore};

#[derive(Debug, Deserialize)]
pub struct QuestionPair {
    pub q: String,
    pub a: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportLostRequest {
    pub category: Category,
    pub title: String,
    pub description: String,
    pub location_area: String,
    pub lost_date: DateTime<Utc>,
    pub verification_questions: Vec<QuestionPair>,
}

#[derive(Debug, Deserialize)]
pub struct ReportFoundRequest {
    pub category: Category,
    pub title: String,
    pub description: String,
    pub location_area: String,
    pub found_date: DateTime<Utc>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub cooperative_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct ItemService {
    store: DynStore,
    fraud: FraudGate,
    queue: MatchQueue,
}

impl ItemService {
    pub fn new(store: DynStore, fraud: FraudGate, queue: MatchQueue) -> Self {
        Self {
            store,
            fraud,
            queue,
        }
    }

    pub async fn report_lost(
        &self,
        actor: &Actor,
        req: ReportLostRequest,
    ) -> Result<LostItem, DomainError> {
        let pairs: Vec<(String, String)> = req
            .verification_questions
            .iter()
            .map(|p| (p.q.clone(), p.a.clone()))
            .collect();
        validate_item_text(&req.title, &req.description)?;
        validation::validate_non_empty(&req.location_area, "location_area")
            .map_err(DomainError::invalid)?;
        validation::validate_question_set(&pairs).map_err(DomainError::invalid)?;

        self.enforce_report_cap(actor).await?;
        self.fraud.check(actor, ActionKind::ItemReported).await?;

        let now = Utc::now();
        let text = format!("{} {}", req.title, req.description);
        let item = LostItem {
            id: Uuid::new_v4(),
            owner_id: actor.id(),
            category: req.category,
            title: req.title.trim().to_string(),
            description: req.description.trim().to_string(),
            location_area: req.location_area.trim().to_string(),
            lost_date: req.lost_date,
            keywords: extract_keywords(&text, Some(req.category)),
            status: LostStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let secrets = build_secret_set(item.id, &pairs)?;
        self.store.insert_lost(&item).await.map_err(store_err)?;
        self.store
            .insert_secrets(&secrets)
            .await
            .map_err(store_err)?;

        self.fraud.record(actor, ActionKind::ItemReported).await?;
        audit(
            &self.store,
            Some(actor.id()),
            "lost_item_reported",
            "lost_item",
            Some(item.id),
            serde_json::json!({ "category": item.category }),
        )
        .await;

        // Background matching; scheduling failure never reaches the reporter.
        self.queue.enqueue_lost(item.id);

        Ok(item)
    }

    pub async fn report_found(
        &self,
        actor: &Actor,
        req: ReportFoundRequest,
    ) -> Result<FoundItem, DomainError> {
        validate_item_text(&req.title, &req.description)?;
        validation::validate_non_empty(&req.location_area, "location_area")
            .map_err(DomainError::invalid)?;
        validation::validate_image_urls(&req.image_urls).map_err(DomainError::invalid)?;

        self.enforce_report_cap(actor).await?;
        self.fraud.check(actor, ActionKind::ItemReported).await?;

        let source = if req.cooperative_id.is_some() || actor.user.role == Role::CoopStaff {
            FoundSource::Cooperative
        } else {
            FoundSource::Citizen
        };

        let now = Utc::now();
        let text = format!("{} {}", req.title, req.description);
        let item = FoundItem {
            id: Uuid::new_v4(),
            finder_id: actor.id(),
            cooperative_id: req.cooperative_id.or(actor.user.cooperative_id),
            category: req.category,
            title: req.title.trim().to_string(),
            description: req.description.trim().to_string(),
            location_area: req.location_area.trim().to_string(),
            found_date: req.found_date,
            keywords: extract_keywords(&text, Some(req.category)),
            image_urls: req.image_urls,
            status: FoundStatus::Unclaimed,
            source,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_found(&item).await.map_err(store_err)?;

        self.fraud.record(actor, ActionKind::ItemReported).await?;
        audit(
            &self.store,
            Some(actor.id()),
            "found_item_reported",
            "found_item",
            Some(item.id),
            serde_json::json!({ "category": item.category }),
        )
        .await;

        self.queue.enqueue_found(item.id);

        Ok(item)
    }

    pub async fn get_lost(&self, id: Uuid) -> Result<LostItem, DomainError> {
        self.store
            .lost_by_id(id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("lost item"))
    }

    pub async fn get_found(&self, id: Uuid) -> Result<FoundItem, DomainError> {
        self.store
            .found_by_id(id)
            .await
            .map_err(store_err)?
            .ok_or(DomainError::NotFound("found item"))
    }

    pub async fn list_lost(&self, actor: &Actor) -> Result<Vec<LostItem>, DomainError> {
        self.store
            .lost_by_owner(actor.id())
            .await
            .map_err(store_err)
    }

    pub async fn list_found(&self, actor: &Actor) -> Result<Vec<FoundItem>, DomainError> {
        self.store
            .found_by_finder(actor.id())
            .await
            .map_err(store_err)
    }

    /// Update a lost item's free text; keywords re-derive with it.
    pub async fn update_lost_text(
        &self,
        actor: &Actor,
        id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<LostItem, DomainError> {
        let item = self.get_lost(id).await?;
        if item.owner_id != actor.id() {
            return Err(DomainError::forbidden("Only the owner may edit this item"));
        }
        validate_item_text(title, description)?;

        let text = format!("{} {}", title, description);
        let keywords = extract_keywords(&text, Some(item.category));
        self.store
            .update_lost_text(id, title.trim(), description.trim(), &keywords)
            .await
            .map_err(store_err)?;

        self.queue.enqueue_lost(id);
        self.get_lost(id).await
    }

    /// Publications per 24h are tier-capped.
    async fn enforce_report_cap(&self, actor: &Actor) -> Result<(), DomainError> {
        let tier = Tier::from_score(actor.user.trust_score);
        let cap = tier.report_cap() as i64;
        let used = self
            .store
            .actions_since(
                actor.id(),
                Some(ActionKind::ItemReported),
                Utc::now() - Duration::hours(24),
            )
            .await
            .map_err(store_err)?;
        if used >= cap {
            return Err(DomainError::RateLimited {
                message: format!("Report limit reached for your trust tier ({}/day)", cap),
                retry_after_secs: None,
            });
        }
        Ok(())
    }
}

fn validate_item_text(title: &str, description: &str) -> Result<(), DomainError> {
    let mut errors = Vec::new();
    if let Err(message) = validation::validate_title(title) {
        errors.push(FieldError {
            field: "title".into(),
            message,
        });
    }
    if let Err(message) = validation::validate_description(description) {
        errors.push(FieldError {
            field: "description".into(),
            message,
        });
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DomainError::invalid_fields("Validation failed", errors))
    }
}
