//! Shared test doubles: in-memory stores, a scripted payment processor and
//! permissive infrastructure.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use helpora::config::Config;
use helpora::domain::{
    Booking, BookingGuard, BookingScope, BookingStatus, Identity, IntentRequest, Listing,
    ListingDraft, NewBooking, NewProfile, PaymentApplication, PaymentIntent, PaymentStatus,
    Profile, Role, ServiceCategory,
};
use helpora::errors::{AppError, AppResult};
use helpora::infra::{
    BookingRepository, DocumentStore, GatewayError, HealthProbe, ListingRepository,
    PaymentGateway, ProfileRepository, RateLimiter, UploadedDocument, WebhookVerifier,
};
use helpora::services::{
    Authenticator, BookingManager, CatalogManager, PaymentManager, Services,
};

pub const WEBHOOK_SECRET: &str = "whsec_integration";

// =============================================================================
// Profiles
// =============================================================================

#[derive(Default)]
pub struct InMemoryProfiles {
    rows: Mutex<HashMap<Uuid, Profile>>,
}

#[async_trait]
impl ProfileRepository for InMemoryProfiles {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn create(&self, new: NewProfile) -> AppResult<Profile> {
        let mut rows = self.rows.lock().unwrap();
        if rows.values().any(|p| p.email == new.email) {
            return Err(AppError::conflict("User already exists"));
        }
        let now = Utc::now();
        let profile = Profile {
            id: new.id,
            email: new.email,
            password_hash: new.password_hash,
            full_name: new.full_name,
            role: new.role,
            id_document_path: new.id_document_path,
            created_at: now,
            updated_at: now,
        };
        rows.insert(profile.id, profile.clone());
        Ok(profile)
    }
}

// =============================================================================
// Listings
// =============================================================================

#[derive(Default)]
pub struct InMemoryListings {
    rows: Mutex<Vec<Listing>>,
}

#[async_trait]
impl ListingRepository for InMemoryListings {
    async fn list(&self) -> AppResult<Vec<Listing>> {
        Ok(self.rows.lock().unwrap().iter().rev().cloned().collect())
    }

    async fn list_by_provider(&self, provider_id: Uuid) -> AppResult<Vec<Listing>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|l| l.provider_id == provider_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Listing>> {
        Ok(self.rows.lock().unwrap().iter().find(|l| l.id == id).cloned())
    }

    async fn create(&self, provider_id: Uuid, draft: ListingDraft) -> AppResult<Listing> {
        let now = Utc::now();
        let listing = Listing {
            id: Uuid::new_v4(),
            provider_id,
            title: draft.title,
            description: draft.description,
            price: draft.price,
            category: draft.category,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(listing.clone());
        Ok(listing)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        provider_id: Uuid,
        draft: ListingDraft,
    ) -> AppResult<Option<Listing>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows
            .iter_mut()
            .find(|l| l.id == id && l.provider_id == provider_id)
        else {
            return Ok(None);
        };
        row.title = draft.title;
        row.description = draft.description;
        row.price = draft.price;
        row.category = draft.category;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_owned(&self, id: Uuid, provider_id: Uuid) -> AppResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|l| !(l.id == id && l.provider_id == provider_id));
        Ok(rows.len() < before)
    }
}

// =============================================================================
// Bookings
// =============================================================================

/// Applies the same guarded writes as the SQL store.
#[derive(Default)]
pub struct InMemoryBookings {
    rows: Mutex<Vec<Booking>>,
}

impl InMemoryBookings {
    pub fn get(&self, id: Uuid) -> Option<Booking> {
        self.rows.lock().unwrap().iter().find(|b| b.id == id).cloned()
    }

    /// Overwrite a row as another request would.
    pub fn tamper(&self, id: Uuid, change: impl FnOnce(&mut Booking)) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|b| b.id == id) {
            change(row);
        }
    }

    fn write_guarded(
        &self,
        id: Uuid,
        guard: BookingGuard,
        change: impl FnOnce(&mut Booking),
    ) -> Option<Booking> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|b| b.id == id && b.guard() == guard)?;
        change(row);
        row.updated_at = Utc::now();
        Some(row.clone())
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookings {
    async fn create(&self, new: NewBooking) -> AppResult<Booking> {
        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            customer_id: new.customer_id,
            professional_id: new.professional_id,
            service_id: Some(new.service_id),
            service_type: new.service_type,
            scheduled_at: new.scheduled_at,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_intent_id: None,
            price: new.price,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(booking.clone());
        Ok(booking)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        Ok(self.get(id))
    }

    async fn list(&self, scope: BookingScope) -> AppResult<Vec<Booking>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|b| match scope {
                BookingScope::Customer(id) => b.customer_id == id,
                BookingScope::Professional(id) => b.professional_id == Some(id),
                BookingScope::All => true,
            })
            .cloned()
            .collect())
    }

    async fn list_open(&self) -> AppResult<Vec<Booking>> {
        let mut open: Vec<Booking> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.status == BookingStatus::Pending && b.professional_id.is_none())
            .cloned()
            .collect();
        open.sort_by_key(|b| b.scheduled_at);
        Ok(open)
    }

    async fn assign(
        &self,
        id: Uuid,
        guard: BookingGuard,
        professional_id: Uuid,
    ) -> AppResult<Option<Booking>> {
        Ok(self.write_guarded(id, guard, |row| {
            row.professional_id = Some(professional_id);
            row.status = BookingStatus::Accepted;
        }))
    }

    async fn update_status(
        &self,
        id: Uuid,
        guard: BookingGuard,
        status: BookingStatus,
    ) -> AppResult<Option<Booking>> {
        Ok(self.write_guarded(id, guard, |row| row.status = status))
    }

    async fn mark_paid(
        &self,
        id: Uuid,
        payment_intent_id: &str,
    ) -> AppResult<Option<PaymentApplication>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        if row.payment_status == PaymentStatus::Paid {
            return Ok(Some(PaymentApplication::AlreadyPaid(row.clone())));
        }
        row.payment_status = PaymentStatus::Paid;
        row.payment_intent_id = Some(payment_intent_id.to_string());
        row.updated_at = Utc::now();
        Ok(Some(PaymentApplication::Applied(row.clone())))
    }
}

/// Fails every write, for persistence error paths.
pub struct BrokenBookings(pub Arc<InMemoryBookings>);

#[async_trait]
impl BookingRepository for BrokenBookings {
    async fn create(&self, new: NewBooking) -> AppResult<Booking> {
        self.0.create(new).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        self.0.find_by_id(id).await
    }

    async fn list(&self, scope: BookingScope) -> AppResult<Vec<Booking>> {
        self.0.list(scope).await
    }

    async fn list_open(&self) -> AppResult<Vec<Booking>> {
        self.0.list_open().await
    }

    async fn assign(&self, _: Uuid, _: BookingGuard, _: Uuid) -> AppResult<Option<Booking>> {
        Err(unavailable())
    }

    async fn update_status(
        &self,
        _: Uuid,
        _: BookingGuard,
        _: BookingStatus,
    ) -> AppResult<Option<Booking>> {
        Err(unavailable())
    }

    async fn mark_paid(&self, _: Uuid, _: &str) -> AppResult<Option<PaymentApplication>> {
        Err(unavailable())
    }
}

type Interference = Box<dyn FnOnce(&mut Booking) + Send>;

/// Lets another writer change the row right after the next read, so the
/// guarded write that follows loses the race.
pub struct RacingBookings {
    inner: Arc<InMemoryBookings>,
    interference: Mutex<Option<Interference>>,
}

impl RacingBookings {
    pub fn new(inner: Arc<InMemoryBookings>, change: impl FnOnce(&mut Booking) + Send + 'static) -> Self {
        Self {
            inner,
            interference: Mutex::new(Some(Box::new(change))),
        }
    }
}

#[async_trait]
impl BookingRepository for RacingBookings {
    async fn create(&self, new: NewBooking) -> AppResult<Booking> {
        self.inner.create(new).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        let observed = self.inner.get(id);
        if let Some(change) = self.interference.lock().unwrap().take() {
            self.inner.tamper(id, change);
        }
        Ok(observed)
    }

    async fn list(&self, scope: BookingScope) -> AppResult<Vec<Booking>> {
        self.inner.list(scope).await
    }

    async fn list_open(&self) -> AppResult<Vec<Booking>> {
        self.inner.list_open().await
    }

    async fn assign(&self, id: Uuid, guard: BookingGuard, professional_id: Uuid) -> AppResult<Option<Booking>> {
        self.inner.assign(id, guard, professional_id).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        guard: BookingGuard,
        status: BookingStatus,
    ) -> AppResult<Option<Booking>> {
        self.inner.update_status(id, guard, status).await
    }

    async fn mark_paid(&self, id: Uuid, payment_intent_id: &str) -> AppResult<Option<PaymentApplication>> {
        self.inner.mark_paid(id, payment_intent_id).await
    }
}

fn unavailable() -> AppError {
    AppError::Database(sea_orm::DbErr::Custom("connection reset".into()))
}

// =============================================================================
// Payment processor
// =============================================================================

/// Keeps intents in memory; tests flip them to `succeeded` by hand.
#[derive(Default)]
pub struct FakeGateway {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    counter: AtomicU64,
}

impl FakeGateway {
    pub fn succeed(&self, intent_id: &str) -> PaymentIntent {
        let mut intents = self.intents.lock().unwrap();
        let intent = intents.get_mut(intent_id).expect("unknown intent");
        intent.status = "succeeded".into();
        intent.clone()
    }

    pub fn insert(&self, intent: PaymentIntent) {
        self.intents
            .lock()
            .unwrap()
            .insert(intent.id.clone(), intent);
    }

    pub fn created(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("pi_fake_{n}");
        let intent = PaymentIntent {
            client_secret: Some(format!("{id}_secret")),
            id,
            amount: request.amount,
            currency: request.currency,
            status: "requires_payment_method".into(),
            metadata: request
                .metadata
                .pairs()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        };
        self.insert(intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        self.intents
            .lock()
            .unwrap()
            .get(intent_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(intent_id.to_string()))
    }
}

/// Signed `payment_intent.succeeded` delivery for `intent`.
pub fn succeeded_event(intent: &PaymentIntent) -> (String, Vec<u8>) {
    signed_event("payment_intent.succeeded", intent)
}

pub fn signed_event(event_type: &str, intent: &PaymentIntent) -> (String, Vec<u8>) {
    let body = serde_json::json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": event_type,
        "data": { "object": intent }
    })
    .to_string()
    .into_bytes();
    let header = WebhookVerifier::new(WEBHOOK_SECRET)
        .signature_header(&body, Utc::now().timestamp())
        .unwrap();
    (header, body)
}

// =============================================================================
// Infrastructure
// =============================================================================

pub struct DiscardDocuments;

#[async_trait]
impl DocumentStore for DiscardDocuments {
    async fn store(&self, owner_id: Uuid, document: UploadedDocument) -> AppResult<String> {
        Ok(format!("{}/{}", owner_id, document.file_name))
    }
}

/// Admits a fixed number of requests, then refuses.
pub struct CountingLimiter {
    limit: u64,
    seen: AtomicU64,
    keys: Mutex<Vec<String>>,
}

impl CountingLimiter {
    pub fn unlimited() -> Self {
        Self::new(u64::MAX)
    }

    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            seen: AtomicU64::new(0),
            keys: Mutex::new(Vec::new()),
        }
    }

    /// Counter keys in the order they were checked.
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl RateLimiter for CountingLimiter {
    async fn check_rate_limit(&self, identifier: &str, _: u64, _: u64) -> AppResult<(u64, bool)> {
        self.keys.lock().unwrap().push(identifier.to_string());
        let count = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        Ok((count, count <= self.limit))
    }
}

pub struct StaticProbe {
    pub name: &'static str,
    pub healthy: bool,
}

#[async_trait]
impl HealthProbe for StaticProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn check(&self) -> Result<(), String> {
        if self.healthy {
            Ok(())
        } else {
            Err("connection refused".into())
        }
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub profiles: Arc<InMemoryProfiles>,
    pub listings: Arc<InMemoryListings>,
    pub bookings: Arc<InMemoryBookings>,
    pub gateway: Arc<FakeGateway>,
    pub config: Config,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            profiles: Arc::default(),
            listings: Arc::default(),
            bookings: Arc::default(),
            gateway: Arc::default(),
            config: Config::default().with_webhook_secret(WEBHOOK_SECRET),
        }
    }

    pub fn services(&self) -> Services {
        self.services_with_bookings(self.bookings.clone())
    }

    pub fn services_with_bookings(&self, bookings: Arc<dyn BookingRepository>) -> Services {
        Services::new(
            Arc::new(Authenticator::new(
                self.profiles.clone(),
                Arc::new(DiscardDocuments),
                self.config.clone(),
            )),
            Arc::new(CatalogManager::new(self.listings.clone())),
            Arc::new(BookingManager::new(
                bookings.clone(),
                self.listings.clone(),
                self.profiles.clone(),
            )),
            Arc::new(PaymentManager::new(
                bookings,
                self.gateway.clone(),
                WebhookVerifier::new(WEBHOOK_SECRET),
                "usd",
            )),
        )
    }

    /// Insert a profile directly, bypassing signup.
    pub async fn profile(&self, role: Role) -> Identity {
        let id = Uuid::new_v4();
        let profile = self
            .profiles
            .create(NewProfile {
                id,
                email: format!("{}-{}@example.com", role, id.simple()),
                password_hash: "not-used".into(),
                full_name: None,
                role,
                id_document_path: None,
            })
            .await
            .unwrap();
        profile.identity()
    }

    pub async fn listing(&self, provider: &Identity, price: Decimal) -> Listing {
        self.listings
            .create(
                provider.id,
                ListingDraft {
                    title: "Pipe Fix".into(),
                    description: Some("Fix leaking kitchen pipes".into()),
                    price,
                    category: ServiceCategory::Plumbing,
                },
            )
            .await
            .unwrap()
    }
}

/// An ISO-8601 schedule `days` from now.
pub fn in_days(days: i64) -> String {
    (Utc::now() + Duration::days(days)).to_rfc3339()
}
