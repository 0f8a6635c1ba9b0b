//! Booking lifecycle - creation, assignment and status changes.
//!
//! Every mutation re-checks authorization against the row it read and then
//! writes with a conditional update guarded by that same state. A write
//! that matches nothing means another request got there first.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{parse_schedule, Booking, BookingScope, BookingStatus, Identity, NewBooking};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{BookingRepository, ListingRepository, ProfileRepository};

const BOOKING: &str = "Booking";

/// New booking payload
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookingRequest {
    /// Listing being booked
    #[serde(alias = "serviceId")]
    pub service_id: Uuid,
    /// ISO 8601 date or datetime, UTC when no offset is given
    #[serde(alias = "scheduledDate")]
    #[validate(length(min = 1, message = "Scheduled date is required"))]
    #[schema(example = "2025-07-01T09:00:00Z")]
    pub scheduled_date: String,
    /// Optional professional to request up front
    #[serde(default, alias = "professionalId")]
    pub professional_id: Option<Uuid>,
}

/// Booking service trait for dependency injection.
#[async_trait]
pub trait BookingService: Send + Sync {
    async fn create(&self, caller: &Identity, request: BookingRequest) -> AppResult<Booking>;

    /// Bookings visible to the caller, newest first
    async fn list(&self, caller: &Identity) -> AppResult<Vec<Booking>>;

    /// Pending bookings without a professional (providers only)
    async fn list_open(&self, caller: &Identity) -> AppResult<Vec<Booking>>;

    async fn assign(&self, caller: &Identity, id: Uuid, professional_id: Uuid) -> AppResult<Booking>;

    async fn update_status(&self, caller: &Identity, id: Uuid, status: &str) -> AppResult<Booking>;
}

pub struct BookingManager {
    bookings: Arc<dyn BookingRepository>,
    listings: Arc<dyn ListingRepository>,
    profiles: Arc<dyn ProfileRepository>,
}

impl BookingManager {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        listings: Arc<dyn ListingRepository>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self {
            bookings,
            listings,
            profiles,
        }
    }

    /// The id must belong to a provider profile.
    async fn ensure_professional(&self, professional_id: Uuid) -> AppResult<()> {
        match self.profiles.find_by_id(professional_id).await? {
            Some(profile) if profile.role.is_professional() => Ok(()),
            _ => Err(AppError::validation(
                "Assigned professional must be a registered provider",
            )),
        }
    }
}

fn lost_race(booking_id: Uuid) -> AppError {
    tracing::warn!(booking_id = %booking_id, "Booking changed between read and write");
    AppError::conflict("Booking was modified by another request")
}

#[async_trait]
impl BookingService for BookingManager {
    async fn create(&self, caller: &Identity, request: BookingRequest) -> AppResult<Booking> {
        if !caller.role.is_customer() {
            return Err(AppError::forbidden("Only customers can create bookings"));
        }
        let scheduled_at = parse_schedule(&request.scheduled_date)?;

        let listing = self
            .listings
            .find_by_id(request.service_id)
            .await?
            .ok_or_not_found("Service")?;

        if let Some(professional_id) = request.professional_id {
            self.ensure_professional(professional_id).await?;
        }

        let booking = self
            .bookings
            .create(NewBooking {
                customer_id: caller.id,
                professional_id: request.professional_id,
                service_id: listing.id,
                service_type: listing.title,
                scheduled_at,
                price: listing.price,
            })
            .await?;

        tracing::info!(
            booking_id = %booking.id,
            customer_id = %caller.id,
            service_id = %listing.id,
            "Booking created"
        );
        Ok(booking)
    }

    async fn list(&self, caller: &Identity) -> AppResult<Vec<Booking>> {
        self.bookings.list(BookingScope::for_identity(caller)).await
    }

    async fn list_open(&self, caller: &Identity) -> AppResult<Vec<Booking>> {
        if !caller.role.is_professional() {
            return Err(AppError::forbidden("Only providers can browse open bookings"));
        }
        self.bookings.list_open().await
    }

    async fn assign(&self, caller: &Identity, id: Uuid, professional_id: Uuid) -> AppResult<Booking> {
        let booking = self.bookings.find_by_id(id).await?.ok_or_not_found(BOOKING)?;
        booking.authorize_assignment(caller, professional_id)?;
        self.ensure_professional(professional_id).await?;

        let updated = self
            .bookings
            .assign(id, booking.guard(), professional_id)
            .await?
            .ok_or_else(|| lost_race(id))?;

        tracing::info!(
            booking_id = %id,
            professional_id = %professional_id,
            actor = %caller.id,
            "Professional assigned"
        );
        Ok(updated)
    }

    async fn update_status(&self, caller: &Identity, id: Uuid, status: &str) -> AppResult<Booking> {
        let target = BookingStatus::parse(status).ok_or_else(|| AppError::validation("Invalid status"))?;

        let booking = self.bookings.find_by_id(id).await?.ok_or_not_found(BOOKING)?;
        booking.authorize_status_change(caller, target)?;

        let updated = self
            .bookings
            .update_status(id, booking.guard(), target)
            .await?
            .ok_or_else(|| lost_race(id))?;

        tracing::info!(
            booking_id = %id,
            from = %booking.status,
            to = %target,
            actor = %caller.id,
            "Booking status changed"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingGuard, Listing, PaymentStatus, Profile, Role, ServiceCategory};
    use crate::infra::{MockBookingRepository, MockListingRepository, MockProfileRepository};
    use chrono::Utc;
    use mockall::predicate::*;
    use rust_decimal_macros::dec;

    fn identity(role: Role) -> Identity {
        Identity::new(Uuid::new_v4(), "someone@example.com", role)
    }

    fn provider_profile(id: Uuid, role: Role) -> Profile {
        let now = Utc::now();
        Profile {
            id,
            email: "pro@example.com".into(),
            password_hash: String::new(),
            full_name: None,
            role,
            id_document_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn booking(customer_id: Uuid, professional_id: Option<Uuid>, status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            customer_id,
            professional_id,
            service_id: Some(Uuid::new_v4()),
            service_type: "Leak repair".into(),
            scheduled_at: now,
            status,
            payment_status: PaymentStatus::Unpaid,
            payment_intent_id: None,
            price: dec!(80.00),
            created_at: now,
            updated_at: now,
        }
    }

    fn manager(
        bookings: MockBookingRepository,
        listings: MockListingRepository,
        profiles: MockProfileRepository,
    ) -> BookingManager {
        BookingManager::new(Arc::new(bookings), Arc::new(listings), Arc::new(profiles))
    }

    fn request(service_id: Uuid) -> BookingRequest {
        BookingRequest {
            service_id,
            scheduled_date: "2025-07-01".into(),
            professional_id: None,
        }
    }

    #[tokio::test]
    async fn test_only_customers_create_bookings() {
        let svc = manager(
            MockBookingRepository::new(),
            MockListingRepository::new(),
            MockProfileRepository::new(),
        );
        let err = svc
            .create(&identity(Role::Provider), request(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Only customers can create bookings");
    }

    #[tokio::test]
    async fn test_create_snapshots_listing() {
        let customer = identity(Role::Customer);
        let service_id = Uuid::new_v4();

        let mut listings = MockListingRepository::new();
        listings.expect_find_by_id().with(eq(service_id)).returning(|id| {
            let now = Utc::now();
            Ok(Some(Listing {
                id,
                provider_id: Uuid::new_v4(),
                title: "Deep clean".into(),
                description: None,
                price: dec!(120.50),
                category: ServiceCategory::Cleaning,
                created_at: now,
                updated_at: now,
            }))
        });

        let customer_id = customer.id;
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_create()
            .withf(move |new| {
                new.customer_id == customer_id
                    && new.service_type == "Deep clean"
                    && new.price == dec!(120.50)
                    && new.professional_id.is_none()
            })
            .returning(|new| {
                let mut created = booking(new.customer_id, None, BookingStatus::Pending);
                created.service_id = Some(new.service_id);
                Ok(created)
            });

        let created = manager(bookings, listings, MockProfileRepository::new())
            .create(&customer, request(service_id))
            .await
            .unwrap();
        assert_eq!(created.status, BookingStatus::Pending);
        assert_eq!(created.service_id, Some(service_id));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_schedule_before_reading() {
        let mut listings = MockListingRepository::new();
        listings.expect_find_by_id().never();

        let mut req = request(Uuid::new_v4());
        req.scheduled_date = "next tuesday".into();
        let err = manager(MockBookingRepository::new(), listings, MockProfileRepository::new())
            .create(&identity(Role::Customer), req)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_for_missing_listing() {
        let mut listings = MockListingRepository::new();
        listings.expect_find_by_id().returning(|_| Ok(None));

        let err = manager(MockBookingRepository::new(), listings, MockProfileRepository::new())
            .create(&identity(Role::Customer), request(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Service not found");
    }

    #[tokio::test]
    async fn test_provider_accepts_open_job() {
        let pro = identity(Role::Provider);
        let pro_id = pro.id;
        let open = booking(Uuid::new_v4(), None, BookingStatus::Pending);
        let id = open.id;

        let mut bookings = MockBookingRepository::new();
        let read = open.clone();
        bookings
            .expect_find_by_id()
            .returning(move |_| Ok(Some(read.clone())));
        bookings
            .expect_assign()
            .with(
                eq(id),
                eq(BookingGuard {
                    status: BookingStatus::Pending,
                    professional_id: None,
                }),
                eq(pro_id),
            )
            .returning(move |_, _, professional_id| {
                let mut accepted = open.clone();
                accepted.professional_id = Some(professional_id);
                accepted.status = BookingStatus::Accepted;
                Ok(Some(accepted))
            });

        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_by_id()
            .returning(|id| Ok(Some(provider_profile(id, Role::Provider))));

        let updated = manager(bookings, MockListingRepository::new(), profiles)
            .assign(&pro, id, pro_id)
            .await
            .unwrap();
        assert_eq!(updated.status, BookingStatus::Accepted);
        assert_eq!(updated.professional_id, Some(pro_id));
    }

    #[tokio::test]
    async fn test_assign_target_must_be_provider() {
        let customer = identity(Role::Customer);
        let owned = booking(customer.id, None, BookingStatus::Pending);
        let id = owned.id;

        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_find_by_id()
            .returning(move |_| Ok(Some(owned.clone())));
        bookings.expect_assign().never();

        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_by_id()
            .returning(|id| Ok(Some(provider_profile(id, Role::Customer))));

        let err = manager(bookings, MockListingRepository::new(), profiles)
            .assign(&customer, id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_assign_lost_race_conflicts() {
        let pro = identity(Role::Provider);
        let open = booking(Uuid::new_v4(), None, BookingStatus::Pending);
        let id = open.id;

        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_find_by_id()
            .returning(move |_| Ok(Some(open.clone())));
        bookings.expect_assign().returning(|_, _, _| Ok(None));

        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_by_id()
            .returning(|id| Ok(Some(provider_profile(id, Role::Provider))));

        let err = manager(bookings, MockListingRepository::new(), profiles)
            .assign(&pro, id, pro.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_status_rejects_unknown_status() {
        let mut bookings = MockBookingRepository::new();
        bookings.expect_find_by_id().never();

        let err = manager(bookings, MockListingRepository::new(), MockProfileRepository::new())
            .update_status(&identity(Role::Provider), Uuid::new_v4(), "done")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid status");
    }

    #[tokio::test]
    async fn test_customer_cannot_complete_own_booking() {
        let customer = identity(Role::Customer);
        let accepted = booking(customer.id, Some(Uuid::new_v4()), BookingStatus::Accepted);
        let id = accepted.id;

        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_find_by_id()
            .returning(move |_| Ok(Some(accepted.clone())));
        bookings.expect_update_status().never();

        let err = manager(bookings, MockListingRepository::new(), MockProfileRepository::new())
            .update_status(&customer, id, "completed")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_open_jobs_are_provider_only() {
        let mut bookings = MockBookingRepository::new();
        bookings.expect_list_open().times(1).returning(|| Ok(vec![]));
        let svc = manager(bookings, MockListingRepository::new(), MockProfileRepository::new());

        assert!(svc.list_open(&identity(Role::Provider)).await.unwrap().is_empty());
        assert!(matches!(
            svc.list_open(&identity(Role::Customer)).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_lists_everything() {
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_list()
            .with(eq(BookingScope::All))
            .returning(|_| Ok(vec![]));

        manager(bookings, MockListingRepository::new(), MockProfileRepository::new())
            .list(&identity(Role::Admin))
            .await
            .unwrap();
    }
}
