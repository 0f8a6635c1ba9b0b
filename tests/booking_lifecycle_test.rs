//! End-to-end booking scenarios over in-memory stores.

mod common;

use std::sync::Arc;

use rust_decimal_macros::dec;
use uuid::Uuid;

use common::{in_days, BrokenBookings, Harness, RacingBookings};
use helpora::domain::{BookingStatus, PaymentStatus, Role};
use helpora::errors::AppError;
use helpora::services::{BookingRequest, ServiceContainer};

fn request(service_id: Uuid) -> BookingRequest {
    BookingRequest {
        service_id,
        scheduled_date: in_days(3),
        professional_id: None,
    }
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_customer_books_provider_accepts_and_completes() {
    let h = Harness::new();
    let services = h.services();
    let customer = h.profile(Role::Customer).await;
    let provider = h.profile(Role::Provider).await;
    let listing = h.listing(&provider, dec!(49.99)).await;

    let booking = services
        .bookings()
        .create(&customer, request(listing.id))
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.payment_status, PaymentStatus::Unpaid);
    assert_eq!(booking.customer_id, customer.id);
    assert_eq!(booking.service_type, "Pipe Fix");
    assert_eq!(booking.price, dec!(49.99));

    // The job shows up for providers until someone takes it
    let open = services.bookings().list_open(&provider).await.unwrap();
    assert_eq!(open.len(), 1);

    let accepted = services
        .bookings()
        .assign(&provider, booking.id, provider.id)
        .await
        .unwrap();
    assert_eq!(accepted.status, BookingStatus::Accepted);
    assert_eq!(accepted.professional_id, Some(provider.id));
    assert!(services.bookings().list_open(&provider).await.unwrap().is_empty());

    let completed = services
        .bookings()
        .update_status(&provider, booking.id, "completed")
        .await
        .unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    assert_eq!(completed.customer_id, customer.id);

    // Terminal: nothing moves it again
    let err = services
        .bookings()
        .update_status(&provider, booking.id, "cancelled")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Not even the owner's cancel
    let err = services
        .bookings()
        .update_status(&customer, booking.id, "cancelled")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(err.to_string(), "Booking is already completed and can no longer change");
    assert_eq!(h.bookings.get(booking.id).unwrap().status, BookingStatus::Completed);
}

#[tokio::test]
async fn test_listings_are_role_scoped() {
    let h = Harness::new();
    let services = h.services();
    let customer = h.profile(Role::Customer).await;
    let other_customer = h.profile(Role::Customer).await;
    let provider = h.profile(Role::Provider).await;
    let admin = h.profile(Role::Admin).await;
    let listing = h.listing(&provider, dec!(20)).await;

    let mine = services
        .bookings()
        .create(&customer, request(listing.id))
        .await
        .unwrap();
    services
        .bookings()
        .create(&other_customer, request(listing.id))
        .await
        .unwrap();

    let seen = services.bookings().list(&customer).await.unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id, mine.id);

    // Providers see nothing until assigned
    assert!(services.bookings().list(&provider).await.unwrap().is_empty());
    services
        .bookings()
        .assign(&provider, mine.id, provider.id)
        .await
        .unwrap();
    assert_eq!(services.bookings().list(&provider).await.unwrap().len(), 1);

    assert_eq!(services.bookings().list(&admin).await.unwrap().len(), 2);
}

// =============================================================================
// Authorization
// =============================================================================

#[tokio::test]
async fn test_customer_may_only_cancel() {
    let h = Harness::new();
    let services = h.services();
    let customer = h.profile(Role::Customer).await;
    let provider = h.profile(Role::Provider).await;
    let listing = h.listing(&provider, dec!(20)).await;
    let booking = services
        .bookings()
        .create(&customer, request(listing.id))
        .await
        .unwrap();

    for target in ["accepted", "completed"] {
        let err = services
            .bookings()
            .update_status(&customer, booking.id, target)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)), "{target}");
    }

    let cancelled = services
        .bookings()
        .update_status(&customer, booking.id, "cancelled")
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    // A cancelled booking cannot be picked up
    let err = services
        .bookings()
        .assign(&provider, booking.id, provider.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_strangers_cannot_touch_a_booking() {
    let h = Harness::new();
    let services = h.services();
    let customer = h.profile(Role::Customer).await;
    let stranger = h.profile(Role::Customer).await;
    let provider = h.profile(Role::Provider).await;
    let other_provider = h.profile(Role::Provider).await;
    let listing = h.listing(&provider, dec!(20)).await;
    let booking = services
        .bookings()
        .create(&customer, request(listing.id))
        .await
        .unwrap();

    let err = services
        .bookings()
        .update_status(&stranger, booking.id, "cancelled")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Not authorized to update this booking");

    // A provider cannot assign someone else
    let err = services
        .bookings()
        .assign(&other_provider, booking.id, provider.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    services
        .bookings()
        .assign(&provider, booking.id, provider.id)
        .await
        .unwrap();

    // Nor take over a job already held
    let err = services
        .bookings()
        .assign(&other_provider, booking.id, other_provider.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Only the assigned professional drives the job
    let err = services
        .bookings()
        .update_status(&other_provider, booking.id, "completed")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_customer_assigns_a_provider() {
    let h = Harness::new();
    let services = h.services();
    let customer = h.profile(Role::Customer).await;
    let provider = h.profile(Role::Provider).await;
    let listing = h.listing(&provider, dec!(20)).await;
    let booking = services
        .bookings()
        .create(&customer, request(listing.id))
        .await
        .unwrap();

    // The target has to be a provider
    let err = services
        .bookings()
        .assign(&customer, booking.id, customer.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let assigned = services
        .bookings()
        .assign(&customer, booking.id, provider.id)
        .await
        .unwrap();
    assert_eq!(assigned.professional_id, Some(provider.id));
    assert_eq!(assigned.status, BookingStatus::Accepted);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_create_rejects_bad_input() {
    let h = Harness::new();
    let services = h.services();
    let customer = h.profile(Role::Customer).await;
    let provider = h.profile(Role::Provider).await;
    let listing = h.listing(&provider, dec!(20)).await;

    let mut bad_date = request(listing.id);
    bad_date.scheduled_date = "next tuesday".into();
    assert!(matches!(
        services.bookings().create(&customer, bad_date).await,
        Err(AppError::Validation(_))
    ));

    let err = services
        .bookings()
        .create(&customer, request(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Service not found");

    let err = services
        .bookings()
        .create(&provider, request(listing.id))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Only customers can create bookings");

    let err = services
        .bookings()
        .update_status(&customer, Uuid::new_v4(), "paused")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_two_providers_race_for_one_job() {
    let h = Harness::new();
    let services = h.services();
    let customer = h.profile(Role::Customer).await;
    let first = h.profile(Role::Provider).await;
    let second = h.profile(Role::Provider).await;
    let listing = h.listing(&first, dec!(20)).await;
    let booking = services
        .bookings()
        .create(&customer, request(listing.id))
        .await
        .unwrap();

    let bookings = services.bookings();
    let (a, b) = tokio::join!(
        bookings.assign(&first, booking.id, first.id),
        bookings.assign(&second, booking.id, second.id),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1, "exactly one provider wins");
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(
        loser,
        Err(AppError::Conflict(_)) | Err(AppError::Forbidden(_))
    ));

    let stored = h.bookings.get(booking.id).unwrap();
    assert_eq!(stored.status, BookingStatus::Accepted);
    assert!(stored.professional_id == Some(first.id) || stored.professional_id == Some(second.id));
}

#[tokio::test]
async fn test_stale_guard_leaves_row_untouched() {
    let h = Harness::new();
    let services = h.services();
    let customer = h.profile(Role::Customer).await;
    let provider = h.profile(Role::Provider).await;
    let listing = h.listing(&provider, dec!(20)).await;
    let booking = services
        .bookings()
        .create(&customer, request(listing.id))
        .await
        .unwrap();
    services
        .bookings()
        .assign(&provider, booking.id, provider.id)
        .await
        .unwrap();

    // The guarded write sees a row that moved on
    let mut stale = h.bookings.get(booking.id).unwrap().guard();
    stale.status = BookingStatus::Pending;
    let written = helpora::infra::BookingRepository::update_status(
        h.bookings.as_ref(),
        booking.id,
        stale,
        BookingStatus::Completed,
    )
    .await
    .unwrap();
    assert!(written.is_none());
    assert_eq!(h.bookings.get(booking.id).unwrap().status, BookingStatus::Accepted);
}

#[tokio::test]
async fn test_status_change_after_concurrent_cancel_conflicts() {
    let h = Harness::new();
    let customer = h.profile(Role::Customer).await;
    let provider = h.profile(Role::Provider).await;
    let listing = h.listing(&provider, dec!(20)).await;
    let booking = h
        .services()
        .bookings()
        .create(&customer, request(listing.id))
        .await
        .unwrap();
    h.services()
        .bookings()
        .assign(&provider, booking.id, provider.id)
        .await
        .unwrap();

    // The customer cancels between the provider's read and write
    let racing = RacingBookings::new(h.bookings.clone(), |row| {
        row.status = BookingStatus::Cancelled;
    });
    let services = h.services_with_bookings(Arc::new(racing));

    let err = services
        .bookings()
        .update_status(&provider, booking.id, "completed")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(err.to_string(), "Booking was modified by another request");
    assert_eq!(h.bookings.get(booking.id).unwrap().status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_storage_failure_surfaces_as_database_error() {
    let h = Harness::new();
    let services = h.services_with_bookings(Arc::new(BrokenBookings(h.bookings.clone())));
    let customer = h.profile(Role::Customer).await;
    let provider = h.profile(Role::Provider).await;
    let listing = h.listing(&provider, dec!(20)).await;
    let booking = services
        .bookings()
        .create(&customer, request(listing.id))
        .await
        .unwrap();

    let err = services
        .bookings()
        .assign(&provider, booking.id, provider.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
    assert_eq!(h.bookings.get(booking.id).unwrap().status, BookingStatus::Pending);
}
