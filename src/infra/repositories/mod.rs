//! Repository layer - Data access abstraction
//!
//! Each repository is a trait with a SeaORM-backed store. Services depend
//! on the traits so tests can swap in mocks or in-memory fakes.

mod booking_repository;
pub(crate) mod entities;
mod listing_repository;
mod profile_repository;

pub use booking_repository::{BookingRepository, BookingStore};
pub use listing_repository::{ListingRepository, ListingStore};
pub use profile_repository::{ProfileRepository, ProfileStore};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use booking_repository::MockBookingRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use listing_repository::MockListingRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use profile_repository::MockProfileRepository;
