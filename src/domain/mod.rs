//! Domain layer - Core business entities and rules
//!
//! Marketplace concepts (roles, profiles, listings, bookings and payments)
//! independent of storage and transport. Authorization and lifecycle rules
//! live here so every entry point applies them the same way.

pub mod booking;
pub mod listing;
pub mod password;
pub mod payment;
pub mod profile;
pub mod role;

pub use booking::{
    parse_schedule, Booking, BookingGuard, BookingScope, BookingStatus, NewBooking, PaymentStatus,
};
pub use listing::{Listing, ListingDraft, ListingInput, ServiceCategory};
pub use password::Password;
pub use payment::{
    from_minor_units, to_minor_units, IntentMetadata, IntentRequest, PaymentApplication,
    PaymentIntent,
};
pub use profile::{NewProfile, Profile, ProfileResponse};
pub use role::{Identity, Role};
