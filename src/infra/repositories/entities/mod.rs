//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod booking;
pub mod listing;
pub mod profile;
