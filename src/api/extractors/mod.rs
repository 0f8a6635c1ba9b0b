//! Request extractors.

mod signup_form;
mod validated_json;

pub use signup_form::{SignupForm, SignupRequest};
pub use validated_json::ValidatedJson;
