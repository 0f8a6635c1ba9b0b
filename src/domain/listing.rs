//! Service listings published by providers.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::MAX_LISTING_TITLE_LENGTH;
use crate::errors::{AppError, AppResult};

const TITLE_REQUIRED: &str = "Title is required and cannot be empty.";
const TITLE_TOO_LONG: &str = "Title cannot exceed 100 characters.";
const PRICE_REQUIRED: &str = "Price is required.";
const PRICE_NOT_NUMERIC: &str = "Price must be a valid number.";
const PRICE_NOT_POSITIVE: &str = "Price must be a positive number.";
const PRICE_TOO_LARGE: &str = "Price exceeds the maximum allowed value.";
const CATEGORY_INVALID: &str = "Invalid category selected.";

/// Largest value a NUMERIC(10,2) column can hold
fn max_price() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

/// Fixed set of listing categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ServiceCategory {
    Plumbing,
    Electrical,
    Cleaning,
    #[serde(rename = "AC Repair")]
    AcRepair,
    #[serde(rename = "Appliance Repair")]
    ApplianceRepair,
    #[serde(rename = "Home Maintenance")]
    HomeMaintenance,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 6] = [
        ServiceCategory::Plumbing,
        ServiceCategory::Electrical,
        ServiceCategory::Cleaning,
        ServiceCategory::AcRepair,
        ServiceCategory::ApplianceRepair,
        ServiceCategory::HomeMaintenance,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ServiceCategory::Plumbing => "Plumbing",
            ServiceCategory::Electrical => "Electrical",
            ServiceCategory::Cleaning => "Cleaning",
            ServiceCategory::AcRepair => "AC Repair",
            ServiceCategory::ApplianceRepair => "Appliance Repair",
            ServiceCategory::HomeMaintenance => "Home Maintenance",
        }
    }

    /// Exact, case-sensitive match on the display label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Listing domain entity
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Listing {
    pub id: Uuid,
    pub provider_id: Uuid,
    #[schema(example = "Pipe Fix")]
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "49.99")]
    pub price: Decimal,
    pub category: ServiceCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    pub fn is_owned_by(&self, provider_id: Uuid) -> bool {
        self.provider_id == provider_id
    }
}

/// Raw create/update payload. Fields stay loose so every problem can be
/// reported at once instead of failing on the first bad type.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListingInput {
    #[schema(example = "Pipe Fix")]
    pub title: Option<String>,
    #[schema(example = "Fix leaking kitchen pipes")]
    pub description: Option<String>,
    /// Number or numeric string
    #[schema(value_type = Option<f64>, example = 49.99)]
    pub price: Option<Value>,
    #[schema(example = "Plumbing")]
    pub category: Option<String>,
}

/// Listing fields that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDraft {
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: ServiceCategory,
}

impl ListingDraft {
    /// Validate raw input, collecting every failure.
    pub fn parse(input: &ListingInput) -> AppResult<Self> {
        let mut errors = Vec::new();

        let title = input.title.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() {
            errors.push(TITLE_REQUIRED.to_string());
        } else if title.chars().count() > MAX_LISTING_TITLE_LENGTH {
            errors.push(TITLE_TOO_LONG.to_string());
        }

        let price = match parse_price(input.price.as_ref()) {
            Ok(price) => Some(price),
            Err(msg) => {
                errors.push(msg.to_string());
                None
            }
        };

        let category = input
            .category
            .as_deref()
            .and_then(ServiceCategory::from_label);
        if category.is_none() {
            errors.push(CATEGORY_INVALID.to_string());
        }

        match (price, category) {
            (Some(price), Some(category)) if errors.is_empty() => Ok(Self {
                title: title.to_string(),
                description: input
                    .description
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string),
                price,
                category,
            }),
            _ => Err(AppError::InvalidInput(errors)),
        }
    }
}

fn parse_price(raw: Option<&Value>) -> Result<Decimal, &'static str> {
    let text = match raw {
        None | Some(Value::Null) => return Err(PRICE_REQUIRED),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => return Err(PRICE_REQUIRED),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(PRICE_NOT_NUMERIC),
    };

    let price = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| PRICE_NOT_NUMERIC)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    if price <= Decimal::ZERO {
        return Err(PRICE_NOT_POSITIVE);
    }
    if price > max_price() {
        return Err(PRICE_TOO_LARGE);
    }
    Ok(price)
}
