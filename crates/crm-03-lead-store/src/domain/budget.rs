//! Budget drafting rules.

use chrono::NaiveDate;
use crm_types::{BudgetReference, FieldErrors, Money};
use serde::Deserialize;

pub const DESCRIPTION_MAX: usize = 2000;

/// A budget as requested by office staff.
#[derive(Debug, Clone, Deserialize)]
pub struct BudgetDraft {
    pub description: String,
    pub amount: Money,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    /// Already validated PDF bytes.
    #[serde(skip)]
    pub document: Option<Vec<u8>>,
}

/// Check a new budget against `today`.
///
/// The validity date may be today or later; it is only checked on creation.
pub fn validate_draft(draft: &BudgetDraft, today: NaiveDate) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    let description = draft.description.trim();
    if description.is_empty() {
        errors.add("description", "Description is required.");
    } else if description.chars().count() > DESCRIPTION_MAX {
        errors.add(
            "description",
            format!("Description cannot exceed {} characters.", DESCRIPTION_MAX),
        );
    }

    if !draft.amount.is_positive() {
        errors.add("amount", "Amount must be greater than zero.");
    }

    if let Some(valid_until) = draft.valid_until {
        if valid_until < today {
            errors.add("valid_until", "The validity date cannot be in the past.");
        }
    }

    errors.into_result(())
}

/// Reference for the `sequence`-th budget of `year`.
pub fn reference_for(prefix: &str, year: i32, sequence: u32) -> BudgetReference {
    BudgetReference::new(prefix, year, sequence)
}
