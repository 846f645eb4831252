// ==========================================
// Packing Station - order / detail domain model
// ==========================================
// An order exclusively owns its details.
// Detail counters (packed / defective) are independent.
// ==========================================

use crate::domain::types::OrderState;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// PackingDetail - one line item to pack
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingDetail {
    pub id: i64,
    pub order_id: i64,
    pub name: String,
    pub external_code: String, // human-facing code, unique only within the order
    pub required_quantity: i64, // >= 1, fixed at creation
    pub packed_quantity: i64,
    pub defective_quantity: i64,
    pub size_info: Option<String>,
}

impl PackingDetail {
    /// `packed_quantity >= required_quantity`
    pub fn is_fully_packed(&self) -> bool {
        self.packed_quantity >= self.required_quantity
    }

    /// `defective_quantity > 0`
    pub fn is_defective(&self) -> bool {
        self.defective_quantity > 0
    }
}

/// Creation payload for a detail (bulk import or manual add).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDetail {
    pub external_code: String,
    pub name: String,
    pub required_quantity: i64,
    pub size_info: Option<String>,
}

impl NewDetail {
    /// Field checks shared by manual add and bulk import.
    pub fn validate(&self) -> Result<(), String> {
        if self.external_code.trim().is_empty() {
            return Err("external_code must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.required_quantity < 1 {
            return Err(format!(
                "required_quantity must be >= 1, got {}",
                self.required_quantity
            ));
        }
        Ok(())
    }
}

// ==========================================
// PackingOrder
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingOrder {
    pub id: i64,
    pub reference: String,
    pub operator_id: Option<i64>,
    pub created_date: NaiveDate,
    pub state: OrderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_label: Option<Vec<u8>>,
}

/// Order together with its details, in detail id order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithDetails {
    pub order: PackingOrder,
    pub details: Vec<PackingDetail>,
}

impl OrderWithDetails {
    pub fn all_packed(&self) -> bool {
        self.details.iter().all(PackingDetail::is_fully_packed)
    }

    pub fn has_defects(&self) -> bool {
        self.details.iter().any(PackingDetail::is_defective)
    }

    pub fn packed_units(&self) -> i64 {
        self.details.iter().map(|d| d.packed_quantity).sum()
    }

    pub fn defective_units(&self) -> i64 {
        self.details.iter().map(|d| d.defective_quantity).sum()
    }
}
