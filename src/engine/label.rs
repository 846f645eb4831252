// ==========================================
// Packing Station - shipping label generation
// ==========================================
// Invoked once, on an order's transition into Done.
// A failure here never aborts the packing operation.
// ==========================================

use crate::config::PackingConfig;
use crate::domain::order::{PackingDetail, PackingOrder};
use chrono::Local;
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("order {order_id} has no details to label")]
    EmptyOrder { order_id: i64 },

    #[error("label rendering failed: {0}")]
    Render(String),
}

impl From<std::fmt::Error> for LabelError {
    fn from(err: std::fmt::Error) -> Self {
        LabelError::Render(err.to_string())
    }
}

/// Renders a shipping label document for a completed order.
///
/// Called inside the packing transaction with the connection lock held, on
/// the order and detail snapshot already read by that transaction.
/// Implementations must render from those arguments only and must not block
/// on I/O; printing or uploading happens after the fact, from the stored label.
pub trait LabelGenerator: Send + Sync {
    fn generate(
        &self,
        order: &PackingOrder,
        details: &[PackingDetail],
    ) -> Result<Vec<u8>, LabelError>;
}

// ==========================================
// TextLabelGenerator - plain text document
// ==========================================
#[derive(Debug, Clone)]
pub struct TextLabelGenerator {
    title: String,
    barcode_placeholder: String,
}

impl TextLabelGenerator {
    pub fn new(title: impl Into<String>, barcode_placeholder: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            barcode_placeholder: barcode_placeholder.into(),
        }
    }

    pub fn from_config(config: &PackingConfig) -> Self {
        Self::new(&config.label_title, &config.label_barcode_placeholder)
    }
}

impl Default for TextLabelGenerator {
    fn default() -> Self {
        Self::from_config(&PackingConfig::default())
    }
}

impl LabelGenerator for TextLabelGenerator {
    fn generate(
        &self,
        order: &PackingOrder,
        details: &[PackingDetail],
    ) -> Result<Vec<u8>, LabelError> {
        if details.is_empty() {
            return Err(LabelError::EmptyOrder { order_id: order.id });
        }

        let operator = order
            .operator_id
            .map(|id| format!("#{}", id))
            .unwrap_or_else(|| "unassigned".to_string());

        let mut out = String::new();
        writeln!(out, "{}", self.title)?;
        writeln!(out, "{}", "=".repeat(self.title.chars().count().max(16)))?;
        writeln!(out, "Order: {}", order.reference)?;
        writeln!(out, "Created: {}", order.created_date)?;
        writeln!(out, "Printed: {}", Local::now().format("%Y-%m-%d %H:%M"))?;
        writeln!(out, "Operator: {}", operator)?;
        writeln!(out, "Barcode: {}", self.barcode_placeholder)?;
        writeln!(out)?;
        writeln!(out, "Contents:")?;
        for detail in details {
            writeln!(out, "- {} (x{})", detail.name, detail.required_quantity)?;
        }
        writeln!(out)?;
        writeln!(out, "Packed by: ____________________")?;
        writeln!(out, "Checked by: ___________________")?;

        Ok(out.into_bytes())
    }
}
