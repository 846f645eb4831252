// ==========================================
// Packing Station - order state engine
// ==========================================
// Decides the next order state from a detail snapshot.
// No SQL here; callers persist the decision.
//
//   Draft  --all packed-->  Done
//   any    --defect-->      Defective
//   Defective --all cleared--> Draft
// ==========================================

use crate::domain::order::PackingDetail;
use crate::domain::types::OrderState;
use serde::{Deserialize, Serialize};

/// Outcome of one transition decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: OrderState,
    pub to: OrderState,
    /// Every detail has `packed_quantity >= required_quantity`.
    pub all_packed: bool,
}

impl StateTransition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }

    /// True only on the step into Done (label generation hook).
    pub fn entered_done(&self) -> bool {
        self.from != OrderState::Done && self.to == OrderState::Done
    }
}

// ==========================================
// OrderStateEngine
// ==========================================
pub struct OrderStateEngine;

impl OrderStateEngine {
    pub fn new() -> Self {
        Self
    }

    /// After a unit was packed.
    ///
    /// Outstanding defects keep the order Defective even when everything is
    /// packed; otherwise a fully packed order is Done and anything else Draft.
    pub fn after_pack(&self, current: OrderState, details: &[PackingDetail]) -> StateTransition {
        let all_packed = Self::all_packed(details);
        let to = if Self::has_defects(details) {
            OrderState::Defective
        } else if all_packed {
            OrderState::Done
        } else {
            OrderState::Draft
        };

        StateTransition {
            from: current,
            to,
            all_packed,
        }
    }

    /// After units were flagged defective: always Defective.
    pub fn after_defect(&self, current: OrderState, details: &[PackingDetail]) -> StateTransition {
        StateTransition {
            from: current,
            to: OrderState::Defective,
            all_packed: Self::all_packed(details),
        }
    }

    /// After one detail's defects were cleared.
    ///
    /// Falls back to Draft once no detail carries defects (never straight to
    /// Done; the next pack re-evaluates completion).
    pub fn after_clear(&self, current: OrderState, details: &[PackingDetail]) -> StateTransition {
        let to = if Self::has_defects(details) {
            current
        } else {
            OrderState::Draft
        };

        StateTransition {
            from: current,
            to,
            all_packed: Self::all_packed(details),
        }
    }

    /// After a detail was appended by hand.
    ///
    /// A Done order with an unpacked detail drops back to Draft; other
    /// states are kept.
    pub fn after_detail_added(&self, current: OrderState, details: &[PackingDetail]) -> StateTransition {
        let all_packed = Self::all_packed(details);
        let to = match current {
            OrderState::Done if !all_packed => OrderState::Draft,
            other => other,
        };

        StateTransition {
            from: current,
            to,
            all_packed,
        }
    }

    /// After a full reset: always Draft.
    pub fn after_reset(&self, current: OrderState) -> StateTransition {
        StateTransition {
            from: current,
            to: OrderState::Draft,
            all_packed: false,
        }
    }

    fn all_packed(details: &[PackingDetail]) -> bool {
        details.iter().all(PackingDetail::is_fully_packed)
    }

    fn has_defects(details: &[PackingDetail]) -> bool {
        details.iter().any(PackingDetail::is_defective)
    }
}

impl Default for OrderStateEngine {
    fn default() -> Self {
        Self::new()
    }
}
