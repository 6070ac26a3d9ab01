//! (equipment type, token) → element count for numeric array fields.
//!
//! The engine fills array fields without reporting their length, so the
//! bridge must size the output buffer itself. The built-in table covers the
//! fields this crate knows about; deployments extend or override it through
//! the `[schema]` configuration section.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::debug;

use super::tokens::*;
use crate::error::{BridgeError, Result};

/// One configured table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ArrayLengthEntry {
    pub equipment: EquipmentType,
    pub token: Token,
    pub length: usize,
}

static BUILT_IN: Lazy<HashMap<(EquipmentType, Token), usize>> = Lazy::new(|| {
    HashMap::from([
        ((EquipmentType::LINE, LN_V_D_RATING), 4),
        ((EquipmentType::XFMR, XR_V_D_RATING), 4),
        ((EquipmentType::RELAY_GROUP, RG_V_N_PRIMARY), MAX_ZONES),
        ((EquipmentType::RELAY_DS_GROUND, DG_V_D_PARAMS), MAX_DS_PARAMS),
        ((EquipmentType::RELAY_DS_PHASE, DP_V_D_PARAMS), MAX_DS_PARAMS),
        ((EquipmentType::BREAKER, BK_V_N_OPS), MAX_SBKF),
    ])
});

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLengths {
    table: HashMap<(EquipmentType, Token), usize>,
}

impl Default for ArrayLengths {
    fn default() -> Self {
        Self {
            table: BUILT_IN.clone(),
        }
    }
}

impl ArrayLengths {
    /// A table with no entries; every lookup fails.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Built-in table with `entries` merged over it.
    pub fn with_entries(entries: &[ArrayLengthEntry]) -> Result<Self> {
        let mut lengths = Self::default();
        for entry in entries {
            lengths.insert(entry.equipment, entry.token, entry.length)?;
        }
        Ok(lengths)
    }

    pub fn insert(&mut self, equipment: EquipmentType, token: Token, length: usize) -> Result<()> {
        let kind = token.kind().ok_or(BridgeError::UnknownToken(token))?;
        if !kind.needs_length() {
            return Err(BridgeError::invalid(
                "ArrayLengths",
                format!("token {token} is a {kind} field, not a numeric array"),
            ));
        }
        if length == 0 {
            return Err(BridgeError::invalid(
                "ArrayLengths",
                format!("zero length for equipment type {equipment}, token {token}"),
            ));
        }
        if let Some(old) = self.table.insert((equipment, token), length) {
            debug!(%equipment, %token, old, length, "array length overridden");
        }
        Ok(())
    }

    pub fn length(&self, equipment: EquipmentType, token: Token) -> Result<usize> {
        self.table
            .get(&(equipment, token))
            .copied()
            .ok_or(BridgeError::Schema { equipment, token })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
