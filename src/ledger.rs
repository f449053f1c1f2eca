//! Artifact uniqueness ledger
//!
//! The only state shared across tests during a run. Each generated
//! artifact identity (a file name, or a file name plus grid-cell
//! discriminator) may be claimed at most once per execution context;
//! colliding claims are authoring mistakes caught before any file is
//! written. The ledger is an owned value threaded through the driver, not
//! a global.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::DefinitionError;
use crate::variant::CanvasType;

#[derive(Debug, Default)]
pub struct UniquenessLedger {
    claimed: BTreeMap<String, BTreeSet<CanvasType>>,
}

impl UniquenessLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `identity` for every canvas type in `types`. Fails when any
    /// of those types was already claimed for the same identity.
    pub fn claim(
        &mut self,
        identity: &str,
        types: &BTreeSet<CanvasType>,
    ) -> Result<(), DefinitionError> {
        let entry = self.claimed.entry(identity.to_string()).or_default();
        let overlap: Vec<String> = entry
            .intersection(types)
            .map(|t| t.as_str().to_string())
            .collect();
        if !overlap.is_empty() {
            return Err(DefinitionError::DuplicateTest {
                identity: identity.to_string(),
                types: overlap,
            });
        }
        entry.extend(types.iter().copied());
        Ok(())
    }
}
