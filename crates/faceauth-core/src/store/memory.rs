use super::{DescriptorStore, StoreError};
use crate::types::Identity;
use std::sync::RwLock;

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: RwLock<Option<Identity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DescriptorStore for MemoryStore {
    fn load(&self) -> Option<Identity> {
        self.slot.read().ok().and_then(|slot| slot.clone())
    }

    fn save(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut slot = self.slot.write().map_err(|_| StoreError::Poisoned)?;
        *slot = Some(identity.clone());
        Ok(())
    }
}
