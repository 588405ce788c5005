//! Character-selection handoff.
//!
//! The selection screen may emit the world-entry snapshot before the world
//! client is listening. When that happens the snapshot is parked in the
//! cross-scene store, and the world client picks it up once at attach time.

use chrono::{DateTime, Duration, Utc};
use realm_shared::{error::SyncError, protocol::EnterWorld, storage::HandoffStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Well-known store key of the persisted selection.
pub const HANDOFF_KEY: &str = "character_selection";

/// What the selection screen persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffPayload {
    pub saved_at: DateTime<Utc>,
    pub selection: EnterWorld,
}

impl HandoffPayload {
    pub fn new(selection: EnterWorld) -> Self {
        Self {
            saved_at: Utc::now(),
            selection,
        }
    }

    /// Serializes and stores the payload under [`HANDOFF_KEY`].
    pub fn park(&self, store: &mut dyn HandoffStore) -> anyhow::Result<()> {
        let data = serde_json::to_vec(self)?;
        store.put(HANDOFF_KEY, &data)
    }
}

/// One-shot reader of the parked selection.
#[derive(Debug, Default)]
pub struct PendingHandoff {
    consumed: bool,
    max_age: Option<Duration>,
}

impl PendingHandoff {
    pub fn new(max_age: Option<Duration>) -> Self {
        Self {
            consumed: false,
            max_age,
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Reads and deletes the parked selection. Only the first call looks at
    /// the store; later calls return `None`.
    pub fn take(&mut self, store: &mut dyn HandoffStore) -> Option<EnterWorld> {
        if std::mem::replace(&mut self.consumed, true) {
            return None;
        }

        let data = match store.take(HANDOFF_KEY) {
            Ok(Some(data)) => data,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Handoff store unreadable");
                return None;
            }
        };

        match self.decode(&data) {
            Ok(selection) => {
                info!(local_id = %selection.local_id, "Recovered parked character selection");
                Some(selection)
            }
            Err(e) => {
                warn!(error = %e, "Parked character selection discarded");
                None
            }
        }
    }

    fn decode(&self, data: &[u8]) -> Result<EnterWorld, SyncError> {
        let payload: HandoffPayload = serde_json::from_slice(data)?;
        if let Some(max_age) = self.max_age {
            let age = Utc::now() - payload.saved_at;
            if age > max_age {
                return Err(SyncError::StaleHandoffPayload {
                    age_secs: age.num_seconds(),
                });
            }
        }
        Ok(payload.selection)
    }
}

#[cfg(test)]
mod tests {
    use realm_shared::{protocol::CharacterData, storage::MemoryStore};

    use super::*;

    fn selection() -> EnterWorld {
        EnterWorld {
            success: true,
            local_id: "P1".into(),
            local_character: CharacterData {
                id: "P1".into(),
                name: "Ayla".into(),
                health: 100,
                max_health: 100,
                ..Default::default()
            },
            all_players: vec![],
            all_monsters: vec![],
        }
    }

    #[test]
    fn parked_selection_is_read_once() {
        let mut store = MemoryStore::new();
        HandoffPayload::new(selection()).park(&mut store).unwrap();

        let mut pending = PendingHandoff::default();
        assert_eq!(pending.take(&mut store), Some(selection()));
        assert!(!store.contains(HANDOFF_KEY));
        assert!(pending.is_consumed());

        HandoffPayload::new(selection()).park(&mut store).unwrap();
        assert_eq!(pending.take(&mut store), None);
        assert!(store.contains(HANDOFF_KEY), "second take must not touch the store");
    }

    #[test]
    fn malformed_payload_is_dropped() {
        let mut store = MemoryStore::new();
        store.put(HANDOFF_KEY, b"{not json").unwrap();

        let mut pending = PendingHandoff::default();
        assert_eq!(pending.take(&mut store), None);
        assert!(!store.contains(HANDOFF_KEY));
    }

    #[test]
    fn stale_payload_is_dropped() {
        let mut store = MemoryStore::new();
        let mut payload = HandoffPayload::new(selection());
        payload.saved_at = Utc::now() - Duration::seconds(600);
        payload.park(&mut store).unwrap();

        let mut pending = PendingHandoff::new(Some(Duration::seconds(60)));
        assert_eq!(pending.take(&mut store), None);
    }
}
