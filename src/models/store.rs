use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::activity::{Activity, Duration};

/// The most recently deleted activity and the index it was removed from
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeletedActivity {
    pub activity: Activity,
    pub position: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Store {
    /// Ordered as displayed; ids are unique
    pub activities: Vec<Activity>,
    /// One-slot undo buffer, overwritten by every delete
    pub pending_deletion: Option<DeletedActivity>,
}

impl Store {
    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.activities.iter().position(|a| a.id == id)
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_minutes(self.activities.iter().map(Activity::total_minutes).sum())
    }
}
