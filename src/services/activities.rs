use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    models::{
        activity::{Activity, ActivityDraft, Duration},
        store::{DeletedActivity, Store},
    },
    notifications::{ActivityEvent, EventKind, HandlerError, Notifier, SubscriptionId},
    storage::{ACTIVITIES_KEY, PENDING_DELETION_KEY, Storage, StorageError},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Activity '{0}' not found")]
    NotFound(Uuid),

    #[error("Position {index} is out of range (there are {len} activities)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Changes could not be saved: {0}")]
    PersistenceUnavailable(#[from] StorageError),
}

/// Owns the activity list and the undo slot.
///
/// Every mutation validates first and then applies, so a failed call leaves
/// the state untouched. Persistence failures are logged and kept for
/// [`ActivityStore::take_persistence_error`]; the in-memory state stays
/// authoritative for the session.
pub struct ActivityStore<S: Storage> {
    store: Store,
    storage: S,
    notifier: Notifier,
    persistence_error: Option<StorageError>,
}

impl<S: Storage> ActivityStore<S> {
    /// Hydrates from storage. Absent or malformed keys load as empty.
    pub fn initialize(storage: S) -> Self {
        let activities: Vec<Activity> = load_or_default(&storage, ACTIVITIES_KEY);
        let pending_deletion: Option<DeletedActivity> =
            load_or_default(&storage, PENDING_DELETION_KEY);

        let activities = dedupe_by_id(activities);
        let pending_deletion = pending_deletion.filter(|pending| {
            let stale = activities.iter().any(|a| a.id == pending.activity.id);
            if stale {
                warn!(
                    id = %pending.activity.id,
                    "pending deletion is still in the activity list, dropping it"
                );
            }
            !stale
        });

        let store = Store {
            activities,
            pending_deletion,
        };
        debug!(
            activities = store.activities.len(),
            pending_deletion = store.pending_deletion.is_some(),
            "activity store initialized"
        );

        Self {
            store,
            storage,
            notifier: Notifier::new(),
            persistence_error: None,
        }
    }

    pub fn activities(&self) -> &[Activity] {
        &self.store.activities
    }

    pub fn pending_deletion(&self) -> Option<&DeletedActivity> {
        self.store.pending_deletion.as_ref()
    }

    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.store.position_of(id)
    }

    pub fn len(&self) -> usize {
        self.store.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.activities.is_empty()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&ActivityEvent) -> Result<(), HandlerError> + 'static,
    {
        self.notifier.subscribe(kind, handler)
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Hands out the most recent persistence failure, if any
    pub fn take_persistence_error(&mut self) -> Option<StoreError> {
        self.persistence_error
            .take()
            .map(StoreError::PersistenceUnavailable)
    }

    pub fn add(&mut self, draft: ActivityDraft) -> Activity {
        let activity = Activity::from_draft(Uuid::new_v4(), draft);
        let id = activity.id;

        self.store.activities.push(activity.clone());
        debug!(%id, position = self.store.activities.len() - 1, "activity added");

        self.persist_activities();
        self.notifier.emit(&ActivityEvent::Added(id));

        activity
    }

    pub fn edit(&mut self, updated: Activity) -> Result<(), StoreError> {
        let position = self
            .store
            .position_of(updated.id)
            .ok_or(StoreError::NotFound(updated.id))?;

        debug!(id = %updated.id, position, "activity edited");
        self.store.activities[position] = updated;

        self.persist_activities();
        Ok(())
    }

    /// Removes the activity and makes it the only restorable one
    pub fn delete(&mut self, id: Uuid) -> Result<Activity, StoreError> {
        let position = self.store.position_of(id).ok_or(StoreError::NotFound(id))?;

        let activity = self.store.activities.remove(position);
        if let Some(previous) = &self.store.pending_deletion {
            debug!(id = %previous.activity.id, "discarding previous pending deletion");
        }
        self.store.pending_deletion = Some(DeletedActivity {
            activity: activity.clone(),
            position,
        });
        debug!(%id, position, "activity deleted");

        self.persist_activities();
        self.persist_pending_deletion();

        Ok(activity)
    }

    /// Puts the last deleted activity back, clamped to the current length
    pub fn restore(&mut self) -> Option<Activity> {
        let Some(DeletedActivity { activity, position }) = self.store.pending_deletion.take()
        else {
            debug!("nothing to restore");
            return None;
        };

        let insert_at = position.min(self.store.activities.len());
        self.store.activities.insert(insert_at, activity.clone());
        debug!(id = %activity.id, position = insert_at, "activity restored");

        self.persist_activities();
        self.persist_pending_deletion();
        self.notifier.emit(&ActivityEvent::Restored(activity.id));

        Some(activity)
    }

    /// Moves one activity, shifting the ones in between
    pub fn reorder(&mut self, from_index: usize, to_index: usize) -> Result<(), StoreError> {
        let len = self.store.activities.len();
        for index in [from_index, to_index] {
            if index >= len {
                return Err(StoreError::IndexOutOfRange { index, len });
            }
        }

        if from_index == to_index {
            return Ok(());
        }

        let activity = self.store.activities.remove(from_index);
        self.store.activities.insert(to_index, activity);
        debug!(from_index, to_index, "activities reordered");

        self.persist_activities();
        Ok(())
    }

    pub fn clear_all(&mut self) {
        self.store.activities.clear();
        self.store.pending_deletion = None;
        debug!("all activities cleared");

        self.persist_activities();
        self.persist_pending_deletion();
    }

    pub fn total_duration(&self) -> Duration {
        self.store.total_duration()
    }

    fn persist_activities(&mut self) {
        let result = serde_json::to_value(&self.store.activities)
            .map_err(|e| StorageError::SerializeFailed {
                key: ACTIVITIES_KEY.to_string(),
                source: e,
            })
            .and_then(|value| self.storage.save(ACTIVITIES_KEY, &value));
        self.record_persistence(result);
    }

    fn persist_pending_deletion(&mut self) {
        let result = match &self.store.pending_deletion {
            Some(pending) => serde_json::to_value(pending)
                .map_err(|e| StorageError::SerializeFailed {
                    key: PENDING_DELETION_KEY.to_string(),
                    source: e,
                })
                .and_then(|value| self.storage.save(PENDING_DELETION_KEY, &value)),
            None => self.storage.remove(PENDING_DELETION_KEY),
        };
        self.record_persistence(result);
    }

    fn record_persistence(&mut self, result: Result<(), StorageError>) {
        if let Err(e) = result {
            error!(error = %e, "failed to persist activity state, keeping in-memory changes");
            self.persistence_error = Some(e);
        }
    }

    #[cfg(test)]
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

fn load_or_default<T: DeserializeOwned + Default>(storage: &impl Storage, key: &str) -> T {
    let Some(value) = storage.load(key) else {
        return T::default();
    };

    match serde_json::from_value::<T>(value) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(key, error = %e, "stored value has an unexpected shape, starting empty");
            T::default()
        }
    }
}

fn dedupe_by_id(activities: Vec<Activity>) -> Vec<Activity> {
    let mut seen = std::collections::HashSet::new();
    activities
        .into_iter()
        .filter(|activity| {
            let unique = seen.insert(activity.id);
            if !unique {
                warn!(id = %activity.id, "dropping activity with duplicate id");
            }
            unique
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum ResolveActivityError {
    #[error("Activity '{0}' not found")]
    ActivityNotFound(String),

    #[error("Activity reference is ambiguous. Multiple activities found: {}", .0.join(", "))]
    AmbiguousActivity(Vec<String>),
}

/// Finds an activity by 1-based position or by a fragment of its name or organization
pub fn find_activity<'a>(
    activities: &'a [Activity],
    position_or_fuzzy_name: &str,
) -> Result<&'a Activity, ResolveActivityError> {
    if let Ok(position) = position_or_fuzzy_name.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| activities.get(index))
            .ok_or_else(|| ResolveActivityError::ActivityNotFound(position_or_fuzzy_name.to_string()));
    }

    let needle = position_or_fuzzy_name.to_lowercase();
    let matching: Vec<_> = activities
        .iter()
        .filter(|a| {
            a.name.to_lowercase().contains(&needle)
                || a.organization.to_lowercase().contains(&needle)
        })
        .collect();

    match matching.len() {
        0 => Err(ResolveActivityError::ActivityNotFound(
            position_or_fuzzy_name.to_string(),
        )),
        1 => Ok(matching[0]),
        _ => {
            let labels = matching
                .iter()
                .map(|a| format!("{} ({})", a.label(), a.organization))
                .collect();
            Err(ResolveActivityError::AmbiguousActivity(labels))
        }
    }
}
