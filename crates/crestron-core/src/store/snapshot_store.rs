// ── Snapshot store ──
//
// Single source of truth for consumers. Readers load an `Arc<Snapshot>`
// without locking; writers swap whole snapshots. Every swap is published
// on a `watch` channel.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tokio::time::Instant;

use super::snapshot::Snapshot;
use crate::config::OPTIMISTIC_COOLDOWN;
use crate::error::CoreError;
use crate::model::{CompositeId, Device, Subtype};

pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
    published: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// An empty store.
    pub fn new() -> Self {
        let empty = Arc::new(Snapshot::empty());
        let (published, _) = watch::channel(Arc::clone(&empty));
        Self {
            current: ArcSwap::new(empty),
            published,
        }
    }

    /// Atomically replace the whole device set, returning the previous
    /// snapshot. Readers observe either the old or the new set in full.
    pub fn replace(&self, devices: Vec<Device>) -> Arc<Snapshot> {
        let previous = self.current.swap(Arc::new(Snapshot::new(devices)));
        self.publish();
        previous
    }

    /// O(1) lookup by composite id.
    pub fn get(&self, id: &CompositeId) -> Result<Arc<Device>, CoreError> {
        self.current
            .load()
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound { id: id.to_string() })
    }

    /// All devices of one subtype, ordered by id.
    pub fn get_by_type(&self, subtype: Subtype) -> Arc<[Arc<Device>]> {
        self.current.load().of_type_shared(subtype)
    }

    /// Rewrite one device copy-on-write and stamp its optimistic cooldown.
    ///
    /// The next [`replace`](Self::replace) overwrites the patch
    /// unconditionally.
    pub fn apply_optimistic(
        &self,
        id: &CompositeId,
        patch: impl Fn(&mut Device),
    ) -> Result<Arc<Device>, CoreError> {
        let until = Instant::now() + OPTIMISTIC_COOLDOWN;
        let stamped = |device: &mut Device| {
            patch(device);
            device.optimistic_until = Some(until);
        };

        let before = self.current.rcu(|snap| {
            snap.with_patch(id, &stamped)
                .map_or_else(|| Arc::clone(snap), Arc::new)
        });
        if !before.contains(id) {
            return Err(CoreError::NotFound { id: id.to_string() });
        }

        self.publish();
        self.get(id)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Receiver that observes every swap.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.published.subscribe()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Load under the channel lock so concurrent writers publish in
    /// swap order.
    fn publish(&self) {
        self.published.send_modify(|slot| *slot = self.current.load_full());
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::DeviceState;
    use crate::testing::{light, shade};

    #[test]
    fn replace_returns_previous() {
        let store = SnapshotStore::new();
        let prev = store.replace(vec![light(CompositeId::device(1), "A", 0)]);
        assert!(prev.is_empty());

        let prev = store.replace(vec![shade(CompositeId::device(2), "B", 0)]);
        assert!(prev.contains(&CompositeId::device(1)));
        assert!(store.get(&CompositeId::device(1)).is_err());
        assert_eq!(store.get_by_type(Subtype::Shade).len(), 1);
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = SnapshotStore::new();
        let err = store.get(&CompositeId::sensor(4)).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn optimistic_patch_is_visible_and_published() {
        let store = SnapshotStore::new();
        store.replace(vec![light(CompositeId::device(1), "A", 0)]);
        let mut rx = store.subscribe();

        let device = store
            .apply_optimistic(&CompositeId::device(1), |d| {
                d.state = DeviceState::Light { on: true, level: 65535 };
            })
            .unwrap();

        assert!(device.is_cooling_down());
        assert!(rx.has_changed().unwrap());
        let published = rx.borrow_and_update().clone();
        assert_eq!(
            published.get(&CompositeId::device(1)).unwrap().state,
            DeviceState::Light { on: true, level: 65535 }
        );
    }

    #[tokio::test]
    async fn replace_overwrites_optimistic_state() {
        let store = SnapshotStore::new();
        store.replace(vec![light(CompositeId::device(1), "A", 0)]);
        store
            .apply_optimistic(&CompositeId::device(1), |d| {
                d.state = DeviceState::Light { on: true, level: 65535 };
            })
            .unwrap();

        store.replace(vec![light(CompositeId::device(1), "A", 0)]);
        let device = store.get(&CompositeId::device(1)).unwrap();
        assert_eq!(device.state, DeviceState::Light { on: false, level: 0 });
        assert!(!device.is_cooling_down());
    }

    #[tokio::test]
    async fn optimistic_on_missing_device_changes_nothing() {
        let store = SnapshotStore::new();
        store.replace(vec![light(CompositeId::device(1), "A", 0)]);
        let before = store.snapshot();

        let result = store.apply_optimistic(&CompositeId::device(2), |_| {});
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }
}
