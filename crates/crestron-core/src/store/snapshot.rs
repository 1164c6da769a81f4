// ── Immutable device snapshot ──

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::model::{CompositeId, Device, Namespace, Subtype};

/// The full device set from one poll, indexed two ways.
///
/// `by_id` and `by_type` are always built together from the same device
/// list and never updated in place. `by_type` sequences are ordered by
/// composite id.
#[derive(Debug, Clone)]
pub struct Snapshot {
    by_id: HashMap<CompositeId, Arc<Device>>,
    by_type: HashMap<Subtype, Arc<[Arc<Device>]>>,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            by_id: HashMap::new(),
            by_type: HashMap::new(),
            taken_at: Utc::now(),
        }
    }

    /// Index a device list. On a duplicate id the later record wins.
    pub fn new(devices: impl IntoIterator<Item = Device>) -> Self {
        let mut by_id = HashMap::new();
        for device in devices {
            let id = device.id;
            if by_id.insert(id, Arc::new(device)).is_some() {
                warn!(%id, "duplicate device id in snapshot, keeping the later record");
            }
        }
        Self::index(by_id, Utc::now())
    }

    fn index(by_id: HashMap<CompositeId, Arc<Device>>, taken_at: DateTime<Utc>) -> Self {
        let mut grouped: HashMap<Subtype, Vec<Arc<Device>>> = HashMap::new();
        for device in by_id.values() {
            grouped
                .entry(device.subtype)
                .or_default()
                .push(Arc::clone(device));
        }

        let by_type = grouped
            .into_iter()
            .map(|(subtype, mut devices)| {
                devices.sort_by_key(|d| d.id);
                (subtype, Arc::from(devices))
            })
            .collect();

        Self {
            by_id,
            by_type,
            taken_at,
        }
    }

    pub fn get(&self, id: &CompositeId) -> Option<&Arc<Device>> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &CompositeId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Devices of one subtype, ordered by id.
    pub fn of_type(&self, subtype: Subtype) -> &[Arc<Device>] {
        self.by_type.get(&subtype).map(|d| &**d).unwrap_or(&[])
    }

    /// Shared handle to the same ordered sequence.
    pub fn of_type_shared(&self, subtype: Subtype) -> Arc<[Arc<Device>]> {
        self.by_type
            .get(&subtype)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Every device, ordered by id.
    pub fn devices(&self) -> Vec<Arc<Device>> {
        let mut all: Vec<_> = self.by_id.values().cloned().collect();
        all.sort_by_key(|d| d.id);
        all
    }

    pub fn in_namespace(&self, namespace: Namespace) -> impl Iterator<Item = &Arc<Device>> {
        self.by_id
            .values()
            .filter(move |d| d.id.namespace() == namespace)
    }

    pub fn ids(&self) -> impl Iterator<Item = &CompositeId> {
        self.by_id.keys()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// A copy with one device rewritten by `patch`, or `None` if `id` is
    /// absent. Only the patched device's subtype sequence is rebuilt.
    pub(crate) fn with_patch(&self, id: &CompositeId, patch: &dyn Fn(&mut Device)) -> Option<Self> {
        let current = self.by_id.get(id)?;
        let mut device = Device::clone(current);
        patch(&mut device);
        let device = Arc::new(device);
        let subtype = device.subtype;

        let mut by_id = self.by_id.clone();
        by_id.insert(*id, Arc::clone(&device));

        let mut by_type = self.by_type.clone();
        if let Some(seq) = by_type.get_mut(&subtype) {
            let rebuilt: Vec<_> = seq
                .iter()
                .map(|d| if d.id == *id { Arc::clone(&device) } else { Arc::clone(d) })
                .collect();
            *seq = Arc::from(rebuilt);
        }

        Some(Self {
            by_id,
            by_type,
            taken_at: self.taken_at,
        })
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
