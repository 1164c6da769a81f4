// ── Snapshot storage ──
//
// Immutable `Snapshot` values swapped wholesale by the poll loop and
// patched copy-on-write by the command gateway.

mod snapshot;
mod snapshot_store;

pub use snapshot::Snapshot;
pub use snapshot_store::SnapshotStore;
