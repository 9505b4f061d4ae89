use parking_lot::RwLock;
use stargazer_data::ScanPoint;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Shared {
    points: RwLock<Vec<ScanPoint>>,
    generation: AtomicU64,
}

/// Append-only point cloud in acquisition order.
///
/// Only the scan controller holds the store. Renderers get a
/// [`PointCloudReader`] and may read at any time.
#[derive(Default)]
pub struct PointCloudStore {
    shared: Arc<Shared>,
}

impl PointCloudStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reader(&self) -> PointCloudReader {
        PointCloudReader {
            shared: Arc::clone(&self.shared),
        }
    }

    pub(crate) fn push(&self, point: ScanPoint) {
        self.shared.points.write().push(point);
    }

    pub(crate) fn clear(&self) {
        let mut points = self.shared.points.write();
        points.clear();
        self.shared.generation.fetch_add(1, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.shared.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct PointCloudReader {
    shared: Arc<Shared>,
}

impl PointCloudReader {
    pub fn snapshot(&self) -> Vec<ScanPoint> {
        self.shared.points.read().clone()
    }

    /// Points appended after the first `offset` ones.
    pub fn since(&self, offset: usize) -> Vec<ScanPoint> {
        let points = self.shared.points.read();
        points.get(offset..).map(<[_]>::to_vec).unwrap_or_default()
    }

    /// Bumped on every clear. An incremental reader holding an offset must
    /// start over when this changes.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.shared.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
