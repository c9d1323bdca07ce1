use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use parking_lot::RwLock;

use crate::resource::TextureRef;

/// Camera matrices as uploaded to the GPU (column-major).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Camera {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

impl Camera {
    const IDENTITY_MATRIX: [[f32; 4]; 4] = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    pub const IDENTITY: Self = Self {
        view: Self::IDENTITY_MATRIX,
        projection: Self::IDENTITY_MATRIX,
    };

    /// Raw bytes suitable for a uniform buffer write.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Identifies a material; batches are drawn in ascending key order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MaterialKey(pub u32);

/// A contiguous run of indices in the shared geometry buffers.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawRange {
    pub first: u32,
    pub count: u32,
}

impl DrawRange {
    #[inline]
    pub const fn new(first: u32, count: u32) -> Self {
        Self { first, count }
    }
}

/// Draws sharing one material and its textures.
#[derive(Debug, Clone)]
pub struct MaterialBatch {
    material: MaterialKey,
    textures: Vec<TextureRef>,
    draws: Vec<DrawRange>,
}

impl MaterialBatch {
    pub fn material(&self) -> MaterialKey {
        self.material
    }

    pub fn textures(&self) -> &[TextureRef] {
        &self.textures
    }

    pub fn draws(&self) -> &[DrawRange] {
        &self.draws
    }

    /// A batch can be drawn once every texture it samples has been uploaded.
    pub fn is_ready(&self) -> bool {
        self.textures.iter().all(TextureRef::is_ready)
    }

    pub fn index_count(&self) -> u64 {
        self.draws.iter().map(|d| u64::from(d.count)).sum()
    }
}

/// Index of a batch inside a [`Scene`], stable until the next `clear`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BatchId(usize);

/// Read-only input to scene steps: camera plus material batches.
///
/// Batches are kept sorted by material; batches sharing a material stay in
/// insertion order.
#[derive(Debug, Default)]
pub struct Scene {
    camera: Camera,
    batches: Vec<MaterialBatch>,
    order: Vec<usize>,
}

/// Scene shared between the thread that edits it and the frame task.
pub type SharedScene = Arc<RwLock<Scene>>;

impl Scene {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedScene {
        Arc::new(RwLock::new(self))
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Adds an empty batch for `material` sampling `textures`.
    pub fn add_batch(&mut self, material: MaterialKey, textures: Vec<TextureRef>) -> BatchId {
        let id = self.batches.len();
        self.batches.push(MaterialBatch {
            material,
            textures,
            draws: Vec::new(),
        });

        let batches = &self.batches;
        let at = self
            .order
            .partition_point(|&i| batches[i].material <= material);
        self.order.insert(at, id);

        BatchId(id)
    }

    /// Appends a draw to a batch. Unknown ids are ignored.
    pub fn push_draw(&mut self, batch: BatchId, range: DrawRange) {
        match self.batches.get_mut(batch.0) {
            Some(batch) => batch.draws.push(range),
            None => log::warn!("push_draw on unknown batch {}", batch.0),
        }
    }

    /// Removes every batch. Keeps allocated capacity for reuse.
    pub fn clear(&mut self) {
        self.batches.clear();
        self.order.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Iterates batches in draw order.
    pub fn batches(&self) -> impl Iterator<Item = &MaterialBatch> {
        self.order.iter().map(|&i| &self.batches[i])
    }

    /// Iterates drawable batches in draw order, skipping any whose textures
    /// are still loading.
    pub fn ready_batches(&self) -> impl Iterator<Item = &MaterialBatch> {
        self.batches().filter(|batch| batch.is_ready())
    }

    pub fn draw_count(&self) -> usize {
        self.batches.iter().map(|b| b.draws.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::resource::{DecodedImage, TextureLoader};
    use crate::task::{Scheduler, StopTask, TaskFlags, WorkerCount};
    use crate::test_utils::RecordingBackend;

    fn materials(scene: &Scene) -> Vec<u32> {
        scene.batches().map(|b| b.material().0).collect()
    }

    // ── ordering ──────────────────────────────────────────────────────────

    #[test]
    fn batches_are_sorted_by_material_then_insertion() {
        let mut scene = Scene::new();
        let a = scene.add_batch(MaterialKey(3), Vec::new());
        scene.add_batch(MaterialKey(1), Vec::new());
        let c = scene.add_batch(MaterialKey(3), Vec::new());
        scene.add_batch(MaterialKey(2), Vec::new());

        scene.push_draw(a, DrawRange::new(0, 6));
        scene.push_draw(c, DrawRange::new(6, 3));

        assert_eq!(materials(&scene), vec![1, 2, 3, 3]);
        let last_two: Vec<_> = scene.batches().skip(2).map(|b| b.index_count()).collect();
        assert_eq!(last_two, vec![6, 3]);
        assert_eq!(scene.draw_count(), 2);
    }

    #[test]
    fn clear_resets_batches() {
        let mut scene = Scene::new();
        scene.add_batch(MaterialKey(0), Vec::new());
        scene.clear();
        assert!(scene.is_empty());
        assert_eq!(scene.batches().count(), 0);
    }

    // ── readiness ─────────────────────────────────────────────────────────

    #[test]
    fn ready_batches_skip_loading_textures() {
        let scheduler = Scheduler::default();
        scheduler.start(WorkerCount::Exact(0)).unwrap();
        let loader = TextureLoader::new(scheduler.clone(), Arc::new(RecordingBackend::default()));

        let uploaded = loader.from_image("white", DecodedImage::solid(1, 1, [255; 4]));
        let slot = loader.pending("slot");

        let mut scene = Scene::new();
        scene.add_batch(MaterialKey(0), vec![uploaded.clone()]);
        scene.add_batch(MaterialKey(1), vec![uploaded, slot]);
        scene.add_batch(MaterialKey(2), Vec::new());

        assert_eq!(
            scene.ready_batches().map(|b| b.material().0).collect::<Vec<_>>(),
            vec![2]
        );

        scheduler.submit(StopTask::with_flags(TaskFlags::NONE));
        scheduler.become_worker(TaskFlags::GPU_THREAD);

        assert_eq!(
            scene.ready_batches().map(|b| b.material().0).collect::<Vec<_>>(),
            vec![0, 2]
        );
        scheduler.stop(true).unwrap();
    }

    // ── camera ────────────────────────────────────────────────────────────

    #[test]
    fn camera_bytes_match_uniform_layout() {
        let camera = Camera::IDENTITY;
        assert_eq!(camera.as_bytes().len(), 2 * 16 * std::mem::size_of::<f32>());
        assert_eq!(&camera.as_bytes()[..4], &1.0_f32.to_ne_bytes());
    }
}
