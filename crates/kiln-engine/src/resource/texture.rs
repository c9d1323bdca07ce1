use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::task::{Scheduler, Task, TaskError, TaskFlags, TaskStatus, WeakScheduler};

use super::{
    DecodedImage, GpuBackend, ImageDecoder, ImageFileDecoder, ResourceError, TextureHandle,
    TextureSettings, TextureSource,
};

/// Observable state of a texture reference.
///
/// `Ready` is terminal for the lifetime of the shared state.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TextureState {
    /// Nothing submitted yet.
    Pending,
    /// Decode task queued or running.
    Loading,
    /// Pixels decoded; GPU upload queued or running.
    Uploading,
    Ready(TextureHandle),
    /// Decoding failed under [`LoadFailurePolicy::Isolate`].
    Failed(String),
}

impl TextureState {
    pub fn is_ready(&self) -> bool {
        matches!(self, TextureState::Ready(_))
    }

    fn name(&self) -> &'static str {
        match self {
            TextureState::Pending => "pending",
            TextureState::Loading => "loading",
            TextureState::Uploading => "uploading",
            TextureState::Ready(_) => "ready",
            TextureState::Failed(_) => "failed",
        }
    }
}

/// What a decode failure does to the run.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum LoadFailurePolicy {
    /// The decode error propagates out of the task and stops the scheduler.
    #[default]
    Fatal,
    /// The reference moves to [`TextureState::Failed`] and the run continues.
    Isolate,
}

/// State block shared by every clone of a [`TextureRef`].
struct TextureShared {
    label: String,
    state: Mutex<TextureState>,
    backend: Arc<dyn GpuBackend>,
    scheduler: WeakScheduler,
}

impl TextureShared {
    /// Moves to `next` unless the texture is already ready.
    fn transition(&self, next: TextureState) {
        let mut state = self.state.lock();
        if state.is_ready() {
            log::warn!(
                "texture `{}` is ready; ignoring transition to {}",
                self.label,
                next.name()
            );
            return;
        }
        *state = next;
    }
}

impl Drop for TextureShared {
    /// Releasing the last reference never frees GPU memory inline: the delete
    /// call is only legal on the GPU thread, so a pinned destroy task is queued
    /// instead. Runs exactly once per shared state.
    fn drop(&mut self) {
        let TextureState::Ready(handle) = self.state.get_mut() else {
            return;
        };
        let handle = *handle;

        match self.scheduler.upgrade() {
            Some(scheduler) => {
                log::debug!("texture `{}` released; scheduling destroy", self.label);
                scheduler.submit(DestroyTextureTask {
                    label: std::mem::take(&mut self.label),
                    handle,
                    backend: self.backend.clone(),
                });
            }
            None => log::warn!(
                "texture `{}` released after its scheduler; GPU handle {} leaks with the backend",
                self.label,
                handle.raw()
            ),
        }
    }
}

/// Shared handle to a GPU texture that may not exist yet.
///
/// Cloning shares ownership; the GPU texture is destroyed once, after the last
/// clone (and every in-flight load task) has been dropped.
#[derive(Clone)]
pub struct TextureRef {
    shared: Arc<TextureShared>,
}

impl TextureRef {
    fn new(
        label: String,
        state: TextureState,
        backend: Arc<dyn GpuBackend>,
        scheduler: &Scheduler,
    ) -> Self {
        Self {
            shared: Arc::new(TextureShared {
                label,
                state: Mutex::new(state),
                backend,
                scheduler: scheduler.downgrade(),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    pub fn is_ready(&self) -> bool {
        self.shared.state.lock().is_ready()
    }

    pub fn state(&self) -> TextureState {
        self.shared.state.lock().clone()
    }

    /// Returns the GPU handle, or an error if the upload has not completed.
    pub fn handle(&self) -> Result<TextureHandle, ResourceError> {
        match &*self.shared.state.lock() {
            TextureState::Ready(handle) => Ok(*handle),
            TextureState::Failed(reason) => Err(ResourceError::LoadFailed {
                label: self.shared.label.clone(),
                reason: reason.clone(),
            }),
            other => Err(ResourceError::NotReady {
                label: self.shared.label.clone(),
                state: other.name(),
            }),
        }
    }

    /// Returns `true` if both references share one state block.
    pub fn ptr_eq(&self, other: &TextureRef) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for TextureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureRef")
            .field("label", &self.shared.label)
            .field("state", &self.shared.state.lock().name())
            .finish()
    }
}

/// Creates texture references and submits the tasks that populate them.
#[derive(Clone)]
pub struct TextureLoader {
    scheduler: Scheduler,
    backend: Arc<dyn GpuBackend>,
    decoder: Arc<dyn ImageDecoder>,
    settings: TextureSettings,
    failure_policy: LoadFailurePolicy,
}

impl TextureLoader {
    /// Loader decoding with [`ImageFileDecoder`] and default settings.
    pub fn new(scheduler: Scheduler, backend: Arc<dyn GpuBackend>) -> Self {
        Self {
            scheduler,
            backend,
            decoder: Arc::new(ImageFileDecoder),
            settings: TextureSettings::default(),
            failure_policy: LoadFailurePolicy::default(),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_settings(mut self, settings: TextureSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_failure_policy(mut self, policy: LoadFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Returns a reference immediately and queues its decode on a general
    /// worker; the upload follows on the GPU thread.
    pub fn load(&self, source: TextureSource) -> TextureRef {
        let texture = TextureRef::new(
            source.label(),
            TextureState::Loading,
            self.backend.clone(),
            &self.scheduler,
        );
        self.scheduler.submit(TextureLoadTask {
            shared: texture.shared.clone(),
            stage: LoadStage::Decode {
                source,
                decoder: self.decoder.clone(),
            },
            settings: self.settings,
            failure_policy: self.failure_policy,
        });
        texture
    }

    pub fn load_file(&self, path: impl Into<PathBuf>) -> TextureRef {
        self.load(TextureSource::File(path.into()))
    }

    /// Uploads already-decoded pixels; only the GPU stage runs.
    pub fn from_image(&self, label: impl Into<String>, image: DecodedImage) -> TextureRef {
        let texture = TextureRef::new(
            label.into(),
            TextureState::Uploading,
            self.backend.clone(),
            &self.scheduler,
        );
        self.scheduler.submit(TextureLoadTask {
            shared: texture.shared.clone(),
            stage: LoadStage::Upload { image },
            settings: self.settings,
            failure_policy: self.failure_policy,
        });
        texture
    }

    /// A reference that never loads; useful as a placeholder slot.
    pub fn pending(&self, label: impl Into<String>) -> TextureRef {
        TextureRef::new(
            label.into(),
            TextureState::Pending,
            self.backend.clone(),
            &self.scheduler,
        )
    }
}

enum LoadStage {
    Decode {
        source: TextureSource,
        decoder: Arc<dyn ImageDecoder>,
    },
    Upload {
        image: DecodedImage,
    },
    Finished,
}

/// Decode → upload chain for one texture.
///
/// The decode stage runs anywhere; it then advances to the upload stage and
/// returns `Continue`, which requeues the same task pinned to the GPU thread.
struct TextureLoadTask {
    shared: Arc<TextureShared>,
    stage: LoadStage,
    settings: TextureSettings,
    failure_policy: LoadFailurePolicy,
}

impl Task for TextureLoadTask {
    fn flags(&self) -> TaskFlags {
        match self.stage {
            LoadStage::Upload { .. } => TaskFlags::GPU_THREAD,
            LoadStage::Decode { .. } | LoadStage::Finished => TaskFlags::NONE,
        }
    }

    fn run(&mut self, _scheduler: &Scheduler) -> Result<TaskStatus, TaskError> {
        match std::mem::replace(&mut self.stage, LoadStage::Finished) {
            LoadStage::Decode { source, decoder } => match decoder.decode(&source) {
                Ok(image) => {
                    log::debug!(
                        "decoded `{}` ({}x{})",
                        self.shared.label,
                        image.width(),
                        image.height()
                    );
                    self.shared.transition(TextureState::Uploading);
                    self.stage = LoadStage::Upload { image };
                    Ok(TaskStatus::Continue)
                }
                Err(err) => match self.failure_policy {
                    LoadFailurePolicy::Fatal => {
                        self.stage = LoadStage::Decode { source, decoder };
                        Err(err.into())
                    }
                    LoadFailurePolicy::Isolate => {
                        log::warn!("texture `{}` failed to load: {err}", self.shared.label);
                        self.shared.transition(TextureState::Failed(err.to_string()));
                        Ok(TaskStatus::Done)
                    }
                },
            },
            LoadStage::Upload { image } => {
                match self.shared.backend.upload_texture(&image, &self.settings) {
                    Ok(handle) => {
                        self.shared.transition(TextureState::Ready(handle));
                        log::debug!("texture `{}` ready", self.shared.label);
                        Ok(TaskStatus::Done)
                    }
                    Err(err) => {
                        self.stage = LoadStage::Upload { image };
                        Err(err.into())
                    }
                }
            }
            LoadStage::Finished => Ok(TaskStatus::Done),
        }
    }

    fn name(&self) -> &str {
        match self.stage {
            LoadStage::Decode { .. } => "texture decode",
            LoadStage::Upload { .. } => "texture upload",
            LoadStage::Finished => "texture load",
        }
    }
}

/// Releases a GPU texture on the GPU thread.
struct DestroyTextureTask {
    label: String,
    handle: TextureHandle,
    backend: Arc<dyn GpuBackend>,
}

impl Task for DestroyTextureTask {
    fn flags(&self) -> TaskFlags {
        TaskFlags::GPU_THREAD
    }

    fn run(&mut self, _scheduler: &Scheduler) -> Result<TaskStatus, TaskError> {
        log::trace!("destroying texture `{}`", self.label);
        self.backend.destroy_texture(self.handle);
        Ok(TaskStatus::Done)
    }

    fn name(&self) -> &str {
        "texture destroy"
    }
}
