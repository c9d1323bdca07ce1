//! Reference-counted GPU textures that load asynchronously.
//!
//! A [`TextureLoader`] hands out [`TextureRef`]s immediately and fills them in
//! through scheduler tasks: decoding on any worker, upload and destroy on the
//! GPU thread.

mod backend;
mod decode;
mod error;
mod texture;

pub use backend::{FilterMode, GpuBackend, TextureHandle, TextureSettings, WrapMode};
pub use decode::{DecodedImage, ImageDecoder, ImageFileDecoder, TextureSource};
pub use error::{DecodeError, ResourceError};
pub use texture::{LoadFailurePolicy, TextureLoader, TextureRef, TextureState};
