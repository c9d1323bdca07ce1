/// Failure to turn a texture source into RGBA8 pixels.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("failed to decode `{source_name}`")]
    Image {
        source_name: String,
        #[source]
        error: image::ImageError,
    },

    #[error("image `{0}` has zero width or height")]
    Empty(String),

    #[error("pixel buffer for a {width}x{height} image holds {actual} bytes, expected {expected}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Misuse of a resource reference, raised synchronously to the caller.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum ResourceError {
    #[error("texture `{label}` is not ready (state: {state})")]
    NotReady { label: String, state: &'static str },

    #[error("texture `{label}` failed to load: {reason}")]
    LoadFailed { label: String, reason: String },
}
