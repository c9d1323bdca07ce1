use std::fmt;

/// Error codes reported alongside a GPU failure.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GpuErrorCode {
    InvalidValue,
    InvalidOperation,
    InvalidFramebufferOperation,
    OutOfMemory,
    DeviceLost,
}

impl GpuErrorCode {
    /// Code for an error captured from a wgpu error scope.
    pub fn from_wgpu(error: &wgpu::Error) -> Self {
        match error {
            wgpu::Error::OutOfMemory { .. } => GpuErrorCode::OutOfMemory,
            wgpu::Error::Validation { .. } | wgpu::Error::Internal { .. } => {
                GpuErrorCode::InvalidOperation
            }
        }
    }
}

/// A failed GPU call plus every error code that was outstanding at the time.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GpuError {
    context: String,
    codes: Vec<GpuErrorCode>,
}

impl GpuError {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            codes: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: GpuErrorCode) -> Self {
        self.codes.push(code);
        self
    }

    pub fn with_codes(mut self, codes: impl IntoIterator<Item = GpuErrorCode>) -> Self {
        self.codes.extend(codes);
        self
    }

    /// Folds everything captured while running `context` into one error.
    ///
    /// Returns `None` when wgpu reported nothing and the device is still alive.
    pub fn from_captured(
        context: &str,
        captured: impl IntoIterator<Item = wgpu::Error>,
        device_lost: Option<&str>,
    ) -> Option<Self> {
        let captured: Vec<wgpu::Error> = captured.into_iter().collect();
        if captured.is_empty() && device_lost.is_none() {
            return None;
        }

        let mut messages: Vec<String> = captured.iter().map(ToString::to_string).collect();
        if let Some(reason) = device_lost {
            messages.push(format!("device lost: {reason}"));
        }
        let error = GpuError::new(format!("{context}: {}", messages.join("; ")))
            .with_codes(captured.iter().map(GpuErrorCode::from_wgpu))
            .with_codes(device_lost.map(|_| GpuErrorCode::DeviceLost));
        Some(error)
    }

    /// Prefixes the message with where the call happened (e.g. a pass name).
    pub fn within(mut self, scope: &str) -> Self {
        self.context = format!("{scope}: {}", self.context);
        self
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn codes(&self) -> &[GpuErrorCode] {
        &self.codes
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.context)?;
        if let Some((first, rest)) = self.codes.split_first() {
            write!(f, " (gpu error codes: {first:?}")?;
            for code in rest {
                write!(f, ", {code:?}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl std::error::Error for GpuError {}
