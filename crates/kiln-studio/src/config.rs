use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, ensure};

/// Demo settings, read from `KILN_*` environment variables and the command
/// line (each argument is a texture path).
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub frames: u64,
    pub width: u32,
    pub height: u32,
    /// Keep rendering when a texture fails to decode.
    pub isolate_failures: bool,
    pub textures: Vec<PathBuf>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            frames: 120,
            width: 1280,
            height: 720,
            isolate_failures: false,
            textures: Vec::new(),
        }
    }
}

impl StudioConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Self {
            frames: env_or("KILN_FRAMES", defaults.frames)?,
            width: env_or("KILN_WIDTH", defaults.width)?,
            height: env_or("KILN_HEIGHT", defaults.height)?,
            isolate_failures: env_or("KILN_ISOLATE_FAILURES", defaults.isolate_failures)?,
            textures: std::env::args_os().skip(1).map(PathBuf::from).collect(),
        }
        .validated()
    }

    fn validated(self) -> Result<Self> {
        ensure!(self.frames > 0, "KILN_FRAMES must be at least 1");
        ensure!(
            self.width > 0 && self.height > 0,
            "KILN_WIDTH and KILN_HEIGHT must be non-zero (got {}x{})",
            self.width,
            self.height
        );
        Ok(self)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => parse_value(key, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value `{value}` for {key}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_trimmed_and_parsed() {
        assert_eq!(parse_value::<u64>("KILN_FRAMES", " 30 ").unwrap(), 30);
        assert!(parse_value::<bool>("KILN_ISOLATE_FAILURES", "true").unwrap());
    }

    #[test]
    fn zero_frames_are_rejected() {
        let config = StudioConfig {
            frames: 0,
            ..StudioConfig::default()
        };
        let err = config.validated().unwrap_err();
        assert!(err.to_string().contains("KILN_FRAMES"));
    }

    #[test]
    fn zero_sized_display_is_rejected() {
        let config = StudioConfig {
            height: 0,
            ..StudioConfig::default()
        };
        assert!(config.validated().is_err());
        assert!(StudioConfig::default().validated().is_ok());
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = parse_value::<u32>("KILN_WIDTH", "wide").unwrap_err();
        assert!(err.to_string().contains("KILN_WIDTH"));
    }
}
