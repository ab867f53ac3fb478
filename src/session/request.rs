use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::export::ExportConfig;
use crate::encode::settings::FileType;
use crate::foundation::error::{TranscodeError, TranscodeResult};
use crate::media::asset::Asset;

/// Everything a caller supplies for one export.
///
/// Fields are optional so an incomplete request can be represented; a session refuses to start
/// until [`ExportRequest::validate`] passes.
#[derive(Clone, Default)]
pub struct ExportRequest {
    /// Source media.
    pub asset: Option<Arc<dyn Asset>>,
    /// Destination file.
    pub output_path: Option<PathBuf>,
    /// Output container kind.
    pub file_type: Option<FileType>,
    /// Caller configuration mapping.
    pub config: ExportConfig,
}

impl std::fmt::Debug for ExportRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportRequest")
            .field("asset", &self.asset.as_ref().map(|_| "<asset>"))
            .field("output_path", &self.output_path)
            .field("file_type", &self.file_type)
            .field("config", &self.config)
            .finish()
    }
}

/// Borrowed view of a request that passed validation.
#[derive(Clone, Copy)]
pub(crate) struct ExportTarget<'a> {
    pub(crate) asset: &'a dyn Asset,
    pub(crate) output_path: &'a Path,
    pub(crate) file_type: FileType,
}

impl ExportRequest {
    /// Request for `asset` written to `output_path` as MP4 with default configuration.
    pub fn new(asset: Arc<dyn Asset>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            asset: Some(asset),
            output_path: Some(output_path.into()),
            file_type: Some(FileType::Mp4),
            config: ExportConfig::default(),
        }
    }

    /// Replace the output container kind.
    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.file_type = Some(file_type);
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    /// Check that asset, destination and container kind are present and the config is valid.
    pub fn validate(&self) -> TranscodeResult<()> {
        self.target().map(|_| ())
    }

    pub(crate) fn target(&self) -> TranscodeResult<ExportTarget<'_>> {
        let asset = self
            .asset
            .as_deref()
            .ok_or_else(|| TranscodeError::validation("export request has no source asset"))?;
        let output_path = self
            .output_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| TranscodeError::validation("export request has no output path"))?;
        let file_type = self
            .file_type
            .ok_or_else(|| TranscodeError::validation("export request has no output file type"))?;
        self.config.validate()?;
        Ok(ExportTarget {
            asset,
            output_path,
            file_type,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/request.rs"]
mod tests;
