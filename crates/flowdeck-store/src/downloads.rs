use std::path::{Path, PathBuf};

use tracing::info;

use flowdeck_core::error::{FlowdeckError, Result};
use flowdeck_core::traits::DownloadSink;

/// Delivers downloads as files in a directory.
pub struct FileDownloads {
    dir: PathBuf,
}

impl FileDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for FileDownloads {
    fn deliver(&self, file_name: &str, contents: &str) -> Result<()> {
        // File names come from user-editable workflow names
        if file_name.contains(['/', '\\']) || file_name == ".." {
            return Err(FlowdeckError::Download {
                file: file_name.to_string(),
                message: "file name must not contain path separators".into(),
            });
        }

        let download_err = |e: std::io::Error| FlowdeckError::Download {
            file: file_name.to_string(),
            message: e.to_string(),
        };

        std::fs::create_dir_all(&self.dir).map_err(download_err)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, contents).map_err(download_err)?;

        info!(path = %path.display(), "Download written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_file_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileDownloads::new(dir.path().join("downloads"));
        sink.deliver("My_Flow.json", "{}").unwrap();
        let written = std::fs::read_to_string(dir.path().join("downloads/My_Flow.json")).unwrap();
        assert_eq!(written, "{}");
    }

    #[test]
    fn test_rejects_path_separators() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileDownloads::new(dir.path());
        let err = sink.deliver("../escape.json", "{}").unwrap_err();
        assert!(matches!(err, FlowdeckError::Download { .. }));
    }
}
