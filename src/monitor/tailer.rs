//! Incremental log file tailer.
//!
//! Reads complete lines appended to a text file since the last read.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

use super::error::MonitorError;

/// Incremental line reader that tracks its byte offset.
///
/// Only newline-terminated lines are returned. A trailing partial line is
/// left for the next read, so a line written in two chunks is seen whole.
#[derive(Debug)]
pub struct LogTailer {
    /// Path to the log file.
    path: PathBuf,
    /// Offset just past the last consumed newline.
    offset: u64,
}

impl LogTailer {
    /// Create a new tailer for the given path.
    ///
    /// Starts at offset 0 (beginning of file).
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path, offset: 0 }
    }

    /// Get the current byte offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Get the path being tailed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the offset to the current end of the file.
    ///
    /// # Errors
    ///
    /// Same conditions as [`LogTailer::read_new_lines`] for opening the file.
    pub async fn seek_to_end(&mut self) -> Result<(), MonitorError> {
        let file = self.open().await?;
        self.offset = file.metadata().await?.len();
        Ok(())
    }

    /// Read complete lines appended since the last read.
    ///
    /// Lines are returned without their terminator; invalid UTF-8 is replaced.
    /// The offset only moves once the whole read has succeeded, so a failed
    /// read leaves it where it was.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist ([`MonitorError::FileMissing`])
    /// - The file cannot be opened ([`MonitorError::PermissionDenied`])
    /// - The path is not a regular file, or I/O errors occur during reading
    ///
    /// If the file is truncated (smaller than our offset), the offset is
    /// reset to 0 and reading starts from the beginning.
    pub async fn read_new_lines(&mut self) -> Result<Vec<String>, MonitorError> {
        let mut file = self.open().await?;

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(MonitorError::Io(std::io::Error::other(format!(
                "{} is not a regular file",
                self.path.display()
            ))));
        }

        // Check for truncation
        let file_len = metadata.len();
        let mut offset = self.offset;

        // Detect truncation (file is now smaller than our offset)
        if file_len < offset {
            tracing::warn!(
                path = %self.path.display(),
                old_offset = offset,
                new_len = file_len,
                "Log truncated or rotated, resetting offset to 0"
            );
            offset = 0;
        }

        // If file hasn't grown, no new lines
        if file_len == offset {
            self.offset = offset;
            return Ok(Vec::new());
        }

        file.seek(std::io::SeekFrom::Start(offset)).await?;

        let mut reader = BufReader::new(file);
        let mut lines = Vec::new();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let bytes_read = reader.read_until(b'\n', &mut buf).await?;

            // EOF, or a partial line still being written
            if bytes_read == 0 || buf.last() != Some(&b'\n') {
                break;
            }

            offset += bytes_read as u64;

            let line = String::from_utf8_lossy(&buf);
            lines.push(line.trim_end_matches(['\r', '\n']).to_string());
        }

        self.offset = offset;
        Ok(lines)
    }

    async fn open(&self) -> Result<File, MonitorError> {
        match File::open(&self.path).await {
            Ok(f) => Ok(f),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MonitorError::FileMissing(self.path.clone()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(MonitorError::PermissionDenied(self.path.clone()))
            }
            Err(e) => Err(MonitorError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_tailer_reads_initial_content() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[2024:01:01:10:00:00]: Info: starting").unwrap();
        writeln!(file, "[2024:01:01:10:00:01]: Info: CLIENT CONNECTED").unwrap();
        file.flush().unwrap();

        let mut tailer = LogTailer::new(file.path().to_path_buf());
        let lines = tailer.read_new_lines().await.unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "[2024:01:01:10:00:01]: Info: CLIENT CONNECTED");
        assert_eq!(tailer.offset(), file.as_file().metadata().unwrap().len());
    }

    #[tokio::test]
    async fn test_tailer_reads_only_new_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "first").unwrap();
        file.flush().unwrap();

        let mut tailer = LogTailer::new(file.path().to_path_buf());

        let lines1 = tailer.read_new_lines().await.unwrap();
        assert_eq!(lines1, vec!["first"]);
        let offset_after_first = tailer.offset();
        assert_eq!(offset_after_first, 6);

        // No new content - should return empty
        let lines2 = tailer.read_new_lines().await.unwrap();
        assert!(lines2.is_empty());
        assert_eq!(tailer.offset(), offset_after_first);

        writeln!(file, "second").unwrap();
        writeln!(file, "third").unwrap();
        file.flush().unwrap();

        // Should only get the new lines
        let lines3 = tailer.read_new_lines().await.unwrap();
        assert_eq!(lines3, vec!["second", "third"]);
        assert!(tailer.offset() > offset_after_first);
    }

    #[tokio::test]
    async fn test_tailer_defers_partial_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "complete").unwrap();
        write!(file, "CLIENT CONN").unwrap();
        file.flush().unwrap();

        let mut tailer = LogTailer::new(file.path().to_path_buf());
        assert_eq!(tailer.read_new_lines().await.unwrap(), vec!["complete"]);
        assert_eq!(tailer.offset(), 9);

        writeln!(file, "ECTED").unwrap();
        file.flush().unwrap();

        assert_eq!(
            tailer.read_new_lines().await.unwrap(),
            vec!["CLIENT CONNECTED"]
        );
    }

    #[tokio::test]
    async fn test_tailer_strips_crlf_and_replaces_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"windows line\r\n").unwrap();
        file.write_all(b"bad \xff byte\n").unwrap();
        file.flush().unwrap();

        let mut tailer = LogTailer::new(file.path().to_path_buf());
        let lines = tailer.read_new_lines().await.unwrap();
        assert_eq!(lines[0], "windows line");
        assert_eq!(lines[1], "bad \u{fffd} byte");
    }

    #[tokio::test]
    async fn test_tailer_handles_truncation() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        {
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "a fairly long line before rotation").unwrap();
            writeln!(f, "another fairly long line before rotation").unwrap();
        }

        let mut tailer = LogTailer::new(path.clone());
        assert_eq!(tailer.read_new_lines().await.unwrap().len(), 2);
        let old_offset = tailer.offset();

        // Truncate file (simulate log rotation)
        {
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "CLIENT CONNECTED").unwrap();
        }

        let lines = tailer.read_new_lines().await.unwrap();
        assert_eq!(lines, vec!["CLIENT CONNECTED"]);
        assert!(tailer.offset() < old_offset);
    }

    #[tokio::test]
    async fn test_tailer_handles_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunshine.log");
        std::fs::write(&path, "CLIENT CONNECTED\n").unwrap();

        let mut tailer = LogTailer::new(path.clone());
        tailer.read_new_lines().await.unwrap();
        assert_eq!(tailer.offset(), 17);

        std::fs::remove_file(&path).unwrap();
        let result = tailer.read_new_lines().await;
        assert!(matches!(result, Err(MonitorError::FileMissing(_))));
        assert_eq!(tailer.offset(), 17);
    }

    #[tokio::test]
    async fn test_tailer_read_error_keeps_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sunshine.log");
        std::fs::write(&path, "CLIENT CONNECTED\n").unwrap();

        let mut tailer = LogTailer::new(path.clone());
        tailer.read_new_lines().await.unwrap();
        assert_eq!(tailer.offset(), 17);

        // Opens fine, but cannot be read as a log.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let result = tailer.read_new_lines().await;
        assert!(matches!(result, Err(MonitorError::Io(_))));
        assert_eq!(tailer.offset(), 17);
    }

    #[tokio::test]
    async fn test_seek_to_end_skips_history() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "CLIENT CONNECTED").unwrap();
        file.flush().unwrap();

        let mut tailer = LogTailer::new(file.path().to_path_buf());
        tailer.seek_to_end().await.unwrap();
        assert!(tailer.read_new_lines().await.unwrap().is_empty());

        writeln!(file, "CLIENT DISCONNECTED").unwrap();
        file.flush().unwrap();
        assert_eq!(
            tailer.read_new_lines().await.unwrap(),
            vec!["CLIENT DISCONNECTED"]
        );
    }
}
