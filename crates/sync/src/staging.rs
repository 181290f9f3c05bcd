//! Private working copy of the delivered file.
//!
//! The source file is copied before any read so a concurrent redelivery
//! cannot change it mid-run. The copy lives in a `NamedTempFile`, so it is
//! removed on drop — on every exit path, success or failure.

use std::fs::File;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::SyncError;

/// A staged copy of the input file, removed when dropped.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
}

impl StagedFile {
    /// Copy `source` into a fresh temporary file.
    pub fn stage(source: &Path) -> Result<Self, SyncError> {
        let file = tempfile::Builder::new()
            .prefix("roster-sync-")
            .suffix(".csv")
            .tempfile()
            .map_err(|err| SyncError::Staging {
                path: source.to_path_buf(),
                source: err,
            })?;
        std::fs::copy(source, file.path()).map_err(|err| SyncError::Staging {
            path: source.to_path_buf(),
            source: err,
        })?;
        Ok(Self { file })
    }

    /// Path of the working copy.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Open a CSV reader over the working copy. Called once per pass; a
    /// fresh reader is the rewind.
    pub fn reader(&self) -> Result<csv::Reader<File>, SyncError> {
        Ok(csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(self.path())?)
    }
}

// -----------------------------------------------------------------------------
// tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert_matches::assert_matches;

    use super::*;
    use crate::error::SyncError;

    #[test]
    fn stages_a_copy_and_removes_it_on_drop() {
        let mut source = NamedTempFile::new().unwrap();
        writeln!(source, "id,email").unwrap();
        writeln!(source, "1,a@example.com").unwrap();
        source.flush().unwrap();

        let staged = StagedFile::stage(source.path()).unwrap();
        let copy_path = staged.path().to_path_buf();
        assert_ne!(copy_path, source.path());
        assert!(copy_path.exists());

        let mut reader = staged.reader().unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["id", "email"]);

        drop(staged);
        assert!(!copy_path.exists());
    }

    #[test]
    fn missing_source_is_a_staging_error() {
        let err = StagedFile::stage(Path::new("/nonexistent/input.csv")).unwrap_err();
        assert_matches!(err, SyncError::Staging { .. });
    }

    #[test]
    fn reader_survives_source_mutation_after_staging() {
        let mut source = NamedTempFile::new().unwrap();
        writeln!(source, "id").unwrap();
        writeln!(source, "42").unwrap();
        source.flush().unwrap();

        let staged = StagedFile::stage(source.path()).unwrap();
        std::fs::write(source.path(), "id\n999\n").unwrap();

        let mut reader = staged.reader().unwrap();
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "42");
    }
}
