use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use snafu::prelude::*;

use super::{BoxedReader, FileMetadataSnafu, MultipartError, NotAFileSnafu, StreamSource};

/// Streams part content from a file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Checks that `path` is a regular file and returns it with its length.
    pub(crate) fn inspect(path: PathBuf) -> Result<(Self, u64), MultipartError> {
        let metadata = std::fs::metadata(&path).context(FileMetadataSnafu { path: &path })?;
        ensure!(metadata.is_file(), NotAFileSnafu { path });

        Ok((Self { path }, metadata.len()))
    }

    /// The file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

impl StreamSource for FileSource {
    fn open(&self) -> BoxFuture<'_, std::io::Result<BoxedReader>> {
        Box::pin(async move {
            let file = tokio::fs::File::open(&self.path).await?;
            Ok(Box::pin(file) as BoxedReader)
        })
    }
}
