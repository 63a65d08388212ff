//! Filesystem convenience wrappers over the transfer orchestrators (SPEC_FULL.md §4.7).
//!
//! Trims the teacher's `fs.rs`, which hand-rolled its own chunking, hashing, and a
//! sequential (`// TODO: parallel`) large-file loop. All of that now lives once in
//! [`crate::upload`]/[`crate::download`]; this module only turns a filesystem path into a
//! [`Source`]/[`Sink`] and calls through.

use std::path::Path;

use crate::download::{self, DownloadIdentifier, DownloadOptions};
use crate::error::B2Error;
use crate::models;
use crate::progress::ProgressSink;
use crate::session::Client;
use crate::sink::FileSink;
use crate::source::Source;
use crate::upload::{self, UploadOptions};

impl Client {
    /// Uploads the file at `path` to `bucket_id`, choosing the single-shot or large-file
    /// path by size exactly as [`crate::upload::upload`] does.
    ///
    /// If `options.file_name` is left empty, the source path's file name is used.
    pub async fn upload_from_path(
        &self,
        path: impl AsRef<Path>,
        bucket_id: &str,
        mut options: UploadOptions,
        progress: &dyn ProgressSink,
    ) -> Result<models::B2FileInfo, B2Error> {
        let path = path.as_ref();

        if options.file_name.is_empty() {
            options.file_name = path.file_name().ok_or(B2Error::MissingFileName)?.to_string_lossy().into_owned();
        }

        let source = Source::from_path(path);
        upload::upload(self, bucket_id, &source, &options, progress).await
    }

    /// Downloads the file named by `identifier` into a new file at `path`, choosing the
    /// direct-stream or ranged-part path by size exactly as [`crate::download::download`]
    /// does.
    pub async fn download_to_path(
        &self,
        identifier: &DownloadIdentifier,
        path: impl AsRef<Path>,
        options: DownloadOptions,
        progress: &dyn ProgressSink,
    ) -> Result<String, B2Error> {
        let sink = FileSink::create(path).await?;
        download::download(self, identifier, &sink, &options, progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_defaults_from_path_when_unset() {
        let path = Path::new("/tmp/some/dir/report.csv");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, "report.csv");
    }
}
