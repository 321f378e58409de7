//! `multipart/form-data` request construction.
//!
//! Builds a POST body from an ordered sequence of file descriptors plus
//! optional scalar fields. Files are written first, in the order given;
//! fields follow in their given order; the terminating boundary closes the
//! body. The first failure aborts construction and the partial body is
//! discarded, so no half-written request ever reaches the caller.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use rand::RngCore;

use crate::error::{Error, Result};
use crate::request::Request;

/// Descriptor for one file part.
///
/// `fieldname` and `path` are required and must be non-empty; `filename`
/// defaults to the base name of `path`.
#[derive(Debug, Clone, Default)]
pub struct FilePart {
    pub fieldname: String,
    pub path: PathBuf,
    pub filename: Option<String>,
}

impl FilePart {
    pub fn new(fieldname: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            fieldname: fieldname.into(),
            path: path.into(),
            filename: None,
        }
    }

    /// Override the filename reported inside the part header.
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

impl Request {
    /// Construct a POST request with a `multipart/form-data` body.
    ///
    /// File descriptors are processed in order; on the first failure (missing
    /// descriptor fields, unreadable file, I/O error) construction aborts and
    /// the error propagates. Scalar fields are written only after every file
    /// succeeded. The resulting request carries the boundary-qualified
    /// Content-Type and the default identification header.
    pub fn multipart(url: &str, files: &[FilePart], fields: &[(&str, &str)]) -> Result<Request> {
        let mut writer = MultipartWriter::new();

        for part in files {
            writer.write_file(part)?;
        }
        for (name, value) in fields {
            writer.write_field(name, value);
        }

        let content_type = writer.content_type();
        let body = writer.finish();

        let mut request = Request::new("POST", url, Some(Bytes::from(body)), None)?;
        request.set_header("Content-Type", &content_type);
        Ok(request)
    }
}

/// In-memory multipart/form-data writer.
struct MultipartWriter {
    buf: Vec<u8>,
    boundary: String,
}

impl MultipartWriter {
    fn new() -> Self {
        Self {
            buf: Vec::new(),
            boundary: random_boundary(),
        }
    }

    /// The boundary-qualified Content-Type for the finished body.
    fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Stream one file into a form-file part.
    ///
    /// The file handle lives only within this call, so it is released before
    /// the next descriptor is processed, success or failure.
    fn write_file(&mut self, part: &FilePart) -> Result<()> {
        if part.fieldname.is_empty() || part.path.as_os_str().is_empty() {
            return Err(Error::file("fieldname or path is missing"));
        }

        let filename = match &part.filename {
            Some(name) => name.clone(),
            None => base_name(&part.path),
        };

        let mark = self.buf.len();
        self.part_header(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream",
            escape_quotes(&part.fieldname),
            escape_quotes(&filename),
        ));

        let mut file = File::open(&part.path)
            .map_err(|e| Error::file(format!("{}: {}", part.path.display(), e)))?;
        if let Err(e) = io::copy(&mut file, &mut self.buf) {
            // Drop the half-written part so a caller inspecting the error
            // cannot observe it.
            self.buf.truncate(mark);
            return Err(Error::file(format!("{}: {}", part.path.display(), e)));
        }
        self.buf.extend_from_slice(b"\r\n");
        Ok(())
    }

    /// Write one scalar form field.
    fn write_field(&mut self, name: &str, value: &str) {
        self.part_header(&format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quotes(name),
        ));
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.extend_from_slice(b"\r\n");
    }

    fn part_header(&mut self, disposition: &str) {
        self.buf.extend_from_slice(b"--");
        self.buf.extend_from_slice(self.boundary.as_bytes());
        self.buf.extend_from_slice(b"\r\n");
        self.buf.extend_from_slice(disposition.as_bytes());
        self.buf.extend_from_slice(b"\r\n\r\n");
    }

    /// Append the terminating boundary and return the finished body.
    fn finish(mut self) -> Vec<u8> {
        self.buf.extend_from_slice(b"--");
        self.buf.extend_from_slice(self.boundary.as_bytes());
        self.buf.extend_from_slice(b"--\r\n");
        self.buf
    }
}

/// 60 hex characters, same shape Go's mime/multipart generates.
fn random_boundary() -> String {
    let mut bytes = [0u8; 30];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
