//! Fixtures shared by the unit tests: in-memory archives and a scripted
//! archive fetcher.

use crate::acquire::fetch::{copy_cancellable, ArchiveFetcher};
use crate::cancel::CancelToken;
use crate::error::{MineError, Result};
use crate::types::config::ArchiveFormat;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

pub fn write_tar_gz(path: &Path, files: &[(&str, &str)]) {
    let file = File::create(path).expect("archive should be created");
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, name, content.as_bytes())
            .expect("entry should append");
    }
    let encoder = builder.into_inner().expect("tar should finish");
    encoder.finish().expect("gzip should finish");
}

pub fn write_zip(path: &Path, files: &[(&str, &str)]) {
    let file = File::create(path).expect("archive should be created");
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    for (name, content) in files {
        zip.start_file(*name, options).expect("entry should start");
        zip.write_all(content.as_bytes()).expect("entry should write");
    }
    zip.finish().expect("zip should finish");
}

pub fn tar_gz_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let dir = tempfile::TempDir::new().expect("temp dir should be created");
    let path = dir.path().join("archive.tar.gz");
    write_tar_gz(&path, files);
    std::fs::read(path).expect("archive should read back")
}

/// What a [`FakeFetcher`] does when asked for an archive.
pub enum FakeResponse {
    Bytes(Vec<u8>),
    Fail,
    /// Sleep in small steps until cancelled.
    Hang,
}

pub struct FakeFetcher {
    response: FakeResponse,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new(response: FakeResponse) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ArchiveFetcher for FakeFetcher {
    fn fetch(
        &self,
        repo_id: &str,
        _format: ArchiveFormat,
        dest: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            FakeResponse::Bytes(bytes) => copy_cancellable(bytes.as_slice(), dest, cancel).map(|_| ()),
            FakeResponse::Fail => Err(MineError::Download(format!("{repo_id}: HTTP 404"))),
            FakeResponse::Hang => loop {
                cancel.check()?;
                thread::sleep(Duration::from_millis(10));
            },
        }
    }
}
