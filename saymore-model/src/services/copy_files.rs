//! Copy files with progress
//!
//! Copies (source, destination) pairs one after another, never overwriting,
//! and keeps a progress record that other threads can poll while the job
//! runs on its worker thread.

use chrono::{DateTime, Utc};
use saymore_common::error::error_chain_message;
use saymore_common::{Error, Result};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

const BUFFER_SIZE: usize = 64 * 1024;
const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Called once when the job ends, with the failure if there was one
pub type FinishedCallback = Box<dyn FnOnce(Option<&Error>) + Send>;

/// Where a copy job stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyState {
    Waiting,
    Copying,
    Finished,
    Failed,
}

/// Snapshot of a copy job's progress
#[derive(Debug, Clone, Serialize)]
pub struct CopyProgress {
    pub state: CopyState,
    /// One-based index of the file being copied
    pub current_file: usize,
    pub total_files: usize,
    pub copied_bytes: u64,
    pub total_bytes: u64,
    /// 0 - 100
    pub percentage: u8,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl CopyProgress {
    fn new(total_files: usize, total_bytes: u64) -> Self {
        Self {
            state: CopyState::Waiting,
            current_file: 0,
            total_files,
            copied_bytes: 0,
            total_bytes,
            percentage: 0,
            status: "Waiting to start...".to_string(),
            started_at: None,
            ended_at: None,
        }
    }

    fn update_copying(&mut self) {
        self.percentage = if self.total_bytes > 0 {
            ((self.copied_bytes as f64 / self.total_bytes as f64) * 100.0).min(100.0) as u8
        } else {
            0
        };
        self.status = format!(
            "Copying {} of {} Files, ({:.1} of {:.1} Megabytes)",
            self.current_file,
            self.total_files,
            self.copied_bytes as f64 / BYTES_PER_MEGABYTE,
            self.total_bytes as f64 / BYTES_PER_MEGABYTE
        );
    }

    /// Whether the job has stopped (successfully or not)
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, CopyState::Finished | CopyState::Failed)
    }
}

/// Sequential copy of a list of files
pub struct CopyFilesJob {
    pairs: Vec<(PathBuf, PathBuf)>,
    progress: Arc<Mutex<CopyProgress>>,
    on_finished: Option<FinishedCallback>,
}

impl CopyFilesJob {
    /// Prepare a job; sizes of all sources are totalled up front
    ///
    /// Fails on an empty list or a source that cannot be read.
    pub fn new(pairs: Vec<(PathBuf, PathBuf)>) -> Result<Self> {
        if pairs.is_empty() {
            return Err(Error::InvalidInput("No files to copy".to_string()));
        }

        let mut total_bytes = 0;
        for (source, _) in &pairs {
            total_bytes += std::fs::metadata(source)?.len();
        }

        Ok(Self {
            progress: Arc::new(Mutex::new(CopyProgress::new(pairs.len(), total_bytes))),
            pairs,
            on_finished: None,
        })
    }

    /// Run `callback` when the job ends
    pub fn on_finished(mut self, callback: FinishedCallback) -> Self {
        self.on_finished = Some(callback);
        self
    }

    /// Shared progress record
    pub fn progress_handle(&self) -> Arc<Mutex<CopyProgress>> {
        self.progress.clone()
    }

    /// Current progress
    pub fn progress(&self) -> CopyProgress {
        lock(&self.progress).clone()
    }

    /// Copy every file on the calling thread, stopping at the first error
    pub fn run(mut self) -> Result<()> {
        let result = self.copy_all();

        {
            let mut progress = lock(&self.progress);
            progress.ended_at = Some(Utc::now());
            match &result {
                Ok(()) => {
                    progress.state = CopyState::Finished;
                    progress.percentage = 100;
                    progress.status = "Finished".to_string();
                    info!(files = progress.total_files, bytes = progress.total_bytes, "Copy finished");
                }
                Err(e) => {
                    progress.state = CopyState::Failed;
                    progress.status = format!("Copying failed: {}", error_chain_message(e));
                    warn!(error = %e, "Copy failed");
                }
            }
        }

        if let Some(callback) = self.on_finished.take() {
            callback(result.as_ref().err());
        }
        result
    }

    /// Run the job on a worker thread
    pub fn start(self) -> Result<JoinHandle<Result<()>>> {
        thread::Builder::new()
            .name("copy-files".to_string())
            .spawn(move || self.run())
            .map_err(|e| Error::Internal(format!("failed to spawn copy thread: {}", e)))
    }

    fn copy_all(&self) -> Result<()> {
        {
            let mut progress = lock(&self.progress);
            progress.state = CopyState::Copying;
            progress.started_at = Some(Utc::now());
        }

        for (index, (source, destination)) in self.pairs.iter().enumerate() {
            {
                let mut progress = lock(&self.progress);
                progress.current_file = index + 1;
                progress.update_copying();
            }
            debug!(from = %source.display(), to = %destination.display(), "Copying file");
            self.copy_one(source, destination)?;
        }
        Ok(())
    }

    fn copy_one(&self, source: &Path, destination: &Path) -> Result<()> {
        let mut reader = File::open(source)?;
        // create_new refuses to overwrite
        let mut writer = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("{}: {}", destination.display(), e),
                ))
            })?;

        let mut buffer = vec![0u8; BUFFER_SIZE];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            writer.write_all(&buffer[..read])?;

            let mut progress = lock(&self.progress);
            progress.copied_bytes += read as u64;
            progress.update_copying();
        }
        writer.flush()?;
        Ok(())
    }
}

fn lock(progress: &Mutex<CopyProgress>) -> std::sync::MutexGuard<'_, CopyProgress> {
    progress.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use tempfile::TempDir;

    #[test]
    fn test_empty_job_rejected() {
        assert!(CopyFilesJob::new(Vec::new()).is_err());
    }

    #[test]
    fn test_copies_and_reports_progress() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.wav");
        let b = temp_dir.path().join("b.wav");
        std::fs::write(&a, vec![1u8; 1000]).unwrap();
        std::fs::write(&b, vec![2u8; 3000]).unwrap();
        let out = temp_dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        let job = CopyFilesJob::new(vec![(a, out.join("a.wav")), (b, out.join("b.wav"))]).unwrap();
        let progress = job.progress_handle();
        assert_eq!(job.progress().status, "Waiting to start...");
        assert_eq!(job.progress().total_bytes, 4000);

        job.run().unwrap();

        let progress = progress.lock().unwrap().clone();
        assert_eq!(progress.state, CopyState::Finished);
        assert_eq!(progress.status, "Finished");
        assert_eq!(progress.percentage, 100);
        assert_eq!(progress.copied_bytes, 4000);
        assert_eq!(std::fs::read(out.join("b.wav")).unwrap().len(), 3000);
    }

    #[test]
    fn test_stops_at_first_error_without_overwriting() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.wav");
        let b = temp_dir.path().join("b.wav");
        std::fs::write(&a, b"new").unwrap();
        std::fs::write(&b, b"new").unwrap();
        let out = temp_dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("a.wav"), b"old").unwrap();

        let (tx, rx) = mpsc::channel();
        let job = CopyFilesJob::new(vec![(a, out.join("a.wav")), (b, out.join("b.wav"))])
            .unwrap()
            .on_finished(Box::new(move |error: Option<&Error>| {
                tx.send(error.is_some()).unwrap();
            }));
        let progress = job.progress_handle();

        let handle = job.start().unwrap();
        assert!(handle.join().unwrap().is_err());
        assert!(rx.recv().unwrap());

        let progress = progress.lock().unwrap().clone();
        assert_eq!(progress.state, CopyState::Failed);
        assert!(progress.status.starts_with("Copying failed: "));
        assert_eq!(std::fs::read(out.join("a.wav")).unwrap(), b"old");
        assert!(!out.join("b.wav").exists());
    }
}
