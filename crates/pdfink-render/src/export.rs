//! Background flatten and export.
//!
//! [`ExportTask::spawn`] runs on a worker thread and reports progress over a
//! channel. Pages are written to a temporary file next to the output, which
//! replaces the output only once the export succeeds. A cancelled or failed
//! export leaves any existing file at the output path untouched.

use crate::flatten::ExportFlattener;
use crate::pdf_writer::PdfWriter;
use crate::renderer::RenderError;
use pdfink_core::cancel::CancelToken;
use pdfink_core::raster::PageBitmap;
use pdfink_core::scene::SceneSnapshot;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export cancelled")]
    Cancelled,
    #[error("Failed to render page {page}: {source}")]
    Render {
        page: usize,
        #[source]
        source: RenderError,
    },
    #[error("No raster for page {0}")]
    MissingRaster(usize),
    #[error("Write failed: {0}")]
    Write(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Progress report: `page` of `total` pages flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportProgress {
    pub page: usize,
    pub total: usize,
}

/// A finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutput {
    pub path: PathBuf,
    pub page_count: usize,
}

/// Entry point for background exports.
pub struct ExportTask;

impl ExportTask {
    /// Flatten `snapshot` over `rasters` and write the result to `output_path`
    /// on a worker thread.
    pub fn spawn<W>(snapshot: SceneSnapshot, rasters: Vec<PageBitmap>, writer: W, output_path: PathBuf) -> ExportHandle
    where
        W: PdfWriter + 'static,
    {
        Self::spawn_with(ExportFlattener::default(), snapshot, rasters, writer, output_path)
    }

    /// Like [`ExportTask::spawn`] with a custom flattener.
    pub fn spawn_with<W>(
        flattener: ExportFlattener,
        snapshot: SceneSnapshot,
        rasters: Vec<PageBitmap>,
        writer: W,
        output_path: PathBuf,
    ) -> ExportHandle
    where
        W: PdfWriter + 'static,
    {
        let cancel = CancelToken::new();
        let (progress_tx, progress_rx) = channel();
        let worker_cancel = cancel.clone();

        let thread = thread::spawn(move || {
            let result = run(&flattener, &snapshot, &rasters, &writer, &output_path, &worker_cancel, &progress_tx);
            if let Err(e) = &result {
                match e {
                    ExportError::Cancelled => log::info!("Export to {} cancelled", output_path.display()),
                    _ => log::error!("Export to {} failed: {}", output_path.display(), e),
                }
            }
            result
        });

        ExportHandle {
            cancel,
            progress: progress_rx,
            thread: Some(thread),
        }
    }
}

fn run(
    flattener: &ExportFlattener,
    snapshot: &SceneSnapshot,
    rasters: &[PageBitmap],
    writer: &dyn PdfWriter,
    output_path: &Path,
    cancel: &CancelToken,
    progress: &Sender<ExportProgress>,
) -> ExportResult<ExportOutput> {
    log::info!("Exporting {} pages to {}", snapshot.pages.len(), output_path.display());
    let pages = flattener.flatten(snapshot, rasters, cancel, |page, total| {
        // The receiver may already be gone; the export still completes.
        let _ = progress.send(ExportProgress { page, total });
    })?;

    if cancel.is_cancelled() {
        return Err(ExportError::Cancelled);
    }
    // Dropping the temporary file on any early return deletes it.
    let staging = staging_file(output_path)?;
    writer.write(&pages, staging.path())?;
    if cancel.is_cancelled() {
        return Err(ExportError::Cancelled);
    }
    staging.persist(output_path).map_err(|e| ExportError::Io(e.error))?;
    Ok(ExportOutput {
        path: output_path.to_path_buf(),
        page_count: pages.len(),
    })
}

fn staging_file(output_path: &Path) -> ExportResult<NamedTempFile> {
    let dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok(NamedTempFile::new_in(dir)?)
}

/// Handle to a running export. Dropping it cancels the export.
pub struct ExportHandle {
    cancel: CancelToken,
    progress: Receiver<ExportProgress>,
    thread: Option<JoinHandle<ExportResult<ExportOutput>>>,
}

impl ExportHandle {
    /// Request cancellation. The worker stops before the next page.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Drain pending progress reports (non-blocking).
    pub fn poll_progress(&self) -> Vec<ExportProgress> {
        self.progress.try_iter().collect()
    }

    /// Block until the next progress report. `None` once the worker is done.
    pub fn wait_progress(&self) -> Option<ExportProgress> {
        self.progress.recv().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Wait for the worker and return its result.
    pub fn join(mut self) -> ExportResult<ExportOutput> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| ExportError::Write("export already joined".to_string()))?;
        thread
            .join()
            .map_err(|_| ExportError::Write("export worker panicked".to_string()))?
    }
}

impl Drop for ExportHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_writer::LopdfWriter;
    use kurbo::{Point, Size};
    use pdfink_core::config::EditorConfig;
    use pdfink_core::scene::SceneController;
    use pdfink_core::style::PaintSpec;
    use std::sync::{Arc, Mutex};

    fn two_page_snapshot() -> SceneSnapshot {
        let mut scene = SceneController::new(EditorConfig::default());
        scene.add_page_with_view(Size::new(100.0, 100.0), Size::new(50.0, 50.0));
        scene.add_page_with_view(Size::new(100.0, 100.0), Size::new(50.0, 50.0));
        let strokes = &mut scene.page_mut(1).unwrap().strokes;
        strokes.begin_stroke(Point::new(5.0, 5.0), PaintSpec::default());
        strokes.extend_stroke(Point::new(40.0, 40.0));
        strokes.commit_stroke();
        scene.snapshot()
    }

    fn rasters() -> Vec<PageBitmap> {
        vec![PageBitmap::white(100, 100), PageBitmap::white(100, 100)]
    }

    /// Leaves a partial file behind, then fails.
    struct FailingWriter;

    impl PdfWriter for FailingWriter {
        fn write(&self, _pages: &[PageBitmap], path: &Path) -> ExportResult<PathBuf> {
            std::fs::write(path, b"%PDF-partial")?;
            Err(ExportError::Write("disk full".to_string()))
        }
    }

    /// Leaves a partial file behind and cancels its own export.
    struct GatedWriter {
        cancel: Arc<Mutex<Option<CancelToken>>>,
    }

    impl PdfWriter for GatedWriter {
        fn write(&self, _pages: &[PageBitmap], path: &Path) -> ExportResult<PathBuf> {
            std::fs::write(path, b"%PDF-partial")?;
            if let Some(token) = self.cancel.lock().unwrap().as_ref() {
                token.cancel();
            }
            Ok(path.to_path_buf())
        }
    }

    #[test]
    fn test_export_writes_pdf_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.pdf");
        let handle = ExportTask::spawn(two_page_snapshot(), rasters(), LopdfWriter::new(144.0), path.clone());

        let mut progress = Vec::new();
        while let Some(event) = handle.wait_progress() {
            progress.push(event);
        }
        let output = handle.join().unwrap();

        assert_eq!(output.page_count, 2);
        assert_eq!(output.path, path);
        assert!(path.exists());
        assert_eq!(
            progress,
            vec![ExportProgress { page: 1, total: 2 }, ExportProgress { page: 2, total: 2 }]
        );
    }

    fn dir_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_failed_write_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        let handle = ExportTask::spawn(two_page_snapshot(), rasters(), FailingWriter, path.clone());

        let result = handle.join();
        assert!(matches!(result, Err(ExportError::Write(_))));
        assert!(!path.exists());
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[test]
    fn test_failed_export_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"previous export").unwrap();

        let handle = ExportTask::spawn(two_page_snapshot(), Vec::new(), LopdfWriter::default(), path.clone());
        assert!(matches!(handle.join(), Err(ExportError::MissingRaster(0))));
        assert_eq!(std::fs::read(&path).unwrap(), b"previous export");

        let handle = ExportTask::spawn(two_page_snapshot(), rasters(), FailingWriter, path.clone());
        assert!(matches!(handle.join(), Err(ExportError::Write(_))));
        assert_eq!(std::fs::read(&path).unwrap(), b"previous export");
        assert_eq!(dir_entries(dir.path()), 1);
    }

    #[test]
    fn test_successful_export_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"previous export").unwrap();

        let handle = ExportTask::spawn(two_page_snapshot(), rasters(), LopdfWriter::default(), path.clone());
        assert_eq!(handle.join().unwrap().path, path);
        assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));
        assert_eq!(dir_entries(dir.path()), 1);
    }

    #[test]
    fn test_cancel_during_write_discards_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cancelled.pdf");
        let slot = Arc::new(Mutex::new(None));
        let writer = GatedWriter { cancel: slot.clone() };

        // Hold the lock so the token is installed before the writer runs.
        let mut guard = slot.lock().unwrap();
        let handle = ExportTask::spawn(two_page_snapshot(), rasters(), writer, path.clone());
        *guard = Some(handle.cancel_token());
        drop(guard);

        let result = handle.join();
        assert!(matches!(result, Err(ExportError::Cancelled)));
        assert!(!path.exists());
        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[test]
    fn test_missing_raster_fails_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pdf");
        let rasters = vec![PageBitmap::white(100, 100)];
        let handle = ExportTask::spawn(two_page_snapshot(), rasters, LopdfWriter::default(), path.clone());
        assert!(matches!(handle.join(), Err(ExportError::MissingRaster(1))));
        assert!(!path.exists());
    }
}
