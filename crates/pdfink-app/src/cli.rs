//! Command-line export: `pdfink [--config FILE] <scene.json> <output.pdf> <page.png>...`

use crate::image_source::ImageFileSource;
use pdfink_core::cancel::CancelToken;
use pdfink_core::config::{ConfigError, EditorConfig};
use pdfink_core::raster::{PageBitmap, PageLoad, RasterError, load_pages};
use pdfink_core::scene::{SceneError, SceneSnapshot};
use pdfink_render::{ExportError, ExportOutput, ExportTask, LopdfWriter};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

pub const USAGE: &str = "usage: pdfink [--config FILE] <scene.json> <output.pdf> <page1.png> [page2.png ...]";

/// Host errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Usage(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
    #[error("None of the scene's pages could be loaded")]
    NoPages,
}

pub type AppResult<T> = Result<T, AppError>;

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub scene: PathBuf,
    pub output: PathBuf,
    pub pages: Vec<PathBuf>,
}

impl CliArgs {
    /// Parse arguments, program name excluded.
    pub fn parse<I, S>(args: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = None;
        let mut positional = Vec::new();
        let mut args = args.into_iter().map(Into::<String>::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args
                        .next()
                        .ok_or_else(|| AppError::Usage("--config needs a file".to_string()))?;
                    config = Some(PathBuf::from(path));
                }
                flag if flag.starts_with("--") => {
                    return Err(AppError::Usage(format!("unknown option {}", flag)));
                }
                _ => positional.push(PathBuf::from(arg)),
            }
        }

        if positional.len() < 3 {
            return Err(AppError::Usage("expected a scene, an output and at least one page".to_string()));
        }
        let pages = positional.split_off(2);
        let output = positional.pop().ok_or_else(|| AppError::Usage("missing output".to_string()))?;
        let scene = positional.pop().ok_or_else(|| AppError::Usage("missing scene".to_string()))?;
        Ok(Self {
            config,
            scene,
            output,
            pages,
        })
    }
}

/// Load the scene and pages, then export and wait for the result.
pub fn run(args: &CliArgs) -> AppResult<ExportOutput> {
    let config = match &args.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let mut snapshot = SceneSnapshot::from_json(&fs::read_to_string(&args.scene)?)?;
    log::info!("Loaded scene with {} pages from {}", snapshot.pages.len(), args.scene.display());

    let source = ImageFileSource::new(args.pages.clone(), config.render_dpi);
    let mut loaded: HashMap<usize, PageBitmap> = HashMap::new();
    load_pages(&source, &config, &CancelToken::new(), |page| {
        if let PageLoad::Rendered { index, bitmap } = page {
            loaded.insert(index, bitmap);
        }
    })?;

    // Pages without a raster are left out of the export.
    let mut rasters = Vec::with_capacity(snapshot.pages.len());
    snapshot.pages.retain(|page| match loaded.remove(&page.index) {
        Some(bitmap) => {
            rasters.push(bitmap);
            true
        }
        None => {
            log::warn!("No raster for page {}, leaving it out", page.index);
            false
        }
    });
    if snapshot.pages.is_empty() {
        return Err(AppError::NoPages);
    }

    let handle = ExportTask::spawn(
        snapshot,
        rasters,
        LopdfWriter::new(config.render_dpi),
        args.output.clone(),
    );
    while let Some(progress) = handle.wait_progress() {
        log::info!("Flattened page {}/{}", progress.page, progress.total);
    }
    Ok(handle.join()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Size};
    use pdfink_core::scene::SceneController;
    use pdfink_core::style::PaintSpec;

    #[test]
    fn test_parse_positional() {
        let args = CliArgs::parse(["scene.json", "out.pdf", "a.png", "b.png"]).unwrap();
        assert_eq!(args.scene, PathBuf::from("scene.json"));
        assert_eq!(args.output, PathBuf::from("out.pdf"));
        assert_eq!(args.pages, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
        assert_eq!(args.config, None);
    }

    #[test]
    fn test_parse_config_flag() {
        let args = CliArgs::parse(["--config", "c.json", "s.json", "o.pdf", "p.png"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("c.json")));
        assert_eq!(args.pages.len(), 1);
    }

    #[test]
    fn test_parse_rejects_missing_pages_and_unknown_flags() {
        assert!(matches!(CliArgs::parse(["s.json", "o.pdf"]), Err(AppError::Usage(_))));
        assert!(matches!(CliArgs::parse(["--dpi", "s.json", "o.pdf", "p.png"]), Err(AppError::Usage(_))));
        assert!(matches!(CliArgs::parse(["s.json", "o.pdf", "p.png", "--config"]), Err(AppError::Usage(_))));
    }

    #[test]
    fn test_run_exports_loaded_pages() {
        let dir = tempfile::tempdir().unwrap();
        let page_path = dir.path().join("page0.png");
        image::RgbaImage::from_pixel(144, 144, image::Rgba([255, 255, 255, 255]))
            .save(&page_path)
            .unwrap();

        let mut scene = SceneController::new(EditorConfig::default());
        scene.add_page_with_view(Size::new(144.0, 144.0), Size::new(72.0, 72.0));
        scene.add_page_with_view(Size::new(144.0, 144.0), Size::new(72.0, 72.0));
        let strokes = &mut scene.page_mut(0).unwrap().strokes;
        strokes.begin_stroke(Point::new(10.0, 10.0), PaintSpec::default());
        strokes.extend_stroke(Point::new(60.0, 60.0));
        strokes.commit_stroke();
        let scene_path = dir.path().join("scene.json");
        fs::write(&scene_path, scene.snapshot().to_json().unwrap()).unwrap();

        let output = dir.path().join("out.pdf");
        let args = CliArgs {
            config: None,
            scene: scene_path,
            output: output.clone(),
            pages: vec![page_path],
        };
        let result = run(&args).unwrap();

        // The second page has no image and is dropped.
        assert_eq!(result.page_count, 1);
        let bytes = fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_run_without_any_page_fails() {
        let dir = tempfile::tempdir().unwrap();
        let scene_path = dir.path().join("scene.json");
        fs::write(&scene_path, SceneSnapshot::default().to_json().unwrap()).unwrap();
        let args = CliArgs {
            config: None,
            scene: scene_path,
            output: dir.path().join("out.pdf"),
            pages: vec![dir.path().join("missing.png")],
        };
        assert!(matches!(run(&args), Err(AppError::NoPages)));
    }
}
