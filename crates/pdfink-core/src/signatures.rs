//! Signature bitmaps and their persistence.
//!
//! The store keeps one PNG file per signature in a `signatures` directory.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Signature store errors.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Signature not found: {0}")]
    NotFound(String),
    #[error("Invalid signature image: {0}")]
    InvalidImage(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for signature operations.
pub type SignatureResult<T> = Result<T, SignatureError>;

/// A user-supplied signature image, kept at its original resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBitmap {
    /// Pixel width of the PNG.
    pub width: u32,
    /// Pixel height of the PNG.
    pub height: u32,
    /// PNG bytes as base64 so snapshots stay plain JSON.
    pub data_base64: String,
}

impl SignatureBitmap {
    /// Wrap PNG bytes, reading the dimensions from the header.
    pub fn from_png(data: &[u8]) -> SignatureResult<Self> {
        let decoder = png::Decoder::new(data);
        let reader = decoder
            .read_info()
            .map_err(|e| SignatureError::InvalidImage(e.to_string()))?;
        let info = reader.info();
        if info.width == 0 || info.height == 0 {
            return Err(SignatureError::InvalidImage("empty image".to_string()));
        }
        Ok(Self {
            width: info.width,
            height: info.height,
            data_base64: STANDARD.encode(data),
        })
    }

    /// The PNG bytes.
    pub fn data(&self) -> Option<Vec<u8>> {
        STANDARD.decode(&self.data_base64).ok()
    }
}

/// Source of saved signatures.
pub trait SignatureStore {
    /// Ids of saved signatures, oldest first.
    fn list(&self) -> SignatureResult<Vec<String>>;

    fn load(&self, id: &str) -> SignatureResult<SignatureBitmap>;

    /// Persist a signature and return its id.
    fn save(&mut self, bitmap: &SignatureBitmap) -> SignatureResult<String>;

    fn delete(&mut self, id: &str) -> SignatureResult<()>;

    /// Signature chosen for the next insertion, if any.
    fn current(&self) -> SignatureResult<Option<SignatureBitmap>>;

    fn set_current(&mut self, id: &str) -> SignatureResult<()>;
}

/// File-per-signature PNG store.
pub struct FileSignatureStore {
    base_path: PathBuf,
    current: Option<String>,
}

impl FileSignatureStore {
    /// Open the store in `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> SignatureResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                SignatureError::Io(format!("Failed to create signature directory: {}", e))
            })?;
        }
        Ok(Self {
            base_path,
            current: None,
        })
    }

    /// Open the store in the platform data directory.
    ///
    /// On Unix: `~/.local/share/pdfink/signatures/`
    pub fn default_location() -> SignatureResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| SignatureError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("pdfink").join("signatures"))
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn signature_path(&self, id: &str) -> PathBuf {
        let safe_id: String = id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.png", safe_id))
    }
}

impl SignatureStore for FileSignatureStore {
    fn list(&self) -> SignatureResult<Vec<String>> {
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| SignatureError::Io(format!("Failed to read {}: {}", self.base_path.display(), e)))?;

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    let modified = entry.metadata().and_then(|m| m.modified()).ok();
                    found.push((modified, stem.to_string()));
                }
            }
        }
        found.sort();
        Ok(found.into_iter().map(|(_, id)| id).collect())
    }

    fn load(&self, id: &str) -> SignatureResult<SignatureBitmap> {
        let path = self.signature_path(id);
        if !path.exists() {
            return Err(SignatureError::NotFound(id.to_string()));
        }
        let data = fs::read(&path)
            .map_err(|e| SignatureError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        SignatureBitmap::from_png(&data)
    }

    fn save(&mut self, bitmap: &SignatureBitmap) -> SignatureResult<String> {
        let data = bitmap
            .data()
            .ok_or_else(|| SignatureError::InvalidImage("corrupt base64 payload".to_string()))?;
        let id = Uuid::new_v4().to_string();
        let path = self.signature_path(&id);
        fs::write(&path, data)
            .map_err(|e| SignatureError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        log::info!("Saved signature {} ({}x{})", id, bitmap.width, bitmap.height);
        self.current = Some(id.clone());
        Ok(id)
    }

    fn delete(&mut self, id: &str) -> SignatureResult<()> {
        let path = self.signature_path(id);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| SignatureError::Io(format!("Failed to delete {}: {}", path.display(), e)))?;
        }
        if self.current.as_deref() == Some(id) {
            self.current = None;
        }
        Ok(())
    }

    fn current(&self) -> SignatureResult<Option<SignatureBitmap>> {
        match &self.current {
            Some(id) => self.load(id).map(Some),
            None => match self.list()?.last() {
                Some(id) => self.load(id).map(Some),
                None => Ok(None),
            },
        }
    }

    fn set_current(&mut self, id: &str) -> SignatureResult<()> {
        if !self.signature_path(id).exists() {
            return Err(SignatureError::NotFound(id.to_string()));
        }
        self.current = Some(id.to_string());
        Ok(())
    }
}

/// Encode a tiny RGBA PNG for tests.
#[cfg(test)]
pub(crate) fn test_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        let pixels = vec![0u8; (width * height * 4) as usize];
        writer.write_image_data(&pixels).unwrap();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (FileSignatureStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSignatureStore::new(temp_dir.path().join("signatures")).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_bitmap_reads_dimensions() {
        let bitmap = SignatureBitmap::from_png(&test_png(40, 20)).unwrap();
        assert_eq!((bitmap.width, bitmap.height), (40, 20));
        assert_eq!(bitmap.data().unwrap(), test_png(40, 20));
    }

    #[test]
    fn test_bitmap_rejects_garbage() {
        assert!(matches!(
            SignatureBitmap::from_png(b"not a png"),
            Err(SignatureError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_save_load_list() {
        let (mut store, _dir) = create_test_store();
        let bitmap = SignatureBitmap::from_png(&test_png(8, 4)).unwrap();
        let id = store.save(&bitmap).unwrap();

        assert_eq!(store.list().unwrap(), vec![id.clone()]);
        assert_eq!(store.load(&id).unwrap(), bitmap);
        assert_eq!(store.current().unwrap(), Some(bitmap));
    }

    #[test]
    fn test_delete_clears_current() {
        let (mut store, _dir) = create_test_store();
        let id = store.save(&SignatureBitmap::from_png(&test_png(2, 2)).unwrap()).unwrap();
        store.delete(&id).unwrap();

        assert!(store.list().unwrap().is_empty());
        assert_eq!(store.current().unwrap(), None);
        assert!(matches!(store.load(&id), Err(SignatureError::NotFound(_))));
    }

    #[test]
    fn test_set_current_unknown() {
        let (mut store, _dir) = create_test_store();
        assert!(matches!(store.set_current("missing"), Err(SignatureError::NotFound(_))));
    }
}
