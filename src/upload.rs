//! Persisting screenshots of displayed panoramas.

use crate::config::load_output_dir;
use crate::error::{PanoError, Result};
use crate::save::{encode_capture, save_capture, SaveOptions};
use crate::types::PanoramaView;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A screenshot of a panorama, as sent by a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Groups captures of one session; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub pano: String,
    /// Capture date label, e.g. "Mar 2019"
    pub date: String,
    /// `data:image/<type>;base64,<payload>`
    pub img: String,
}

impl UploadRequest {
    /// Build a request for the panorama currently shown in `view`.
    pub fn from_view(id: Option<String>, view: &PanoramaView, img: &DynamicImage) -> Result<Self> {
        let options = SaveOptions::new();
        let bytes = encode_capture(img, &options)?;

        Ok(Self {
            id,
            pano: view.panorama_id.clone(),
            date: view.capture_date_label.clone(),
            img: format!(
                "data:{};base64,{}",
                options.format.mime_type(),
                STANDARD.encode(bytes)
            ),
        })
    }
}

/// Writes uploaded captures under a root directory.
///
/// Files land at `<root>/<id>/<id>_<date>_<pano>.jpg`, with spaces in the
/// date replaced by underscores.
#[derive(Debug, Clone)]
pub struct CaptureStore {
    root: PathBuf,
    options: SaveOptions,
}

impl CaptureStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            options: SaveOptions::new(),
        }
    }

    /// Store rooted at `OUTPUT_DIR`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(load_output_dir()?))
    }

    pub fn with_options(mut self, options: SaveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decode and save an upload, returning the written path.
    ///
    /// # Errors
    ///
    /// - `InvalidDataUri` if `img` is not a base64 image data URI
    /// - `InvalidUpload` if `id` or `pano` is not a plain file name component
    /// - `Base64`/`ImageError` if the payload does not decode to an image
    pub fn store(&self, request: &UploadRequest) -> Result<PathBuf> {
        let id = match &request.id {
            Some(id) => id.clone(),
            None => Uuid::now_v7().to_string(),
        };
        check_component("id", &id)?;
        check_component("pano", &request.pano)?;

        let payload = data_uri_payload(&request.img)?;
        let bytes = STANDARD.decode(payload)?;
        let img = image::load_from_memory(&bytes)?;

        let date = request.date.split(' ').collect::<Vec<_>>().join("_");
        let file_name = format!(
            "{id}_{date}_{}.{}",
            request.pano,
            self.options.format.extension()
        );
        let path = self.root.join(&id).join(file_name);

        save_capture(&img, &path, &self.options)?;
        tracing::info!(path = %path.display(), pano = %request.pano, "saved capture");

        Ok(path)
    }
}

fn data_uri_payload(uri: &str) -> Result<&str> {
    let rest = uri.strip_prefix("data:image/").ok_or(PanoError::InvalidDataUri)?;
    let (media, payload) = rest.split_once(',').ok_or(PanoError::InvalidDataUri)?;
    if !media.ends_with(";base64") {
        return Err(PanoError::InvalidDataUri);
    }
    Ok(payload)
}

fn check_component(field: &str, value: &str) -> Result<()> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(PanoError::InvalidUpload(format!("{field} {value:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinate;
    use image::RgbImage;

    fn small_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 8, image::Rgb([200, 40, 40])))
    }

    fn view() -> PanoramaView {
        PanoramaView {
            panorama_id: "CAoSLEFGMVFpcE".to_string(),
            panorama_position: Coordinate::new(45.5318, -73.5592),
            target_coordinate: Coordinate::new(45.5317, -73.5592),
            heading_degrees: 180.0,
            zoom_level: 0.0,
            capture_date_label: "Mar 2019".to_string(),
            alternate_captures: vec![],
        }
    }

    #[test]
    fn test_store_writes_under_id_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(dir.path());
        let request = UploadRequest::from_view(Some("run1".to_string()), &view(), &small_image()).unwrap();

        let path = store.store(&request).unwrap();

        assert_eq!(path, dir.path().join("run1").join("run1_Mar_2019_CAoSLEFGMVFpcE.jpg"));
        let saved = image::open(&path).unwrap();
        assert_eq!((saved.width(), saved.height()), (16, 8));
    }

    #[test]
    fn test_store_generates_id_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(dir.path());
        let request = UploadRequest::from_view(None, &view(), &small_image()).unwrap();

        let path = store.store(&request).unwrap();

        let id = path.parent().unwrap().file_name().unwrap().to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&id).is_ok());
        let file_name = path.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with(&format!("{id}_Mar_2019_")));
    }

    #[test]
    fn test_rejects_non_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(dir.path());
        let request = UploadRequest {
            id: Some("run1".to_string()),
            pano: "p".to_string(),
            date: "Mar 2019".to_string(),
            img: "https://example.com/shot.jpg".to_string(),
        };

        assert!(matches!(store.store(&request), Err(PanoError::InvalidDataUri)));
    }

    #[test]
    fn test_rejects_path_components() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(dir.path());
        let mut request = UploadRequest::from_view(Some("../escape".to_string()), &view(), &small_image()).unwrap();
        assert!(matches!(store.store(&request), Err(PanoError::InvalidUpload(_))));

        request.id = Some("ok".to_string());
        request.pano = "..".to_string();
        assert!(matches!(store.store(&request), Err(PanoError::InvalidUpload(_))));
    }

    #[test]
    fn test_rejects_garbage_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(dir.path());
        let request = UploadRequest {
            id: Some("run1".to_string()),
            pano: "p".to_string(),
            date: "Mar 2019".to_string(),
            img: format!("data:image/jpeg;base64,{}", STANDARD.encode(b"not an image")),
        };

        assert!(matches!(store.store(&request), Err(PanoError::ImageError(_))));
    }

    #[test]
    fn test_request_json_shape() {
        let request: UploadRequest = serde_json::from_str(
            r#"{"pano":"p","date":"Jan 2020","img":"data:image/png;base64,AAAA"}"#,
        )
        .unwrap();
        assert_eq!(request.id, None);
        assert_eq!(request.date, "Jan 2020");
    }
}
