//! Image backend trait and shared error type.
//!
//! The [`ImageBackend`] trait covers the three touch points the pipeline has
//! with storage: decode a source, encode and write a variant, and report a
//! file's byte size.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate's pure-Rust codecs.

use super::params::EncodeParams;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Unsupported output format for {0}")]
    UnsupportedFormat(String),
}

/// Trait for image storage backends.
///
/// The batch pipeline and the preview path are written against this trait so
/// tests can substitute an in-memory backend.
pub trait ImageBackend: Sync {
    /// Decode the image at `path`.
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode `image` and write it to `path`, creating parent directories.
    /// Returns the number of bytes written.
    fn encode(
        &self,
        image: &DynamicImage,
        path: &Path,
        params: &EncodeParams,
    ) -> Result<u64, BackendError>;

    /// Encode `image` in memory and return the encoded length.
    fn estimate(&self, image: &DynamicImage, params: &EncodeParams) -> Result<u64, BackendError>;

    /// Size in bytes of the file at `path`.
    fn byte_size(&self, path: &Path) -> Result<u64, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::{Encoding, Quality};
    use image::RgbImage;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Mock backend serving images from memory and recording every write.
    /// Uses Mutex (not RefCell) so it is Sync and can cross into the batch worker.
    #[derive(Default)]
    pub struct MockBackend {
        pub images: Mutex<HashMap<PathBuf, DynamicImage>>,
        pub failing_writes: Mutex<Vec<PathBuf>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(String),
        Encode {
            output: String,
            width: u32,
            height: u32,
            encoding: Encoding,
            quality: u32,
        },
    }

    /// Bytes reported for every mock source file.
    pub const MOCK_SOURCE_BYTES: u64 = 10_000;

    /// Bytes reported for every mock write.
    pub const MOCK_OUTPUT_BYTES: u64 = 2_500;

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a solid grey source image at `path`.
        pub fn with_image(self, path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
            let img = RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128]));
            self.images
                .lock()
                .unwrap()
                .insert(path.into(), DynamicImage::ImageRgb8(img));
            self
        }

        /// Make writes to `path` fail.
        pub fn failing_write(self, path: impl Into<PathBuf>) -> Self {
            self.failing_writes.lock().unwrap().push(path.into());
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn encoded_outputs(&self) -> Vec<String> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Encode { output, .. } => Some(output),
                    _ => None,
                })
                .collect()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(path.to_string_lossy().to_string()));

            self.images
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| BackendError::Decode {
                    path: path.display().to_string(),
                    message: "not a mock image".to_string(),
                })
        }

        fn encode(
            &self,
            image: &DynamicImage,
            path: &Path,
            params: &EncodeParams,
        ) -> Result<u64, BackendError> {
            if self.failing_writes.lock().unwrap().iter().any(|p| p == path) {
                return Err(BackendError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "mock write refused",
                )));
            }
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                output: path.to_string_lossy().to_string(),
                width: image.width(),
                height: image.height(),
                encoding: params.encoding,
                quality: params.quality.value(),
            });
            Ok(MOCK_OUTPUT_BYTES)
        }

        fn estimate(
            &self,
            _image: &DynamicImage,
            _params: &EncodeParams,
        ) -> Result<u64, BackendError> {
            Ok(MOCK_OUTPUT_BYTES)
        }

        fn byte_size(&self, _path: &Path) -> Result<u64, BackendError> {
            Ok(MOCK_SOURCE_BYTES)
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::new().with_image("/test/image.jpg", 80, 60);

        let img = backend.decode(Path::new("/test/image.jpg")).unwrap();
        assert_eq!((img.width(), img.height()), (80, 60));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Decode(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_decode_unknown_path_fails() {
        let backend = MockBackend::new();
        let err = backend.decode(Path::new("/missing.jpg")).unwrap_err();
        assert!(err.to_string().contains("/missing.jpg"));
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();
        let img = DynamicImage::ImageRgb8(RgbImage::new(30, 20));

        let written = backend
            .encode(
                &img,
                Path::new("/out/30x20/a.jpg"),
                &EncodeParams {
                    encoding: Encoding::Jpeg,
                    quality: Quality::new(90),
                },
            )
            .unwrap();
        assert_eq!(written, MOCK_OUTPUT_BYTES);

        let ops = backend.get_operations();
        assert!(matches!(
            &ops[0],
            RecordedOp::Encode {
                width: 30,
                height: 20,
                encoding: Encoding::Jpeg,
                quality: 90,
                ..
            }
        ));
    }

    #[test]
    fn mock_failing_write_is_io_error() {
        let backend = MockBackend::new().failing_write("/out/x.jpg");
        let img = DynamicImage::ImageRgb8(RgbImage::new(1, 1));
        let params = EncodeParams {
            encoding: Encoding::Png,
            quality: Quality::default(),
        };
        assert!(matches!(
            backend.encode(&img, Path::new("/out/x.jpg"), &params),
            Err(BackendError::Io(_))
        ));
        assert!(backend.get_operations().is_empty());
    }
}
