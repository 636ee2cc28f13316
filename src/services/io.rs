//! Image I/O operations service
//!
//! Inputs come from a file or stdin and are always decoded to 8-bit RGB.
//! Results are always written as PNG, to a file or stdout.

use crate::{
    error::{BgRemovalError, Result},
    types::encode_png,
};
use image::{RgbImage, RgbaImage};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Token selecting the standard stream instead of a file
pub const STDIO_TOKEN: &str = "-";

/// Where an input image is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Stdin,
}

impl FromStr for ImageSource {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(BgRemovalError::invalid_config("Input path must not be empty")),
            STDIO_TOKEN => Ok(Self::Stdin),
            path => Ok(Self::Path(PathBuf::from(path))),
        }
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Stdin => write!(f, "<stdin>"),
        }
    }
}

/// Where a result image is written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSink {
    Path(PathBuf),
    Stdout,
}

impl ImageSink {
    /// Whether the sink is the standard output stream
    #[must_use]
    pub fn is_stdout(&self) -> bool {
        matches!(self, Self::Stdout)
    }
}

impl FromStr for ImageSink {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(BgRemovalError::invalid_config("Output path must not be empty")),
            STDIO_TOKEN => Ok(Self::Stdout),
            path => Ok(Self::Path(PathBuf::from(path))),
        }
    }
}

impl std::fmt::Display for ImageSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Stdout => write!(f, "<stdout>"),
        }
    }
}

/// Service for handling image input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path as 8-bit RGB
    ///
    /// # Errors
    /// - `Io` when the file is missing or unreadable
    /// - `Decode` when the content is not a supported image
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bg_remover::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("input.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(BgRemovalError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        // Content sniffing rather than the extension decides the format
        let data = std::fs::read(path_ref)
            .map_err(|e| BgRemovalError::file_io_error("read image data", path_ref, &e))?;
        Self::load_from_bytes(&data).map_err(|e| match e {
            BgRemovalError::Decode(msg) => {
                BgRemovalError::decode(format!("{msg} (path: {})", path_ref.display()))
            },
            other => other,
        })
    }

    /// Decode image bytes to 8-bit RGB, dropping any alpha channel
    ///
    /// # Errors
    /// - `Decode` when the bytes are empty or not a supported image
    pub fn load_from_bytes(bytes: &[u8]) -> Result<RgbImage> {
        if bytes.is_empty() {
            return Err(BgRemovalError::decode("Image data is empty"));
        }
        let image = image::load_from_memory(bytes)
            .map_err(|e| BgRemovalError::decode(format!("Failed to decode image: {e}")))?;
        log::debug!(
            "Decoded {}x{} image ({:?})",
            image.width(),
            image.height(),
            image.color()
        );
        Ok(image.to_rgb8())
    }

    /// Read the whole of standard input
    ///
    /// # Errors
    /// - `Io` when stdin cannot be read
    /// - `Decode` when stdin is empty
    pub fn read_stdin() -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        std::io::stdin().lock().read_to_end(&mut buffer)?;
        if buffer.is_empty() {
            return Err(BgRemovalError::decode("No data received from stdin"));
        }
        Ok(buffer)
    }

    /// Read encoded image bytes from a source
    ///
    /// # Errors
    /// - `Io` when the source cannot be read
    /// - `Decode` when stdin is empty
    pub fn read_source(source: &ImageSource) -> Result<Vec<u8>> {
        match source {
            ImageSource::Path(path) => std::fs::read(path)
                .map_err(|e| BgRemovalError::file_io_error("read input image", path, &e)),
            ImageSource::Stdin => Self::read_stdin(),
        }
    }

    /// Write a PNG to a file, creating missing parent directories
    ///
    /// # Errors
    /// - `Encode` when PNG encoding fails
    /// - `Io` when the directory or file cannot be written
    pub fn save_png<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                BgRemovalError::file_io_error("create output directory", parent, &e)
            })?;
        }

        let bytes = encode_png(image)?;
        std::fs::write(path_ref, bytes)
            .map_err(|e| BgRemovalError::file_io_error("write PNG file", path_ref, &e))
    }

    /// Write encoded PNG bytes to standard output
    ///
    /// # Errors
    /// - `Io` when stdout cannot be written
    pub fn write_stdout(bytes: &[u8]) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(bytes)?;
        stdout.flush()?;
        Ok(())
    }

    /// Encode an image as PNG and send it to a sink
    ///
    /// # Errors
    /// - Any error from [`Self::save_png`] or [`Self::write_stdout`]
    pub fn write_sink(image: &RgbaImage, sink: &ImageSink) -> Result<()> {
        match sink {
            ImageSink::Path(path) => Self::save_png(image, path),
            ImageSink::Stdout => Self::write_stdout(&encode_png(image)?),
        }
    }

    /// Read an async stream to the end
    ///
    /// # Errors
    /// - `Io` when the stream fails
    /// - `Decode` when the stream is empty
    pub async fn read_all<R: tokio::io::AsyncRead + Unpin>(mut reader: R) -> Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        AsyncReadExt::read_to_end(&mut reader, &mut buffer).await?;
        if buffer.is_empty() {
            return Err(BgRemovalError::decode("No data received from stream"));
        }
        Ok(buffer)
    }

    /// Load an image from an async reader
    ///
    /// # Errors
    /// - Any error from [`Self::read_all`] or [`Self::load_from_bytes`]
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bg_remover::services::ImageIOService;
    /// use tokio::fs::File;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let file = File::open("image.jpg").await?;
    /// let image = ImageIOService::load_from_reader(file).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load_from_reader<R: tokio::io::AsyncRead + Unpin>(reader: R) -> Result<RgbImage> {
        let buffer = Self::read_all(reader).await?;
        Self::load_from_bytes(&buffer)
    }

    /// Encode an image as PNG and write it to an async writer
    ///
    /// # Errors
    /// - `Encode` when PNG encoding fails
    /// - `Io` when writing or flushing fails
    pub async fn save_to_writer<W: tokio::io::AsyncWrite + Unpin>(
        image: &RgbaImage,
        mut writer: W,
    ) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        let bytes = encode_png(image)?;
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn encoded(format: image::ImageFormat) -> Vec<u8> {
        let image = RgbImage::from_fn(8, 6, |x, y| Rgb([x as u8 * 30, y as u8 * 40, 90]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn test_source_and_sink_parsing() {
        assert_eq!("-".parse::<ImageSource>().unwrap(), ImageSource::Stdin);
        assert_eq!(
            "in.jpg".parse::<ImageSource>().unwrap(),
            ImageSource::Path(PathBuf::from("in.jpg"))
        );
        assert!("".parse::<ImageSource>().is_err());

        let sink = "-".parse::<ImageSink>().unwrap();
        assert!(sink.is_stdout());
        assert!(!"out.png".parse::<ImageSink>().unwrap().is_stdout());
        assert!(" ".parse::<ImageSink>().is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = ImageIOService::load_image("nonexistent.jpg").unwrap_err();
        assert!(matches!(err, BgRemovalError::Io(_)));
        assert!(err.to_string().contains("nonexistent.jpg"));
    }

    #[test]
    fn test_load_from_bytes_formats() {
        for format in [
            image::ImageFormat::Png,
            image::ImageFormat::Jpeg,
            image::ImageFormat::Bmp,
            image::ImageFormat::Tiff,
        ] {
            let image = ImageIOService::load_from_bytes(&encoded(format)).unwrap();
            assert_eq!(image.dimensions(), (8, 6), "{format:?}");
        }
    }

    #[test]
    fn test_load_from_bytes_invalid() {
        assert!(matches!(
            ImageIOService::load_from_bytes(b"definitely not an image"),
            Err(BgRemovalError::Decode(_))
        ));
        assert!(matches!(
            ImageIOService::load_from_bytes(&[]),
            Err(BgRemovalError::Decode(_))
        ));
    }

    #[test]
    fn test_alpha_input_is_flattened_to_rgb() {
        let rgba = RgbaImage::from_pixel(3, 3, Rgba([10, 20, 30, 0]));
        let bytes = encode_png(&rgba).unwrap();
        let image = ImageIOService::load_from_bytes(&bytes).unwrap();
        assert_eq!(image.get_pixel(1, 1), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_load_image_sniffs_content() {
        let dir = tempdir().unwrap();
        // PNG content behind a misleading extension
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, encoded(image::ImageFormat::Png)).unwrap();
        assert_eq!(ImageIOService::load_image(&path).unwrap().dimensions(), (8, 6));
    }

    #[test]
    fn test_load_image_garbage_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"garbage").unwrap();
        let err = ImageIOService::load_image(&path).unwrap_err();
        assert!(matches!(err, BgRemovalError::Decode(_)));
        assert!(err.to_string().contains("broken.png"));
    }

    #[test]
    fn test_read_source_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.png");
        let bytes = encoded(image::ImageFormat::Png);
        std::fs::write(&path, &bytes).unwrap();

        let source = ImageSource::Path(path);
        assert_eq!(ImageIOService::read_source(&source).unwrap(), bytes);

        let missing = ImageSource::Path(dir.path().join("missing.png"));
        let err = ImageIOService::read_source(&missing).unwrap_err();
        assert!(matches!(err, BgRemovalError::Io(_)));
        assert!(err.to_string().contains("missing.png"));
    }

    #[test]
    fn test_save_png_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested").join("dir").join("out.png");
        let image = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 128]));

        ImageIOService::save_png(&image, &nested).unwrap();
        let reloaded = image::open(&nested).unwrap().to_rgba8();
        assert_eq!(reloaded, image);
    }

    #[test]
    fn test_write_sink_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sink.png");
        let image = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 9]));
        ImageIOService::write_sink(&image, &ImageSink::Path(path.clone())).unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_async_reader_and_writer() {
        let image = ImageIOService::load_from_reader(Cursor::new(encoded(image::ImageFormat::Png)))
            .await
            .unwrap();
        assert_eq!(image.dimensions(), (8, 6));

        let rgba = RgbaImage::from_pixel(5, 5, Rgba([200, 100, 50, 25]));
        let mut out = Vec::new();
        ImageIOService::save_to_writer(&rgba, &mut out).await.unwrap();
        assert_eq!(image::load_from_memory(&out).unwrap().to_rgba8(), rgba);
    }

    #[tokio::test]
    async fn test_empty_stream_is_decode_error() {
        let err = ImageIOService::read_all(Cursor::new(Vec::<u8>::new())).await.unwrap_err();
        assert!(matches!(err, BgRemovalError::Decode(_)));
    }
}
