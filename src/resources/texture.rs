use std::{io::BufReader, path::Path};

use image::{ImageFormat, ImageReader, RgbaImage, imageops};

use crate::{error::LoadError, resources::open_source};

/// Decode an image file into RGBA8, flipped so that the first row is the bottom of the picture.
///
/// Mesh texture coordinates put v = 0 at the bottom of the image while image
/// files store their top row first.
pub fn decode_texture(path: impl AsRef<Path>) -> Result<RgbaImage, LoadError> {
    let path = path.as_ref();
    let file = open_source(path)?;
    // the format comes from the file's content, the extension is only a fallback
    let mut reader = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(|err| LoadError::unavailable(path, err))?;
    if reader.format().is_none() {
        if let Ok(format) = ImageFormat::from_path(path) {
            reader.set_format(format);
        }
    }
    let image = reader.decode().map_err(|source| LoadError::TextureDecodeFailure {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(imageops::flip_vertical(&image.to_rgba8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Unavailable;

    #[test]
    fn decoded_rows_are_flipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stripes.png");
        let mut stripes = RgbaImage::new(1, 2);
        stripes.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        stripes.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
        stripes.save(&path).unwrap();

        let decoded = decode_texture(&path).unwrap();
        assert_eq!(decoded.get_pixel(0, 0), &image::Rgba([0, 0, 255, 255]));
        assert_eq!(decoded.get_pixel(0, 1), &image::Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn format_is_detected_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hull_texture");
        RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let decoded = decode_texture(&path).unwrap();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(1, 1), &image::Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn misleading_extension_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hull.jpg");
        RgbaImage::from_pixel(1, 1, image::Rgba([200, 0, 0, 255]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let decoded = decode_texture(&path).unwrap();
        assert_eq!(decoded.get_pixel(0, 0), &image::Rgba([200, 0, 0, 255]));
    }

    #[test]
    fn garbage_is_a_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(
            decode_texture(&path),
            Err(LoadError::TextureDecodeFailure { .. })
        ));
    }

    #[test]
    fn missing_texture_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            decode_texture(dir.path().join("nope.png")),
            Err(LoadError::SourceUnavailable {
                reason: Unavailable::Missing,
                ..
            })
        ));
    }
}
