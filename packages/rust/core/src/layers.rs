//! Raster layer loading.
//!
//! A layer pairs a discovered path with the image description decoded from
//! the file's first IFD. Files that do not decode as TIFF rasters are skipped.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use bandmerge_shared::{BandMergeError, Result};
use tiff::ColorType;
use tiff::decoder::Decoder;
use tiff::tags::Tag;
use tracing::{debug, info, warn};

/// A raster file that opened successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub color_type: ColorType,
}

/// Result of loading a list of paths.
#[derive(Debug, Default)]
pub struct LoadedLayers {
    /// Valid layers, in input order.
    pub layers: Vec<RasterLayer>,
    /// Paths that failed to load.
    pub skipped: Vec<PathBuf>,
}

/// Open `path` as a TIFF raster and read its first image description.
///
/// The strip (or tile) table must point inside the file; a truncated copy
/// whose header survived is still rejected.
pub fn open_raster(path: &Path) -> Result<RasterLayer> {
    let file = File::open(path).map_err(|e| BandMergeError::io(path, e))?;
    let file_len = file
        .metadata()
        .map_err(|e| BandMergeError::io(path, e))?
        .len();
    let invalid = |reason: String| BandMergeError::invalid_raster(path, reason);

    let mut decoder = Decoder::new(BufReader::new(file)).map_err(|e| invalid(e.to_string()))?;
    let (width, height) = decoder.dimensions().map_err(|e| invalid(e.to_string()))?;
    let color_type = decoder.colortype().map_err(|e| invalid(e.to_string()))?;
    check_data_extents(&mut decoder, file_len).map_err(invalid)?;

    Ok(RasterLayer {
        path: path.to_path_buf(),
        width,
        height,
        color_type,
    })
}

fn check_data_extents<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    file_len: u64,
) -> std::result::Result<(), String> {
    let tiled = decoder
        .find_tag(Tag::TileOffsets)
        .map_err(|e| e.to_string())?
        .is_some();
    let (offsets_tag, counts_tag) = if tiled {
        (Tag::TileOffsets, Tag::TileByteCounts)
    } else {
        (Tag::StripOffsets, Tag::StripByteCounts)
    };

    let offsets = decoder
        .find_tag_unsigned_vec::<u64>(offsets_tag)
        .map_err(|e| e.to_string())?
        .ok_or("no image data offsets")?;
    let counts = decoder
        .find_tag_unsigned_vec::<u64>(counts_tag)
        .map_err(|e| e.to_string())?
        .ok_or("no image data byte counts")?;

    if offsets.len() != counts.len() {
        return Err(format!(
            "{} data offsets but {} byte counts",
            offsets.len(),
            counts.len()
        ));
    }

    for (offset, count) in offsets.iter().zip(&counts) {
        let end = offset
            .checked_add(*count)
            .ok_or("image data extent overflows")?;
        if end > file_len {
            return Err(format!(
                "image data ends at byte {end}, past the end of the file ({file_len} bytes)"
            ));
        }
    }

    Ok(())
}

/// Load every path as a raster layer, skipping the ones that fail.
pub fn load_layers(paths: &[PathBuf]) -> LoadedLayers {
    let mut loaded = LoadedLayers::default();

    for path in paths {
        match open_raster(path) {
            Ok(layer) => {
                debug!(
                    path = %path.display(),
                    width = layer.width,
                    height = layer.height,
                    color_type = ?layer.color_type,
                    "layer loaded"
                );
                loaded.layers.push(layer);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load layer from path");
                loaded.skipped.push(path.clone());
            }
        }
    }

    info!(
        layers = loaded.layers.len(),
        skipped = loaded.skipped.len(),
        "layers loaded"
    );
    loaded
}

/// Small valid rasters for tests across the crate.
#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Cursor;
    use std::path::Path;

    use tiff::encoder::{TiffEncoder, colortype};

    /// Encode a 2x2 16-bit grayscale TIFF.
    pub(crate) fn gray16_tiff() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut buf).unwrap();
            encoder
                .write_image::<colortype::Gray16>(2, 2, &[0, 100, 200, 300])
                .unwrap();
        }
        buf.into_inner()
    }

    pub(crate) fn write_tiff(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, gray16_tiff()).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{gray16_tiff, write_tiff};
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bm-layers-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Uncompressed 1x1 8-bit grayscale TIFF whose only strip starts at `strip_offset`.
    fn one_pixel_tiff(strip_offset: u32) -> Vec<u8> {
        let entries: [(u16, u16, u32); 9] = [
            (256, 3, 1),            // ImageWidth
            (257, 3, 1),            // ImageLength
            (258, 3, 8),            // BitsPerSample
            (259, 3, 1),            // Compression: none
            (262, 3, 1),            // PhotometricInterpretation: BlackIsZero
            (273, 4, strip_offset), // StripOffsets
            (277, 3, 1),            // SamplesPerPixel
            (278, 3, 1),            // RowsPerStrip
            (279, 4, 1),            // StripByteCounts
        ];

        let mut bytes = b"II*\0".to_vec();
        bytes.extend_from_slice(&8u32.to_le_bytes());
        bytes.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, kind, value) in entries {
            bytes.extend_from_slice(&tag.to_le_bytes());
            bytes.extend_from_slice(&kind.to_le_bytes());
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(0x7f);
        bytes
    }

    #[test]
    fn encoded_tiff_loads_with_dimensions() {
        let dir = temp_dir();
        let path = dir.join("s_B4.TIF");
        write_tiff(&path);

        let layer = open_raster(&path).unwrap();
        assert_eq!((layer.width, layer.height), (2, 2));
        assert_eq!(layer.color_type, ColorType::Gray(16));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn valid_magic_with_bad_ifd_is_skipped() {
        let dir = temp_dir();
        let path = dir.join("x_B4.TIF");
        std::fs::write(&path, b"II*\0\xff\xff\xff\x7fgarbage").unwrap();

        let loaded = load_layers(std::slice::from_ref(&path));
        assert!(loaded.layers.is_empty());
        assert_eq!(loaded.skipped, vec![path.clone()]);

        let err = open_raster(&path).unwrap_err();
        assert!(matches!(err, BandMergeError::InvalidRaster { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn strip_past_end_of_file_is_invalid() {
        let dir = temp_dir();
        let path = dir.join("x_B5.TIF");
        std::fs::write(&path, one_pixel_tiff(4096)).unwrap();

        let err = open_raster(&path).unwrap_err();
        assert!(matches!(err, BandMergeError::InvalidRaster { .. }));
        assert!(err.to_string().contains("past the end of the file"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn truncated_tiff_is_invalid() {
        let dir = temp_dir();
        let path = dir.join("x_B6.TIF");
        let bytes = gray16_tiff();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(open_raster(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_layers_skips_invalid_files() {
        let dir = temp_dir();
        let good = dir.join("s_B4.TIF");
        let bad = dir.join("s_B5.TIF");
        let short = dir.join("s_B6.TIF");
        let missing = dir.join("s_B7.TIF");
        write_tiff(&good);
        std::fs::write(&bad, b"<html>oops</html>").unwrap();
        std::fs::write(&short, b"II").unwrap();

        let loaded = load_layers(&[good.clone(), bad.clone(), short.clone(), missing.clone()]);
        assert_eq!(loaded.layers.len(), 1);
        assert_eq!(loaded.layers[0].path, good);
        assert_eq!(loaded.skipped, vec![bad, short, missing]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
