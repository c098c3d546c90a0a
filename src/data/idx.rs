//! MNIST-style IDX files as a dataset provider.
//!
//! # IDX3 image file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x03        (number of dimensions = 3)
//! bytes  4-7:   N           (number of images, big-endian u32)
//! bytes  8-11:  rows        (image height in pixels, big-endian u32)
//! bytes 12-15:  cols        (image width in pixels, big-endian u32)
//! bytes 16..:   N * rows * cols bytes, row-major, uint8
//! ```
//!
//! # IDX1 label file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x01        (number of dimensions = 1)
//! bytes  4-7:   N           (number of labels, big-endian u32)
//! bytes  8..:   N bytes, each a class index
//! ```

use std::path::{Path, PathBuf};

use log::info;

use crate::data::dataset::{DatasetProvider, RawImage, RawSplit};
use crate::error::{Error, Result};

/// Reads the big-endian u32 at `offset`.
fn be_u32(bytes: &[u8], offset: usize) -> usize {
    u32::from_be_bytes([
        bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3],
    ]) as usize
}

/// Checks the 4-byte magic of an IDX file with `dims` dimensions and
/// returns the declared dimension sizes.
fn read_header(bytes: &[u8], dims: u8, what: &str) -> Result<Vec<usize>> {
    let header_len = 4 + 4 * dims as usize;
    if bytes.len() < header_len {
        return Err(Error::Dataset(format!(
            "IDX {what} file too short: expected at least {header_len} header bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[0] != 0x00 || bytes[1] != 0x00 {
        return Err(Error::Dataset(format!(
            "IDX {what} file: bytes 0-1 must be 0x00 0x00, got 0x{:02X} 0x{:02X}",
            bytes[0], bytes[1]
        )));
    }
    if bytes[2] != 0x08 {
        return Err(Error::Dataset(format!(
            "IDX {what} file: dtype must be 0x08 (uint8), got 0x{:02X}",
            bytes[2]
        )));
    }
    if bytes[3] != dims {
        return Err(Error::Dataset(format!(
            "IDX {what} file: expected {dims} dimensions, got {}",
            bytes[3]
        )));
    }
    Ok((0..dims as usize).map(|d| be_u32(bytes, 4 + 4 * d)).collect())
}

/// Parses an IDX3 image file and its IDX1 label file into a raw split.
pub fn parse_idx_pair(image_bytes: &[u8], label_bytes: &[u8]) -> Result<RawSplit> {
    let dims = read_header(image_bytes, 3, "image")?;
    let (n_items, rows, cols) = (dims[0], dims[1], dims[2]);

    let n_pixels = rows.checked_mul(cols).ok_or_else(|| {
        Error::Dataset(format!("IDX image file: rows * cols overflows (rows={rows}, cols={cols})"))
    })?;
    let required = n_items
        .checked_mul(n_pixels)
        .and_then(|n| n.checked_add(16))
        .ok_or_else(|| Error::Dataset("IDX image file: data length overflows".to_owned()))?;
    if image_bytes.len() < required {
        return Err(Error::Dataset(format!(
            "IDX image file too short: header declares {n_items} images of {rows}x{cols} \
             ({required} bytes total), file is {} bytes",
            image_bytes.len()
        )));
    }

    let label_count = read_header(label_bytes, 1, "label")?[0];
    if label_count != n_items {
        return Err(Error::Dataset(format!(
            "IDX file mismatch: {n_items} images but {label_count} labels"
        )));
    }
    if label_bytes.len() < 8 + n_items {
        return Err(Error::Dataset(format!(
            "IDX label file too short: header declares {n_items} labels, file is {} bytes",
            label_bytes.len()
        )));
    }

    let images = image_bytes[16..required]
        .chunks_exact(n_pixels.max(1))
        .take(n_items)
        .map(|chunk| RawImage::new(cols, rows, chunk.to_vec()))
        .collect();
    let labels = label_bytes[8..8 + n_items].iter().map(|&l| l as usize).collect();

    Ok(RawSplit { images, labels })
}

/// The four IDX files of an MNIST-style dataset.
#[derive(Debug, Clone)]
pub struct IdxDataset {
    pub train_images: PathBuf,
    pub train_labels: PathBuf,
    pub test_images: PathBuf,
    pub test_labels: PathBuf,
}

impl IdxDataset {
    /// Uses the canonical MNIST file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> IdxDataset {
        let dir = dir.as_ref();
        IdxDataset {
            train_images: dir.join("train-images-idx3-ubyte"),
            train_labels: dir.join("train-labels-idx1-ubyte"),
            test_images: dir.join("t10k-images-idx3-ubyte"),
            test_labels: dir.join("t10k-labels-idx1-ubyte"),
        }
    }

    fn load_split(images: &Path, labels: &Path) -> Result<RawSplit> {
        let image_bytes = std::fs::read(images).map_err(|e| {
            Error::Dataset(format!("cannot read '{}': {e}", images.display()))
        })?;
        let label_bytes = std::fs::read(labels).map_err(|e| {
            Error::Dataset(format!("cannot read '{}': {e}", labels.display()))
        })?;
        parse_idx_pair(&image_bytes, &label_bytes)
    }
}

impl DatasetProvider for IdxDataset {
    fn load(&self) -> Result<(RawSplit, RawSplit)> {
        let train = Self::load_split(&self.train_images, &self.train_labels)?;
        let test = Self::load_split(&self.test_images, &self.test_labels)?;
        info!("loaded {} training and {} test images", train.len(), test.len());
        Ok((train, test))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx_images(rows: u32, cols: u32, images: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = vec![0x00, 0x00, 0x08, 0x03];
        bytes.extend_from_slice(&(images.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&rows.to_be_bytes());
        bytes.extend_from_slice(&cols.to_be_bytes());
        for img in images {
            bytes.extend_from_slice(img);
        }
        bytes
    }

    fn idx_labels(labels: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x00, 0x00, 0x08, 0x01];
        bytes.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        bytes.extend_from_slice(labels);
        bytes
    }

    #[test]
    fn parses_images_and_labels() {
        let images = idx_images(2, 3, &[vec![0, 1, 2, 3, 4, 5], vec![255; 6]]);
        let labels = idx_labels(&[7, 2]);
        let split = parse_idx_pair(&images, &labels).unwrap();
        assert_eq!(split.len(), 2);
        assert_eq!((split.images[0].width, split.images[0].height), (3, 2));
        assert_eq!(split.images[0].pixels, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(split.labels, vec![7, 2]);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut images = idx_images(1, 1, &[vec![0]]);
        images[3] = 0x02;
        let err = parse_idx_pair(&images, &idx_labels(&[0])).unwrap_err();
        assert!(err.to_string().contains("dimensions"));
    }

    #[test]
    fn rejects_count_mismatch_and_truncation() {
        let images = idx_images(1, 2, &[vec![0, 0], vec![1, 1]]);
        assert!(parse_idx_pair(&images, &idx_labels(&[0])).is_err());

        let truncated = &images[..images.len() - 1];
        assert!(matches!(
            parse_idx_pair(truncated, &idx_labels(&[0, 1])),
            Err(Error::Dataset(_))
        ));
    }

    #[test]
    fn provider_reads_files_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let files = IdxDataset::in_dir(dir.path());
        std::fs::write(&files.train_images, idx_images(1, 2, &[vec![9, 9]])).unwrap();
        std::fs::write(&files.train_labels, idx_labels(&[4])).unwrap();
        std::fs::write(&files.test_images, idx_images(1, 2, &[vec![1, 2], vec![3, 4]])).unwrap();
        std::fs::write(&files.test_labels, idx_labels(&[0, 1])).unwrap();

        let (train, test) = files.load().unwrap();
        assert_eq!((train.len(), test.len()), (1, 2));
        assert_eq!(train.labels, vec![4]);
    }

    #[test]
    fn missing_file_is_a_dataset_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(IdxDataset::in_dir(dir.path()).load(), Err(Error::Dataset(_))));
    }
}
