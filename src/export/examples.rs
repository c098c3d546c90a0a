//! One representative input per class, as a PNG and as a JSON matrix.

use std::path::{Path, PathBuf};

use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};
use log::info;
use serde::Serialize;

use crate::data::dataset::{to_grid, EncodedDataset};
use crate::error::{Error, Result};
use crate::network::config::{ArchitectureConfig, InputShape};

/// The input chosen for one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassExample {
    pub class_index: usize,
    pub name: String,
    /// `height` rows of `width` values in {0.0, 1.0}.
    pub matrix: Vec<Vec<f64>>,
}

/// Where one class's example landed on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedExample {
    pub class_index: usize,
    pub name: String,
    pub png: PathBuf,
    pub json: PathBuf,
}

#[derive(Serialize)]
struct MatrixDump<'a> {
    matrix: &'a [Vec<f64>],
}

/// Picks and writes one example per class under `out_dir`.
pub struct ExampleExporter<'a> {
    config: &'a ArchitectureConfig,
    out_dir: PathBuf,
}

impl<'a> ExampleExporter<'a> {
    pub fn new(config: &'a ArchitectureConfig, out_dir: impl Into<PathBuf>) -> Self {
        ExampleExporter { config, out_dir: out_dir.into() }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Chooses the example of every class.
    ///
    /// The "none" class gets an all-zero grid. Every other class gets the
    /// first sample of `test`, in split order, whose one-hot label marks it.
    /// Since synthetic samples sit after the real ones, they never shadow a
    /// real first occurrence.
    pub fn select(&self, test: &EncodedDataset) -> Result<Vec<ClassExample>> {
        let shape = self.config.input;
        if test.shape != shape {
            return Err(Error::mismatch(
                "export",
                "input",
                format!("{}x{}", shape.width, shape.height),
                format!("{}x{}", test.shape.width, test.shape.height),
            ));
        }

        let none = self.config.none_index();
        (0..self.config.num_classes())
            .map(|c| -> Result<ClassExample> {
                let name = self.config.class_name(c).to_owned();
                let pixels = if c == none {
                    vec![0.0; shape.len()]
                } else {
                    let pos = test.labels
                        .iter()
                        .position(|label| label.get(c) == Some(&1.0))
                        .ok_or_else(|| Error::NoExampleFound { class: name.clone(), index: c })?;
                    test.inputs[pos].clone()
                };
                Ok(ClassExample { class_index: c, name, matrix: to_grid(&pixels, shape) })
            })
            .collect()
    }

    /// Selects the examples, then writes them.
    ///
    /// A missing class aborts before the first file is created.
    pub fn export(&self, test: &EncodedDataset) -> Result<Vec<ExportedExample>> {
        let examples = self.select(test)?;
        self.write(&examples)
    }

    /// Encodes every example in memory, then writes `<name>.png` and
    /// `<name>.json` for each one, creating the output directory if needed.
    pub fn write(&self, examples: &[ClassExample]) -> Result<Vec<ExportedExample>> {
        let mut encoded = Vec::with_capacity(examples.len());
        for example in examples {
            let png = encode_png(&example.matrix, self.config.input)?;
            let json = serde_json::to_vec(&MatrixDump { matrix: &example.matrix })?;
            encoded.push((example, png, json));
        }

        std::fs::create_dir_all(&self.out_dir)?;

        let mut written = Vec::with_capacity(encoded.len());
        for (example, png, json) in encoded {
            let png_path = self.out_dir.join(format!("{}.png", example.name));
            let json_path = self.out_dir.join(format!("{}.json", example.name));
            std::fs::write(&png_path, png)?;
            std::fs::write(&json_path, json)?;
            written.push(ExportedExample {
                class_index: example.class_index,
                name: example.name.clone(),
                png: png_path,
                json: json_path,
            });
        }

        info!("wrote {} class examples to {}", written.len(), self.out_dir.display());
        Ok(written)
    }
}

/// 8-bit grayscale PNG, 0.0 → black and 1.0 → white.
fn encode_png(matrix: &[Vec<f64>], shape: InputShape) -> Result<Vec<u8>> {
    let pixels: Vec<u8> = matrix
        .iter()
        .flatten()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();

    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        &pixels,
        shape.width as u32,
        shape.height as u32,
        ColorType::L8,
    )?;
    Ok(bytes)
}
