use std::collections::HashSet;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

/// Name of the synthetic rejection class, always last in `classes`.
pub const NONE_CLASS: &str = "none";

/// Width and height of every input image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    pub width: usize,
    pub height: usize,
}

impl InputShape {
    /// Length of the flattened input vector.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One entry of the `layers` list.
///
/// Both fields are optional in the document: the flatten entry usually has
/// neither, and the output entry may omit `size` because the class list
/// decides it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default)]
    pub activation: Option<String>,
}

/// Declarative description of the classifier.
///
/// `layers[0]` is the flatten step; `layers[1..]` are the dense layers in
/// order, the last one being the output. The output width always equals
/// `classes.len()`, and the last class is the synthetic "none" class.
///
/// Loaded once and then passed by reference to every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    pub input: InputShape,
    pub classes: Vec<String>,
    pub layers: Vec<LayerConfig>,
}

impl ArchitectureConfig {
    /// Reads and validates a config file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<ArchitectureConfig> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(path.display().to_string(), format!("cannot read config file: {e}"))
        })?;
        Self::from_json_str(&text)
    }

    /// Parses and validates a config document.
    pub fn from_json_str(text: &str) -> Result<ArchitectureConfig> {
        let config: ArchitectureConfig = serde_json::from_str(text)
            .map_err(|e| Error::config("<document>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the structural rules that do not depend on any data.
    ///
    /// Activation names are resolved later, by the network builder.
    pub fn validate(&self) -> Result<()> {
        if self.input.width == 0 || self.input.height == 0 {
            return Err(Error::config(
                "input",
                format!("width and height must be positive, got {}x{}", self.input.width, self.input.height),
            ));
        }

        if self.classes.len() < 2 {
            return Err(Error::config(
                "classes",
                format!("need at least one real class plus \"none\", got {}", self.classes.len()),
            ));
        }
        let last = &self.classes[self.classes.len() - 1];
        if last.as_str() != NONE_CLASS {
            return Err(Error::config(
                format!("classes[{}]", self.classes.len() - 1),
                format!("the last class is the synthetic rejection class and must be named \"{NONE_CLASS}\", got `{last}`"),
            ));
        }
        let mut seen = HashSet::new();
        for (i, name) in self.classes.iter().enumerate() {
            if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(Error::config(
                    format!("classes[{i}]"),
                    format!("`{name}` cannot be used as an example file name"),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::config(format!("classes[{i}]"), format!("duplicate class `{name}`")));
            }
        }

        if self.layers.len() < 2 {
            return Err(Error::config(
                "layers",
                format!("need a flatten entry and at least one dense layer, got {} entries", self.layers.len()),
            ));
        }

        let output = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate().skip(1) {
            if layer.activation.is_none() {
                return Err(Error::config(format!("layers[{i}].activation"), "missing"));
            }
            if i == output {
                continue;
            }
            match layer.size {
                Some(size) if size > 0 => {}
                Some(_) => return Err(Error::config(format!("layers[{i}].size"), "must be positive")),
                None => return Err(Error::config(format!("layers[{i}].size"), "missing")),
            }
        }

        Ok(())
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Index of the synthetic rejection class, always the last one.
    pub fn none_index(&self) -> usize {
        self.classes.len() - 1
    }

    pub fn input_len(&self) -> usize {
        self.input.len()
    }

    /// The dense entries (`layers[1..]`), output last.
    pub fn dense_layers(&self) -> &[LayerConfig] {
        &self.layers[1..]
    }

    pub fn class_name(&self, index: usize) -> &str {
        &self.classes[index]
    }
}
