use serde::{Deserialize, Serialize};
use std::fmt;

/// Voxel element type of a data layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementClass {
    Uint8,
    Uint16,
    Uint24,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
}

impl ElementClass {
    /// Bytes occupied by one voxel
    pub fn byte_count(self) -> u32 {
        match self {
            ElementClass::Uint8 | ElementClass::Int8 => 1,
            ElementClass::Uint16 | ElementClass::Int16 => 2,
            ElementClass::Uint24 => 3,
            ElementClass::Uint32 | ElementClass::Int32 | ElementClass::Float => 4,
            ElementClass::Uint64 | ElementClass::Int64 | ElementClass::Double => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, ElementClass::Float)
    }
}

/// Opaque layer handle; layer names are unique within a dataset
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(name: &str) -> Self {
        LayerId(name.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerCategory {
    #[default]
    Color,
    Segmentation,
}

#[derive(Debug, Clone, Deserialize)]
struct RawLayer {
    name: String,
    element_class: ElementClass,
    #[serde(default)]
    category: LayerCategory,
}

/// One rendered channel of the dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "RawLayer")]
pub struct LayerDescriptor {
    pub id: LayerId,
    pub element_class: ElementClass,
    pub element_byte_count: u32,
    pub is_segmentation: bool,
}

impl From<RawLayer> for LayerDescriptor {
    fn from(raw: RawLayer) -> Self {
        Self::new(&raw.name, raw.element_class, raw.category)
    }
}

impl LayerDescriptor {
    pub fn new(name: &str, element_class: ElementClass, category: LayerCategory) -> Self {
        Self {
            id: LayerId::from(name),
            element_class,
            element_byte_count: element_class.byte_count(),
            is_segmentation: category == LayerCategory::Segmentation,
        }
    }

    pub fn color(name: &str, element_class: ElementClass) -> Self {
        Self::new(name, element_class, LayerCategory::Color)
    }

    pub fn segmentation(name: &str, element_class: ElementClass) -> Self {
        Self::new(name, element_class, LayerCategory::Segmentation)
    }

    pub fn name(&self) -> &str {
        &self.id.0
    }

    /// Size of one bucket payload of this layer
    pub fn bucket_byte_length(&self) -> usize {
        crate::constants::BUCKET_SIZE as usize * self.element_byte_count as usize
    }
}
