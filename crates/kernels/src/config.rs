//! Generator configuration tables.

use crate::error::{GenerateError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of the last capability range.
pub const SM_SENTINEL: u32 = 90;

/// First capability tier where reduced-precision kernels exist and where
/// unaligned kernels are no longer generated.
pub const SM_AMPERE: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    F32,
    F16,
    BF16,
}

impl DataType {
    pub fn tag(&self) -> &'static str {
        match self {
            DataType::F32 => "f32",
            DataType::F16 => "f16",
            DataType::BF16 => "bf16",
        }
    }

    /// bf16-class types only have hardware support from sm80 onwards.
    pub fn is_reduced_precision(&self) -> bool {
        matches!(self, DataType::BF16)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A precision tag together with the C++ type it instantiates the kernel with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Precision {
    pub dtype: DataType,
    pub cpp_type: String,
}

impl Precision {
    pub fn new<T: Into<String>>(dtype: DataType, cpp_type: T) -> Self {
        Self {
            dtype,
            cpp_type: cpp_type.into(),
        }
    }
}

/// Half-open compute capability range `[sm_min, sm_max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchRange {
    pub sm_min: u32,
    pub sm_max: u32,
}

impl ArchRange {
    pub fn new(sm_min: u32, sm_max: u32) -> Self {
        Self { sm_min, sm_max }
    }

    pub fn contains(&self, cc: u32) -> bool {
        self.sm_min <= cc && cc < self.sm_max
    }
}

impl fmt::Display for ArchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sm{}-sm{}", self.sm_min, self.sm_max)
    }
}

/// Block tiling of a forward kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForwardShape {
    pub q_tile: u32,
    pub k_tile: u32,
    /// Output accumulator stays in registers (`rf`) instead of global memory.
    pub single_value_iter: bool,
}

impl ForwardShape {
    pub fn new(q_tile: u32, k_tile: u32, single_value_iter: bool) -> Self {
        Self {
            q_tile,
            k_tile,
            single_value_iter,
        }
    }
}

/// Largest head dimension a backward kernel handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaxK(pub u32);

impl MaxK {
    /// Sentinel for kernels without a head dimension bound.
    pub const UNBOUNDED: MaxK = MaxK(1 << 16);

    pub fn is_unbounded(&self) -> bool {
        *self == Self::UNBOUNDED
    }
}

impl fmt::Display for MaxK {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every input the enumeration depends on.
///
/// Generation is a pure function of these tables: the same tables always
/// produce byte-identical artifacts. Order matters everywhere, it fixes the
/// cross-product order of the enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorTables {
    pub precisions: Vec<Precision>,
    /// Lower bounds of consecutive capability ranges.
    pub sm_boundaries: Vec<u32>,
    /// Upper bound of the final range.
    pub sm_sentinel: u32,
    pub forward_shapes: Vec<ForwardShape>,
    pub backward_max_k: Vec<MaxK>,
}

impl GeneratorTables {
    pub fn production() -> Self {
        Self {
            precisions: vec![
                Precision::new(DataType::F32, "float"),
                Precision::new(DataType::F16, "cutlass::half_t"),
                Precision::new(DataType::BF16, "cutlass::bfloat16_t"),
            ],
            sm_boundaries: vec![50, 70, 75, 80],
            sm_sentinel: SM_SENTINEL,
            forward_shapes: vec![
                ForwardShape::new(32, 128, true),
                ForwardShape::new(32, 128, false),
                ForwardShape::new(64, 64, true),
            ],
            backward_max_k: vec![MaxK(32), MaxK(64), MaxK(128), MaxK::UNBOUNDED],
        }
    }

    /// Consecutive boundary pairs; the last range ends at the sentinel.
    pub fn arch_ranges(&self) -> Vec<ArchRange> {
        self.sm_boundaries
            .iter()
            .zip(
                self.sm_boundaries
                    .iter()
                    .skip(1)
                    .chain(std::iter::once(&self.sm_sentinel)),
            )
            .map(|(&sm_min, &sm_max)| ArchRange::new(sm_min, sm_max))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.precisions.is_empty() {
            return Err(invalid("precision table is empty"));
        }
        for (index, precision) in self.precisions.iter().enumerate() {
            if self.precisions[..index]
                .iter()
                .any(|seen| seen.dtype == precision.dtype)
            {
                return Err(invalid(format!(
                    "precision `{}` listed more than once",
                    precision.dtype
                )));
            }
        }

        if self.sm_boundaries.is_empty() {
            return Err(invalid("no capability boundaries"));
        }
        if self.sm_boundaries.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(invalid(format!(
                "capability boundaries {:?} are not strictly increasing",
                self.sm_boundaries
            )));
        }
        if let Some(&last) = self.sm_boundaries.last() {
            if last >= self.sm_sentinel {
                return Err(invalid(format!(
                    "last boundary sm{} is not below the sentinel sm{}",
                    last, self.sm_sentinel
                )));
            }
        }

        if self.forward_shapes.is_empty() {
            return Err(invalid("no forward tile shapes"));
        }
        if self
            .forward_shapes
            .iter()
            .any(|shape| shape.q_tile == 0 || shape.k_tile == 0)
        {
            return Err(invalid("forward tile dimensions must be > 0"));
        }

        if self.backward_max_k.is_empty() {
            return Err(invalid("no backward max_k buckets"));
        }
        if self.backward_max_k.iter().any(|max_k| max_k.0 == 0) {
            return Err(invalid("backward max_k buckets must be > 0"));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for GeneratorTables {
    fn default() -> Self {
        Self::production()
    }
}

fn invalid<S: Into<String>>(reason: S) -> GenerateError {
    GenerateError::InvalidTables(reason.into())
}
