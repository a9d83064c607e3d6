//! Shared kernel variant model.

use crate::config::{ArchRange, DataType, GeneratorTables, Precision, SM_AMPERE};
use crate::render::RenderedEntryPoint;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Forward,
    Backward,
}

impl Family {
    /// Tag embedded in entry point names and default artifact names.
    pub fn tag(&self) -> &'static str {
        match self {
            Family::Forward => "cutlassF",
            Family::Backward => "cutlassB",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Forward => f.write_str("forward"),
            Family::Backward => f.write_str("backward"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionRule {
    ReducedPrecisionBeforeSm80,
    UnalignedFromSm80,
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionRule::ReducedPrecisionBeforeSm80 => {
                write!(f, "reduced precision requires sm{}+", SM_AMPERE)
            }
            ExclusionRule::UnalignedFromSm80 => {
                write!(f, "unaligned kernels are only built below sm{}", SM_AMPERE)
            }
        }
    }
}

/// Returns the rule a combination breaks, if any. Both families share it.
pub fn exclusion(dtype: DataType, aligned: bool, arch: ArchRange) -> Option<ExclusionRule> {
    if dtype.is_reduced_precision() && arch.sm_min < SM_AMPERE {
        return Some(ExclusionRule::ReducedPrecisionBeforeSm80);
    }
    if !aligned && arch.sm_min >= SM_AMPERE {
        return Some(ExclusionRule::UnalignedFromSm80);
    }
    None
}

/// Alignment × precision × capability range, in cross-product order, with
/// excluded combinations removed.
pub fn base_combinations(tables: &GeneratorTables) -> Vec<(bool, &Precision, ArchRange)> {
    let ranges = tables.arch_ranges();
    let mut combinations = Vec::new();
    for aligned in [true, false] {
        for precision in &tables.precisions {
            for &arch in &ranges {
                if exclusion(precision.dtype, aligned, arch).is_none() {
                    combinations.push((aligned, precision, arch));
                }
            }
        }
    }
    combinations
}

/// A kernel class name and its template arguments in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateInstantiation {
    pub class: &'static str,
    pub args: Vec<String>,
}

impl TemplateInstantiation {
    pub fn new(class: &'static str, args: Vec<String>) -> Self {
        Self { class, args }
    }
}

impl fmt::Display for TemplateInstantiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.class, self.args.join(", "))
    }
}

/// Runtime dispatch category: one dispatch helper is emitted per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CategoryKey {
    pub dtype: DataType,
    pub arch: ArchRange,
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / sm{}", self.dtype, self.arch.sm_min)
    }
}

/// One fully specialized kernel of a family.
///
/// `Ord` is the dispatch priority: at runtime the first kernel in ascending
/// order whose static constraints accept the inputs is selected. Derived
/// properties are computed once at construction and never change.
pub trait KernelVariant: Ord + fmt::Debug {
    const FAMILY: Family;

    /// Every variant of the family for the given tables, in cross-product
    /// order.
    fn enumerate(tables: &GeneratorTables) -> Vec<Self>
    where
        Self: Sized;

    fn precision(&self) -> &Precision;
    fn aligned(&self) -> bool;
    fn arch(&self) -> ArchRange;
    fn name(&self) -> &str;
    fn template(&self) -> &TemplateInstantiation;
    /// Key of the compilation unit the definition is emitted into.
    fn impl_group(&self) -> &str;
    fn entry_point(&self) -> &RenderedEntryPoint;

    fn dtype(&self) -> DataType {
        self.precision().dtype
    }

    fn category(&self) -> CategoryKey {
        CategoryKey {
            dtype: self.dtype(),
            arch: self.arch(),
        }
    }

    fn exclusion(&self) -> Option<ExclusionRule> {
        exclusion(self.dtype(), self.aligned(), self.arch())
    }
}

pub(crate) fn bool_arg(value: bool) -> String {
    let arg = if value { "true" } else { "false" };
    arg.to_string()
}

pub(crate) fn aligned_suffix(aligned: bool) -> &'static str {
    if aligned {
        "aligned"
    } else {
        "notaligned"
    }
}

/// Lower rank wins: 0 when the preferred property holds.
pub(crate) fn rank(preferred: bool) -> u8 {
    if preferred {
        0
    } else {
        1
    }
}
