//! Forward attention kernel variants.

use crate::config::{ArchRange, ForwardShape, GeneratorTables, Precision};
use crate::render::{EntryPoint, RenderedEntryPoint};
use crate::variant::{
    aligned_suffix, base_combinations, bool_arg, rank, Family, KernelVariant,
    TemplateInstantiation,
};
use std::cmp::Ordering;

/// Attributes that identify a forward kernel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForwardAttrs {
    pub precision: Precision,
    pub aligned: bool,
    pub arch: ArchRange,
    pub shape: ForwardShape,
    /// Kernel can apply dropout. It still serves requests without dropout.
    pub supports_dropout: bool,
    /// Kernel can add an attention bias. It still serves requests without one.
    pub supports_bias: bool,
}

/// Dispatch priority of a forward kernel, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForwardPriority {
    alignment: u8,
    accumulator: u8,
    k_tile: u32,
    dropout: u8,
    bias: u8,
}

impl ForwardPriority {
    fn new(attrs: &ForwardAttrs) -> Self {
        Self {
            alignment: rank(attrs.aligned),
            accumulator: rank(attrs.shape.single_value_iter),
            k_tile: attrs.shape.k_tile,
            // Kernels without the optional features are cheaper
            dropout: rank(!attrs.supports_dropout),
            bias: rank(!attrs.supports_bias),
        }
    }
}

impl Ord for ForwardPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.alignment
            .cmp(&other.alignment)
            .then_with(|| self.accumulator.cmp(&other.accumulator))
            .then_with(|| self.k_tile.cmp(&other.k_tile))
            .then_with(|| self.dropout.cmp(&other.dropout))
            .then_with(|| self.bias.cmp(&other.bias))
    }
}

impl PartialOrd for ForwardPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
pub struct ForwardVariant {
    attrs: ForwardAttrs,
    priority: ForwardPriority,
    name: String,
    template: TemplateInstantiation,
    impl_group: String,
    entry_point: RenderedEntryPoint,
}

impl ForwardVariant {
    pub fn new(attrs: ForwardAttrs) -> Self {
        let priority = ForwardPriority::new(&attrs);
        let ForwardAttrs {
            precision,
            aligned,
            arch,
            shape,
            supports_dropout,
            supports_bias,
        } = &attrs;

        let accumulator = if shape.single_value_iter { "rf" } else { "gmem" };
        let name = format!(
            "fmha_{}_{}_{}_{}x{}_{}_sm{}",
            Family::Forward.tag(),
            precision.dtype,
            aligned_suffix(*aligned),
            shape.q_tile,
            shape.k_tile,
            accumulator,
            arch.sm_min
        );

        let template = TemplateInstantiation::new(
            "AttentionKernel",
            vec![
                precision.cpp_type.clone(),
                format!("cutlass::arch::Sm{}", arch.sm_min),
                bool_arg(*aligned),
                shape.q_tile.to_string(),
                shape.k_tile.to_string(),
                bool_arg(shape.single_value_iter),
                bool_arg(*supports_dropout),
                bool_arg(*supports_bias),
            ],
        );

        let impl_group = format!("{}_{}", precision.dtype, aligned_suffix(*aligned));
        let class = template.to_string();
        let entry_point = EntryPoint::new(&class, &name, *arch).render();

        Self {
            attrs,
            priority,
            name,
            template,
            impl_group,
            entry_point,
        }
    }

    pub fn attrs(&self) -> &ForwardAttrs {
        &self.attrs
    }

    pub fn priority(&self) -> ForwardPriority {
        self.priority
    }

    pub fn shape(&self) -> ForwardShape {
        self.attrs.shape
    }

    pub fn supports_dropout(&self) -> bool {
        self.attrs.supports_dropout
    }

    pub fn supports_bias(&self) -> bool {
        self.attrs.supports_bias
    }
}

impl KernelVariant for ForwardVariant {
    const FAMILY: Family = Family::Forward;

    fn enumerate(tables: &GeneratorTables) -> Vec<Self> {
        let mut variants = Vec::new();
        for (aligned, precision, arch) in base_combinations(tables) {
            for &shape in &tables.forward_shapes {
                variants.push(ForwardVariant::new(ForwardAttrs {
                    precision: precision.clone(),
                    aligned,
                    arch,
                    shape,
                    supports_dropout: true,
                    supports_bias: true,
                }));
            }
        }
        variants
    }

    fn precision(&self) -> &Precision {
        &self.attrs.precision
    }

    fn aligned(&self) -> bool {
        self.attrs.aligned
    }

    fn arch(&self) -> ArchRange {
        self.attrs.arch
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn template(&self) -> &TemplateInstantiation {
        &self.template
    }

    fn impl_group(&self) -> &str {
        &self.impl_group
    }

    fn entry_point(&self) -> &RenderedEntryPoint {
        &self.entry_point
    }
}

/// Priority first; kernels that tie on priority (different categories, as a
/// rule) fall back to their identity so the order stays strict and stable
/// across runs.
impl Ord for ForwardVariant {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.attrs, &other.attrs);
        self.priority
            .cmp(&other.priority)
            .then_with(|| a.aligned.cmp(&b.aligned))
            .then_with(|| a.precision.dtype.tag().cmp(b.precision.dtype.tag()))
            .then_with(|| a.arch.sm_min.cmp(&b.arch.sm_min))
            .then_with(|| a.arch.sm_max.cmp(&b.arch.sm_max))
            .then_with(|| a.shape.q_tile.cmp(&b.shape.q_tile))
            .then_with(|| a.shape.k_tile.cmp(&b.shape.k_tile))
            .then_with(|| a.shape.single_value_iter.cmp(&b.shape.single_value_iter))
            .then_with(|| a.supports_dropout.cmp(&b.supports_dropout))
            .then_with(|| a.supports_bias.cmp(&b.supports_bias))
            .then_with(|| a.precision.cpp_type.cmp(&b.precision.cpp_type))
    }
}

impl PartialOrd for ForwardVariant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ForwardVariant {
    fn eq(&self, other: &Self) -> bool {
        self.attrs == other.attrs
    }
}

impl Eq for ForwardVariant {}
