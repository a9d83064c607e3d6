//! Backward attention kernel variants.

use crate::config::{ArchRange, GeneratorTables, MaxK, Precision};
use crate::render::{EntryPoint, RenderedEntryPoint};
use crate::variant::{
    aligned_suffix, base_combinations, bool_arg, rank, Family, KernelVariant,
    TemplateInstantiation,
};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackwardAttrs {
    pub precision: Precision,
    pub aligned: bool,
    pub arch: ArchRange,
    /// Dropout is compiled in; such a kernel cannot serve dropout-free calls.
    pub apply_dropout: bool,
    pub max_k: MaxK,
}

/// Dispatch priority of a backward kernel, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackwardPriority {
    alignment: u8,
    dropout: u8,
    max_k: MaxK,
}

impl BackwardPriority {
    fn new(attrs: &BackwardAttrs) -> Self {
        Self {
            alignment: rank(attrs.aligned),
            dropout: rank(!attrs.apply_dropout),
            max_k: attrs.max_k,
        }
    }
}

impl Ord for BackwardPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.alignment
            .cmp(&other.alignment)
            .then_with(|| self.dropout.cmp(&other.dropout))
            .then_with(|| self.max_k.0.cmp(&other.max_k.0))
    }
}

impl PartialOrd for BackwardPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
pub struct BackwardVariant {
    attrs: BackwardAttrs,
    priority: BackwardPriority,
    name: String,
    template: TemplateInstantiation,
    impl_group: String,
    entry_point: RenderedEntryPoint,
}

impl BackwardVariant {
    pub fn new(attrs: BackwardAttrs) -> Self {
        let priority = BackwardPriority::new(&attrs);
        let BackwardAttrs {
            precision,
            aligned,
            arch,
            apply_dropout,
            max_k,
        } = &attrs;

        let dropout_suffix = if *apply_dropout { "_dropout" } else { "" };
        let name = format!(
            "fmha_{}_{}_{}_k{}{}_sm{}",
            Family::Backward.tag(),
            precision.dtype,
            aligned_suffix(*aligned),
            max_k,
            dropout_suffix,
            arch.sm_min
        );

        let template = TemplateInstantiation::new(
            "AttentionBackwardKernel",
            vec![
                format!("cutlass::arch::Sm{}", arch.sm_min),
                precision.cpp_type.clone(),
                bool_arg(*aligned),
                bool_arg(*apply_dropout),
                max_k.to_string(),
            ],
        );

        // One unit per size bucket and dropout mode keeps each file small
        let impl_group = format!(
            "{}_{}_k{}{}",
            precision.dtype,
            aligned_suffix(*aligned),
            max_k,
            dropout_suffix
        );
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

    pub fn attrs(&self) -> &BackwardAttrs {
        &self.attrs
    }

    pub fn priority(&self) -> BackwardPriority {
        self.priority
    }

    pub fn apply_dropout(&self) -> bool {
        self.attrs.apply_dropout
    }

    pub fn max_k(&self) -> MaxK {
        self.attrs.max_k
    }
}

impl KernelVariant for BackwardVariant {
    const FAMILY: Family = Family::Backward;

    fn enumerate(tables: &GeneratorTables) -> Vec<Self> {
        let mut variants = Vec::new();
        for (aligned, precision, arch) in base_combinations(tables) {
            for apply_dropout in [true, false] {
                for &max_k in &tables.backward_max_k {
                    variants.push(BackwardVariant::new(BackwardAttrs {
                        precision: precision.clone(),
                        aligned,
                        arch,
                        apply_dropout,
                        max_k,
                    }));
                }
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

impl Ord for BackwardVariant {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.attrs, &other.attrs);
        self.priority
            .cmp(&other.priority)
            .then_with(|| a.arch.sm_min.cmp(&b.arch.sm_min))
            .then_with(|| a.arch.sm_max.cmp(&b.arch.sm_max))
            .then_with(|| a.precision.dtype.tag().cmp(b.precision.dtype.tag()))
            .then_with(|| a.aligned.cmp(&b.aligned))
            .then_with(|| a.apply_dropout.cmp(&b.apply_dropout))
            .then_with(|| a.max_k.cmp(&b.max_k))
            .then_with(|| a.precision.cpp_type.cmp(&b.precision.cpp_type))
    }
}

impl PartialOrd for BackwardVariant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BackwardVariant {
    fn eq(&self, other: &Self) -> bool {
        self.attrs == other.attrs
    }
}

impl Eq for BackwardVariant {}
