//! Partitions of an ordered kernel set.
//!
//! Both partitions keep the priority order of their input: groups appear in
//! the order of their first member and members keep their relative order.

use fmhagen_kernels::error::{GenerateError, Result};
use fmhagen_kernels::{CategoryKey, DataType, KernelVariant};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Kernels sharing a precision and capability range. Emitted as one dispatch
/// helper that offers its members in priority order.
#[derive(Debug)]
pub struct Category<'a, V> {
    pub key: CategoryKey,
    pub cpp_type: &'a str,
    pub variants: Vec<&'a V>,
}

impl<'a, V: KernelVariant> Category<'a, V> {
    /// First member accepted by `supports`, mirroring how the emitted
    /// dispatch callback picks a kernel.
    pub fn first_match<F>(&self, mut supports: F) -> Option<&'a V>
    where
        F: FnMut(&V) -> bool,
    {
        self.variants
            .iter()
            .copied()
            .find(|&variant| supports(variant))
    }
}

/// Kernels whose definitions share one source file.
#[derive(Debug)]
pub struct CompilationUnit<'a, V> {
    pub group: &'a str,
    pub variants: Vec<&'a V>,
}

#[derive(Debug)]
pub struct Grouping<'a, V> {
    categories: Vec<Category<'a, V>>,
    units: Vec<CompilationUnit<'a, V>>,
}

impl<'a, V: KernelVariant> Grouping<'a, V> {
    /// `variants` must already be in priority order.
    pub fn new(variants: &'a [V]) -> Self {
        let mut categories: IndexMap<CategoryKey, Category<'a, V>> = IndexMap::new();
        let mut units: IndexMap<&'a str, CompilationUnit<'a, V>> = IndexMap::new();

        for variant in variants {
            categories
                .entry(variant.category())
                .or_insert_with(|| Category {
                    key: variant.category(),
                    cpp_type: &variant.precision().cpp_type,
                    variants: Vec::new(),
                })
                .variants
                .push(variant);

            units
                .entry(variant.impl_group())
                .or_insert_with(|| CompilationUnit {
                    group: variant.impl_group(),
                    variants: Vec::new(),
                })
                .variants
                .push(variant);
        }

        Self {
            categories: categories.into_values().collect(),
            units: units.into_values().collect(),
        }
    }

    pub fn categories(&self) -> &[Category<'a, V>] {
        &self.categories
    }

    pub fn units(&self) -> &[CompilationUnit<'a, V>] {
        &self.units
    }

    /// Category the emitted top-level dispatch forwards to for a runtime
    /// precision and compute capability.
    pub fn select(&self, dtype: DataType, cc: u32) -> Option<&Category<'a, V>> {
        self.categories
            .iter()
            .find(|category| category.key.dtype == dtype && category.key.arch.contains(cc))
    }

    /// Checks both partitions cover `variants` exactly once.
    pub fn verify_partition(&self, variants: &[V]) -> Result<()> {
        let expected: HashSet<&str> = variants.iter().map(|variant| variant.name()).collect();

        let by_category = self
            .categories
            .iter()
            .flat_map(|category| category.variants.iter().map(|variant| variant.name()));
        check_cover::<V>("category", &expected, variants.len(), by_category)?;

        let by_unit = self
            .units
            .iter()
            .flat_map(|unit| unit.variants.iter().map(|variant| variant.name()));
        check_cover::<V>("compilation unit", &expected, variants.len(), by_unit)?;

        Ok(())
    }
}

fn check_cover<'n, V: KernelVariant>(
    grouping: &'static str,
    expected: &HashSet<&str>,
    total: usize,
    names: impl Iterator<Item = &'n str>,
) -> Result<()> {
    let mut seen = HashSet::new();
    let mut found = 0;
    for name in names {
        found += 1;
        if !expected.contains(name) || !seen.insert(name) {
            return Err(GenerateError::PartitionMismatch {
                family: V::FAMILY,
                grouping,
                expected: total,
                found,
            });
        }
    }
    if found != total {
        return Err(GenerateError::PartitionMismatch {
            family: V::FAMILY,
            grouping,
            expected: total,
            found,
        });
    }
    Ok(())
}
