//! Ordered, validated kernel sets.

use crate::config::GeneratorTables;
use crate::error::{GenerateError, Result};
use crate::variant::KernelVariant;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// Every kernel of one family, sorted by dispatch priority.
///
/// Construction is the only place variants are ordered, so anything holding a
/// registry can rely on: no excluded combination, unique names and a strictly
/// increasing order.
#[derive(Debug, Clone)]
pub struct KernelRegistry<V> {
    variants: Vec<V>,
}

impl<V: KernelVariant> KernelRegistry<V> {
    pub fn new(mut variants: Vec<V>) -> Result<Self> {
        for variant in &variants {
            if let Some(rule) = variant.exclusion() {
                return Err(GenerateError::ExcludedVariant {
                    family: V::FAMILY,
                    name: variant.name().to_string(),
                    rule,
                });
            }
        }

        variants.sort();

        for pair in variants.windows(2) {
            if pair[0].cmp(&pair[1]) != Ordering::Less {
                return Err(GenerateError::AmbiguousPriority {
                    family: V::FAMILY,
                    first: pair[0].name().to_string(),
                    second: pair[1].name().to_string(),
                });
            }
        }

        {
            let mut names = HashSet::with_capacity(variants.len());
            for variant in &variants {
                if !names.insert(variant.name()) {
                    return Err(GenerateError::DuplicateName {
                        family: V::FAMILY,
                        name: variant.name().to_string(),
                    });
                }
            }
        }

        Ok(Self { variants })
    }

    /// Enumerates the family from `tables` and orders it.
    pub fn from_tables(tables: &GeneratorTables) -> Result<Self> {
        tables.validate()?;
        let variants = V::enumerate(tables);
        debug!(
            family = %V::FAMILY,
            count = variants.len(),
            "enumerated kernel variants"
        );
        Self::new(variants)
    }

    pub fn variants(&self) -> &[V] {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&V> {
        self.variants.iter().find(|variant| variant.name() == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.variants
            .iter()
            .position(|variant| variant.name() == name)
    }
}
