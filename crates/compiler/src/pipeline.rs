//! Generation pipeline assembly.
//!
//! Enumerate, order, group and emit are pure functions chained in a fixed
//! order; nothing here touches the filesystem.

use crate::emit::{emit_declarations, emit_units, Artifact, FamilyConfig};
use crate::grouping::Grouping;
use anyhow::{Context, Result};
use fmhagen_kernels::{BackwardVariant, ForwardVariant, GeneratorTables, KernelRegistry, KernelVariant};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub tables: GeneratorTables,
    pub forward: FamilyConfig,
    pub backward: FamilyConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            tables: GeneratorTables::production(),
            forward: FamilyConfig::forward(),
            backward: FamilyConfig::backward(),
        }
    }
}

impl GeneratorConfig {
    pub fn with_tables(tables: GeneratorTables) -> Self {
        Self {
            tables,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilySummary {
    pub family: String,
    pub variants: usize,
    pub categories: usize,
    pub compilation_units: usize,
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub families: Vec<FamilySummary>,
}

impl GenerationSummary {
    pub fn total_variants(&self) -> usize {
        self.families.iter().map(|family| family.variants).sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug)]
pub struct FamilyOutput {
    pub summary: FamilySummary,
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Default)]
pub struct GeneratedArtifacts {
    artifacts: Vec<Artifact>,
    summary: GenerationSummary,
}

impl GeneratedArtifacts {
    fn push(&mut self, output: FamilyOutput) {
        self.artifacts.extend(output.artifacts);
        self.summary.families.push(output.summary);
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn find(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|artifact| artifact.name == name)
    }

    pub fn summary(&self) -> &GenerationSummary {
        &self.summary
    }
}

pub struct GeneratorPipeline {
    config: GeneratorConfig,
}

impl GeneratorPipeline {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Forward artifacts first, then backward.
    pub fn generate(&self) -> Result<GeneratedArtifacts> {
        let mut generated = GeneratedArtifacts::default();
        generated.push(self.generate_family::<ForwardVariant>(&self.config.forward)?);
        generated.push(self.generate_family::<BackwardVariant>(&self.config.backward)?);
        Ok(generated)
    }

    pub fn generate_family<V: KernelVariant>(&self, family: &FamilyConfig) -> Result<FamilyOutput> {
        let registry = KernelRegistry::<V>::from_tables(&self.config.tables)
            .with_context(|| format!("ordering {} kernels", family.name))?;

        let grouping = Grouping::new(registry.variants());
        grouping
            .verify_partition(registry.variants())
            .with_context(|| format!("grouping {} kernels", family.name))?;

        let mut artifacts = Vec::with_capacity(grouping.units().len() + 1);
        artifacts.push(emit_declarations(family, &grouping));
        artifacts.extend(emit_units(family, &grouping));

        info!(
            family = %family.name,
            variants = registry.len(),
            categories = grouping.categories().len(),
            compilation_units = grouping.units().len(),
            "generated kernel family"
        );

        Ok(FamilyOutput {
            summary: FamilySummary {
                family: family.name.clone(),
                variants: registry.len(),
                categories: grouping.categories().len(),
                compilation_units: grouping.units().len(),
                artifacts: artifacts.iter().map(|artifact| artifact.name.clone()).collect(),
            },
            artifacts,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}
