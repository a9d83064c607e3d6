//! Generation session orchestration.

use crate::emit::Artifact;
use crate::pipeline::{GenerationSummary, GeneratorConfig, GeneratorPipeline};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes artifacts into one directory, replacing existing files.
///
/// The first failure aborts the write; rerunning the generator is the only
/// recovery since every run regenerates everything.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    out_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new<P: Into<PathBuf>>(out_dir: P) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn write_all(&self, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("creating output directory {}", self.out_dir.display()))?;

        let mut written = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let path = self.out_dir.join(&artifact.name);
            fs::write(&path, &artifact.contents)
                .with_context(|| format!("writing {}", path.display()))?;
            debug!(path = %path.display(), bytes = artifact.contents.len(), "wrote artifact");
            written.push(path);
        }
        Ok(written)
    }
}

pub struct GenerationSession {
    pipeline: GeneratorPipeline,
    writer: ArtifactWriter,
}

impl GenerationSession {
    pub fn new<P: Into<PathBuf>>(config: GeneratorConfig, out_dir: P) -> Self {
        Self {
            pipeline: GeneratorPipeline::new(config),
            writer: ArtifactWriter::new(out_dir),
        }
    }

    /// Generates every family, then writes all artifacts. Nothing is written
    /// unless generation of both families succeeded.
    pub fn run(&self) -> Result<GenerationSummary> {
        let generated = self.pipeline.generate()?;
        let written = self.writer.write_all(generated.artifacts())?;
        info!(
            out_dir = %self.writer.out_dir().display(),
            artifacts = written.len(),
            variants = generated.summary().total_variants(),
            "kernel generation complete"
        );
        Ok(generated.summary().clone())
    }

    pub fn config(&self) -> &GeneratorConfig {
        self.pipeline.config()
    }

    pub fn writer(&self) -> &ArtifactWriter {
        &self.writer
    }
}
