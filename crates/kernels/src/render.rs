//! CUDA source rendering for a single kernel entry point.

use crate::config::ArchRange;
use std::fmt::Write;

/// Structured description of a `__global__` entry point.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoint<'a> {
    /// Fully instantiated kernel class, e.g. `AttentionKernel<float, ...>`.
    pub class: &'a str,
    pub name: &'a str,
    pub arch: ArchRange,
}

/// Declaration and definition text of an entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEntryPoint {
    pub declaration: String,
    pub definition: String,
}

impl<'a> EntryPoint<'a> {
    pub fn new(class: &'a str, name: &'a str, arch: ArchRange) -> Self {
        Self { class, name, arch }
    }

    pub fn signature(&self) -> String {
        let mut text = String::from("__global__ void __launch_bounds__(\n");
        let _ = writeln!(text, "    {}::kNumThreads,", self.class);
        let _ = writeln!(text, "    {}::kMinBlocksPerSm)", self.class);
        let _ = write!(text, "{}(typename {}::Params p)", self.name, self.class);
        text
    }

    pub fn declaration(&self) -> String {
        format!("{};", self.signature())
    }

    /// Body runs only when compiled for a capability inside `arch`; any other
    /// target prints a fatal diagnostic instead of running foreign code.
    pub fn definition(&self) -> String {
        let ArchRange { sm_min, sm_max } = self.arch;

        let mut text = self.signature();
        text.push_str(" {\n");
        text.push_str("#ifdef __CUDA_ARCH__\n");
        let _ = writeln!(text, "#if __CUDA_ARCH__ >= {}0", sm_min);
        let _ = writeln!(text, "#if __CUDA_ARCH__ < {}0", sm_max);
        text.push_str("  if (!p.advance_to_block()) {\n");
        text.push_str("    return;\n");
        text.push_str("  }\n");
        let _ = writeln!(text, "  {}::attention_kernel(p);", self.class);
        text.push_str("  return;\n");
        text.push_str("#endif\n");
        text.push_str("#endif\n");
        text.push_str("    printf(\n");
        let _ = writeln!(
            text,
            "        \"FATAL: kernel `{}` is for sm{}-sm{}, but was built for sm%d\\n\",",
            self.name, sm_min, sm_max
        );
        text.push_str("        int(__CUDA_ARCH__ + 0) / 10);\n");
        text.push_str("#endif\n");
        text.push_str("}\n");
        text
    }

    pub fn render(&self) -> RenderedEntryPoint {
        RenderedEntryPoint {
            declaration: self.declaration(),
            definition: self.definition(),
        }
    }
}
