//! Declaration and implementation artifact emission.

use crate::grouping::{Category, CompilationUnit, Grouping};
use fmhagen_kernels::{CategoryKey, Family, KernelVariant};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Naming and guarding of one family's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyConfig {
    /// Prefix of artifact names and dispatch functions, e.g. `cutlassF`.
    pub name: String,
    /// Header that defines the kernel template, relative to the artifacts.
    pub impl_include: String,
    /// Defining this symbol compiles the whole family out.
    pub disable_guard: String,
}

impl FamilyConfig {
    pub fn forward() -> Self {
        Self {
            name: Family::Forward.tag().to_string(),
            impl_include: "../kernel_forward.h".to_string(),
            disable_guard: "XFORMERS_MEM_EFF_ATTENTION_DISABLE_FORWARD".to_string(),
        }
    }

    pub fn backward() -> Self {
        Self {
            name: Family::Backward.tag().to_string(),
            impl_include: "../kernel_backward.h".to_string(),
            disable_guard: "XFORMERS_MEM_EFF_ATTENTION_DISABLE_BACKWARD".to_string(),
        }
    }

    pub fn declaration_artifact(&self) -> String {
        format!("{}.h", self.name)
    }

    pub fn unit_artifact(&self, group: &str) -> String {
        format!("{}_{}.cu", self.name, group)
    }

    pub fn dispatch_fn(&self) -> String {
        format!("dispatch_{}", self.name)
    }

    pub fn category_dispatch_fn(&self, key: &CategoryKey) -> String {
        format!("dispatch_{}_{}_sm{}", self.name, key.dtype, key.arch.sm_min)
    }
}

/// A named text file produced by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub contents: String,
}

impl Artifact {
    pub fn new<N: Into<String>>(name: N, contents: String) -> Self {
        Self {
            name: name.into(),
            contents,
        }
    }
}

fn file_header(config: &FamilyConfig) -> String {
    format!(
        "// This file is auto-generated by fmhagen. Do not edit.\n#include \"{}\"\n\n",
        config.impl_include
    )
}

/// Forward declarations, one dispatch helper per category and the top-level
/// `dispatch_<family>` selecting a category from `DT` and `cc`.
pub fn emit_declarations<V: KernelVariant>(
    config: &FamilyConfig,
    grouping: &Grouping<'_, V>,
) -> Artifact {
    let mut text = file_header(config);
    text.push_str("#pragma once\n");
    let _ = writeln!(text, "#ifndef {}", config.disable_guard);

    let mut dispatch_all = String::new();
    for category in grouping.categories() {
        emit_category(&mut text, config, category);

        let _ = write!(
            dispatch_all,
            "\n    if (std::is_same<DT, {}>::value && {} <= cc && cc < {}) {{\n        {}(cb);\n    }}",
            category.cpp_type,
            category.key.arch.sm_min,
            category.key.arch.sm_max,
            config.category_dispatch_fn(&category.key)
        );
    }

    text.push_str("\ntemplate <typename DT, typename T>\n");
    let _ = writeln!(text, "void {}(T cb, int cc = 0) {{", config.dispatch_fn());
    text.push_str(&dispatch_all);
    text.push_str("\n}\n");
    let _ = writeln!(text, "#endif // {}", config.disable_guard);

    Artifact::new(config.declaration_artifact(), text)
}

fn emit_category<V: KernelVariant>(
    text: &mut String,
    config: &FamilyConfig,
    category: &Category<'_, V>,
) {
    let _ = writeln!(text, "// ======== {} ========", category.key);
    let declarations = category
        .variants
        .iter()
        .map(|variant| variant.entry_point().declaration.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    text.push_str(&declarations);

    let _ = writeln!(
        text,
        "\n\ntemplate <typename T> void {}(T cb) {{",
        config.category_dispatch_fn(&category.key)
    );
    let callbacks = category
        .variants
        .iter()
        .map(|variant| format!("    cb({}(), {});", variant.template(), variant.name()))
        .collect::<Vec<_>>()
        .join("\n");
    text.push_str(&callbacks);
    text.push_str("\n}\n\n");
}

/// Definitions of every member, in priority order.
pub fn emit_unit<V: KernelVariant>(config: &FamilyConfig, unit: &CompilationUnit<'_, V>) -> Artifact {
    let mut text = String::new();
    let _ = writeln!(text, "#ifndef {}", config.disable_guard);
    text.push_str(&file_header(config));
    for variant in &unit.variants {
        text.push_str(&variant.entry_point().definition);
    }
    let _ = writeln!(text, "#endif // {}", config.disable_guard);

    Artifact::new(config.unit_artifact(unit.group), text)
}

pub fn emit_units<V: KernelVariant>(config: &FamilyConfig, grouping: &Grouping<'_, V>) -> Vec<Artifact> {
    grouping
        .units()
        .iter()
        .map(|unit| emit_unit(config, unit))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmhagen_kernels::{
        ArchRange, DataType, ForwardShape, ForwardVariant, GeneratorTables, KernelRegistry, MaxK,
        Precision,
    };

    fn small_tables() -> GeneratorTables {
        GeneratorTables {
            precisions: vec![
                Precision::new(DataType::F16, "cutlass::half_t"),
                Precision::new(DataType::BF16, "cutlass::bfloat16_t"),
            ],
            sm_boundaries: vec![75, 80],
            sm_sentinel: 90,
            forward_shapes: vec![ForwardShape::new(64, 64, true)],
            backward_max_k: vec![MaxK(64), MaxK::UNBOUNDED],
        }
    }

    #[test]
    fn test_declaration_artifact_layout() {
        let registry = KernelRegistry::<ForwardVariant>::from_tables(&small_tables()).unwrap();
        let grouping = Grouping::new(registry.variants());
        let artifact = emit_declarations(&FamilyConfig::forward(), &grouping);

        assert_eq!(artifact.name, "cutlassF.h");

        let f16_class = "AttentionKernel<cutlass::half_t, cutlass::arch::Sm80, true, 64, 64, true, true, true>";
        let bf16_class = "AttentionKernel<cutlass::bfloat16_t, cutlass::arch::Sm80, true, 64, 64, true, true, true>";
        let f16_turing_class = "AttentionKernel<cutlass::half_t, cutlass::arch::Sm75, true, 64, 64, true, true, true>";
        let unaligned_class = "AttentionKernel<cutlass::half_t, cutlass::arch::Sm75, false, 64, 64, true, true, true>";
        let declaration = |class: &str, name: &str| {
            format!(
                "__global__ void __launch_bounds__(\n    {class}::kNumThreads,\n    {class}::kMinBlocksPerSm)\n{name}(typename {class}::Params p);"
            )
        };

        let expected = format!(
            "// This file is auto-generated by fmhagen. Do not edit.\n\
             #include \"../kernel_forward.h\"\n\
             \n\
             #pragma once\n\
             #ifndef XFORMERS_MEM_EFF_ATTENTION_DISABLE_FORWARD\n\
             // ======== bf16 / sm80 ========\n\
             {bf16_decl}\n\
             \n\
             template <typename T> void dispatch_cutlassF_bf16_sm80(T cb) {{\n\
             \x20   cb({bf16_class}(), fmha_cutlassF_bf16_aligned_64x64_rf_sm80);\n\
             }}\n\
             \n\
             // ======== f16 / sm75 ========\n\
             {f16_turing_decl}\n\
             {unaligned_decl}\n\
             \n\
             template <typename T> void dispatch_cutlassF_f16_sm75(T cb) {{\n\
             \x20   cb({f16_turing_class}(), fmha_cutlassF_f16_aligned_64x64_rf_sm75);\n\
             \x20   cb({unaligned_class}(), fmha_cutlassF_f16_notaligned_64x64_rf_sm75);\n\
             }}\n\
             \n\
             // ======== f16 / sm80 ========\n\
             {f16_decl}\n\
             \n\
             template <typename T> void dispatch_cutlassF_f16_sm80(T cb) {{\n\
             \x20   cb({f16_class}(), fmha_cutlassF_f16_aligned_64x64_rf_sm80);\n\
             }}\n\
             \n\
             \n\
             template <typename DT, typename T>\n\
             void dispatch_cutlassF(T cb, int cc = 0) {{\n\
             \n\
             \x20   if (std::is_same<DT, cutlass::bfloat16_t>::value && 80 <= cc && cc < 90) {{\n\
             \x20       dispatch_cutlassF_bf16_sm80(cb);\n\
             \x20   }}\n\
             \x20   if (std::is_same<DT, cutlass::half_t>::value && 75 <= cc && cc < 80) {{\n\
             \x20       dispatch_cutlassF_f16_sm75(cb);\n\
             \x20   }}\n\
             \x20   if (std::is_same<DT, cutlass::half_t>::value && 80 <= cc && cc < 90) {{\n\
             \x20       dispatch_cutlassF_f16_sm80(cb);\n\
             \x20   }}\n\
             }}\n\
             #endif // XFORMERS_MEM_EFF_ATTENTION_DISABLE_FORWARD\n",
            bf16_decl = declaration(bf16_class, "fmha_cutlassF_bf16_aligned_64x64_rf_sm80"),
            f16_turing_decl = declaration(f16_turing_class, "fmha_cutlassF_f16_aligned_64x64_rf_sm75"),
            unaligned_decl = declaration(unaligned_class, "fmha_cutlassF_f16_notaligned_64x64_rf_sm75"),
            f16_decl = declaration(f16_class, "fmha_cutlassF_f16_aligned_64x64_rf_sm80"),
        );
        assert_eq!(artifact.contents, expected);
    }

    #[test]
    fn test_unit_artifacts() {
        let registry = KernelRegistry::<ForwardVariant>::from_tables(&small_tables()).unwrap();
        let grouping = Grouping::new(registry.variants());
        let config = FamilyConfig::forward();
        let units = emit_units(&config, &grouping);

        let names: Vec<_> = units.iter().map(|unit| unit.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["cutlassF_bf16_aligned.cu", "cutlassF_f16_aligned.cu", "cutlassF_f16_notaligned.cu"]
        );

        let f16 = &units[1];
        assert!(f16
            .contents
            .starts_with("#ifndef XFORMERS_MEM_EFF_ATTENTION_DISABLE_FORWARD\n// This file is auto-generated"));
        assert!(f16
            .contents
            .ends_with("}\n#endif // XFORMERS_MEM_EFF_ATTENTION_DISABLE_FORWARD\n"));
        let sm75 = f16.contents.find("fmha_cutlassF_f16_aligned_64x64_rf_sm75(").unwrap();
        let sm80 = f16.contents.find("fmha_cutlassF_f16_aligned_64x64_rf_sm80(").unwrap();
        assert!(sm75 < sm80);
        assert_eq!(f16.contents.matches("advance_to_block").count(), 2);
        assert!(f16.contents.contains("#if __CUDA_ARCH__ >= 750\n#if __CUDA_ARCH__ < 800\n"));
    }

    #[test]
    fn test_category_dispatch_names() {
        let config = FamilyConfig::backward();
        let key = CategoryKey {
            dtype: DataType::BF16,
            arch: ArchRange::new(80, 90),
        };
        assert_eq!(config.category_dispatch_fn(&key), "dispatch_cutlassB_bf16_sm80");
        assert_eq!(config.dispatch_fn(), "dispatch_cutlassB");
        assert_eq!(config.unit_artifact("f32_aligned_k64"), "cutlassB_f32_aligned_k64.cu");
    }
}
