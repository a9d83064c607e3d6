use anyhow::Result;
use fmhagen_compiler::emit::FamilyConfig;
use fmhagen_compiler::grouping::Grouping;
use fmhagen_compiler::pipeline::{GeneratorConfig, GeneratorPipeline};
use fmhagen_compiler::session::GenerationSession;
use fmhagen_kernels::{
    ArchRange, BackwardVariant, DataType, ForwardAttrs, ForwardShape, ForwardVariant,
    GeneratorTables, KernelRegistry, KernelVariant, MaxK, Precision,
};
use std::collections::HashSet;
use std::fs;

fn synthetic_tables() -> GeneratorTables {
    GeneratorTables {
        precisions: vec![
            Precision::new(DataType::F32, "float"),
            Precision::new(DataType::BF16, "cutlass::bfloat16_t"),
        ],
        sm_boundaries: vec![70, 80],
        sm_sentinel: 90,
        forward_shapes: vec![ForwardShape::new(32, 128, true), ForwardShape::new(64, 64, true)],
        backward_max_k: vec![MaxK(64), MaxK::UNBOUNDED],
    }
}

#[test]
fn regeneration_is_byte_identical() -> Result<()> {
    let first = GeneratorPipeline::new(GeneratorConfig::default()).generate()?;
    let second = GeneratorPipeline::new(GeneratorConfig::default()).generate()?;

    assert_eq!(first.artifacts().len(), second.artifacts().len());
    for (a, b) in first.artifacts().iter().zip(second.artifacts()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.contents, b.contents, "{} differs between runs", a.name);
    }
    Ok(())
}

#[test]
fn session_writes_identical_files_twice() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let session = GenerationSession::new(GeneratorConfig::default(), dir.path());

    let summary = session.run()?;
    let mut snapshot = Vec::new();
    for name in summary.families.iter().flat_map(|family| family.artifacts.iter()) {
        snapshot.push((name.clone(), fs::read_to_string(dir.path().join(name))?));
    }
    assert_eq!(snapshot.len(), 47);

    session.run()?;
    for (name, contents) in &snapshot {
        assert_eq!(&fs::read_to_string(dir.path().join(name))?, contents);
    }
    Ok(())
}

#[test]
fn artifact_names_are_unique() -> Result<()> {
    let generated = GeneratorPipeline::new(GeneratorConfig::default()).generate()?;
    let names: HashSet<_> = generated.artifacts().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names.len(), generated.artifacts().len());
    Ok(())
}

#[test]
fn every_variant_is_declared_and_defined_once() -> Result<()> {
    let config = GeneratorConfig::default();
    let generated = GeneratorPipeline::new(config.clone()).generate()?;
    let registry = KernelRegistry::<BackwardVariant>::from_tables(&config.tables)?;

    let header = &generated.find("cutlassB.h").unwrap().contents;
    let units: Vec<_> = generated
        .artifacts()
        .iter()
        .filter(|a| a.name.starts_with("cutlassB_"))
        .collect();

    for variant in registry.variants() {
        let prototype = format!("{}(typename", variant.name());
        assert_eq!(header.matches(&prototype).count(), 1, "{}", variant.name());
        let defined_in = units
            .iter()
            .filter(|unit| unit.contents.contains(&prototype))
            .count();
        assert_eq!(defined_in, 1, "{}", variant.name());
    }
    Ok(())
}

#[test]
fn forward_dispatch_prefers_kernels_without_optional_features() -> Result<()> {
    let base = ForwardAttrs {
        precision: Precision::new(DataType::F16, "cutlass::half_t"),
        aligned: true,
        arch: ArchRange::new(80, 90),
        shape: ForwardShape::new(32, 128, true),
        supports_dropout: false,
        supports_bias: false,
    };
    let plain = ForwardVariant::new(base.clone());
    let dropout = ForwardVariant::new(ForwardAttrs {
        supports_dropout: true,
        ..base
    });
    assert!(plain < dropout);
    Ok(())
}

#[test]
fn backward_buckets_sort_ascending_with_unbounded_last() -> Result<()> {
    let registry = KernelRegistry::<BackwardVariant>::from_tables(&GeneratorTables::production())?;
    let grouping = Grouping::new(registry.variants());
    let category = grouping.select(DataType::F32, 75).unwrap();

    let buckets: Vec<_> = category
        .variants
        .iter()
        .filter(|v| v.aligned() && !v.apply_dropout())
        .map(|v| v.max_k())
        .collect();
    assert_eq!(buckets, vec![MaxK(32), MaxK(64), MaxK(128), MaxK::UNBOUNDED]);

    // aligned kernels are offered before any unaligned one
    let first_unaligned = category.variants.iter().position(|v| !v.aligned()).unwrap();
    assert!(category.variants[..first_unaligned].iter().all(|v| v.aligned()));
    assert!(category.variants[first_unaligned..].iter().all(|v| !v.aligned()));
    Ok(())
}

#[test]
fn bf16_is_only_dispatched_on_sm80_and_newer() -> Result<()> {
    let generated = GeneratorPipeline::new(GeneratorConfig::default()).generate()?;
    for header in ["cutlassF.h", "cutlassB.h"] {
        let contents = &generated.find(header).unwrap().contents;
        let bf16_branches: Vec<_> = contents
            .lines()
            .filter(|line| line.contains("std::is_same<DT, cutlass::bfloat16_t>"))
            .collect();
        assert_eq!(bf16_branches.len(), 1);
        assert!(bf16_branches[0].contains("80 <= cc && cc < 90"));
        assert!(!contents.contains("bf16_aligned_32x128_rf_sm75"));
        assert!(!contents.contains("cutlass::bfloat16_t, cutlass::arch::Sm75"));
    }
    Ok(())
}

#[test]
fn synthetic_tables_drive_generation() -> Result<()> {
    let config = GeneratorConfig::with_tables(synthetic_tables());
    let generated = GeneratorPipeline::new(config).generate()?;
    let summary = generated.summary();

    // f32 on both ranges (aligned) + f32 unaligned on sm70 + bf16 on sm80
    assert_eq!(summary.families[0].variants, 4 * 2);
    assert_eq!(summary.families[1].variants, 4 * 2 * 2);
    assert_eq!(summary.families[0].categories, 3);
    assert_eq!(
        summary.families[0].artifacts,
        vec![
            "cutlassF.h".to_string(),
            "cutlassF_bf16_aligned.cu".to_string(),
            "cutlassF_f32_aligned.cu".to_string(),
            "cutlassF_f32_notaligned.cu".to_string(),
        ]
    );

    let header = &generated.find("cutlassF.h").unwrap().contents;
    assert!(header.starts_with("// This file is auto-generated by fmhagen. Do not edit.\n"));
    assert!(header.contains("#ifndef XFORMERS_MEM_EFF_ATTENTION_DISABLE_FORWARD\n"));
    assert!(header.ends_with("#endif // XFORMERS_MEM_EFF_ATTENTION_DISABLE_FORWARD\n"));
    Ok(())
}

#[test]
fn custom_family_names_flow_into_artifacts() -> Result<()> {
    let config = GeneratorConfig {
        forward: FamilyConfig {
            name: "fwd".into(),
            impl_include: "kernel_forward.h".into(),
            disable_guard: "NO_FWD".into(),
        },
        ..GeneratorConfig::with_tables(synthetic_tables())
    };
    let generated = GeneratorPipeline::new(config).generate()?;
    let header = &generated.find("fwd.h").unwrap().contents;
    assert!(header.contains("#include \"kernel_forward.h\"\n"));
    assert!(header.contains("void dispatch_fwd(T cb, int cc = 0) {"));
    assert!(header.contains("template <typename T> void dispatch_fwd_f32_sm70(T cb) {"));
    assert!(generated.find("fwd_f32_aligned.cu").is_some());
    // entry point names keep the family tag
    assert!(header.contains("fmha_cutlassF_f32_aligned_64x64_rf_sm70"));
    Ok(())
}
