//! GLSL to SPIR-V translation
//!
//! Pipelines carry GLSL source; this module runs it through naga at
//! pipeline creation and hands back a SPIR-V word stream for
//! `vkCreateShaderModule`.

use trilight_engine::trilight::{Error, Result};
use trilight_engine::trilight::gpu::{ShaderDesc, ShaderStage};

/// Translate one shader's GLSL source into SPIR-V words
pub(crate) fn compile_glsl(desc: &ShaderDesc) -> Result<Vec<u32>> {
    let stage = match desc.stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };

    let mut frontend = naga::front::glsl::Frontend::default();
    let module = frontend
        .parse(&naga::front::glsl::Options::from(stage), desc.source)
        .map_err(|e| Error::InvalidResource(format!("GLSL parse failed: {:?}", e)))?;

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| Error::InvalidResource(format!("shader validation failed: {:?}", e)))?;

    let options = naga::back::spv::Options::default();
    let pipeline_options = naga::back::spv::PipelineOptions {
        shader_stage: stage,
        entry_point: desc.entry_point.to_string(),
    };

    naga::back::spv::write_vec(&module, &info, &options, Some(&pipeline_options))
        .map_err(|e| Error::InvalidResource(format!("SPIR-V emission failed: {:?}", e)))
}
