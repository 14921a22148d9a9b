use std::{env, fs, path::PathBuf};

fn main() {
    let out = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Must match the pipeline's vertex layout and CameraUbo:
    //   binding 0, location 0: R32G32B32_SFLOAT (pos)
    //   binding 0, location 1: R32G32B32_SFLOAT (color)
    //   set 0, binding 0: { mat4 projection; mat4 view; }
    //   push constant: mat4 model
    let vs_src = r#"
#version 450
layout(location = 0) in vec3 inPos;
layout(location = 1) in vec3 inColor;

layout(set = 0, binding = 0) uniform Camera {
    mat4 projection;
    mat4 view;
} cam;

layout(push_constant) uniform Draw {
    mat4 model;
} draw;

layout(location = 0) out vec3 vColor;

void main() {
    vColor = inColor;
    gl_Position = cam.projection * cam.view * draw.model * vec4(inPos, 1.0);
}
"#;

    let fs_src = r#"
#version 450
layout(location = 0) in vec3 vColor;
layout(location = 0) out vec4 outColor;

void main() {
    outColor = vec4(vColor, 1.0);
}
"#;

    let comp = shaderc::Compiler::new().unwrap();
    let mut opts = shaderc::CompileOptions::new().unwrap();
    opts.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_0 as u32,
    );
    opts.set_optimization_level(shaderc::OptimizationLevel::Performance);

    let vs_spv = comp
        .compile_into_spirv(
            vs_src,
            shaderc::ShaderKind::Vertex,
            "eye.vert",
            "main",
            Some(&opts),
        )
        .unwrap();

    let fs_spv = comp
        .compile_into_spirv(
            fs_src,
            shaderc::ShaderKind::Fragment,
            "eye.frag",
            "main",
            Some(&opts),
        )
        .unwrap();

    fs::write(out.join("eye.vert.spv"), vs_spv.as_binary_u8()).unwrap();
    fs::write(out.join("eye.frag.spv"), fs_spv.as_binary_u8()).unwrap();

    println!("cargo:rerun-if-changed=build.rs");
}
