//! GPU Backend Tests
//!
//! Renders actors offscreen through `WgpuRenderer2D`. Every test returns
//! early when the machine has no usable adapter.

use std::sync::Arc;

use glam::{Mat4, Vec2};

use actor2d::gpu::ShaderGenerator;
use actor2d::renderer::DrawVariant;
use actor2d::{Actor, BlendMode, GpuContext, Renderer2D, RendererSettings, WgpuRenderer2D};

mod common;
use common::{four_variant_model, scratch_dir};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

fn settings() -> RendererSettings {
    RendererSettings {
        color_format: TARGET_FORMAT,
        required_limits: wgpu::Limits::downlevel_defaults(),
        ..Default::default()
    }
}

fn context() -> Option<GpuContext> {
    let _ = env_logger::builder().is_test(true).try_init();
    match pollster::block_on(GpuContext::new_headless(&settings())) {
        Ok(ctx) => Some(ctx),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}

fn target(ctx: &GpuContext) -> wgpu::TextureView {
    ctx.device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Test Target"),
            size: wgpu::Extent3d {
                width: 64,
                height: 64,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

// ============================================================================
// Shader Templates
// ============================================================================

#[test]
fn every_variant_generates_a_shader() {
    for variant in DrawVariant::ALL {
        let source = ShaderGenerator::generate_actor_shader(variant).unwrap();
        assert!(source.contains("fn vs_main"));
        assert!(source.contains("fn fs_main"));
        assert_eq!(source.contains("var<storage, read> bones"), variant.is_skinned());
        assert_eq!(source.contains("deformed_position"), variant.is_deformed());
    }
}

// ============================================================================
// Frame Rendering
// ============================================================================

#[test]
fn renders_all_variants_and_blend_modes() -> anyhow::Result<()> {
    let Some(ctx) = context() else {
        return Ok(());
    };
    let dir = scratch_dir("gpu_variants");
    let mut renderer = WgpuRenderer2D::new(&ctx, settings());
    renderer.set_view_projection(Mat4::orthographic_rh(0.0, 4.0, 0.0, 4.0, -1.0, 1.0));

    let mut model = four_variant_model(&dir);
    for (image, mode) in model.images.iter_mut().zip(BlendMode::ALL) {
        image.blend_mode = mode;
    }
    let mut actor = Actor::new(model);
    actor.initialize(&mut renderer)?;
    let mut instance = Arc::new(actor).make_instance();
    instance.initialize(&mut renderer)?;

    instance.image_mut(3)?.bone_influence_matrices[1] =
        glam::Affine2::from_translation(Vec2::new(1.0, 1.0));
    instance.render(&mut renderer);
    assert_eq!(renderer.draw_list().commands().len(), 4);

    let view = target(&ctx);
    renderer.render_to_view(&view);
    assert!(renderer.draw_list().commands().is_empty());

    // Second frame reuses pipelines and picks up a deform update.
    instance.set_deformed_vertices(1, &[0.5; 8])?;
    instance.render(&mut renderer);
    renderer.render_to_view(&view);

    Ok(())
}

#[test]
fn many_draws_grow_frame_buffers() -> anyhow::Result<()> {
    let Some(ctx) = context() else {
        return Ok(());
    };
    let dir = scratch_dir("gpu_many");
    let mut renderer = WgpuRenderer2D::new(&ctx, settings());

    let mut actor = Actor::new(four_variant_model(&dir));
    actor.initialize(&mut renderer)?;
    let actor = Arc::new(actor);

    let mut instances = Vec::new();
    for _ in 0..100 {
        let mut instance = actor.make_instance();
        instance.initialize(&mut renderer)?;
        instances.push(instance);
    }
    for instance in &instances {
        instance.render(&mut renderer);
    }
    assert_eq!(renderer.draw_list().commands().len(), 400);

    renderer.render_to_view(&target(&ctx));
    Ok(())
}

#[test]
fn set_blend_mode_is_recorded() {
    let Some(ctx) = context() else {
        return;
    };
    let mut renderer = WgpuRenderer2D::new(&ctx, settings());
    renderer.set_blend_mode(BlendMode::Multiply);
    assert_eq!(renderer.draw_list().blend_mode(), BlendMode::Multiply);
}
