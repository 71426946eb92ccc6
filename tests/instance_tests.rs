//! Actor Instance Tests
//!
//! Tests for:
//! - Deform buffers: creation, upload, update, replacement of deformed vertices
//! - render: draw variant selection, blend modes, offsets, skipped images
//! - compute_bounds: rest pose, deformation, skinning, world transform

use std::sync::Arc;

use glam::{Affine2, Vec2};

use actor2d::model::ActorModel;
use actor2d::renderer::{BufferHint, DrawVariant};
use actor2d::{Actor, Actor2dError, ActorInstance, BlendMode, DrawList};

mod common;
use common::{four_variant_model, quad, scratch_dir, skinned_triangle, write_atlas};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec2_approx(a: Vec2, b: Vec2) -> bool {
    approx(a.x, b.x) && approx(a.y, b.y)
}

fn initialized(model: ActorModel, renderer: &mut DrawList) -> ActorInstance {
    let mut actor = Actor::new(model);
    actor.initialize(renderer).unwrap();
    let mut instance = Arc::new(actor).make_instance();
    instance.initialize(renderer).unwrap();
    instance
}

// ============================================================================
// Deform Buffers
// ============================================================================

#[test]
fn only_deforming_images_get_buffers() {
    let dir = scratch_dir("deform_buffers");
    let mut renderer = DrawList::new();
    let instance = initialized(four_variant_model(&dir), &mut renderer);

    assert!(instance.deform_buffer(0).is_none());
    assert!(instance.deform_buffer(1).is_some());
    assert!(instance.deform_buffer(2).is_none());
    assert!(instance.deform_buffer(3).is_some());
    // 3 static + 2 deform
    assert_eq!(renderer.buffers_created(), 5);
}

#[test]
fn deform_buffer_starts_at_rest_pose() {
    let dir = scratch_dir("deform_rest");
    let instance = initialized(four_variant_model(&dir), &mut DrawList::new());

    let buffer = instance.deform_buffer(1).unwrap();
    assert_eq!(buffer.hint(), BufferHint::Dynamic);
    assert_eq!(
        buffer.to_f32_vec(),
        vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]
    );

    let skinned = instance.deform_buffer(3).unwrap();
    assert_eq!(skinned.to_f32_vec(), vec![0.0, 0.0, 2.0, 0.0, 0.0, 2.0]);
}

#[test]
fn update_vertex_deform_uploads_current_positions() {
    let dir = scratch_dir("deform_update");
    let mut instance = initialized(four_variant_model(&dir), &mut DrawList::new());
    let version = instance.deform_buffer(1).unwrap().version();

    instance.image_mut(1).unwrap().deformed_vertices[0] = -3.0;
    instance.update_vertex_deform(1).unwrap();

    let buffer = instance.deform_buffer(1).unwrap();
    assert!(buffer.version() > version);
    assert!(approx(buffer.to_f32_vec()[0], -3.0));
}

#[test]
fn update_vertex_deform_requires_a_buffer() {
    let dir = scratch_dir("deform_missing");
    let instance = initialized(four_variant_model(&dir), &mut DrawList::new());

    assert!(matches!(
        instance.update_vertex_deform(0),
        Err(Actor2dError::MissingDeformBuffer(name)) if name == "plain"
    ));
    assert!(matches!(
        instance.update_vertex_deform(9),
        Err(Actor2dError::ImageIndexOutOfBounds { index: 9, count: 4 })
    ));
}

#[test]
fn update_vertex_deforms_refreshes_all() {
    let dir = scratch_dir("deform_all");
    let mut instance = initialized(four_variant_model(&dir), &mut DrawList::new());

    instance.image_mut(1).unwrap().deformed_vertices[1] = 7.0;
    instance.image_mut(3).unwrap().deformed_vertices[1] = 8.0;
    instance.update_vertex_deforms().unwrap();

    assert!(approx(instance.deform_buffer(1).unwrap().to_f32_vec()[1], 7.0));
    assert!(approx(instance.deform_buffer(3).unwrap().to_f32_vec()[1], 8.0));
}

#[test]
fn set_deformed_vertices_uploads() {
    let dir = scratch_dir("deform_set");
    let mut instance = initialized(four_variant_model(&dir), &mut DrawList::new());
    let moved = [5.0, 5.0, 6.0, 5.0, 6.0, 6.0, 5.0, 6.0];

    instance.set_deformed_vertices(1, &moved).unwrap();

    assert_eq!(instance.image(1).unwrap().deformed_vertices, moved);
    assert_eq!(instance.deform_buffer(1).unwrap().to_f32_vec(), moved);
}

#[test]
fn set_deformed_vertices_checks_length() {
    let dir = scratch_dir("deform_len");
    let mut instance = initialized(four_variant_model(&dir), &mut DrawList::new());

    let err = instance.set_deformed_vertices(1, &[1.0, 2.0]).unwrap_err();
    assert!(matches!(err, Actor2dError::InvalidVertexData { .. }));
    assert_eq!(instance.image(1).unwrap().deformed_vertices.len(), 8);
}

#[test]
fn instances_deform_independently() {
    let dir = scratch_dir("deform_independent");
    let mut renderer = DrawList::new();
    let mut actor = Actor::new(four_variant_model(&dir));
    actor.initialize(&mut renderer).unwrap();
    let actor = Arc::new(actor);

    let mut a = actor.make_instance();
    let mut b = actor.make_instance();
    a.initialize(&mut renderer).unwrap();
    b.initialize(&mut renderer).unwrap();

    a.set_deformed_vertices(1, &[9.0; 8]).unwrap();

    assert_ne!(a.deform_buffer(1), b.deform_buffer(1));
    assert!(approx(b.deform_buffer(1).unwrap().to_f32_vec()[0], 0.0));
}

// ============================================================================
// Render
// ============================================================================

#[test]
fn render_selects_variant_per_image() {
    let dir = scratch_dir("render_variants");
    let mut renderer = DrawList::new();
    let instance = initialized(four_variant_model(&dir), &mut renderer);

    instance.render(&mut renderer);

    let variants: Vec<_> = renderer.commands().iter().map(|c| c.variant).collect();
    assert_eq!(variants, DrawVariant::ALL.to_vec());
}

#[test]
fn render_uses_matching_buffers() {
    let dir = scratch_dir("render_buffers");
    let mut renderer = DrawList::new();
    let instance = initialized(four_variant_model(&dir), &mut renderer);
    let actor = Arc::clone(instance.actor());

    instance.render(&mut renderer);
    let commands = renderer.commands();

    assert_eq!(&commands[0].vertex_buffer, actor.vertex_buffer().unwrap());
    assert_eq!(&commands[2].vertex_buffer, actor.skinned_vertex_buffer().unwrap());
    assert_eq!(commands[1].deform_buffer.as_ref(), instance.deform_buffer(1));
    assert_eq!(commands[3].deform_buffer.as_ref(), instance.deform_buffer(3));
    for command in commands {
        assert_eq!(&command.index_buffer, actor.index_buffer().unwrap());
    }
}

#[test]
fn render_passes_offsets_and_counts() {
    let dir = scratch_dir("render_ranges");
    let mut renderer = DrawList::new();
    let instance = initialized(four_variant_model(&dir), &mut renderer);

    instance.render(&mut renderer);

    let ranges: Vec<_> = renderer.commands().iter().map(|c| c.index_range()).collect();
    assert_eq!(ranges, vec![0..6, 6..12, 12..15, 15..18]);
}

#[test]
fn render_passes_pose() {
    let dir = scratch_dir("render_pose");
    let mut renderer = DrawList::new();
    let mut instance = initialized(four_variant_model(&dir), &mut renderer);

    let transform = Affine2::from_translation(Vec2::new(3.0, 4.0));
    let bone = Affine2::from_angle(0.25);
    {
        let image = instance.image_mut(2).unwrap();
        image.world_transform = transform;
        image.render_opacity = 0.5;
        image.bone_influence_matrices[1] = bone;
    }

    instance.render(&mut renderer);
    let command = &renderer.commands()[2];

    assert_eq!(command.transform, transform);
    assert!(approx(command.opacity, 0.5));
    assert_eq!(command.bone_matrices.len(), 2);
    assert_eq!(command.bone_matrices[1], bone);
    assert!(renderer.commands()[0].bone_matrices.is_empty());
}

#[test]
fn render_sets_blend_mode_before_each_draw() {
    let dir = scratch_dir("render_blend");
    write_atlas(&dir.join("blend.png"), 4);
    let model = ActorModel::new(dir.join("blend"), 1)
        .with_image(quad("a").with_texture(0).with_blend_mode(BlendMode::Additive))
        .with_image(quad("b").with_texture(0))
        .with_image(quad("c").with_texture(0).with_blend_mode(BlendMode::Screen));
    let mut renderer = DrawList::new();
    let instance = initialized(model, &mut renderer);

    instance.render(&mut renderer);

    let modes: Vec<_> = renderer.commands().iter().map(|c| c.blend_mode).collect();
    assert_eq!(
        modes,
        vec![BlendMode::Additive, BlendMode::Normal, BlendMode::Screen]
    );
    assert_eq!(renderer.blend_mode(), BlendMode::Screen);
}

#[test]
fn render_skips_images_without_drawable_data() {
    let dir = scratch_dir("render_skips");
    write_atlas(&dir.join("skip0.png"), 4);
    let mut no_triangles = quad("no_triangles").with_texture(0);
    no_triangles.triangles.clear();
    let model = ActorModel::new(dir.join("skip"), 2)
        .with_image(quad("no_texture"))
        .with_image(quad("missing_atlas").with_texture(1))
        .with_image(no_triangles)
        .with_image(quad("drawn").with_texture(0));
    let mut renderer = DrawList::new();
    let instance = initialized(model, &mut renderer);

    instance.render(&mut renderer);

    assert_eq!(renderer.commands().len(), 1);
    assert_eq!(renderer.commands()[0].index_range(), 12..18);
}

#[test]
fn mesh_edits_on_instance_do_not_change_draws() {
    let dir = scratch_dir("render_mesh_edit");
    write_atlas(&dir.join("m.png"), 4);
    let model = ActorModel::new(dir.join("m"), 1)
        .with_image(quad("a").with_texture(0))
        .with_image(quad("b").with_texture(0));
    let mut renderer = DrawList::new();
    let mut instance = initialized(model, &mut renderer);

    {
        let image = instance.image_mut(0).unwrap();
        image.triangles.extend_from_slice(&[0, 1, 3]);
        image.connected_bone_count = 2;
        image.texture_index = None;
    }
    instance.render(&mut renderer);

    let commands = renderer.commands();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].index_range(), 0..6);
    assert_eq!(commands[1].index_range(), 6..12);
    assert_eq!(commands[0].variant, DrawVariant::Textured);
    assert_eq!(&commands[0].vertex_buffer, instance.actor().vertex_buffer().unwrap());
}

#[test]
fn render_of_uninitialized_actor_draws_nothing() {
    let dir = scratch_dir("render_uninit");
    let actor = Arc::new(Actor::new(four_variant_model(&dir)));
    let instance = actor.make_instance();
    let mut renderer = DrawList::new();

    instance.render(&mut renderer);
    assert!(renderer.commands().is_empty());
}

#[test]
fn render_without_instance_initialize_skips_deform_variants() {
    let dir = scratch_dir("render_no_deform");
    let mut renderer = DrawList::new();
    let mut actor = Actor::new(four_variant_model(&dir));
    actor.initialize(&mut renderer).unwrap();
    let instance = Arc::new(actor).make_instance();

    instance.render(&mut renderer);

    let variants: Vec<_> = renderer.commands().iter().map(|c| c.variant).collect();
    assert_eq!(
        variants,
        vec![
            DrawVariant::Textured,
            DrawVariant::Textured,
            DrawVariant::TexturedSkin,
            DrawVariant::TexturedSkin,
        ]
    );
}

// ============================================================================
// Bounds
// ============================================================================

#[test]
fn bounds_at_rest() {
    let dir = scratch_dir("bounds_rest");
    write_atlas(&dir.join("b.png"), 4);
    let model = ActorModel::new(dir.join("b"), 1).with_image(quad("q").with_texture(0));
    let instance = initialized(model, &mut DrawList::new());

    let bounds = instance.compute_bounds().unwrap();
    assert!(vec2_approx(bounds.min, Vec2::ZERO));
    assert!(vec2_approx(bounds.max, Vec2::ONE));
}

#[test]
fn bounds_follow_deform_and_world_transform() {
    let dir = scratch_dir("bounds_deform");
    write_atlas(&dir.join("b.png"), 4);
    let model = ActorModel::new(dir.join("b"), 1)
        .with_image(quad("q").with_texture(0).with_vertex_deform());
    let mut instance = initialized(model, &mut DrawList::new());

    instance
        .set_deformed_vertices(0, &[0.0, 0.0, 2.0, 0.0, 2.0, 3.0, 0.0, 3.0])
        .unwrap();
    instance.image_mut(0).unwrap().world_transform =
        Affine2::from_translation(Vec2::new(10.0, 0.0));

    let bounds = instance.compute_bounds().unwrap();
    assert!(vec2_approx(bounds.min, Vec2::new(10.0, 0.0)));
    assert!(vec2_approx(bounds.max, Vec2::new(12.0, 3.0)));
}

#[test]
fn bounds_follow_bones() {
    let dir = scratch_dir("bounds_skin");
    write_atlas(&dir.join("b.png"), 4);
    let model = ActorModel::new(dir.join("b"), 1).with_image(skinned_triangle("s").with_texture(0));
    let mut instance = initialized(model, &mut DrawList::new());

    instance.image_mut(0).unwrap().bone_influence_matrices[1] =
        Affine2::from_translation(Vec2::new(0.0, 5.0));

    let bounds = instance.compute_bounds().unwrap();
    assert!(vec2_approx(bounds.min, Vec2::new(0.0, 5.0)));
    assert!(vec2_approx(bounds.max, Vec2::new(2.0, 7.0)));
}

#[test]
fn bounds_ignore_images_with_missing_atlas() {
    let dir = scratch_dir("bounds_missing_atlas");
    write_atlas(&dir.join("half0.png"), 4);
    let model = ActorModel::new(dir.join("half"), 2)
        .with_image(quad("loaded").with_texture(0))
        .with_image(quad("missing").with_texture(1));
    let mut renderer = DrawList::new();
    let mut instance = initialized(model, &mut renderer);
    instance.image_mut(1).unwrap().world_transform =
        Affine2::from_translation(Vec2::new(100.0, 100.0));

    instance.render(&mut renderer);
    assert_eq!(renderer.commands().len(), 1);

    let bounds = instance.compute_bounds().unwrap();
    assert!(vec2_approx(bounds.min, Vec2::ZERO));
    assert!(vec2_approx(bounds.max, Vec2::ONE));
}

#[test]
fn bounds_ignore_images_without_triangles() {
    let dir = scratch_dir("bounds_no_triangles");
    write_atlas(&dir.join("b.png"), 4);
    let mut flat = quad("flat").with_texture(0);
    flat.triangles.clear();
    let model = ActorModel::new(dir.join("b"), 1)
        .with_image(quad("q").with_texture(0))
        .with_image(flat);
    let mut instance = initialized(model, &mut DrawList::new());
    instance.image_mut(1).unwrap().world_transform =
        Affine2::from_translation(Vec2::new(-50.0, 0.0));

    let bounds = instance.compute_bounds().unwrap();
    assert!(vec2_approx(bounds.min, Vec2::ZERO));
}

#[test]
fn bounds_union_every_drawn_image() {
    let dir = scratch_dir("bounds_union");
    write_atlas(&dir.join("b.png"), 4);
    let model = ActorModel::new(dir.join("b"), 1)
        .with_image(quad("a").with_texture(0))
        .with_image(quad("b").with_texture(0));
    let mut instance = initialized(model, &mut DrawList::new());
    instance.image_mut(1).unwrap().world_transform =
        Affine2::from_translation(Vec2::new(3.0, -2.0));

    let bounds = instance.compute_bounds().unwrap();
    assert!(vec2_approx(bounds.min, Vec2::new(0.0, -2.0)));
    assert!(vec2_approx(bounds.max, Vec2::new(4.0, 1.0)));
}

#[test]
fn bounds_ignore_untextured_images() {
    let model = ActorModel::new("none", 0).with_image(quad("q"));
    let instance = initialized(model, &mut DrawList::new());
    assert!(instance.compute_bounds().is_none());
}
