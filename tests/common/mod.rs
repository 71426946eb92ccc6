//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use actor2d::model::{ActorImage, ActorModel, SKINNED_VERTEX_STRIDE};

/// A fresh scratch directory unique to `name` and this process.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("actor2d_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes a solid-color PNG atlas.
pub fn write_atlas(path: &Path, size: u32) {
    let img = image::RgbaImage::from_pixel(size, size, image::Rgba([255, 128, 0, 255]));
    img.save(path).unwrap();
}

/// Unit quad at the origin, 4 vertices, 2 triangles.
pub fn quad(name: &str) -> ActorImage {
    #[rustfmt::skip]
    let vertices = vec![
        0.0, 0.0, 0.0, 0.0,
        1.0, 0.0, 1.0, 0.0,
        1.0, 1.0, 1.0, 1.0,
        0.0, 1.0, 0.0, 1.0,
    ];
    ActorImage::new(name, vertices, vec![0, 1, 2, 0, 2, 3])
}

/// Triangle fully weighted to bone slot 1.
pub fn skinned_triangle(name: &str) -> ActorImage {
    let mut vertices = Vec::with_capacity(3 * SKINNED_VERTEX_STRIDE);
    for (x, y) in [(0.0, 0.0), (2.0, 0.0), (0.0, 2.0)] {
        vertices.extend_from_slice(&[x, y, x * 0.5, y * 0.5]);
        vertices.extend_from_slice(&[1.0, 0.0, 0.0, 0.0]);
        vertices.extend_from_slice(&[1.0, 0.0, 0.0, 0.0]);
    }
    ActorImage::skinned(name, vertices, vec![0, 1, 2], 1)
}

/// A model with one atlas written to disk and one image per draw variant.
pub fn four_variant_model(dir: &Path) -> ActorModel {
    let base = dir.join("hero");
    write_atlas(&dir.join("hero.png"), 8);

    ActorModel::new(base, 1)
        .with_image(quad("plain").with_texture(0))
        .with_image(quad("deformed").with_texture(0).with_vertex_deform())
        .with_image(skinned_triangle("skinned").with_texture(0))
        .with_image(
            skinned_triangle("skinned_deformed")
                .with_texture(0)
                .with_vertex_deform(),
        )
}
