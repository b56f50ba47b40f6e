//! Draw dispatch: walks an asset's groups and issues one draw per group.

use asset::{MaterialProperties, TextureSlot};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::{
    gpu::{LayoutHandle, TextureHandle},
    loaded::{DrawGroup, LoadedAsset},
};

/// How triangles are rasterized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RasterMode {
    #[default]
    Fill,
    Wireframe,
    Points,
}

impl RasterMode {
    pub const ALL: [RasterMode; 3] = [RasterMode::Fill, RasterMode::Wireframe, RasterMode::Points];

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "fill" | "smooth" => Some(Self::Fill),
            "wireframe" | "lines" | "line" => Some(Self::Wireframe),
            "points" | "point" => Some(Self::Points),
            _ => None,
        }
    }
}

/// Which faces are rasterized; the other side is culled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FaceMode {
    Front,
    Back,
    #[default]
    FrontAndBack,
}

impl FaceMode {
    pub const ALL: [FaceMode; 3] = [FaceMode::Front, FaceMode::Back, FaceMode::FrontAndBack];

    /// Next mode in cycle order, wrapping around.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "front" => Some(Self::Front),
            "back" => Some(Self::Back),
            "both" | "front-and-back" | "none" => Some(Self::FrontAndBack),
            _ => None,
        }
    }
}

/// Transform state for one asset's draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawTransform {
    pub model: Mat4,
    pub view_proj: Mat4,
    pub eye: Vec3,
}

/// Per-draw uniform block. Matches `DrawUniforms` in `shaders/mesh.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq)]
pub struct DrawUniforms {
    pub mvp: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub eye: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub emission: [f32; 4],
    /// x = shininess, y = dissolve, z = illum, w = unused.
    pub params: [f32; 4],
    /// 1.0 where a texture is bound, slots 0..4.
    pub has_texture_a: [f32; 4],
    /// Slots 4..7; w unused.
    pub has_texture_b: [f32; 4],
}

impl DrawUniforms {
    pub fn new(
        transform: &DrawTransform,
        material: &MaterialProperties,
        bound: &[bool; TextureSlot::COUNT],
    ) -> Self {
        let rgb = |c: [f32; 3], a: f32| [c[0], c[1], c[2], a];
        let flag = |i: usize| if bound[i] { 1.0 } else { 0.0 };
        Self {
            mvp: (transform.view_proj * transform.model).to_cols_array_2d(),
            model: transform.model.to_cols_array_2d(),
            eye: transform.eye.extend(1.0).to_array(),
            ambient: rgb(material.ambient, 1.0),
            diffuse: rgb(material.diffuse, material.dissolve),
            specular: rgb(material.specular, 1.0),
            emission: rgb(material.emission, 1.0),
            params: [material.shininess, material.dissolve, material.illum as f32, 0.0],
            has_texture_a: [flag(0), flag(1), flag(2), flag(3)],
            has_texture_b: [flag(4), flag(5), flag(6), 0.0],
        }
    }

    pub fn is_bound(&self, slot: TextureSlot) -> bool {
        let i = slot.index();
        let v = if i < 4 {
            self.has_texture_a[i]
        } else {
            self.has_texture_b[i - 4]
        };
        v > 0.5
    }
}

/// Receiver of draw commands. Implemented by the wgpu frame recorder.
pub trait DrawSink {
    fn set_raster_state(&mut self, face: FaceMode, raster: RasterMode);
    fn bind_texture(&mut self, slot: TextureSlot, texture: TextureHandle);
    /// Reset every texture slot (unit 0 included) to "no texture".
    fn unbind_textures(&mut self);
    fn set_uniforms(&mut self, uniforms: &DrawUniforms);
    fn bind_vertex_layout(&mut self, layout: LayoutHandle);
    fn draw_triangles(&mut self, vertex_count: u32);
}

/// Draw every group of `asset` in stored order. Returns the number of draw calls.
pub fn draw_asset<S: DrawSink + ?Sized>(
    asset: &LoadedAsset,
    face: FaceMode,
    raster: RasterMode,
    transform: &DrawTransform,
    sink: &mut S,
) -> usize {
    if asset.is_empty() {
        return 0;
    }

    sink.set_raster_state(face, raster);
    let mut calls = 0;
    for group in asset.groups() {
        if draw_group(asset, group, transform, sink) {
            calls += 1;
        }
    }
    calls
}

fn draw_group<S: DrawSink + ?Sized>(
    asset: &LoadedAsset,
    group: &DrawGroup,
    transform: &DrawTransform,
    sink: &mut S,
) -> bool {
    let Some(buffers) = group.gpu else {
        log::debug!(
            "Group with material {:?} of '{}' has no GPU buffers, skipped",
            group.material_id,
            asset.source().display()
        );
        return false;
    };

    let mut bound = [false; TextureSlot::COUNT];
    for (slot, key) in group.textures.iter() {
        if let Some(handle) = asset.textures().get(key) {
            sink.bind_texture(slot, handle);
            bound[slot.index()] = true;
        }
    }

    sink.set_uniforms(&DrawUniforms::new(transform, &group.material, &bound));
    sink.bind_vertex_layout(buffers.layout);
    sink.draw_triangles(group.vertex_count());
    sink.unbind_textures();
    true
}

#[cfg(test)]
mod tests {
    use asset::Bounds;

    use super::*;
    use crate::{
        gpu::BufferHandle,
        loaded::GroupBuffers,
        testing::{RecordingSink, SinkCall},
    };

    #[test]
    fn face_mode_parse_and_cycle() {
        assert_eq!(FaceMode::parse("Front"), Some(FaceMode::Front));
        assert_eq!(FaceMode::parse("back"), Some(FaceMode::Back));
        assert_eq!(FaceMode::parse("both"), Some(FaceMode::FrontAndBack));
        assert_eq!(FaceMode::parse("sideways"), None);
        assert_eq!(FaceMode::Front.next(), FaceMode::Back);
        assert_eq!(FaceMode::FrontAndBack.next(), FaceMode::Front);
    }

    fn transform() -> DrawTransform {
        DrawTransform {
            model: Mat4::from_scale(Vec3::splat(0.5)),
            view_proj: Mat4::IDENTITY,
            eye: Vec3::new(0.0, 0.0, 3.0),
        }
    }

    fn asset_with_groups() -> LoadedAsset {
        let mut asset = LoadedAsset::empty("draw.obj");

        let mut textured = MaterialProperties::named("tex");
        textured.ambient = [0.1, 0.2, 0.3];
        textured.shininess = 16.0;
        let mut g0 = DrawGroup::new(2, Some(0), textured, Bounds::default());
        g0.textures.set(TextureSlot::Diffuse, Some("d.png".into()));
        g0.gpu = Some(GroupBuffers {
            buffer: BufferHandle(1),
            layout: LayoutHandle(2),
        });

        let mut g1 = DrawGroup::new(1, None, MaterialProperties::default(), Bounds::default());
        g1.gpu = Some(GroupBuffers {
            buffer: BufferHandle(3),
            layout: LayoutHandle(4),
        });

        asset.groups.push(g0);
        asset.groups.push(g1);
        asset
    }

    #[test]
    fn issues_one_draw_per_group_in_order() {
        let asset = asset_with_groups();
        let mut sink = RecordingSink::default();
        let calls = draw_asset(
            &asset,
            FaceMode::FrontAndBack,
            RasterMode::Wireframe,
            &transform(),
            &mut sink,
        );
        assert_eq!(calls, 2);

        let draws: Vec<_> = sink
            .calls
            .iter()
            .filter_map(|c| match c {
                SinkCall::Draw(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(draws, vec![6, 3]);
        assert_eq!(
            sink.calls[0],
            SinkCall::Raster(FaceMode::FrontAndBack, RasterMode::Wireframe)
        );
    }

    #[test]
    fn textures_are_unbound_after_every_group() {
        let asset = asset_with_groups();
        let mut sink = RecordingSink::default();
        draw_asset(&asset, FaceMode::Front, RasterMode::Fill, &transform(), &mut sink);

        for (i, call) in sink.calls.iter().enumerate() {
            if matches!(call, SinkCall::Draw(_)) {
                assert_eq!(sink.calls.get(i + 1), Some(&SinkCall::UnbindTextures));
            }
        }
    }

    #[test]
    fn missing_texture_key_is_not_bound() {
        // The diffuse key of group 0 is not in the cache: flat-color fallback.
        let asset = asset_with_groups();
        let mut sink = RecordingSink::default();
        draw_asset(&asset, FaceMode::Front, RasterMode::Fill, &transform(), &mut sink);

        assert!(!sink.calls.iter().any(|c| matches!(c, SinkCall::BindTexture(..))));
        let uniforms = sink.uniforms();
        assert!(!uniforms[0].is_bound(TextureSlot::Diffuse));
        assert_eq!(uniforms[0].ambient, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(uniforms[0].params[0], 16.0);
    }

    #[test]
    fn groups_without_buffers_are_skipped() {
        let mut asset = asset_with_groups();
        asset.groups[0].gpu = None;
        let mut sink = RecordingSink::default();
        let calls = draw_asset(&asset, FaceMode::Back, RasterMode::Points, &transform(), &mut sink);
        assert_eq!(calls, 1);
    }

    #[test]
    fn empty_asset_draws_nothing() {
        let asset = LoadedAsset::empty("none.obj");
        let mut sink = RecordingSink::default();
        assert_eq!(
            draw_asset(&asset, FaceMode::Front, RasterMode::Fill, &transform(), &mut sink),
            0
        );
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn mvp_combines_model_and_view_proj() {
        let t = transform();
        let u = DrawUniforms::new(&t, &MaterialProperties::default(), &[false; TextureSlot::COUNT]);
        assert_eq!(u.mvp, t.model.to_cols_array_2d());
        assert_eq!(u.diffuse, [0.6, 0.6, 0.6, 1.0]);
    }
}
