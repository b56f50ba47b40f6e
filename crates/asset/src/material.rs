//! Material properties as declared in a material library.

/// One texture channel of a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Ambient,
    Diffuse,
    Specular,
    SpecularHighlight,
    Bump,
    Alpha,
    Reflection,
}

impl TextureSlot {
    pub const COUNT: usize = 7;

    /// All slots in binding order.
    pub const ALL: [TextureSlot; Self::COUNT] = [
        TextureSlot::Ambient,
        TextureSlot::Diffuse,
        TextureSlot::Specular,
        TextureSlot::SpecularHighlight,
        TextureSlot::Bump,
        TextureSlot::Alpha,
        TextureSlot::Reflection,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Texture file names per channel, exactly as written in the library.
/// `None` means the channel is unset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureNames {
    pub ambient: Option<String>,
    pub diffuse: Option<String>,
    pub specular: Option<String>,
    pub specular_highlight: Option<String>,
    pub bump: Option<String>,
    pub alpha: Option<String>,
    pub reflection: Option<String>,
}

impl TextureNames {
    pub fn get(&self, slot: TextureSlot) -> Option<&str> {
        let name = match slot {
            TextureSlot::Ambient => &self.ambient,
            TextureSlot::Diffuse => &self.diffuse,
            TextureSlot::Specular => &self.specular,
            TextureSlot::SpecularHighlight => &self.specular_highlight,
            TextureSlot::Bump => &self.bump,
            TextureSlot::Alpha => &self.alpha,
            TextureSlot::Reflection => &self.reflection,
        };
        name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn set(&mut self, slot: TextureSlot, name: Option<String>) {
        let field = match slot {
            TextureSlot::Ambient => &mut self.ambient,
            TextureSlot::Diffuse => &mut self.diffuse,
            TextureSlot::Specular => &mut self.specular,
            TextureSlot::SpecularHighlight => &mut self.specular_highlight,
            TextureSlot::Bump => &mut self.bump,
            TextureSlot::Alpha => &mut self.alpha,
            TextureSlot::Reflection => &mut self.reflection,
        };
        *field = name;
    }

    /// Iterate over the set channels only.
    pub fn iter(&self) -> impl Iterator<Item = (TextureSlot, &str)> {
        TextureSlot::ALL
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|name| (slot, name)))
    }
}

/// Phong-style material parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialProperties {
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub transmittance: [f32; 3],
    pub emission: [f32; 3],
    pub shininess: f32,
    pub ior: f32,
    /// Opacity, 1.0 is fully opaque.
    pub dissolve: f32,
    pub illum: i32,
    pub textures: TextureNames,
}

impl MaterialProperties {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for MaterialProperties {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient: [0.0; 3],
            diffuse: [0.6; 3],
            specular: [0.0; 3],
            transmittance: [0.0; 3],
            emission: [0.0; 3],
            shininess: 1.0,
            ior: 1.0,
            dissolve: 1.0,
            illum: 0,
            textures: TextureNames::default(),
        }
    }
}
