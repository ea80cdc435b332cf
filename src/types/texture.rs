use serde::Serialize;

use crate::error::{MaterialError, Result};
use crate::wire::{self, Packer, Unpacker};

bitflags::bitflags! {
    /// Per-texture state byte on the wire.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextureStateFlags: u8 {
        const USE_ALPHA = 1 << 0;
        const USE_COLOR = 1 << 1;
        const USE_SPHERE_MAP = 1 << 2;
    }
}

/// How a texture combines with the material color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMode {
    Replace = 0,
    Modulate = 1,
    #[default]
    Decal = 2,
    Blend = 3,
    Add = 4,
    Combine = 5,
}

impl CombineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CombineMode::Replace => "replace",
            CombineMode::Modulate => "modulate",
            CombineMode::Decal => "decal",
            CombineMode::Blend => "blend",
            CombineMode::Add => "add",
            CombineMode::Combine => "combine",
        }
    }
}

impl std::fmt::Display for CombineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i32> for CombineMode {
    type Error = MaterialError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(CombineMode::Replace),
            1 => Ok(CombineMode::Modulate),
            2 => Ok(CombineMode::Decal),
            3 => Ok(CombineMode::Blend),
            4 => Ok(CombineMode::Add),
            5 => Ok(CombineMode::Combine),
            _ => Err(MaterialError::Decode(format!(
                "unknown texture combine mode {value}"
            ))),
        }
    }
}

/// One texture slot of a material.
///
/// `local_name` is where the client actually found the file. It is never
/// transmitted and does not take part in equality.
#[derive(Debug, Clone, Serialize)]
pub struct TextureSlot {
    pub name: String,
    pub local_name: String,
    /// Index into the texture matrix table, -1 for none.
    pub matrix: i32,
    pub combine_mode: CombineMode,
    pub use_alpha: bool,
    pub use_color: bool,
    pub use_sphere_map: bool,
}

impl TextureSlot {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            local_name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn set_matrix(&mut self, matrix: i32) -> &mut Self {
        self.matrix = matrix;
        self
    }

    pub fn set_combine_mode(&mut self, mode: CombineMode) -> &mut Self {
        self.combine_mode = mode;
        self
    }

    pub fn set_use_alpha(&mut self, value: bool) -> &mut Self {
        self.use_alpha = value;
        self
    }

    pub fn set_use_color(&mut self, value: bool) -> &mut Self {
        self.use_color = value;
        self
    }

    pub fn set_use_sphere_map(&mut self, value: bool) -> &mut Self {
        self.use_sphere_map = value;
        self
    }

    pub fn state_flags(&self) -> TextureStateFlags {
        let mut flags = TextureStateFlags::empty();
        flags.set(TextureStateFlags::USE_ALPHA, self.use_alpha);
        flags.set(TextureStateFlags::USE_COLOR, self.use_color);
        flags.set(TextureStateFlags::USE_SPHERE_MAP, self.use_sphere_map);
        flags
    }

    pub fn pack_size(&self) -> usize {
        wire::string_pack_size(&self.name) + wire::I32_SIZE + wire::I32_SIZE + wire::U8_SIZE
    }

    pub fn pack(&self, packer: &mut Packer) {
        packer.pack_string(&self.name);
        packer.pack_i32(self.matrix);
        packer.pack_i32(self.combine_mode as i32);
        packer.pack_u8(self.state_flags().bits());
    }

    pub fn unpack(unpacker: &mut Unpacker<'_>) -> Result<Self> {
        let name = unpacker.unpack_string("texture name")?;
        let matrix = unpacker.unpack_i32("texture matrix")?;
        let combine_mode = CombineMode::try_from(unpacker.unpack_i32("texture combine mode")?)?;
        // Unknown high bits are ignored
        let state = TextureStateFlags::from_bits_truncate(unpacker.unpack_u8("texture state")?);

        Ok(Self {
            local_name: name.clone(),
            name,
            matrix,
            combine_mode,
            use_alpha: state.contains(TextureStateFlags::USE_ALPHA),
            use_color: state.contains(TextureStateFlags::USE_COLOR),
            use_sphere_map: state.contains(TextureStateFlags::USE_SPHERE_MAP),
        })
    }
}

impl Default for TextureSlot {
    fn default() -> Self {
        Self {
            name: String::new(),
            local_name: String::new(),
            matrix: -1,
            combine_mode: CombineMode::Decal,
            use_alpha: false,
            use_color: true,
            use_sphere_map: false,
        }
    }
}

impl PartialEq for TextureSlot {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.matrix == other.matrix
            && self.combine_mode == other.combine_mode
            && self.use_alpha == other.use_alpha
            && self.use_color == other.use_color
            && self.use_sphere_map == other.use_sphere_map
    }
}
