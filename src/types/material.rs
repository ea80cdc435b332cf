use std::io::{self, Write};

use serde::Serialize;
use tracing::warn;

use super::texture::{CombineMode, TextureSlot};
use crate::error::Result;
use crate::external::{DynamicColorSource, TextureAlphaSource};
use crate::wire::{self, Packer, Unpacker};

/// Texture and shader counts travel as a single byte.
pub const MAX_SLOTS: usize = u8::MAX as usize;

pub const DEFAULT_AMBIENT: [f32; 4] = [0.2, 0.2, 0.2, 1.0];
pub const DEFAULT_DIFFUSE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
pub const DEFAULT_SPECULAR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
pub const DEFAULT_EMISSION: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

bitflags::bitflags! {
    /// Material mode byte on the wire.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModeFlags: u8 {
        const NO_CULLING = 1 << 0;
        const NO_SORTING = 1 << 1;
        const NO_RADAR = 1 << 2;
        const NO_SHADOW = 1 << 3;
        const OCCLUDER = 1 << 4;
        const GROUP_ALPHA = 1 << 5;
        const NO_LIGHTING = 1 << 6;
    }
}

/// Digit-led strings are reserved for legacy numeric indices.
pub fn is_reserved_name(name: &str) -> bool {
    name.as_bytes().first().is_none_or(|b| b.is_ascii_digit())
}

/// A named bundle of surface render attributes.
///
/// Equality is structural: names, aliases, texture local names and the
/// `referenced` flag are ignored.
#[derive(Debug, Clone, Serialize)]
pub struct Material {
    name: String,
    aliases: Vec<String>,
    /// Index into the dynamic color table, -1 for none.
    pub dynamic_color: i32,
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub emission: [f32; 4],
    pub shininess: f32,
    pub alpha_threshold: f32,
    pub occluder: bool,
    pub group_alpha: bool,
    pub no_radar: bool,
    pub no_shadow: bool,
    pub no_culling: bool,
    pub no_sorting: bool,
    pub no_lighting: bool,
    textures: Vec<TextureSlot>,
    shaders: Vec<String>,
    legacy_index: i32,
    #[serde(skip)]
    referenced: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            aliases: Vec::new(),
            dynamic_color: -1,
            ambient: DEFAULT_AMBIENT,
            diffuse: DEFAULT_DIFFUSE,
            specular: DEFAULT_SPECULAR,
            emission: DEFAULT_EMISSION,
            shininess: 0.0,
            alpha_threshold: 0.0,
            occluder: false,
            group_alpha: false,
            no_radar: false,
            no_shadow: false,
            no_culling: false,
            no_sorting: false,
            no_lighting: false,
            textures: Vec::new(),
            shaders: Vec::new(),
            legacy_index: -1,
            referenced: false,
        }
    }
}

impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default material carrying `name` (left empty if the name is rejected).
    pub fn named(name: &str) -> Self {
        let mut mat = Self::default();
        mat.set_name(name);
        mat
    }

    /// Restore every field to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // --- Identity ---

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns false and clears the name if `name` is empty or digit-led.
    pub fn set_name(&mut self, name: &str) -> bool {
        if is_reserved_name(name) {
            self.name.clear();
            return false;
        }
        self.name = name.to_string();
        true
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Append an alternate name.
    ///
    /// A rejected alias clears the primary name as well, matching what
    /// deployed peers do.
    pub fn add_alias(&mut self, alias: &str) -> bool {
        if is_reserved_name(alias) {
            self.name.clear();
            return false;
        }
        if !self.aliases.iter().any(|a| a == alias) {
            self.aliases.push(alias.to_string());
        }
        true
    }

    /// Whether `target` is this material's name or one of its aliases.
    pub fn answers_to(&self, target: &str) -> bool {
        self.name == target || self.aliases.iter().any(|a| a == target)
    }

    pub fn legacy_index(&self) -> i32 {
        self.legacy_index
    }

    pub fn set_legacy_index(&mut self, index: i32) {
        self.legacy_index = index;
    }

    pub fn is_referenced(&self) -> bool {
        self.referenced
    }

    pub fn set_referenced(&mut self, referenced: bool) {
        self.referenced = referenced;
    }

    // --- Colors ---

    pub fn set_ambient(&mut self, color: [f32; 4]) {
        self.ambient = color;
    }

    pub fn set_diffuse(&mut self, color: [f32; 4]) {
        self.diffuse = color;
    }

    pub fn set_specular(&mut self, color: [f32; 4]) {
        self.specular = color;
    }

    pub fn set_emission(&mut self, color: [f32; 4]) {
        self.emission = color;
    }

    pub fn mode_flags(&self) -> ModeFlags {
        let mut flags = ModeFlags::empty();
        flags.set(ModeFlags::NO_CULLING, self.no_culling);
        flags.set(ModeFlags::NO_SORTING, self.no_sorting);
        flags.set(ModeFlags::NO_RADAR, self.no_radar);
        flags.set(ModeFlags::NO_SHADOW, self.no_shadow);
        flags.set(ModeFlags::OCCLUDER, self.occluder);
        flags.set(ModeFlags::GROUP_ALPHA, self.group_alpha);
        flags.set(ModeFlags::NO_LIGHTING, self.no_lighting);
        flags
    }

    pub fn set_mode_flags(&mut self, flags: ModeFlags) {
        self.no_culling = flags.contains(ModeFlags::NO_CULLING);
        self.no_sorting = flags.contains(ModeFlags::NO_SORTING);
        self.no_radar = flags.contains(ModeFlags::NO_RADAR);
        self.no_shadow = flags.contains(ModeFlags::NO_SHADOW);
        self.occluder = flags.contains(ModeFlags::OCCLUDER);
        self.group_alpha = flags.contains(ModeFlags::GROUP_ALPHA);
        self.no_lighting = flags.contains(ModeFlags::NO_LIGHTING);
    }

    // --- Textures ---

    pub fn textures(&self) -> &[TextureSlot] {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut [TextureSlot] {
        &mut self.textures
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn texture(&self, index: usize) -> Option<&TextureSlot> {
        self.textures.get(index)
    }

    pub fn texture_mut(&mut self, index: usize) -> Option<&mut TextureSlot> {
        self.textures.get_mut(index)
    }

    pub fn last_texture_mut(&mut self) -> Option<&mut TextureSlot> {
        self.textures.last_mut()
    }

    /// Append a texture slot and return it for further configuration.
    ///
    /// `use_alpha` is seeded from the texture source.
    pub fn add_texture(
        &mut self,
        name: &str,
        source: &impl TextureAlphaSource,
    ) -> &mut TextureSlot {
        let mut slot = TextureSlot::new(name);
        slot.use_alpha = source.has_alpha(name);
        self.textures.push(slot);
        let last = self.textures.len() - 1;
        &mut self.textures[last]
    }

    /// Rename the last texture, or add one if there are none.
    pub fn set_texture(
        &mut self,
        name: &str,
        source: &impl TextureAlphaSource,
    ) -> &mut TextureSlot {
        if self.textures.is_empty() {
            return self.add_texture(name, source);
        }
        let last = self.textures.len() - 1;
        let slot = &mut self.textures[last];
        slot.name = name.to_string();
        slot
    }

    pub fn set_texture_matrix(&mut self, matrix: i32) {
        if let Some(slot) = self.last_texture_mut() {
            slot.set_matrix(matrix);
        }
    }

    pub fn set_combine_mode(&mut self, mode: CombineMode) {
        if let Some(slot) = self.last_texture_mut() {
            slot.set_combine_mode(mode);
        }
    }

    pub fn set_use_texture_alpha(&mut self, value: bool) {
        if let Some(slot) = self.last_texture_mut() {
            slot.set_use_alpha(value);
        }
    }

    pub fn set_use_color_on_texture(&mut self, value: bool) {
        if let Some(slot) = self.last_texture_mut() {
            slot.set_use_color(value);
        }
    }

    pub fn set_use_sphere_map(&mut self, value: bool) {
        if let Some(slot) = self.last_texture_mut() {
            slot.set_use_sphere_map(value);
        }
    }

    pub fn clear_textures(&mut self) {
        self.textures.clear();
    }

    // --- Shaders ---

    pub fn shaders(&self) -> &[String] {
        &self.shaders
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn add_shader(&mut self, name: &str) {
        self.shaders.push(name.to_string());
    }

    /// Replace the last shader, or add one if there are none.
    pub fn set_shader(&mut self, name: &str) {
        match self.shaders.last_mut() {
            Some(last) => *last = name.to_string(),
            None => self.add_shader(name),
        }
    }

    pub fn clear_shaders(&mut self) {
        self.shaders.clear();
    }

    // --- Queries ---

    /// True when nothing of this material would ever reach the screen, so
    /// mesh generation may skip it.
    pub fn is_invisible(&self, colors: &impl DynamicColorSource) -> bool {
        let texture_ignores_color = self.textures.first().is_some_and(|t| !t.use_color);
        self.diffuse[3] == 0.0
            && colors.dynamic_color(self.dynamic_color).is_none()
            && !texture_ignores_color
    }

    // --- Wire format ---

    /// Exact number of bytes `pack` writes.
    pub fn pack_size(&self) -> usize {
        let mut size = wire::string_pack_size(&self.name);
        size += wire::U8_SIZE; // mode byte
        size += wire::I32_SIZE; // dynamic color
        size += 4 * wire::F32X4_SIZE;
        size += 2 * wire::F32_SIZE; // shininess, alpha threshold

        size += wire::U8_SIZE;
        size += self
            .textures
            .iter()
            .take(MAX_SLOTS)
            .map(TextureSlot::pack_size)
            .sum::<usize>();

        size += wire::U8_SIZE;
        size += self
            .shaders
            .iter()
            .take(MAX_SLOTS)
            .map(|s| wire::string_pack_size(s))
            .sum::<usize>();
        size
    }

    pub fn pack(&self, packer: &mut Packer) {
        packer.pack_string(&self.name);
        packer.pack_u8(self.mode_flags().bits());
        packer.pack_i32(self.dynamic_color);
        packer.pack_f32x4(&self.ambient);
        packer.pack_f32x4(&self.diffuse);
        packer.pack_f32x4(&self.specular);
        packer.pack_f32x4(&self.emission);
        packer.pack_f32(self.shininess);
        packer.pack_f32(self.alpha_threshold);

        if self.textures.len() > MAX_SLOTS || self.shaders.len() > MAX_SLOTS {
            warn!(
                material = %self.name,
                textures = self.textures.len(),
                shaders = self.shaders.len(),
                "Too many slots for the wire format, extra entries dropped"
            );
        }

        let textures = &self.textures[..self.textures.len().min(MAX_SLOTS)];
        packer.pack_u8(textures.len() as u8);
        for slot in textures {
            slot.pack(packer);
        }

        let shaders = &self.shaders[..self.shaders.len().min(MAX_SLOTS)];
        packer.pack_u8(shaders.len() as u8);
        for shader in shaders {
            packer.pack_string(shader);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut packer = Packer::with_capacity(self.pack_size());
        self.pack(&mut packer);
        packer.into_bytes()
    }

    /// Decode one material. Aliases and the legacy index are not on the wire.
    pub fn unpack(unpacker: &mut Unpacker<'_>) -> Result<Self> {
        let mut mat = Material {
            name: unpacker.unpack_string("material name")?,
            ..Default::default()
        };

        let mode = ModeFlags::from_bits_truncate(unpacker.unpack_u8("material mode")?);
        mat.set_mode_flags(mode);

        mat.dynamic_color = unpacker.unpack_i32("dynamic color")?;
        mat.ambient = unpacker.unpack_f32x4("ambient")?;
        mat.diffuse = unpacker.unpack_f32x4("diffuse")?;
        mat.specular = unpacker.unpack_f32x4("specular")?;
        mat.emission = unpacker.unpack_f32x4("emission")?;
        mat.shininess = unpacker.unpack_f32("shininess")?;
        mat.alpha_threshold = unpacker.unpack_f32("alpha threshold")?;

        let texture_count = unpacker.unpack_u8("texture count")?;
        mat.textures.reserve(texture_count as usize);
        for _ in 0..texture_count {
            mat.textures.push(TextureSlot::unpack(unpacker)?);
        }

        let shader_count = unpacker.unpack_u8("shader count")?;
        mat.shaders.reserve(shader_count as usize);
        for _ in 0..shader_count {
            mat.shaders.push(unpacker.unpack_string("shader name")?);
        }

        Ok(mat)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::unpack(&mut Unpacker::new(data))
    }

    // --- Presentation ---

    /// World-file style dump listing only what differs from the defaults.
    pub fn print(&self, out: &mut impl Write, indent: &str) -> io::Result<()> {
        writeln!(out, "{indent}material")?;
        if !self.name.is_empty() {
            writeln!(out, "{indent}  name {}", self.name)?;
        }
        for alias in &self.aliases {
            writeln!(out, "{indent}  # alias {alias}")?;
        }
        if self.dynamic_color != -1 {
            writeln!(out, "{indent}  dyncol {}", self.dynamic_color)?;
        }

        let colors = [
            ("ambient", &self.ambient, &DEFAULT_AMBIENT),
            ("diffuse", &self.diffuse, &DEFAULT_DIFFUSE),
            ("specular", &self.specular, &DEFAULT_SPECULAR),
            ("emission", &self.emission, &DEFAULT_EMISSION),
        ];
        for (label, color, default) in colors {
            if color != default {
                writeln!(
                    out,
                    "{indent}  {label} {} {} {} {}",
                    color[0], color[1], color[2], color[3]
                )?;
            }
        }
        if self.shininess != 0.0 {
            writeln!(out, "{indent}  shininess {}", self.shininess)?;
        }
        if self.alpha_threshold != 0.0 {
            writeln!(out, "{indent}  alphathresh {}", self.alpha_threshold)?;
        }

        let switches = [
            ("occluder", self.occluder),
            ("groupalpha", self.group_alpha),
            ("noradar", self.no_radar),
            ("noshadow", self.no_shadow),
            ("noculling", self.no_culling),
            ("nosorting", self.no_sorting),
            ("nolighting", self.no_lighting),
        ];
        for (label, on) in switches {
            if on {
                writeln!(out, "{indent}  {label}")?;
            }
        }

        for slot in &self.textures {
            writeln!(out, "{indent}  addtexture {}", slot.name)?;
            if slot.matrix != -1 {
                writeln!(out, "{indent}    texmat {}", slot.matrix)?;
            }
            if slot.combine_mode != CombineMode::Decal {
                writeln!(out, "{indent}    combine {}", slot.combine_mode)?;
            }
            if !slot.use_alpha {
                writeln!(out, "{indent}    notexalpha")?;
            }
            if !slot.use_color {
                writeln!(out, "{indent}    notexcolor")?;
            }
            if slot.use_sphere_map {
                writeln!(out, "{indent}    spheremap")?;
            }
        }
        for shader in &self.shaders {
            writeln!(out, "{indent}  addshader {shader}")?;
        }
        writeln!(out, "{indent}end")?;
        writeln!(out)
    }

    /// Wavefront MTL block for this material.
    pub fn print_mtl(&self, out: &mut impl Write, indent: &str) -> io::Result<()> {
        let name = if self.name.is_empty() {
            self.aliases.first().map(String::as_str).unwrap_or("unnamed")
        } else {
            self.name.as_str()
        };
        // OBJ shininess runs 0..1000, ours runs 0..128
        let ns = 1000.0 * self.shininess / 128.0;

        writeln!(out, "{indent}newmtl {name}")?;
        write_rgb(out, indent, "Ka", &self.ambient)?;
        write_rgb(out, indent, "Kd", &self.diffuse)?;
        writeln!(out, "{indent}d {}", self.diffuse[3])?;
        write_rgb(out, indent, "Ks", &self.specular)?;
        write_rgb(out, indent, "Ke", &self.emission)?;
        writeln!(out, "{indent}Ns {ns}")?;
        if let Some(slot) = self.textures.first() {
            writeln!(out, "{indent}map_Kd {}", slot.local_name)?;
        }
        writeln!(out)
    }
}

fn write_rgb(out: &mut impl Write, indent: &str, tag: &str, c: &[f32; 4]) -> io::Result<()> {
    writeln!(out, "{indent}{tag} {} {} {}", c[0], c[1], c[2])
}

impl PartialEq for Material {
    fn eq(&self, other: &Self) -> bool {
        self.dynamic_color == other.dynamic_color
            && self.ambient == other.ambient
            && self.diffuse == other.diffuse
            && self.specular == other.specular
            && self.emission == other.emission
            && self.shininess == other.shininess
            && self.alpha_threshold == other.alpha_threshold
            && self.mode_flags() == other.mode_flags()
            && self.textures == other.textures
            && self.shaders == other.shaders
            && self.legacy_index == other.legacy_index
    }
}
