//! Ordered material store with alias resolution and structural de-duplication.

use std::collections::BTreeSet;
use std::io::{self, Write};

use tracing::{debug, info};

use crate::defaults::{self, DEFAULT_MATERIAL_NAME};
use crate::error::Result;
use crate::types::Material;
use crate::wire::{self, Packer, Unpacker};

/// Handle to a material stored in a [`MaterialRegistry`].
///
/// Handles go stale when the registry is cleared; lookups through a stale
/// handle return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId {
    index: usize,
    generation: u32,
}

impl MaterialId {
    /// Position in registration order.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// All materials of the loaded world, in registration order.
///
/// Insertion order matters: lookups scan front to back and the wire format
/// preserves it.
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    materials: Vec<Material>,
    generation: u32,
    legacy_material_index: i32,
    unnamed_count: u32,
    duplicate_name_count: u32,
    unnamed_alias_count: u32,
}

/// Parse the leading decimal digits of `s`, ignoring anything after them.
fn parse_leading_index(s: &str) -> Option<i32> {
    let end = s.bytes().take_while(u8::is_ascii_digit).count();
    s[..end].parse().ok()
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in materials.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.load_default_materials();
        registry
    }

    fn id(&self, index: usize) -> MaterialId {
        MaterialId {
            index,
            generation: self.generation,
        }
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        if id.generation != self.generation {
            return None;
        }
        self.materials.get(id.index)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        if id.generation != self.generation {
            return None;
        }
        self.materials.get_mut(id.index)
    }

    /// Next legacy index `add_legacy_indexed_material` will hand out.
    pub fn next_legacy_index(&self) -> i32 {
        self.legacy_material_index
    }

    // --- Insertion ---

    /// Store `candidate`, or fold it into a structurally equal entry.
    ///
    /// On a fold only the candidate's name (or a synthetic `_UnnamedAlias<N>`)
    /// becomes an alias of the existing entry. A new entry with
    /// no name becomes `_Unnamed<N>`; one whose name is already taken becomes
    /// `_NameCollisionWith<name><N>`.
    pub fn add_material(&mut self, candidate: &Material) -> MaterialId {
        if let Some(existing) = self.find_by_structure(candidate) {
            let alias = if candidate.name().is_empty() {
                let alias = format!("_UnnamedAlias{}", self.unnamed_alias_count);
                self.unnamed_alias_count += 1;
                alias
            } else {
                candidate.name().to_string()
            };

            let mat = &mut self.materials[existing.index];
            mat.add_alias(&alias);
            debug!(material = %mat.name(), alias = %alias, "Folded duplicate material into alias");
            return existing;
        }

        let mut mat = candidate.clone();
        if mat.name().is_empty() {
            mat.set_name(&format!("_Unnamed{}", self.unnamed_count));
            self.unnamed_count += 1;
        } else if self.materials.iter().any(|m| m.answers_to(candidate.name())) {
            let renamed = format!(
                "_NameCollisionWith{}{}",
                candidate.name(),
                self.duplicate_name_count
            );
            self.duplicate_name_count += 1;
            debug!(name = %candidate.name(), renamed = %renamed, "Material name collision");
            mat.set_name(&renamed);
        }

        self.materials.push(mat);
        self.id(self.materials.len() - 1)
    }

    /// Add under the next legacy index.
    ///
    /// Every call consumes one index, including calls that fold into an
    /// existing entry.
    pub fn add_legacy_indexed_material(&mut self, candidate: &Material) -> MaterialId {
        let index = self.legacy_material_index;
        let mut mat = candidate.clone();
        mat.add_alias(&format!("_LegacyMaterialIndex{index}"));
        mat.set_legacy_index(index);

        let id = self.add_material(&mat);
        self.legacy_material_index += 1;
        debug!(legacy_index = index, slot = id.index, "Assigned legacy material index");
        id
    }

    /// Insert the built-in set. Repeat calls only grow alias lists.
    pub fn load_default_materials(&mut self) {
        for mat in defaults::default_materials() {
            self.add_material(&mat);
        }
        debug!(materials = self.materials.len(), "Loaded default materials");
    }

    /// Drop every material and reset all counters.
    ///
    /// Outstanding [`MaterialId`]s become stale.
    pub fn clear(&mut self, load_defaults: bool) {
        self.materials.clear();
        self.generation = self.generation.wrapping_add(1);
        self.legacy_material_index = 0;
        self.unnamed_count = 0;
        self.duplicate_name_count = 0;
        self.unnamed_alias_count = 0;
        if load_defaults {
            self.load_default_materials();
        }
    }

    // --- Lookup ---

    /// Resolve a name, alias, or digit-led legacy index.
    pub fn find_id(&self, target: &str) -> Option<MaterialId> {
        let first = *target.as_bytes().first()?;
        let index = if first.is_ascii_digit() {
            let legacy = parse_leading_index(target)?;
            self.materials
                .iter()
                .position(|m| m.legacy_index() == legacy)
        } else {
            self.materials.iter().position(|m| m.answers_to(target))
        };
        index.map(|i| self.id(i))
    }

    pub fn find_material(&self, target: &str) -> Option<&Material> {
        self.find_id(target).and_then(|id| self.get(id))
    }

    /// Legacy index lookup, falling back to `_DefaultMaterial`.
    pub fn get_material(&self, legacy_index: i32) -> Option<&Material> {
        self.find_material(&legacy_index.to_string())
            .or_else(|| self.find_material(DEFAULT_MATERIAL_NAME))
    }

    /// Legacy index of the stored material, -1 if none or stale.
    pub fn get_index(&self, id: MaterialId) -> i32 {
        self.get(id).map_or(-1, Material::legacy_index)
    }

    /// Legacy index of `material` if it is one of ours (by address).
    pub fn index_of(&self, material: &Material) -> i32 {
        self.find_by_identity(material)
            .map_or(-1, |id| self.materials[id.index].legacy_index())
    }

    /// First stored material structurally equal to `material`.
    pub fn find_by_structure(&self, material: &Material) -> Option<MaterialId> {
        self.materials
            .iter()
            .position(|m| m == material)
            .map(|i| self.id(i))
    }

    /// The stored material living at the same address as `material`.
    pub fn find_by_identity(&self, material: &Material) -> Option<MaterialId> {
        self.materials
            .iter()
            .position(|m| std::ptr::eq(m, material))
            .map(|i| self.id(i))
    }

    /// Primary names in registration order.
    pub fn material_names(&self) -> Vec<String> {
        self.materials.iter().map(|m| m.name().to_string()).collect()
    }

    // --- Texture bookkeeping ---

    /// Union of texture names, optionally restricted to referenced materials.
    pub fn make_texture_list(&self, referenced_only: bool) -> BTreeSet<String> {
        self.materials
            .iter()
            .filter(|m| !referenced_only || m.is_referenced())
            .flat_map(|m| m.textures().iter().map(|t| t.name.clone()))
            .collect()
    }

    /// Record where texture `url` was cached. Returns the number of slots updated.
    pub fn set_texture_local(&mut self, url: &str, local: &str) -> usize {
        let mut updated = 0;
        for mat in &mut self.materials {
            for slot in mat.textures_mut() {
                if slot.name == url {
                    slot.local_name = local.to_string();
                    updated += 1;
                }
            }
        }
        updated
    }

    /// Mark the material answering to `name` as referenced.
    pub fn set_referenced(&mut self, name: &str, referenced: bool) -> bool {
        match self.find_id(name).and_then(|id| self.get_mut(id)) {
            Some(mat) => {
                mat.set_referenced(referenced);
                true
            }
            None => false,
        }
    }

    // --- Wire format ---

    pub fn pack_size(&self) -> usize {
        wire::U32_SIZE + self.materials.iter().map(Material::pack_size).sum::<usize>()
    }

    pub fn pack(&self, packer: &mut Packer) {
        packer.pack_u32(self.materials.len() as u32);
        for mat in &self.materials {
            mat.pack(packer);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut packer = Packer::with_capacity(self.pack_size());
        self.pack(&mut packer);
        info!(
            materials = self.materials.len(),
            bytes = packer.len(),
            "Packed material list"
        );
        packer.into_bytes()
    }

    /// Decode a material list and add each entry as a legacy-indexed material.
    ///
    /// The whole list is decoded before anything is inserted, so a malformed
    /// buffer leaves the registry untouched. Legacy indices continue from this
    /// registry's counter; they match the sender's only when unpacking into an
    /// empty registry.
    pub fn unpack(&mut self, unpacker: &mut Unpacker<'_>) -> Result<()> {
        let count = unpacker.unpack_u32("material count")?;
        let mut decoded = Vec::new();
        for _ in 0..count {
            decoded.push(Material::unpack(unpacker)?);
        }

        let first_index = self.legacy_material_index;
        for mat in &decoded {
            self.add_legacy_indexed_material(mat);
        }
        info!(
            materials = count,
            first_legacy_index = first_index,
            stored = self.materials.len(),
            "Unpacked material list"
        );
        Ok(())
    }

    /// Unpack from a byte slice, returning the number of bytes consumed.
    pub fn unpack_bytes(&mut self, data: &[u8]) -> Result<usize> {
        let mut unpacker = Unpacker::new(data);
        self.unpack(&mut unpacker)?;
        Ok(unpacker.position())
    }

    // --- Presentation ---

    pub fn print(&self, out: &mut impl Write, indent: &str) -> io::Result<()> {
        for mat in &self.materials {
            mat.print(out, indent)?;
        }
        Ok(())
    }

    pub fn print_mtl(&self, out: &mut impl Write, indent: &str) -> io::Result<()> {
        for mat in &self.materials {
            mat.print_mtl(out, indent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::NoTextures;
    use crate::MaterialError;

    fn red() -> Material {
        let mut mat = Material::named("Red");
        mat.set_diffuse([1.0, 0.0, 0.0, 1.0]);
        mat
    }

    #[test]
    fn dedup_folds_into_aliases() {
        let mut reg = MaterialRegistry::new();
        let mut a = red();
        a.set_name("A");
        let mut b = red();
        b.set_name("B");

        let id_a = reg.add_material(&a);
        let id_b = reg.add_material(&b);

        assert_eq!(id_a, id_b);
        assert_eq!(reg.len(), 1);
        let stored = reg.get(id_a).unwrap();
        assert_eq!(stored.name(), "A");
        assert_eq!(stored.aliases(), &["B".to_string()]);
        assert!(std::ptr::eq(
            reg.find_material("A").unwrap(),
            reg.find_material("B").unwrap()
        ));
    }

    #[test]
    fn unnamed_materials_get_synthetic_names() {
        let mut reg = MaterialRegistry::new();
        let first = reg.add_material(&Material::new());
        assert_eq!(reg.get(first).unwrap().name(), "_Unnamed0");

        // Structurally equal and unnamed: synthetic alias
        reg.add_material(&Material::new());
        assert_eq!(
            reg.get(first).unwrap().aliases(),
            &["_UnnamedAlias0".to_string()]
        );

        let second = reg.add_material(&red_unnamed());
        assert_eq!(reg.get(second).unwrap().name(), "_Unnamed1");
    }

    fn red_unnamed() -> Material {
        let mut mat = Material::new();
        mat.set_diffuse([1.0, 0.0, 0.0, 1.0]);
        mat
    }

    #[test]
    fn name_collision_renames_newcomer() {
        let mut reg = MaterialRegistry::new();
        let first = reg.add_material(&Material::named("X"));

        let mut other = red();
        other.set_name("X");
        let second = reg.add_material(&other);

        assert_ne!(first, second);
        assert_eq!(reg.get(second).unwrap().name(), "_NameCollisionWithX0");
        assert_eq!(reg.find_id("X"), Some(first));
    }

    #[test]
    fn collision_against_alias() {
        let mut reg = MaterialRegistry::new();
        reg.add_material(&Material::named("base"));
        reg.add_material(&Material::named("alt"));

        let mut other = red();
        other.set_name("alt");
        let id = reg.add_material(&other);
        assert_eq!(reg.get(id).unwrap().name(), "_NameCollisionWithalt0");
    }

    #[test]
    fn legacy_indices_are_monotonic() {
        let mut reg = MaterialRegistry::new();
        let mats = [red(), red(), Material::named("plain"), red()];

        let ids: Vec<_> = mats
            .iter()
            .map(|m| reg.add_legacy_indexed_material(m))
            .collect();

        for (expected, id) in ids.iter().enumerate() {
            assert_eq!(reg.get_index(*id), expected as i32);
            let mat = reg.get(*id).unwrap();
            assert_eq!(reg.index_of(mat), expected as i32);
            assert!(mat.answers_to(&format!("_LegacyMaterialIndex{expected}")));
        }
        assert_eq!(reg.next_legacy_index(), 4);
    }

    #[test]
    fn fold_keeps_only_candidate_name() {
        let mut reg = MaterialRegistry::new();
        let first = reg.add_material(&red_named("A"));

        let mut b = red_named("B");
        b.add_alias("Bextra");
        let folded = reg.add_material(&b);

        assert_eq!(first, folded);
        assert_eq!(reg.get(first).unwrap().aliases(), &["B".to_string()]);
        assert!(reg.find_material("Bextra").is_none());
    }

    #[test]
    fn legacy_fold_drops_index_alias() {
        let mut reg = MaterialRegistry::new();
        let mut stored = red();
        stored.set_legacy_index(0);
        reg.add_material(&stored);

        reg.add_legacy_indexed_material(&red_named("Other"));
        assert_eq!(reg.len(), 1);
        assert!(reg.find_material("Other").is_some());
        assert!(reg.find_material("_LegacyMaterialIndex0").is_none());
    }

    fn red_named(name: &str) -> Material {
        let mut mat = red();
        mat.set_name(name);
        mat
    }

    #[test]
    fn legacy_counter_advances_on_fold() {
        let mut reg = MaterialRegistry::new();
        let mut legacy = red();
        legacy.set_legacy_index(0);
        // Same structure as what the first legacy call will store
        let stored = reg.add_material(&legacy);
        let folded = reg.add_legacy_indexed_material(&red());

        assert_eq!(stored, folded);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.next_legacy_index(), 1);
    }

    #[test]
    fn find_by_legacy_index_string() {
        let mut reg = MaterialRegistry::new();
        reg.add_material(&Material::named("plain"));
        reg.add_legacy_indexed_material(&red());
        let mut blue = Material::named("Blue");
        blue.set_diffuse([0.0, 0.0, 1.0, 1.0]);
        reg.add_legacy_indexed_material(&blue);

        assert_eq!(reg.find_material("0").unwrap().name(), "Red");
        assert_eq!(reg.find_material("1").unwrap().name(), "Blue");
        assert_eq!(reg.find_material("1xyz").unwrap().name(), "Blue");
        assert!(reg.find_material("2").is_none());
        assert!(reg.find_material("").is_none());
        assert!(reg.find_material("99999999999").is_none());
    }

    #[test]
    fn lookup_scans_in_registration_order() {
        let mut reg = MaterialRegistry::new();
        let first = reg.add_material(&Material::named("one"));
        let second = reg.add_material(&red());
        let mut named_two = red();
        named_two.set_name("two");
        assert_eq!(reg.add_material(&named_two), second);

        // A default-structured material named "Red" folds into "one" as an
        // alias, so the earlier entry answers before the primary name
        assert_eq!(reg.add_material(&Material::named("Red")), first);
        assert_eq!(reg.find_id("Red"), Some(first));
        assert_eq!(reg.find_id("two"), Some(second));
    }

    #[test]
    fn get_material_falls_back_to_default() {
        let mut reg = MaterialRegistry::with_defaults();
        let red_id = reg.add_legacy_indexed_material(&red());

        assert_eq!(reg.get_material(0).unwrap().name(), "Red");
        assert_eq!(reg.get_index(red_id), 0);
        assert_eq!(reg.get_material(5).unwrap().name(), DEFAULT_MATERIAL_NAME);
        assert_eq!(reg.get_material(-1).unwrap().name(), DEFAULT_MATERIAL_NAME);

        assert!(MaterialRegistry::new().get_material(0).is_none());
    }

    #[test]
    fn identity_differs_from_structure() {
        let mut reg = MaterialRegistry::new();
        let id = reg.add_material(&red());

        let outside = red();
        assert_eq!(reg.find_by_structure(&outside), Some(id));
        assert_eq!(reg.find_by_identity(&outside), None);
        assert_eq!(reg.index_of(&outside), -1);

        let inside = reg.get(id).unwrap();
        assert_eq!(reg.find_by_identity(inside), Some(id));
    }

    #[test]
    fn clear_resets_counters_and_stales_ids() {
        let mut reg = MaterialRegistry::new();
        let id = reg.add_legacy_indexed_material(&Material::new());
        assert_eq!(reg.next_legacy_index(), 1);

        reg.clear(false);
        assert!(reg.is_empty());
        assert_eq!(reg.next_legacy_index(), 0);
        assert!(reg.get(id).is_none());
        assert_eq!(reg.get_index(id), -1);

        // Counters restart
        let fresh = reg.add_material(&Material::new());
        assert_eq!(reg.get(fresh).unwrap().name(), "_Unnamed0");

        reg.clear(true);
        assert_eq!(reg.len(), defaults::default_materials().len());
    }

    #[test]
    fn loading_defaults_twice_adds_no_entries() {
        let mut reg = MaterialRegistry::new();
        reg.load_default_materials();
        let names = reg.material_names();
        reg.load_default_materials();

        assert_eq!(reg.material_names(), names);
        let default = reg.find_material(DEFAULT_MATERIAL_NAME).unwrap();
        assert_eq!(default.aliases(), &[DEFAULT_MATERIAL_NAME.to_string()]);
    }

    #[test]
    fn texture_list_respects_referenced() {
        let mut reg = MaterialRegistry::new();
        let mut a = Material::named("a");
        a.add_texture("shared", &NoTextures);
        a.add_texture("only_a", &NoTextures);
        let mut b = Material::named("b");
        b.add_texture("shared", &NoTextures);
        b.add_texture("only_b", &NoTextures);
        reg.add_material(&a);
        reg.add_material(&b);

        let all: Vec<_> = reg.make_texture_list(false).into_iter().collect();
        assert_eq!(all, ["only_a", "only_b", "shared"]);

        assert!(reg.make_texture_list(true).is_empty());
        assert!(reg.set_referenced("b", true));
        assert!(!reg.set_referenced("missing", true));
        let referenced: Vec<_> = reg.make_texture_list(true).into_iter().collect();
        assert_eq!(referenced, ["only_b", "shared"]);
    }

    #[test]
    fn set_texture_local_updates_matching_slots() {
        let mut reg = MaterialRegistry::with_defaults();
        let updated = reg.set_texture_local("roof", "/cache/roof.png");
        assert_eq!(updated, 1);
        let mat = reg.find_material("boxTopMaterial").unwrap();
        assert_eq!(mat.textures()[0].local_name, "/cache/roof.png");
        assert_eq!(reg.set_texture_local("nothing", "x"), 0);
    }

    #[test]
    fn aggregate_round_trip() {
        let mut sender = MaterialRegistry::new();
        sender.add_legacy_indexed_material(&Material::named(DEFAULT_MATERIAL_NAME));
        sender.add_legacy_indexed_material(&red());
        let mut glass = Material::named("Glass");
        glass.set_diffuse([1.0, 1.0, 1.0, 0.3]);
        glass.add_texture("glass.png", &NoTextures).set_use_alpha(true);
        sender.add_legacy_indexed_material(&glass);

        let bytes = sender.to_bytes();
        assert_eq!(bytes.len(), sender.pack_size());

        let mut receiver = MaterialRegistry::new();
        let consumed = receiver.unpack_bytes(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(receiver.material_names(), sender.material_names());
        for (a, b) in sender.iter().zip(receiver.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn unpack_into_populated_registry_shifts_indices() {
        let mut sender = MaterialRegistry::new();
        sender.add_legacy_indexed_material(&red());
        let bytes = sender.to_bytes();

        let mut receiver = MaterialRegistry::new();
        receiver.add_legacy_indexed_material(&Material::named("local"));
        receiver.unpack_bytes(&bytes).unwrap();

        let mat = receiver.find_material("Red").unwrap();
        assert_eq!(mat.legacy_index(), 1);
        assert!(receiver.find_material("_LegacyMaterialIndex1").is_some());
    }

    #[test]
    fn malformed_list_leaves_registry_untouched() {
        let mut sender = MaterialRegistry::new();
        sender.add_material(&red());
        sender.add_material(&Material::named("other"));
        let bytes = sender.to_bytes();

        let mut receiver = MaterialRegistry::new();
        let err = receiver.unpack_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, MaterialError::Truncated { .. }));
        assert!(receiver.is_empty());
        assert_eq!(receiver.next_legacy_index(), 0);
    }

    #[test]
    fn empty_registry_packs_to_count_only() {
        let reg = MaterialRegistry::new();
        assert_eq!(reg.to_bytes(), vec![0, 0, 0, 0]);
        assert_eq!(reg.pack_size(), 4);
    }

    #[test]
    fn print_all_materials() {
        let reg = MaterialRegistry::with_defaults();
        let mut out = Vec::new();
        reg.print(&mut out, "").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("\nend\n").count(), reg.len());
        assert!(text.contains("addtexture std_ground"));

        let mut out = Vec::new();
        reg.print_mtl(&mut out, "").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("newmtl ").count(), reg.len());
    }
}
