//! Built-in materials every world starts from.

use crate::external::NoTextures;
use crate::types::Material;

/// Fallback for legacy lookups that miss.
pub const DEFAULT_MATERIAL_NAME: &str = "_DefaultMaterial";

/// Team colors that get their own base materials.
pub const TEAM_COLORS: [&str; 4] = ["red", "green", "blue", "purple"];

/// (material name, texture name) for the stock obstacle surfaces.
const OBSTACLE_MATERIALS: [(&str, &str); 6] = [
    ("boxWallMaterial", "boxwall"),
    ("boxTopMaterial", "roof"),
    ("pyrWallMaterial", "pyrwall"),
    ("wallMaterial", "wall"),
    ("cautionMaterial", "caution"),
    ("groundMaterial", "std_ground"),
];

fn textured(name: &str, texture: &str) -> Material {
    let mut mat = Material::named(name);
    // Textures are not loaded yet at bootstrap, so no alpha is assumed
    mat.add_texture(texture, &NoTextures);
    mat
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// The full default set in insertion order.
pub fn default_materials() -> Vec<Material> {
    let mut out = Vec::with_capacity(1 + OBSTACLE_MATERIALS.len() + 2 * TEAM_COLORS.len());

    out.push(Material::named(DEFAULT_MATERIAL_NAME));

    for (name, texture) in OBSTACLE_MATERIALS {
        out.push(textured(name, texture));
    }

    for team in TEAM_COLORS {
        let prefix = capitalize(team);
        out.push(textured(
            &format!("{prefix}BaseWall"),
            &format!("{team}_basewall"),
        ));
        out.push(textured(
            &format!("{prefix}BaseTop"),
            &format!("{team}_basetop"),
        ));
    }

    out
}
