//! Read-only queries the material code makes against the rest of the client.
//!
//! The texture manager and the dynamic color table live outside this crate;
//! these traits are the only surface the materials see of them.

use std::collections::{HashMap, HashSet};

/// Answers whether a named texture carries an alpha channel.
pub trait TextureAlphaSource {
    fn has_alpha(&self, name: &str) -> bool;
}

/// Texture source with nothing loaded. Every texture reports no alpha.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTextures;

impl TextureAlphaSource for NoTextures {
    fn has_alpha(&self, _name: &str) -> bool {
        false
    }
}

impl TextureAlphaSource for HashMap<String, bool> {
    fn has_alpha(&self, name: &str) -> bool {
        self.get(name).copied().unwrap_or(false)
    }
}

/// Set of texture names known to have alpha.
impl TextureAlphaSource for HashSet<String> {
    fn has_alpha(&self, name: &str) -> bool {
        self.contains(name)
    }
}

/// What the materials need to know about a bound dynamic color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DynamicColorInfo {
    pub can_have_alpha: bool,
}

/// Resolves a dynamic color index. `None` means the index is unbound.
pub trait DynamicColorSource {
    fn dynamic_color(&self, index: i32) -> Option<DynamicColorInfo>;
}

/// Empty dynamic color table.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDynamicColors;

impl DynamicColorSource for NoDynamicColors {
    fn dynamic_color(&self, _index: i32) -> Option<DynamicColorInfo> {
        None
    }
}

impl DynamicColorSource for Vec<DynamicColorInfo> {
    fn dynamic_color(&self, index: i32) -> Option<DynamicColorInfo> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.get(i))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_textures_never_has_alpha() {
        assert!(!NoTextures.has_alpha("glass"));
    }

    #[test]
    fn map_and_set_sources() {
        let mut map = HashMap::new();
        map.insert("glass".to_string(), true);
        map.insert("wall".to_string(), false);
        assert!(map.has_alpha("glass"));
        assert!(!map.has_alpha("wall"));
        assert!(!map.has_alpha("missing"));

        let set: HashSet<String> = ["fence".to_string()].into_iter().collect();
        assert!(set.has_alpha("fence"));
        assert!(!set.has_alpha("wall"));
    }

    #[test]
    fn vec_dynamic_colors() {
        let table = vec![
            DynamicColorInfo {
                can_have_alpha: false,
            },
            DynamicColorInfo {
                can_have_alpha: true,
            },
        ];
        assert_eq!(table.dynamic_color(-1), None);
        assert_eq!(
            table.dynamic_color(1),
            Some(DynamicColorInfo {
                can_have_alpha: true
            })
        );
        assert_eq!(table.dynamic_color(2), None);
        assert_eq!(NoDynamicColors.dynamic_color(0), None);
    }
}
