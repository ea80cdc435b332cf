pub mod material;
pub mod texture;

pub use material::{Material, ModeFlags};
pub use texture::{CombineMode, TextureSlot, TextureStateFlags};
