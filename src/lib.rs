pub mod app;
pub mod config;
pub mod defaults;
pub mod error;
pub mod external;
pub mod registry;
pub mod types;
pub mod wire;

pub use app::App;
pub use config::{Command, InspectFormat, ToolConfig};
pub use error::{MaterialError, Result};
pub use registry::{MaterialId, MaterialRegistry};
pub use types::{CombineMode, Material, TextureSlot};
