use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::{info, warn};

use crate::config::{Command, InspectFormat, RegistryConfig, ToolConfig};
use crate::error::{MaterialError, Result};
use crate::registry::MaterialRegistry;
use crate::types::Material;

/// Summary of a completed tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Materials held by the registry when the command finished.
    pub materials: usize,
    /// Bytes read or written.
    pub bytes: usize,
}

/// Drives one tool command against a freshly built registry.
pub struct App;

impl App {
    /// Run the configured command, writing human-readable output to `out`.
    pub fn run(config: &ToolConfig, out: &mut impl Write) -> Result<RunSummary> {
        match &config.command {
            Command::Defaults { output } => Self::write_defaults(output),
            Command::Inspect { input, format } => {
                let (registry, bytes) = Self::load(input, &config.registry)?;
                Self::inspect(&registry, *format, out)?;
                Ok(RunSummary {
                    materials: registry.len(),
                    bytes,
                })
            }
            Command::Textures { input } => {
                let (registry, bytes) = Self::load(input, &config.registry)?;
                for name in registry.make_texture_list(false) {
                    writeln!(out, "{name}")?;
                }
                Ok(RunSummary {
                    materials: registry.len(),
                    bytes,
                })
            }
        }
    }

    /// Read and unpack a material list file.
    pub fn load(input: &Path, config: &RegistryConfig) -> Result<(MaterialRegistry, usize)> {
        if !input.exists() {
            return Err(MaterialError::Input(format!(
                "Input file not found: {}",
                input.display()
            )));
        }

        let data = fs::read(input)?;
        let mut registry = if config.load_defaults {
            MaterialRegistry::with_defaults()
        } else {
            MaterialRegistry::new()
        };

        let consumed = registry.unpack_bytes(&data)?;
        if consumed < data.len() {
            warn!(
                path = %input.display(),
                trailing = data.len() - consumed,
                "Ignoring trailing bytes after material list"
            );
        }
        info!(path = %input.display(), materials = registry.len(), "Loaded material list");

        Ok((registry, consumed))
    }

    fn write_defaults(output: &Path) -> Result<RunSummary> {
        let registry = MaterialRegistry::with_defaults();
        let bytes = registry.to_bytes();

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                MaterialError::Output(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        fs::write(output, &bytes).map_err(|e| {
            MaterialError::Output(format!("Failed to write {}: {e}", output.display()))
        })?;

        info!(path = %output.display(), materials = registry.len(), bytes = bytes.len(), "Wrote default materials");
        Ok(RunSummary {
            materials: registry.len(),
            bytes: bytes.len(),
        })
    }

    fn inspect(
        registry: &MaterialRegistry,
        format: InspectFormat,
        out: &mut impl Write,
    ) -> Result<()> {
        match format {
            InspectFormat::Text => registry.print(out, "")?,
            InspectFormat::Mtl => registry.print_mtl(out, "")?,
            InspectFormat::Json => {
                let materials: Vec<&Material> = registry.iter().collect();
                serde_json::to_writer_pretty(&mut *out, &materials)?;
                writeln!(out)?;
            }
        }
        Ok(())
    }
}
