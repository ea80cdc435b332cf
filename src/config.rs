use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// How `inspect` renders a material list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum InspectFormat {
    /// World-file style, non-default fields only
    #[default]
    #[value(name = "text")]
    Text,
    /// Wavefront MTL
    #[value(name = "mtl")]
    Mtl,
    /// JSON array of materials
    #[value(name = "json")]
    Json,
}

impl std::fmt::Display for InspectFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InspectFormat::Text => write!(f, "text"),
            InspectFormat::Mtl => write!(f, "mtl"),
            InspectFormat::Json => write!(f, "json"),
        }
    }
}

/// Registry setup applied before any list is unpacked.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Start from the built-in materials instead of an empty registry.
    ///
    /// Legacy indices of unpacked materials only match the sender's when
    /// this is off.
    pub load_defaults: bool,
}

/// Resolved tool action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Defaults { output: PathBuf },
    Inspect { input: PathBuf, format: InspectFormat },
    Textures { input: PathBuf },
}

/// Fully resolved tool configuration (constructed from CLI args).
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub command: Command,
    pub registry: RegistryConfig,
    pub verbose: bool,
}

impl ToolConfig {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            registry: RegistryConfig::default(),
            verbose: false,
        }
    }
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "bzmat",
    about = "Inspect and produce packed world material lists",
    version
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: CliCommand,

    /// Preload the built-in materials before unpacking
    #[arg(long, global = true)]
    pub with_defaults: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Write the built-in material set as a packed list
    Defaults {
        /// Output file
        #[arg(short = 'o', long)]
        output: PathBuf,
    },
    /// Print the materials of a packed list
    Inspect {
        /// Packed material list
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Output format: text, mtl, or json
        #[arg(long, value_enum, default_value = "text")]
        format: InspectFormat,
    },
    /// List every texture a packed list refers to
    Textures {
        /// Packed material list
        #[arg(short = 'i', long)]
        input: PathBuf,
    },
}

impl From<CliArgs> for ToolConfig {
    fn from(args: CliArgs) -> Self {
        let command = match args.command {
            CliCommand::Defaults { output } => Command::Defaults { output },
            CliCommand::Inspect { input, format } => Command::Inspect { input, format },
            CliCommand::Textures { input } => Command::Textures { input },
        };

        ToolConfig {
            command,
            registry: RegistryConfig {
                load_defaults: args.with_defaults,
            },
            verbose: args.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_format_display() {
        assert_eq!(InspectFormat::Text.to_string(), "text");
        assert_eq!(InspectFormat::Mtl.to_string(), "mtl");
        assert_eq!(InspectFormat::Json.to_string(), "json");
    }

    #[test]
    fn default_registry_config() {
        let config = ToolConfig::new(Command::Textures {
            input: PathBuf::from("world.bin"),
        });
        assert!(!config.registry.load_defaults);
        assert!(!config.verbose);
    }

    #[test]
    fn cli_args_inspect() {
        let args = CliArgs::parse_from([
            "bzmat",
            "inspect",
            "-i",
            "world.mat",
            "--format",
            "json",
            "--with-defaults",
            "-v",
        ]);
        let config: ToolConfig = args.into();

        assert_eq!(
            config.command,
            Command::Inspect {
                input: PathBuf::from("world.mat"),
                format: InspectFormat::Json,
            }
        );
        assert!(config.registry.load_defaults);
        assert!(config.verbose);
    }

    #[test]
    fn cli_args_minimal() {
        let args = CliArgs::parse_from(["bzmat", "inspect", "-i", "world.mat"]);
        let config: ToolConfig = args.into();

        assert_eq!(
            config.command,
            Command::Inspect {
                input: PathBuf::from("world.mat"),
                format: InspectFormat::Text,
            }
        );
        assert!(!config.registry.load_defaults);
        assert!(!config.verbose);
    }

    #[test]
    fn cli_args_defaults_and_textures() {
        let config: ToolConfig = CliArgs::parse_from(["bzmat", "defaults", "-o", "out.mat"]).into();
        assert_eq!(
            config.command,
            Command::Defaults {
                output: PathBuf::from("out.mat")
            }
        );

        let config: ToolConfig =
            CliArgs::parse_from(["bzmat", "-v", "textures", "--input", "a.mat"]).into();
        assert_eq!(
            config.command,
            Command::Textures {
                input: PathBuf::from("a.mat")
            }
        );
        assert!(config.verbose);
    }

    #[test]
    fn cli_rejects_missing_subcommand() {
        assert!(CliArgs::try_parse_from(["bzmat"]).is_err());
    }
}
