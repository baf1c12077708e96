use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CHANNEL_CAPACITY: usize = 64;
const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;
const DEFAULT_ACCEPT: &str = "text/turtle";
const MAX_CHANNEL_CAPACITY: usize = 65_536;
const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Tuning for the conversion engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Items buffered between a conversion worker and its consumer
    pub channel_capacity: usize,
    /// Bytes per chunk emitted by serializers
    pub chunk_size: usize,
    /// Allow two-hop chains through the quad hub
    pub enable_chains: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            enable_chains: true,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (1..=MAX_CHANNEL_CAPACITY).contains(&self.channel_capacity),
            "channel capacity {} must be between 1 and {}",
            self.channel_capacity,
            MAX_CHANNEL_CAPACITY
        );
        anyhow::ensure!(
            (1..=MAX_CHUNK_SIZE).contains(&self.chunk_size),
            "chunk size {} must be between 1 and {}",
            self.chunk_size,
            MAX_CHUNK_SIZE
        );
        Ok(())
    }
}

/// Settings for one `ldp-convert` run
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub input: PathBuf,
    pub content_type: Option<String>,
    pub accept: String,
    pub output: Option<PathBuf>,
    pub identifier: Option<String>,
    pub engine: EngineConfig,
}

impl ConvertConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            input,
            content_type: cli_content_type,
            accept: cli_accept,
            output,
            identifier,
            channel_capacity: cli_channel_capacity,
            chunk_size: cli_chunk_size,
            no_chains,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            accept: file_accept,
            content_type: file_content_type,
            engine: file_engine,
        } = file_config;

        let defaults = file_engine.unwrap_or_default();
        let engine = EngineConfig {
            channel_capacity: cli_channel_capacity.unwrap_or(defaults.channel_capacity),
            chunk_size: cli_chunk_size.unwrap_or(defaults.chunk_size),
            enable_chains: defaults.enable_chains && !no_chains,
        };

        let accept = cli_accept
            .or(file_accept)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ACCEPT.to_string());

        Ok(Self {
            input,
            content_type: cli_content_type.or(file_content_type),
            accept,
            output,
            identifier,
            engine,
        })
    }

    /// Fail fast before touching the input
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        anyhow::ensure!(
            self.input.exists(),
            "input file {:?} does not exist",
            self.input
        );
        anyhow::ensure!(
            self.input.is_file(),
            "input {:?} is not a file",
            self.input
        );
        Ok(())
    }

    /// Content type from the flag, or guessed from the input file extension
    pub fn resolve_content_type(&self) -> Result<String> {
        if let Some(explicit) = self.content_type.as_ref() {
            return Ok(explicit.clone());
        }
        let ext = self
            .input
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .with_context(|| {
                format!(
                    "cannot infer content type of {:?}; pass --content-type",
                    self.input
                )
            })?;
        oxigraph::io::RdfFormat::from_extension(&ext)
            .map(|format| format.media_type().to_string())
            .with_context(|| format!("unknown RDF file extension '.{ext}'; pass --content-type"))
    }

    /// Identifier under which the input is stored; defaults to a `file:` IRI
    pub fn resource_identifier(&self) -> String {
        if let Some(identifier) = self.identifier.as_ref() {
            return identifier.clone();
        }
        let absolute = fs::canonicalize(&self.input).unwrap_or_else(|_| self.input.clone());
        format!("file://{}", absolute.display())
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "ldp-convert",
    about = "Convert an RDF document through the content negotiation engine",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, short, value_name = "FILE", help = "RDF document to convert")]
    pub input: PathBuf,

    #[arg(
        long,
        env = "LDP_CONNEG_CONTENT_TYPE",
        value_name = "TYPE",
        help = "Content type of the input (guessed from the extension when omitted)"
    )]
    pub content_type: Option<String>,

    #[arg(
        long,
        short,
        env = "LDP_CONNEG_ACCEPT",
        value_name = "HEADER",
        help = "Accept header describing the desired output"
    )]
    pub accept: Option<String>,

    #[arg(
        long,
        short,
        value_name = "FILE",
        help = "Write the converted body here instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "IRI",
        help = "Resource identifier, also used as base IRI for relative references"
    )]
    pub identifier: Option<String>,

    #[arg(
        long,
        env = "LDP_CONNEG_CHANNEL_CAPACITY",
        value_name = "N",
        help = "Items buffered between a conversion worker and its consumer",
        value_parser = clap::value_parser!(usize)
    )]
    pub channel_capacity: Option<usize>,

    #[arg(
        long,
        env = "LDP_CONNEG_CHUNK_SIZE",
        value_name = "BYTES",
        help = "Chunk size used when serializing",
        value_parser = clap::value_parser!(usize)
    )]
    pub chunk_size: Option<usize>,

    #[arg(long, help = "Only allow direct converters, no chains through the quad hub")]
    pub no_chains: bool,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    accept: Option<String>,
    content_type: Option<String>,
    engine: Option<EngineConfig>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
