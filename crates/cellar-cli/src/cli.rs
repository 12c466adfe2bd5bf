use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cellar",
    about = "Inspect Cellar schemas and property cache fixtures",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the classes and fields of a schema file
    Schema(SchemaArgs),
    /// Load a fixture into a cache and report what was loaded
    Load(DataArgs),
    /// Check ownership invariants of a loaded fixture
    Verify(DataArgs),
    /// Print the cached properties of one or all objects
    Dump(DumpArgs),
}

#[derive(Args)]
pub struct SchemaArgs {
    pub path: PathBuf,
}

#[derive(Args)]
pub struct DataArgs {
    /// Schema file (.toml or .json)
    #[arg(long)]
    pub schema: PathBuf,
    /// Fixture file (.json)
    #[arg(long)]
    pub data: PathBuf,
    /// Cache configuration (.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct DumpArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Only this object
    #[arg(long)]
    pub handle: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dump_with_handle() {
        let cli = Cli::parse_from([
            "cellar", "dump", "--schema", "s.toml", "--data", "d.json", "--handle", "5",
            "--format", "json",
        ]);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Dump(args) => {
                assert_eq!(args.handle, Some(5));
                assert_eq!(args.data.schema, PathBuf::from("s.toml"));
                assert!(args.data.config.is_none());
            }
            _ => panic!("expected dump"),
        }
    }

    #[test]
    fn verify_requires_schema_and_data() {
        assert!(Cli::try_parse_from(["cellar", "verify", "--data", "d.json"]).is_err());
    }
}
