use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clipforged")]
#[command(author, version, about = "Recipe-driven media transformation with ffmpeg")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a recipe on local files
    Run {
        /// Recipe name
        recipe: String,

        /// Input file for a slot, as SLOT=PATH
        #[arg(short, long = "input", value_parser = parse_key_val::<PathBuf>)]
        inputs: Vec<(String, PathBuf)>,

        /// Parameter value, as KEY=VALUE
        #[arg(short = 'P', long = "param", value_parser = parse_key_val::<String>)]
        params: Vec<(String, String)>,

        /// Output file name inside the output directory
        #[arg(short, long)]
        out: Option<String>,

        /// Deadline in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List available recipes
    Recipes {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the command a recipe would run, without running it
    Preview {
        /// Recipe name
        recipe: String,

        /// Parameter value, as KEY=VALUE
        #[arg(short = 'P', long = "param", value_parser = parse_key_val::<String>)]
        params: Vec<(String, String)>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config or defaults if not specified)
        #[arg(value_name = "CONFIG")]
        file: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

fn parse_key_val<V>(s: &str) -> Result<(String, V), String>
where
    V: From<String>,
{
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", s))?;
    if key.is_empty() {
        return Err(format!("empty key in {:?}", s));
    }
    Ok((key.to_string(), V::from(value.to_string())))
}
