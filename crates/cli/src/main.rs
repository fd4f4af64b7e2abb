use anyhow::Result;
use clap::{Parser, Subcommand};
use sigmatch::commands::{build_command, extract_command, info_command, match_command};
use sigmatch::init_logging;

/// Identify functions in stripped binaries against a signature database.
///
/// This CLI is a thin wrapper around `sigmatch-core` (exposed in code as
/// `sigmatch_core`). All substantive logic lives in the library.
#[derive(Parser, Debug)]
#[command(
    name = "sigmatch",
    version,
    about = "Build signature databases and match stripped binaries against them",
    long_about = None
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a signature database from a corpus directory.
    ///
    /// Every immediate subdirectory of the root is one library; every
    /// object file beneath it contributes one signature.
    Build {
        /// Corpus root directory.
        #[arg(long)]
        root: String,

        /// Database output path. Defaults to `<root>.lmdb` next to the root.
        #[arg(long)]
        out: Option<String>,

        /// Build config file (JSON or YAML).
        #[arg(long)]
        config: Option<String>,

        /// Extract objects one at a time instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Extract a binary's signature and write it to disk.
    Extract {
        /// Binary or object file to extract.
        #[arg(long)]
        path: String,

        /// Signature output path.
        #[arg(long)]
        out: String,

        /// Architecture hint, used when the file header does not say.
        #[arg(long)]
        arch: Option<String>,
    },

    /// Match a target against a signature database.
    Match {
        /// Signature database path.
        #[arg(long)]
        db: String,

        /// Target signature written by `extract`.
        #[arg(long, conflicts_with = "binary", required_unless_present = "binary")]
        target: Option<String>,

        /// Target binary, extracted before matching.
        #[arg(long)]
        binary: Option<String>,

        /// Log candidate quality against the target's own symbol names.
        #[arg(long, default_value_t = false)]
        score: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show the libraries and symbol counts of a database.
    Info {
        /// Signature database path.
        #[arg(long)]
        db: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Build { root, out, config, sequential, json } => {
            build_command(&root, out.as_deref(), config.as_deref(), sequential, json)?
        }
        Command::Extract { path, out, arch } => extract_command(&path, &out, arch)?,
        Command::Match { db, target, binary, score, json } => {
            match_command(&db, target.as_deref(), binary.as_deref(), score, json)?
        }
        Command::Info { db, json } => info_command(&db, json)?,
    }

    Ok(())
}
