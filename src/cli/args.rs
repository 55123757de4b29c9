//! CLI argument parsing using clap.
//!
//! Contains the Cli struct, Commands enum, and all subcommand enums.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Document chunking and schema-driven extraction
#[derive(Parser, Debug)]
#[command(
    name = "docmill",
    version = env!("CARGO_PKG_VERSION"),
    about = "Chunk documents, extract schema fields, and store them for retrieval",
    long_about = "Split converted documents into overlapping chunks, extract schema-defined fields \
                  from each chunk, aggregate document metadata, and store embedded chunks.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Quick Start:\n  $ docmill init\n  $ docmill chunk notes.md\n  $ docmill extract invoice.txt --schema invoice\n  $ docmill process docs/*.md\n  $ docmill search \"refund policy\" --limit 5"
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .docmill directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .docmill/settings.toml")]
    Config,

    /// Split a document into chunks
    #[command(
        about = "Chunk a document and print the chunks",
        after_help = "Examples:\n  docmill chunk report.md\n  docmill chunk report.md --max 500 --min 100 --overlap 50\n  docmill chunk converted.json --json"
    )]
    Chunk {
        /// File to chunk (.txt, .md, or converted .json)
        file: PathBuf,

        /// Maximum chunk size in characters (overrides config)
        #[arg(long)]
        max: Option<usize>,

        /// Minimum chunk size in characters (overrides config)
        #[arg(long)]
        min: Option<usize>,

        /// Overlap between chunks in characters (overrides config)
        #[arg(long)]
        overlap: Option<usize>,

        /// Output chunks as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract schema fields from a document
    #[command(
        about = "Run schema extraction over a document",
        after_help = "Examples:\n  docmill extract invoice.txt\n  docmill extract invoice.txt --schema invoice --threshold 0.8\n  docmill extract contract.md --schema contract_terms --chunks"
    )]
    Extract {
        /// File to extract from
        file: PathBuf,

        /// Schema to apply (repeatable; defaults from config)
        #[arg(short, long = "schema", value_name = "NAME")]
        schemas: Vec<String>,

        /// Confidence threshold between 0.0 and 1.0 (overrides config)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Report per-chunk results instead of document metadata only
        #[arg(long)]
        chunks: bool,
    },

    /// Process and store documents
    #[command(
        about = "Chunk, extract, embed and store documents",
        after_help = "Examples:\n  docmill process docs/a.md docs/b.txt\n  docmill process docs --schema support_case --concurrency 4\n  docmill process report.md --no-embed"
    )]
    Process {
        /// Files or directories to process
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Schema to apply (repeatable; defaults from config)
        #[arg(short, long = "schema", value_name = "NAME")]
        schemas: Vec<String>,

        /// Skip embeddings and storage; print the processed documents as JSON
        #[arg(long)]
        no_embed: bool,

        /// Documents processed at once (overrides config)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-document timeout in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Manage stored documents
    #[command(about = "List, inspect and delete stored documents")]
    Documents {
        #[command(subcommand)]
        action: DocumentAction,
    },

    /// Search stored chunks
    #[command(
        about = "Find chunks similar to a query",
        after_help = "Examples:\n  docmill search \"late payment penalty\"\n  docmill search \"router reset\" --limit 3 --threshold 0.5\n  docmill search invoice --text"
    )]
    Search {
        /// Query text
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Minimum cosine similarity
        #[arg(short, long, default_value = "0.0")]
        threshold: f32,

        /// Keyword search over chunk text instead of embeddings
        #[arg(long)]
        text: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect the schema registry
    #[command(about = "List, show and validate extraction schemas")]
    Schemas {
        #[command(subcommand)]
        action: SchemaAction,
    },
}

/// Stored document management actions
#[derive(Subcommand, Debug)]
pub enum DocumentAction {
    /// List stored documents
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a stored document and its metadata
    Show {
        /// Document id
        id: String,

        /// Include chunk contents
        #[arg(long)]
        chunks: bool,
    },

    /// Delete a stored document and its chunks
    Delete {
        /// Document id
        id: String,
    },
}

/// Schema registry actions
#[derive(Subcommand, Debug)]
pub enum SchemaAction {
    /// List schemas and vocabularies
    List,

    /// Show one schema definition
    Show {
        /// Registry name (file stem, or `stem.domain` for domain schemas)
        name: String,
    },

    /// Check enum references and load issues
    Validate {
        /// Schema to validate (all when omitted)
        name: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_repeated_schemas() {
        let cli = Cli::parse_from([
            "docmill", "extract", "invoice.txt", "-s", "invoice", "--schema", "refund_case",
            "--threshold", "0.8",
        ]);
        match cli.command {
            Commands::Extract {
                schemas, threshold, ..
            } => {
                assert_eq!(schemas, vec!["invoice", "refund_case"]);
                assert_eq!(threshold, Some(0.8));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_documents_show() {
        let cli = Cli::parse_from(["docmill", "--config", "alt.toml", "documents", "show", "abc123"]);
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert!(matches!(
            cli.command,
            Commands::Documents {
                action: DocumentAction::Show { ref id, chunks: false }
            } if id == "abc123"
        ));
    }
}
