//! Mold CLI - apply tag-driven transformations to JSON documents
//!
//! # Main Commands
//!
//! ```bash
//! mold apply --schema user.json input.json       # Transform documents of a schema type
//! mold field "  Joey@Example.COM " trim,lcase    # Transform a single string
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! mold tags                                      # List registered functions and aliases
//! mold check --schema user.json                  # Compile every tag of a schema
//! ```
//!
//! `--preset` / `MOLD_PRESET` picks the function set (`modifiers`, `scrubbers`,
//! `none`), `--tag-name` / `MOLD_TAG_NAME` the tag key that is read. A flag
//! wins over its variable, and the variable is not read when the flag is given.

use clap::{Parser, Subcommand};
use mold::logging::{init_logging, LogConfig, LogFormat};
use mold::config::{PRESET_ENV, TAG_NAME_ENV};
use mold::{Context, EngineConfig, Preset, Schema, Transformer, Value};
use serde_json::Value as Json;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mold")]
#[command(about = "Normalize and scrub JSON documents with tag-driven transformations", long_about = None)]
struct Cli {
    /// Function set to start from
    #[arg(short, long, global = true, ignore_case = true, env = PRESET_ENV)]
    preset: Option<Preset>,

    /// Tag key to read
    #[arg(short, long, global = true, env = TAG_NAME_ENV)]
    tag_name: Option<String>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Multi-line log output
    #[arg(long, global = true)]
    pretty_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform JSON documents described by a schema
    Apply {
        /// Schema file declaring the document types
        #[arg(short, long)]
        schema: PathBuf,

        /// Input JSON file, an object or an array of objects (default: stdin)
        input: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Transform a single string value
    Field {
        /// The value
        value: String,

        /// Tag string, e.g. "trim,lcase"
        tags: String,
    },

    /// List registered functions and aliases
    Tags,

    /// Compile the tags of every type in a schema
    Check {
        /// Schema file
        #[arg(short, long)]
        schema: PathBuf,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut log_config = LogConfig::from_verbosity(cli.verbose);
    if cli.pretty_logs {
        log_config = log_config.with_format(LogFormat::Pretty);
    }
    init_logging(&log_config).ok();

    let result = build_transformer(cli.preset, cli.tag_name).and_then(|t| match cli.command {
        Commands::Apply {
            schema,
            input,
            output,
        } => cmd_apply(&t, &schema, input.as_deref(), output.as_deref()),

        Commands::Field { value, tags } => cmd_field(&t, value, &tags),

        Commands::Tags => cmd_tags(&t),

        Commands::Check { schema } => cmd_check(&t, &schema),
    });

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn build_transformer(
    preset: Option<Preset>,
    tag_name: Option<String>,
) -> Result<Transformer, Box<dyn std::error::Error>> {
    let config = EngineConfig {
        preset: preset.unwrap_or_default(),
        tag_name,
    };
    Ok(config.build()?)
}

fn cmd_apply(
    t: &Transformer,
    schema_path: &Path,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Schema: {}", schema_path.display());
    let resolved = Schema::from_file(schema_path)?.resolve()?;
    eprintln!("   Root type: {}", resolved.root().name());
    eprintln!("   Tag: {}", t.tag_name());

    let content = match input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let document: Json = serde_json::from_str(&content)?;

    let ctx = Context::background();
    let transform_one = |json: &Json| -> Result<Json, Box<dyn std::error::Error>> {
        let mut value = resolved.decode(json)?;
        t.transform_struct(&ctx, &mut value)?;
        Ok(value.to_json())
    };

    let result = match &document {
        Json::Array(items) => {
            let out = items.iter().map(&transform_one).collect::<Result<Vec<_>, _>>()?;
            eprintln!("⚙️  Transformed {} documents", out.len());
            Json::Array(out)
        }
        single => {
            let out = transform_one(single)?;
            eprintln!("⚙️  Transformed 1 document");
            out
        }
    };

    write_output(&serde_json::to_string_pretty(&result)?, output)?;
    eprintln!("✨ Done!");
    Ok(())
}

fn cmd_field(t: &Transformer, value: String, tags: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut v = Value::String(value);
    t.transform_field(&Context::background(), &mut v, tags)?;
    println!("{}", v.as_str().unwrap_or_default());
    Ok(())
}

fn cmd_tags(t: &Transformer) -> Result<(), Box<dyn std::error::Error>> {
    println!("Tag key: {}", t.tag_name());
    println!();
    println!("Functions:");
    for name in t.registered_tags() {
        println!("  {}", name);
    }
    let aliases = t.registered_aliases();
    if !aliases.is_empty() {
        println!();
        println!("Aliases:");
        for (alias, tags) in aliases {
            println!("  {} = {}", alias, tags);
        }
    }
    Ok(())
}

fn cmd_check(t: &Transformer, schema_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Checking: {}", schema_path.display());
    let resolved = Schema::from_file(schema_path)?.resolve()?;

    let mut failures = 0;
    for ty in resolved.types() {
        match t.prepare(ty) {
            Ok(()) => eprintln!("   ✅ {}", ty.name()),
            Err(e) => {
                failures += 1;
                eprintln!("   ❌ {}: {}", ty.name(), e);
            }
        }
    }

    if failures > 0 {
        return Err(format!("{} type(s) with invalid tags", failures).into());
    }
    eprintln!("\n📊 All {} types valid", resolved.types().count());
    Ok(())
}

fn write_output(content: &str, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!("   💾 Saved to: {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
