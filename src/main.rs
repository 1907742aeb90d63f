//! modbind CLI - resolve binding expressions in install descriptors

use std::fs;
use std::path::Path;

use clap::{Parser, Subcommand};
use colored::Colorize;

use modbind::{
    grammar, validate, BindingError, BindingSchema, BindingSession, DbSnapshot, FixSuggestion,
    InstallDescriptor, MemoryGameDb, MemoryX2m,
};

#[derive(Parser)]
#[command(name = "modbind")]
#[command(about = "modbind - binding resolution for mod install descriptors")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a single binding string and print its call list
    Parse {
        /// Binding text, e.g. '{autoid=(0;5000),format=(3)}'
        binding: String,

        /// Property name used in diagnostics
        #[arg(short, long, default_value = "cli")]
        property: String,
    },

    /// Validate every binding in a descriptor file (parse only)
    Validate {
        /// Path to the install descriptor XML
        file: String,
    },

    /// Resolve a descriptor against a database snapshot
    Resolve {
        /// Path to the install descriptor XML
        file: String,

        /// Path to a JSON database snapshot
        #[arg(short, long)]
        db: Option<String>,

        /// Install language for islang/localkey
        #[arg(short, long, default_value = "en")]
        lang: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { binding, property } => parse_binding(&binding, &property),
        Commands::Validate { file } => validate_descriptor(&file),
        Commands::Resolve { file, db, lang } => resolve_descriptor(&file, db.as_deref(), &lang),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn parse_binding(binding: &str, property: &str) -> Result<(), BindingError> {
    let mut remaining = binding.to_string();
    let mut segments = 0;

    while let Some((open, close)) = grammar::next_segment(&remaining, property)? {
        let segment = remaining[open..=close].to_string();
        let mut expr = grammar::parse(&segment, property)?;
        validate::validate(&mut expr, property)?;

        println!("{} {}", "Segment:".cyan().bold(), segment);
        for call in &expr.calls {
            println!(
                "  {} {}({})",
                "→".cyan(),
                call.function.keyword(),
                call.args.join("; ")
            );
        }

        remaining.replace_range(open..=close, "");
        segments += 1;
    }

    if segments == 0 {
        println!("{} no bindings found", "✓".green());
    }
    Ok(())
}

fn validate_descriptor(file: &str) -> Result<(), BindingError> {
    let mut descriptor = InstallDescriptor::load(Path::new(file))?;

    let mut bindings = 0;
    for entry in &mut descriptor.entries {
        entry.visit_properties(&mut |name, value| {
            bindings += validate::check_string(value, name)?;
            Ok(())
        })?;
    }

    println!("{} Descriptor '{}' is valid", "✓".green(), file);
    println!("  Target file: {}", descriptor.file);
    println!("  Entries: {}", descriptor.entries.len());
    println!("  Bindings: {}", bindings);

    Ok(())
}

fn resolve_descriptor(file: &str, db_path: Option<&str>, lang: &str) -> Result<(), BindingError> {
    let descriptor = InstallDescriptor::load(Path::new(file))?;

    let snapshot: DbSnapshot = match db_path {
        Some(path) => {
            serde_json::from_str(&fs::read_to_string(path)?).map_err(|e| {
                BindingError::Descriptor {
                    details: format!("invalid database snapshot: {e}"),
                }
            })?
        }
        None => DbSnapshot::default(),
    };
    let db = MemoryGameDb::from_snapshot(&snapshot);
    let x2m = MemoryX2m::from_snapshot(&snapshot.x2m);

    let mut session = BindingSession::new(&db, &x2m, lang);
    let mut entries = descriptor.entries;
    let swept = session.resolve_entries(&mut entries, &snapshot.existing_indexes, &descriptor.file)?;

    println!(
        "{} Resolved {} entries into {}",
        "✓".green(),
        entries.len(),
        descriptor.file.bold()
    );
    if swept > 0 {
        println!("  {} {} entries dropped by error=(skip)", "!".yellow(), swept);
    }

    for entry in &entries {
        println!("{} Index={}", "→".cyan(), entry.index.bold());
        if !entry.name.is_empty() {
            println!("    Name: {}", entry.name);
        }
        if !entry.path.is_empty() {
            println!("    Path: {}", entry.path);
        }
        for value in &entry.values {
            println!("    Value: {}", value);
        }
    }

    Ok(())
}
