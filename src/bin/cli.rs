// CLI binary: panicking on unrecoverable errors is fine here.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use pawnc_jni::diagnostic::Diagnostic;
use pawnc_jni::settings::SettingsOverrides;
use pawnc_jni::{logging, paths, settings, Pawnc, Session};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "pawnc-cli", about = "Compile pawn sources through the pawnc bridge", version)]
struct Cli {
    /// Source file (.pwn or .p)
    source: PathBuf,

    /// Additional include directory (repeatable)
    #[arg(short = 'i', long = "include")]
    include: Vec<PathBuf>,

    /// Output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Debug level (0-3)
    #[arg(short, long)]
    debug: Option<u8>,

    /// Optimization level (0-2)
    #[arg(short = 'O', long)]
    optimize: Option<u8>,

    /// Directory holding compiler.json
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Write the effective settings back to the config directory
    #[arg(long)]
    save: bool,

    /// Print the result as JSON instead of console text
    #[arg(long)]
    json: bool,

    /// Raw options passed to pawncc after the configured ones
    #[arg(last = true)]
    extra: Vec<String>,
}

impl Cli {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            include_dirs: self.include.clone(),
            output: self.output.clone(),
            debug_level: self.debug,
            optimization_level: self.optimize,
            extra_options: self.extra.clone(),
        }
    }
}

fn main() {
    logging::init();
    let cli = Cli::parse();

    if let Err(e) = paths::require_source_file(&cli.source) {
        eprintln!("Error: {e}");
        process::exit(2);
    }
    // The bridge changes into the source directory, so relative paths would
    // be resolved twice.
    let source = cli.source.canonicalize().unwrap_or_else(|e| {
        eprintln!("Error: cannot access {}: {e}", cli.source.display());
        process::exit(2);
    });

    let config_dir = cli.config_dir.clone().unwrap_or_else(paths::default_config_dir);
    let mut settings = settings::load_settings(&config_dir).unwrap_or_default();
    settings.apply(&cli.overrides());
    if let Err(e) = settings.validate() {
        eprintln!("Error: {e}");
        process::exit(2);
    }
    if cli.save {
        if let Err(e) = settings::save_settings(&config_dir, &settings) {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    }

    let session = Session::new(Pawnc);
    if !cli.json {
        session.set_output_listener(Some(Arc::new(|message: &str| print!("{message}"))));
        session.set_error_listener(Some(Arc::new(|d: &Diagnostic| eprintln!("{d}"))));
    }

    let result = session.compile_with_settings(&source, &settings);
    session.clear_listeners();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result).unwrap());
    } else if result.success {
        let output = settings
            .output
            .clone()
            .unwrap_or_else(|| paths::output_path(&source));
        println!("Output: {}", output.display());
    } else {
        println!(
            "Errors: {}, Warnings: {}",
            result.error_count(),
            result.warning_count()
        );
    }

    process::exit(result.status);
}
