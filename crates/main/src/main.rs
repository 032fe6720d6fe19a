use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use guide_pdf::{load_content, DocumentAssembler, FontConfig, RenderConfig, GUIDE_CONTENT};
use log::info;

const DEFAULT_OUTPUT: &str = "GUIA_MONETIZACION_MEGIA.pdf";

/// Renders the MEG.IA monetization guide.
///
/// Fonts are read from their system paths, or by file name from `--fonts-dir`,
/// the `GUIDE_PDF_FONTS_DIR` environment variable or `assets/fonts`.
#[derive(Parser)]
#[command(author, version, about = "Renders the MEG.IA monetization guide PDF")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the guide to a PDF file.
    Render {
        /// JSON content description; the embedded guide when omitted.
        #[arg(long)]
        content: Option<PathBuf>,

        /// Output file.
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Extra directory searched for font files.
        #[arg(long)]
        fonts_dir: Option<PathBuf>,
    },

    /// Validate a content description without loading fonts.
    Check {
        /// JSON content description; the embedded guide when omitted.
        #[arg(long)]
        content: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            content,
            output,
            fonts_dir,
        } => render(content.as_deref(), &output, fonts_dir),
        Commands::Check { content } => check(content.as_deref()),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn assemble(content: Option<&Path>, fonts: FontConfig) -> Result<DocumentAssembler, Box<dyn Error>> {
    let json = match content {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| format!("cannot read {}: {err}", path.display()))?,
        None => GUIDE_CONTENT.to_owned(),
    };
    let mut assembler = DocumentAssembler::new(RenderConfig::new(fonts));
    load_content(&json, &mut assembler)?;
    Ok(assembler)
}

fn render(
    content: Option<&Path>,
    output: &Path,
    fonts_dir: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let mut fonts = FontConfig::guide_defaults();
    if let Some(dir) = fonts_dir {
        fonts = fonts.with_search_dir(dir);
    }

    let report = assemble(content, fonts)?.render(output)?;
    info!("{} pages written to {}", report.page_count, output.display());
    println!("PDF generado exitosamente!");
    Ok(())
}

fn check(content: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let assembler = assemble(content, FontConfig::guide_defaults())?;
    assembler.validate()?;
    println!(
        "{} styles, {} blocks: OK",
        assembler.styles().len(),
        assembler.blocks().len()
    );
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
