use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "book-cover-match",
    version,
    about = "Identify a book from a photo of its cover"
)]
struct Cli {
    /// Cover image file (png, jpg, webp, gif, bmp, tiff)
    image: Option<String>,

    /// Mime type for the image (auto, png, jpg, image/*)
    #[arg(short = 'M', long = "mime")]
    mime: Option<String>,

    /// Local catalog TOML file ([[books]] id, title, author)
    #[arg(short = 'c', long = "catalog")]
    catalog: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Tesseract languages, joined with '+' (e.g. eng+jpn)
    #[arg(short = 'l', long = "ocr-languages")]
    ocr_languages: Option<String>,

    /// Skip the external book search and match against the catalog only
    #[arg(long = "offline")]
    offline: bool,

    /// Print the result as JSON
    #[arg(long = "json")]
    json: bool,

    /// Show installed Tesseract languages and exit
    #[arg(long = "show-ocr-languages")]
    show_ocr_languages: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    book_cover_match::logging::init(cli.verbose)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; cancelling cover analysis");
            on_interrupt.cancel();
        }
    });

    let config = book_cover_match::Config {
        image_path: cli.image,
        mime: cli.mime,
        catalog_path: cli.catalog,
        settings_path: cli.read_settings,
        ocr_languages: cli.ocr_languages,
        offline: cli.offline,
        json: cli.json,
        show_ocr_languages: cli.show_ocr_languages,
    };
    let output = book_cover_match::run(config, &cancel).await?;
    println!("{}", output);
    Ok(())
}
