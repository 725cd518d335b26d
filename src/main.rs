use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use labelsheet::{
    DEFAULT_QR_PX, EcLevel, Error, GridGeometry, JsonFileStore, LabelConfig, LabelRequest,
    LabelService, QrEncoding, QrFormat,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Lay out package QR labels on Avery-style sheets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the label sheet to a PDF file
    Pdf {
        #[command(flatten)]
        labels: LabelArgs,
        /// Output path
        #[arg(short, long, default_value = "labels.pdf")]
        out: PathBuf,
        /// Embed QR codes as images instead of vector paths
        #[arg(long)]
        raster_qr: bool,
        /// TrueType font for location text
        #[arg(long)]
        font: Option<PathBuf>,
        /// TrueType font for package IDs
        #[arg(long)]
        bold_font: Option<PathBuf>,
    },
    /// Write a print-ready HTML page
    Html {
        #[command(flatten)]
        labels: LabelArgs,
        #[arg(short, long, default_value = "labels.html")]
        out: PathBuf,
        /// Open the print dialog when the page loads
        #[arg(long)]
        print: bool,
    },
    /// Print the preview JSON for client-side rendering
    Preview {
        #[command(flatten)]
        labels: LabelArgs,
    },
    /// QR code for one package
    Qr {
        #[command(flatten)]
        common: CommonArgs,
        /// Package ID
        id: String,
        #[arg(long, value_enum, default_value_t = QrFormatArg::Png)]
        format: QrFormatArg,
        /// PNG edge length in pixels
        #[arg(long, default_value_t = DEFAULT_QR_PX)]
        size: u32,
        /// Output path; stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// JSON array of package records
    #[arg(short, long)]
    store: PathBuf,
    /// Site root encoded into QR codes
    #[arg(long)]
    base_url: Option<String>,
    /// JSON file describing a non-default sheet
    #[arg(long)]
    grid: Option<PathBuf>,
    /// QR error-correction level (L, M, Q, H)
    #[arg(long)]
    ec: Option<EcLevel>,
}

#[derive(Args, Debug)]
struct LabelArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Comma-separated package IDs
    #[arg(long, conflicts_with = "request")]
    ids: Option<String>,
    /// JSON request body file (`packageIds`, `copies`, `offset`)
    #[arg(long)]
    request: Option<PathBuf>,
    #[arg(long)]
    copies: Option<String>,
    /// Cells already used on the first sheet
    #[arg(long)]
    offset: Option<String>,
    /// Stroke cell outlines, useful for alignment test prints
    #[arg(long)]
    outline: bool,
    /// Most sheets one request may produce
    #[arg(long)]
    max_pages: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum QrFormatArg {
    Png,
    Svg,
}

impl CommonArgs {
    fn config(&self) -> Result<LabelConfig, Error> {
        let mut config = LabelConfig::from_env()?;
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(path) = &self.grid {
            let json = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
            config.geometry = GridGeometry::from_json(&json)?;
        }
        if let Some(level) = self.ec {
            config.qr.ec_level = level;
        }
        Ok(config)
    }

    fn service(&self, config: LabelConfig) -> Result<LabelService<JsonFileStore>, Error> {
        let store = JsonFileStore::open(&self.store)?;
        LabelService::new(store, config)
    }
}

impl LabelArgs {
    fn config(&self) -> Result<LabelConfig, Error> {
        let mut config = self.common.config()?;
        config.style.outline_cells = self.outline;
        if let Some(pages) = self.max_pages {
            config.max_pages = pages;
        }
        Ok(config)
    }

    fn request(&self) -> Result<LabelRequest, Error> {
        let mut request = match &self.request {
            Some(path) => LabelRequest::from_json(&std::fs::read_to_string(path)?)?,
            None => LabelRequest {
                package_ids: self.ids.clone().map(Into::into),
                ..LabelRequest::default()
            },
        };
        if let Some(copies) = &self.copies {
            request.copies = Some(copies.as_str().into());
        }
        if let Some(offset) = &self.offset {
            request.offset = Some(offset.as_str().into());
        }
        Ok(request)
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Pdf {
            labels,
            out,
            raster_qr,
            font,
            bold_font,
        } => {
            let mut config = labels.config()?;
            if raster_qr {
                config.qr_encoding = QrEncoding::Raster;
            }
            config.fonts.regular = font;
            config.fonts.bold = bold_font;
            let service = labels.common.service(config)?;
            let doc = labelsheet::write_label_pdf(&service, &labels.request()?, &out)?;
            for url in &doc.skipped_qr {
                eprintln!("warning: no QR code for {url}");
            }
            println!(
                "{}: {} labels on {} pages",
                out.display(),
                doc.labels_drawn,
                doc.page_count
            );
        }
        Command::Html { labels, out, print } => {
            let service = labels.common.service(labels.config()?)?;
            let doc = labelsheet::write_label_html(&service, &labels.request()?, print, &out)?;
            println!(
                "{}: {} labels on {} sheets",
                out.display(),
                doc.labels_drawn,
                doc.page_count
            );
        }
        Command::Preview { labels } => {
            let service = labels.common.service(labels.config()?)?;
            let data = service.preview(&labels.request()?)?;
            let json = serde_json::to_string_pretty(&data).map_err(|e| Error::Rendering(e.to_string()))?;
            println!("{json}");
        }
        Command::Qr {
            common,
            id,
            format,
            size,
            out,
        } => {
            let service = common.service(common.config()?)?;
            let format = match format {
                QrFormatArg::Png => QrFormat::Png,
                QrFormatArg::Svg => QrFormat::Svg,
            };
            let image = service.package_qr(&id, format, size)?;
            match out {
                Some(path) => std::fs::write(path, &image.bytes)?,
                None => std::io::stdout().write_all(&image.bytes)?,
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.payload());
            if (400..500).contains(&e.status()) {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
