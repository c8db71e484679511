use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use clinic_core::image::decode_image;
use clinic_core::records::read_record;
use clinic_core::render::RasterImage;
use clinic_core::{
    reaper, ClinicConfig, Hospital, Patient, PrescriptionAssembler, SectionOutcome, Visit,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Clinic prescription tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a prescription PDF from JSON records
    Render {
        /// Patient record (JSON)
        #[arg(long)]
        patient: PathBuf,
        /// Hospital record (JSON)
        #[arg(long)]
        hospital: PathBuf,
        /// Visit record (JSON)
        #[arg(long)]
        visit: PathBuf,
        /// Prescription text; defaults to the visit's prescription
        #[arg(long)]
        prescription: Option<String>,
        /// Output directory (defaults to ARTIFACT_DIR or `temp`)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Report what the image decoder makes of a data URI or base64 file
    DecodeImage {
        /// File containing a data URI or bare base64
        file: PathBuf,
    },
    /// Delete artifacts older than the given age, once
    Reap {
        /// Minimum artifact age in seconds
        #[arg(long, default_value_t = 300)]
        older_than_secs: u64,
        /// Artifact directory (defaults to ARTIFACT_DIR or `temp`)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn config(artifact_dir: Option<PathBuf>) -> anyhow::Result<ClinicConfig> {
    let artifact_dir = artifact_dir
        .map(|d| d.to_string_lossy().into_owned())
        .or_else(|| std::env::var("ARTIFACT_DIR").ok());
    let cfg = ClinicConfig::from_env_values(
        artifact_dir,
        std::env::var("PUBLIC_BASE_URL").ok(),
        std::env::var("ARTIFACT_RETENTION_SECS").ok(),
        std::env::var("REAPER_INTERVAL_SECS").ok(),
        std::env::var("PLATFORM_NAME").ok(),
        std::env::var("COUNTRY_CODE").ok(),
    )?;
    Ok(cfg)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            patient,
            hospital,
            visit,
            prescription,
            out,
        } => {
            let patient: Patient = read_record(&patient)
                .with_context(|| format!("reading patient {}", patient.display()))?;
            let hospital: Hospital = read_record(&hospital)
                .with_context(|| format!("reading hospital {}", hospital.display()))?;
            let visit: Visit = read_record(&visit)
                .with_context(|| format!("reading visit {}", visit.display()))?;
            let prescription = prescription.unwrap_or_else(|| visit.prescription.clone());

            let assembler = PrescriptionAssembler::from_config(&config(out)?)?;
            let artifact =
                assembler.assemble_at(&prescription, &patient, &hospital, &visit, Utc::now())?;

            println!(
                "Wrote {} ({} bytes, {} page(s), sha256 {})",
                artifact.path.display(),
                artifact.metadata.size_bytes,
                artifact.report.page_count,
                artifact.metadata.sha256
            );
            for (section, outcome) in &artifact.report.sections {
                if let SectionOutcome::Skipped(reason) = outcome {
                    println!("  skipped {}: {}", section, reason);
                }
            }
        }
        Commands::DecodeImage { file } => {
            let input = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            match decode_image(&input) {
                Ok(decoded) => {
                    println!("{} bytes, format {}", decoded.bytes.len(), decoded.format);
                    match RasterImage::from_decoded(&decoded) {
                        Ok(raster) => {
                            let (w, h) = raster.pixels.dimensions();
                            println!("embeddable: {}x{} px", w, h);
                        }
                        Err(reason) => println!("not embeddable: {}", reason),
                    }
                }
                Err(reason) => println!("no image: {}", reason),
            }
        }
        Commands::Reap {
            older_than_secs,
            dir,
        } => {
            let assembler = PrescriptionAssembler::from_config(&config(dir)?)?;
            let removed =
                reaper::reap_once(assembler.store(), Duration::from_secs(older_than_secs))?;
            if removed.is_empty() {
                println!("No expired artifacts.");
            } else {
                for name in removed {
                    println!("Deleted {}", name);
                }
            }
        }
    }

    Ok(())
}
