//
// cli.rs
// Atlas-Overlap
//
// Defines the CLI surface with Clap and dispatches user-selected commands to the corresponding modules.
//

use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand, ValueEnum};

use crate::catalog::{AtlasKind, CatalogSource};
use crate::{batch, job, report, validate, web};

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "atlas-overlap")]
#[command(about = "Lesion burden per atlas region", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute lesion overlap for every region of an atlas
    Overlap {
        #[arg(short, long)]
        lesion: PathBuf,
        #[arg(short, long)]
        atlas: PathBuf,
        #[arg(short, long, value_enum)]
        kind: AtlasArg,
        /// Label table (defaults to the atlas type's conventional file name)
        #[arg(short, long)]
        catalog: Option<PathBuf>,
        /// Output CSV (defaults to regions_in_<kind>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run every job listed in a JSON job file
    Run { jobs: PathBuf },
    /// Overlap for every lesion mask in a directory
    Batch {
        #[arg(short, long)]
        directory: PathBuf,
        #[arg(short, long)]
        atlas: PathBuf,
        #[arg(short, long, value_enum)]
        kind: AtlasArg,
        #[arg(short, long)]
        catalog: Option<PathBuf>,
        #[arg(long, default_value = ".nii.gz")]
        pattern: String,
        #[arg(long, default_value = "regions")]
        output_dir: PathBuf,
    },
    /// Print the resolved region catalog
    Catalog {
        #[arg(short, long, value_enum)]
        kind: AtlasArg,
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },
    /// Count non-zero voxels per volume
    Count {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long, default_value = "nonzero_voxel_counts.csv")]
        output: PathBuf,
    },
    /// Compare lesion volumes of <case>.nii.gz and <case>_warped.nii.gz pairs
    Compare {
        #[arg(short, long)]
        directory: PathBuf,
    },
    /// Start the web server
    Web {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum AtlasArg {
    Brainstem,
    Tailrach,
    Neudorfer,
}

impl From<AtlasArg> for AtlasKind {
    fn from(value: AtlasArg) -> Self {
        match value {
            AtlasArg::Brainstem => AtlasKind::Brainstem,
            AtlasArg::Tailrach => AtlasKind::Tailrach,
            AtlasArg::Neudorfer => AtlasKind::Neudorfer,
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    // Parse the raw CLI arguments once and dispatch to a subcommand handler.
    let cli = Cli::parse();

    match cli.command {
        Commands::Overlap {
            lesion,
            atlas,
            kind,
            catalog,
            output,
        } => {
            let kind = AtlasKind::from(kind);
            let job = job::OverlapJob {
                lesion,
                atlas,
                kind: kind.to_string(),
                catalog,
                output: output.unwrap_or_else(|| PathBuf::from(format!("regions_in_{}.csv", kind))),
            };
            let stats = job::run_job(&job)?;
            report::print_region_summary(&stats);
            println!("Results saved to {:?}", job.output);
        }
        Commands::Run { jobs } => {
            for (job, stats) in job::run_job_file(&jobs)? {
                println!("{:?} -> {:?}", job.lesion, job.output);
                report::print_region_summary(&stats);
            }
        }
        Commands::Batch {
            directory,
            atlas,
            kind,
            catalog,
            pattern,
            output_dir,
        } => {
            let request = batch::BatchRequest {
                directory,
                pattern,
                atlas,
                kind: kind.into(),
                catalog,
                output_dir,
            };
            let outcomes = batch::process_directory(&request)?;
            let failed: Vec<_> = outcomes.iter().filter(|o| o.error.is_some()).collect();
            for outcome in &outcomes {
                match (&outcome.output, &outcome.error) {
                    (Some(output), _) => println!(
                        "Success: {} -> {} ({} region(s) with lesion)",
                        outcome.lesion, output, outcome.regions_with_lesion
                    ),
                    (None, Some(error)) => eprintln!("Error in {}: {}", outcome.lesion, error),
                    (None, None) => {}
                }
            }
            if !failed.is_empty() {
                bail!("{} of {} lesion mask(s) failed", failed.len(), outcomes.len());
            }
        }
        Commands::Catalog { kind, catalog } => {
            let kind = AtlasKind::from(kind);
            let catalog = CatalogSource::for_kind(kind, catalog.as_deref()).load()?;
            println!("Catalog '{}' | {} region(s)", kind, catalog.len());
            for entry in &catalog {
                println!("  {:>6}  {}", entry.region_id, entry.name);
            }
        }
        Commands::Count { files, output } => {
            let summaries = validate::count_nonzero(&files)?;
            for summary in &summaries {
                println!(
                    "{}: {} non-zero voxel(s), {:.2} mm³ (shape {:?})",
                    summary.file, summary.nonzero_voxels, summary.nonzero_volume, summary.shape
                );
            }
            report::write_volume_summaries(&output, &summaries)?;
            println!("Counts saved to {:?}", output);
        }
        Commands::Compare { directory } => {
            let rows = validate::compare_directory(&directory)?;
            let output = directory.join("lesion_volumes.csv");
            report::write_comparisons(&output, &rows)?;
            println!("Results saved to {:?}", output);
        }
        Commands::Web { host, port } => web::start_server(&host, port).await?,
    }

    Ok(())
}
