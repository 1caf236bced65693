//! psnake - project workspace manager
//!
//! Creates consulting project directories, versions their inputs and
//! drives the report toolchain.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use psnake::artifact::ArtifactKind;
use psnake::commands::{self, CreateImports, ImportArgs, Session};

#[derive(Parser)]
#[command(name = "psnake")]
#[command(author, version, about = "Project workspace manager for analysis projects")]
struct Cli {
    /// Project root; defaults to the registered project
    #[arg(long, global = true)]
    prj: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize psnake (first-time setup)
    Init,

    /// Create a new project
    Create {
        /// Customer name
        customer: String,

        /// Project acronym
        acronym: String,

        /// Project title
        #[arg(short, long, default_value = "")]
        title: String,

        /// Directory the project is created in
        #[arg(long, default_value = ".")]
        parent: PathBuf,

        /// Replace an existing project directory
        #[arg(long)]
        recreate: bool,

        /// Protocol file to import
        #[arg(long)]
        protocol: Option<PathBuf>,

        /// Protocol version date (YYYY-MM-DD)
        #[arg(long)]
        protocol_date: Option<String>,

        /// Dataset file(s) to import
        #[arg(long)]
        dataset: Vec<PathBuf>,

        /// Dataset version date (YYYY-MM-DD)
        #[arg(long)]
        dataset_date: Option<String>,

        /// Do not import anything
        #[arg(long)]
        skip_imports: bool,
    },

    /// Clone a project repository
    Clone {
        /// Repository name (e.g. prj24_acme_trial)
        repo: String,

        /// Directory the project is cloned in
        #[arg(long, default_value = ".")]
        parent: PathBuf,
    },

    /// Print the default project
    Get,

    /// Set the default project
    Set {
        /// Project root
        path: PathBuf,
    },

    /// Show project metadata
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add missing standard directories
    FixDirs,

    /// Import a new dataset version
    ImportDataset {
        #[command(flatten)]
        args: ImportFlags,
    },

    /// Import a new protocol version
    ImportProtocol {
        #[command(flatten)]
        args: ImportFlags,
    },

    /// Recreate the project environment from its manifest
    VenvSetup,

    /// Write the installed packages back to the manifest
    VenvFreeze,

    /// Package the report and outputs into an archive
    Zip,

    /// Build the report
    Report {
        /// Open the PDF afterwards
        #[arg(long)]
        view: bool,
    },

    /// Remove report build files
    Clean,

    /// Open the project sources in the editor
    Edit,

    /// Open the project documents
    Docs,

    /// Run the python scripts in src/
    RunPy,

    /// Run the R scripts in src/
    RunR,

    /// Send an item: report, outputs, zip
    Send {
        #[arg(default_value = "report")]
        item: String,
    },
}

#[derive(clap::Args)]
struct ImportFlags {
    /// Version date (YYYY-MM-DD); today if files are given without it
    #[arg(long)]
    date: Option<String>,

    /// Source file(s); prompts when neither files nor --skip are given
    #[arg(short, long = "file")]
    files: Vec<PathBuf>,

    /// Do not import
    #[arg(long)]
    skip: bool,
}

impl From<ImportFlags> for ImportArgs {
    fn from(f: ImportFlags) -> Self {
        ImportArgs {
            date: f.date,
            files: f.files,
            skip: f.skip,
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let session = Session::load()?;
    let prj = cli.prj.as_deref();

    match cli.command {
        Commands::Init => {
            commands::init(&session)?;
        }
        Commands::Create {
            customer,
            acronym,
            title,
            parent,
            recreate,
            protocol,
            protocol_date,
            dataset,
            dataset_date,
            skip_imports,
        } => {
            let imports = CreateImports {
                protocol: ImportArgs {
                    date: protocol_date,
                    files: protocol.into_iter().collect(),
                    skip: skip_imports,
                },
                dataset: ImportArgs {
                    date: dataset_date,
                    files: dataset,
                    skip: skip_imports,
                },
            };
            commands::create(&session, &customer, &acronym, &title, &parent, recreate, &imports)?;
        }
        Commands::Clone { repo, parent } => {
            commands::clone(&session, &repo, &parent)?;
        }
        Commands::Get => {
            commands::get_default(&session)?;
        }
        Commands::Set { path } => {
            commands::set_default(&session, &path)?;
        }
        Commands::Info { json } => {
            commands::info(&session, prj, json)?;
        }
        Commands::FixDirs => {
            commands::fix_dirs(&session, prj)?;
        }
        Commands::ImportDataset { args } => {
            commands::import(&session, ArtifactKind::Dataset, prj, &args.into())?;
        }
        Commands::ImportProtocol { args } => {
            commands::import(&session, ArtifactKind::Protocol, prj, &args.into())?;
        }
        Commands::VenvSetup => {
            commands::venv_setup(&session, prj)?;
        }
        Commands::VenvFreeze => {
            commands::venv_freeze(&session, prj)?;
        }
        Commands::Zip => {
            commands::zip(&session, prj)?;
        }
        Commands::Report { view } => {
            commands::build_report(&session, prj, view)?;
        }
        Commands::Clean => {
            commands::clean(&session, prj)?;
        }
        Commands::Edit => {
            commands::edit(&session, prj)?;
        }
        Commands::Docs => {
            commands::docs(&session, prj)?;
        }
        Commands::RunPy => {
            commands::run_python(&session, prj)?;
        }
        Commands::RunR => {
            commands::run_r(&session, prj)?;
        }
        Commands::Send { item } => {
            commands::send(&session, prj, &item)?;
        }
    }

    Ok(())
}
