//! CLI routing and command dispatch.

use crate::core::paths::StorePaths;
use crate::core::store::ConfigStore;
use crate::core::{audit_log, settings};
use crate::models::settings::Settings;
use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

pub mod audit;
pub mod cluster;
pub mod doctor;
pub mod namespace;
pub mod split;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub paths: StorePaths,
    pub store: ConfigStore,
    pub settings: Settings,
    pub settings_load_warning: Option<String>,
    pub non_interactive: bool,
}

impl CliContext {
    /// Journal the outcome of a mutating store call. Journal failures are
    /// reported and otherwise ignored.
    pub fn audit<T>(
        &self,
        action: &str,
        target: &str,
        clusters: &[&str],
        outcome: &crate::error::Result<T>,
    ) {
        if !self.settings.audit.enabled {
            return;
        }
        let error = outcome.as_ref().err().map(ToString::to_string);
        if let Err(e) = audit_log::record(&self.paths.audit_log, action, target, clusters, error) {
            eprintln!("warning: audit log failed: {:#}", e);
        }
    }

    #[cfg(test)]
    pub(crate) fn for_root(root: &std::path::Path, settings: Settings) -> Self {
        let paths = StorePaths::from_root(root.to_path_buf());
        Self {
            store: ConfigStore::new(paths.root.clone()),
            paths,
            settings,
            settings_load_warning: None,
            non_interactive: true,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "kcc",
    version,
    about = "Tool for managing multiple kubeconfig files",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Directory holding the kubeconfig files (default: $KCC_KUBE_DIR or ~/.kube)
    #[arg(long, global = true, value_name = "PATH")]
    pub kube_dir: Option<PathBuf>,

    /// Run in non-interactive mode (no prompts, suitable for automation)
    #[arg(long, global = true, env = "KCC_NON_INTERACTIVE")]
    pub non_interactive: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        init_tracing(self.verbose);

        let paths = StorePaths::resolve(self.kube_dir)?;

        let mut settings_load_warning: Option<String> = None;
        let settings = match settings::load(&paths.settings) {
            Ok(settings) => settings,
            Err(e) => {
                let warning = format!("cannot read settings, using defaults: {:#}", e);
                tracing::warn!("{}", warning);
                settings_load_warning = Some(warning);
                Settings::default()
            }
        };

        let ctx = CliContext {
            store: ConfigStore::new(paths.root.clone()),
            paths,
            settings,
            settings_load_warning,
            non_interactive: self.non_interactive,
        };

        match self.command {
            Commands::SplitConfig(args) => split::run(&ctx, args),
            Commands::ListClusters(args) => cluster::run_list(&ctx, args),
            Commands::AddNamespace(args) => namespace::run_add(&ctx, args),
            Commands::DelNamespace(args) => namespace::run_delete(&ctx, args),
            Commands::DeleteCluster(args) => cluster::run_delete(&ctx, args),
            Commands::RenameCluster(args) => cluster::run_rename(&ctx, args),
            Commands::Audit { command } => audit::run(&ctx, command),
            Commands::Doctor(args) => doctor::run(&ctx, args),
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a multi-context kubeconfig into one file per cluster and namespace
    ///
    /// Files are named `config|<cluster>|<namespace>`. Names containing `/`,
    /// `\`, `|` or `%` are stored percent-escaped, so an EKS cluster
    /// `arn:aws:eks:eu-west-1:1234:cluster/prod` becomes
    /// `config|arn:aws:eks:eu-west-1:1234:cluster%2Fprod|default`. Names with
    /// control characters are rejected.
    SplitConfig(split::SplitArgs),
    /// List stored clusters (and namespaces with --full)
    ListClusters(cluster::ListArgs),
    /// Store a copy of a cluster's config bound to another namespace
    AddNamespace(namespace::AddNamespaceArgs),
    /// Delete one namespace config of a cluster
    #[command(alias = "delete-namespace")]
    DelNamespace(namespace::DelNamespaceArgs),
    /// Delete every namespace config of a cluster
    DeleteCluster(cluster::DeleteClusterArgs),
    /// Rename a cluster across all its namespace configs
    RenameCluster(cluster::RenameClusterArgs),
    /// View or verify the operation journal
    Audit {
        #[command(subcommand)]
        command: audit::AuditCommand,
    },
    /// Diagnose the kubeconfig directory (read-only)
    Doctor(doctor::DoctorArgs),
}
