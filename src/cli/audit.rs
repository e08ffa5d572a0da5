//! `kcc audit`: read and check the journal of store mutations.

use crate::cli::CliContext;
use crate::core::audit_log::{self, AuditEntry};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Show journaled operations, newest last
    Log(AuditLogArgs),
    /// Check that no journal entry was edited or removed
    Verify,
}

#[derive(Args, Debug)]
pub struct AuditLogArgs {
    /// Show at most this many of the newest matching entries
    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    /// Only this command (split-config, add-namespace, del-namespace,
    /// delete-cluster, rename-cluster)
    #[arg(long)]
    pub action: Option<String>,

    /// Only operations that touched this cluster
    #[arg(long)]
    pub cluster: Option<String>,

    /// Only failed operations
    #[arg(long)]
    pub failed: bool,

    /// Output format: text|json
    #[arg(long, default_value = "text")]
    pub format: String,
}

impl AuditLogArgs {
    fn matches(&self, entry: &AuditEntry) -> bool {
        if self.action.as_deref().is_some_and(|a| a != entry.action) {
            return false;
        }
        if let Some(cluster) = &self.cluster {
            if !entry.clusters.iter().any(|c| c == cluster) {
                return false;
            }
        }
        !(self.failed && entry.success)
    }
}

pub fn run(ctx: &CliContext, cmd: AuditCommand) -> Result<()> {
    match cmd {
        AuditCommand::Log(args) => run_log(ctx, args),
        AuditCommand::Verify => run_verify(ctx),
    }
}

fn run_log(ctx: &CliContext, args: AuditLogArgs) -> Result<()> {
    if args.format != "text" && args.format != "json" {
        bail!("invalid format: {} (use text|json)", args.format);
    }
    let entries = select(audit_log::read_log(&ctx.paths.audit_log, None)?, &args);

    if args.format == "json" {
        let json = serde_json::to_string_pretty(&entries).context("serialize journal")?;
        println!("{}", json);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No matching operations in {}", ctx.paths.audit_log.display());
        return Ok(());
    }
    println!("{}", journal_table(&entries));
    Ok(())
}

/// Matching entries, keeping the newest `limit`.
fn select(entries: Vec<AuditEntry>, args: &AuditLogArgs) -> Vec<AuditEntry> {
    let mut selected: Vec<AuditEntry> = entries.into_iter().filter(|e| args.matches(e)).collect();
    if selected.len() > args.limit {
        selected.drain(..selected.len() - args.limit);
    }
    selected
}

fn journal_table(entries: &[AuditEntry]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("When").add_attribute(Attribute::Bold),
        Cell::new("Command").add_attribute(Attribute::Bold),
        Cell::new("Target").add_attribute(Attribute::Bold),
        Cell::new("Outcome").add_attribute(Attribute::Bold),
    ]);
    for entry in entries {
        let when: DateTime<Local> = entry.timestamp.into();
        let outcome = match (&entry.error, entry.success) {
            (_, true) => "ok".to_string(),
            (Some(error), false) => error.clone(),
            (None, false) => "failed".to_string(),
        };
        table.add_row(vec![
            when.format("%Y-%m-%d %H:%M").to_string(),
            entry.action.clone(),
            entry.target.clone(),
            outcome,
        ]);
    }
    table
}

fn run_verify(ctx: &CliContext) -> Result<()> {
    let journal = &ctx.paths.audit_log;
    let (total, errors) = audit_log::verify_chain(journal)?;
    if errors.is_empty() {
        println!("Journal intact: {} entries in {}", total, journal.display());
        return Ok(());
    }
    for error in &errors {
        eprintln!("  {}", error);
    }
    bail!(
        "journal {} is damaged: {} problem(s) in {} entries",
        journal.display(),
        errors.len(),
        total
    )
}
