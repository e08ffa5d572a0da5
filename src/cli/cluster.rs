use crate::cli::CliContext;
use crate::core::store::ClusterIndex;
use crate::models::key::parse_key_component;
use anyhow::{bail, Context, Result};
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};
use dialoguer::Confirm;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show this cluster
    #[arg(long)]
    pub cluster: Option<String>,

    /// Full listing (one row per cluster and namespace)
    #[arg(long, short)]
    pub full: bool,

    /// Output format: text|json
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct DeleteClusterArgs {
    /// Cluster to delete
    #[arg(value_parser = parse_key_component)]
    pub cluster: String,

    /// Do not ask for confirmation
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct RenameClusterArgs {
    /// Cluster to rename
    #[arg(value_parser = parse_key_component)]
    pub old: String,

    /// New cluster name
    #[arg(value_parser = parse_key_component)]
    pub new: String,
}

pub fn run_list(ctx: &CliContext, args: ListArgs) -> Result<()> {
    if args.format != "text" && args.format != "json" {
        bail!("invalid format: {} (use text|json)", args.format);
    }

    let index = ctx.store.list(args.cluster.as_deref())?;

    if args.format == "json" {
        let json = serde_json::to_string_pretty(&index).context("serialize cluster list")?;
        println!("{}", json);
        return Ok(());
    }

    if index.is_empty() {
        println!("No clusters found in {}", ctx.store.root().display());
        return Ok(());
    }

    if args.full {
        println!("{}", full_table(&index));
    } else {
        for cluster in index.keys() {
            println!("{}", cluster);
        }
    }
    Ok(())
}

fn full_table(index: &ClusterIndex) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Cluster").add_attribute(Attribute::Bold),
        Cell::new("Namespace").add_attribute(Attribute::Bold),
    ]);
    for (cluster, namespaces) in index {
        for namespace in namespaces {
            table.add_row(vec![cluster.as_str(), namespace.as_str()]);
        }
    }
    table
}

pub fn run_delete(ctx: &CliContext, args: DeleteClusterArgs) -> Result<()> {
    let clusters = [args.cluster.as_str()];
    let namespaces = ctx.store.namespaces(&args.cluster);
    if namespaces.is_err() {
        ctx.audit("delete-cluster", &args.cluster, &clusters, &namespaces);
    }
    let namespaces = namespaces?;

    if !args.yes {
        if ctx.non_interactive {
            bail!("--non-interactive requires --yes for delete-cluster");
        }
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete {} config file(s) of cluster '{}' ({})?",
                namespaces.len(),
                args.cluster,
                namespaces.iter().cloned().collect::<Vec<_>>().join(", ")
            ))
            .default(false)
            .interact()
            .context("read confirmation")?;
        if !confirmed {
            println!("Aborted");
            return Ok(());
        }
    }

    let result = ctx.store.delete_cluster(&args.cluster);
    ctx.audit("delete-cluster", &args.cluster, &clusters, &result);
    for key in result? {
        println!("Deleted {}", ctx.store.path_for(&key).display());
    }
    Ok(())
}

pub fn run_rename(ctx: &CliContext, args: RenameClusterArgs) -> Result<()> {
    let result = ctx.store.rename(&args.old, &args.new);
    ctx.audit(
        "rename-cluster",
        &format!("{} -> {}", args.old, args.new),
        &[args.old.as_str(), args.new.as_str()],
        &result,
    );
    let moved = result.with_context(|| format!("rename {} to {}", args.old, args.new))?;
    println!(
        "Renamed cluster '{}' to '{}' ({} namespace(s))",
        args.old,
        args.new,
        moved.len()
    );
    Ok(())
}
