use crate::cli::CliContext;
use crate::models::key::{parse_key_component, StoreKey};
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct AddNamespaceArgs {
    /// Cluster name
    #[arg(value_parser = parse_key_component)]
    pub cluster: String,

    /// Namespace to create
    #[arg(value_parser = parse_key_component)]
    pub namespace: String,
}

#[derive(Args, Debug)]
pub struct DelNamespaceArgs {
    /// Cluster name
    #[arg(value_parser = parse_key_component)]
    pub cluster: String,

    /// Namespace to delete
    #[arg(value_parser = parse_key_component)]
    pub namespace: String,
}

pub fn run_add(ctx: &CliContext, args: AddNamespaceArgs) -> Result<()> {
    let result = ctx.store.add_namespace(&args.cluster, &args.namespace);
    ctx.audit(
        "add-namespace",
        &format!("{}/{}", args.cluster, args.namespace),
        &[args.cluster.as_str()],
        &result,
    );
    let key = result?;
    println!("Wrote {}", ctx.store.path_for(&key).display());
    Ok(())
}

pub fn run_delete(ctx: &CliContext, args: DelNamespaceArgs) -> Result<()> {
    let key = StoreKey::new(args.cluster, args.namespace)?;
    let result = ctx.store.delete(&key);
    ctx.audit("del-namespace", &key.to_string(), &[key.cluster.as_str()], &result);
    result?;
    println!("Deleted {}", ctx.store.path_for(&key).display());
    Ok(())
}
