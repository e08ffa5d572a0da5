use crate::cli::CliContext;
use crate::core::splitter::{self, SplitOptions, Splitter};
use crate::error::Result as StoreResult;
use crate::models::key::StoreKey;
use anyhow::Result;
use clap::Args;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Config file to split (default: <kube-dir>/config)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Do not also store non-default-namespace contexts under `default`
    #[arg(long)]
    pub no_default_copy: bool,

    /// Show the files that would be written without writing them
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(ctx: &CliContext, args: SplitArgs) -> Result<()> {
    let source = args
        .config
        .clone()
        .unwrap_or_else(|| ctx.paths.source_config.clone());
    let options = SplitOptions {
        duplicate_to_default: ctx.settings.split.duplicate_to_default && !args.no_default_copy,
        base_dir: source.parent().map(Path::to_path_buf),
    };

    if args.dry_run {
        let doc = splitter::load_source(&source)?;
        let docs = Splitter::new(options).split(&doc)?;
        for (key, _) in &docs {
            println!("would write {}", ctx.store.path_for(key).display());
        }
        println!("\nNo changes made (dry-run).");
        return Ok(());
    }

    let result = split_and_store(ctx, &source, options);
    let clusters: BTreeSet<&str> = result
        .as_ref()
        .map(|keys| keys.iter().map(|k| k.cluster.as_str()).collect())
        .unwrap_or_default();
    ctx.audit(
        "split-config",
        &source.display().to_string(),
        &clusters.into_iter().collect::<Vec<_>>(),
        &result,
    );
    for key in result? {
        println!("Wrote {}", ctx.store.path_for(&key).display());
    }
    Ok(())
}

fn split_and_store(ctx: &CliContext, source: &Path, options: SplitOptions) -> StoreResult<Vec<StoreKey>> {
    let doc = splitter::load_source(source)?;
    let docs = Splitter::new(options).split(&doc)?;
    let mut written = Vec::with_capacity(docs.len());
    for (key, single) in docs {
        ctx.store.write(&key, &single)?;
        written.push(key);
    }
    Ok(written)
}
