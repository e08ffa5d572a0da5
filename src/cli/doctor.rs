//! Read-only diagnostics for the kubeconfig directory.

use crate::cli::CliContext;
use crate::constants;
use crate::core::audit_log;
use crate::util::fs as store_fs;
use anyhow::{bail, Result};
use clap::Args;

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Also parse every stored config file
    #[arg(long)]
    pub deep: bool,
}

pub fn run(ctx: &CliContext, args: DoctorArgs) -> Result<()> {
    let paths = &ctx.paths;
    let mut ok = 0u32;
    let mut warn = 0u32;
    let mut fail = 0u32;

    println!("Doctor: {}", paths);
    if let Some(w) = &ctx.settings_load_warning {
        println!("  [WARN] {}", w);
        warn += 1;
    }

    if !paths.root.is_dir() {
        println!("  [FAIL] kube directory missing: {}", paths.root.display());
        println!();
        println!("Doctor summary: {} pass, {} warn, {} fail", ok, warn, fail + 1);
        bail!("kube directory missing: {}", paths.root.display());
    }
    println!("  [PASS] kube directory exists: {}", paths.root.display());
    ok += 1;

    match store_fs::mode_of(&paths.root) {
        Some(mode) if mode & 0o077 != 0 => {
            println!(
                "  [WARN] kube directory mode: {:04o} (expected {:04o})",
                mode,
                constants::KUBE_DIR_MODE
            );
            warn += 1;
        }
        Some(mode) => {
            println!("  [PASS] kube directory mode ok: {:04o}", mode);
            ok += 1;
        }
        None => {}
    }

    if paths.source_config.is_file() {
        println!("  [INFO] source config present: {}", paths.source_config.display());
    } else {
        println!("  [INFO] no source config at {}", paths.source_config.display());
    }

    let keys = ctx.store.keys()?;
    println!("  [INFO] {} stored config file(s)", keys.len());

    for stray in ctx.store.stray_entries()? {
        println!("  [WARN] file looks like a store entry but has a malformed name: {}", stray);
        warn += 1;
    }

    for key in &keys {
        let path = ctx.store.path_for(key);
        if let Some(mode) = store_fs::mode_of(&path) {
            if mode & 0o077 != 0 {
                println!(
                    "  [WARN] {} mode: {:04o} (expected {:04o})",
                    path.display(),
                    mode,
                    constants::CONFIG_FILE_MODE
                );
                warn += 1;
            }
        }
        if args.deep {
            match ctx.store.load(key) {
                Ok(_) => ok += 1,
                Err(e) => {
                    println!("  [FAIL] {}", e);
                    fail += 1;
                }
            }
        }
    }

    if paths.audit_log.exists() {
        let (total, errors) = audit_log::verify_chain(&paths.audit_log)?;
        if errors.is_empty() {
            println!("  [PASS] audit chain intact ({} entries)", total);
            ok += 1;
        } else {
            println!("  [FAIL] audit chain: {} error(s), run `kcc audit verify`", errors.len());
            fail += 1;
        }
    }

    println!();
    println!("Doctor summary: {} pass, {} warn, {} fail", ok, warn, fail);
    if fail > 0 {
        bail!("doctor found {} failing check(s)", fail);
    }
    Ok(())
}
