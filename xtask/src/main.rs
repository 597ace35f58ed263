//! Custom cargo commands for the pulse crate.
//!
//! Usage:
//!   cargo xtask verify    - Run full verification suite
//!   cargo xtask test      - Run all tests
//!   cargo xtask check     - Quick check (check + test + clippy)
//!   cargo xtask bench     - Run benchmarks
//!   cargo xtask fuzz      - Run every fuzz target for a minute each

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::process::Command;

const FUZZ_TARGETS: &[&str] = &["snapshot_decoding", "score_calculation"];

fn main() -> Result<()> {
    let task = env::args().nth(1);
    match task.as_deref() {
        Some("verify") => verify()?,
        Some("test") => test()?,
        Some("check") => check()?,
        Some("bench") => bench()?,
        Some("fuzz") => fuzz(env::args().nth(2).as_deref())?,
        _ => print_help(),
    }
    Ok(())
}

fn print_help() {
    eprintln!(
        r#"
cargo xtask <COMMAND>

Commands:
  verify    Run full verification suite (markers + tests + clippy + features + constants)
  test      Run all Rust tests
  check     Quick check (cargo check + test + clippy)
  bench     Run benchmarks
  fuzz      Run fuzz targets (needs nightly and cargo-fuzz); optional seconds per target
"#
    );
}

/// Full verification suite
fn verify() -> Result<()> {
    println!("==========================================");
    println!("Pulse Verification Suite");
    println!("==========================================\n");

    println!("[1/5] Checking invariant markers...");
    check_invariant_markers()?;
    println!("✓ Invariant markers present\n");

    println!("[2/5] Running Rust tests...");
    run_cargo(&["test", "--quiet"])?;
    println!("✓ All Rust tests passed\n");

    println!("[3/5] Running clippy...");
    run_cargo(&["clippy", "--quiet", "--", "-D", "warnings"])?;
    println!("✓ Clippy passed\n");

    println!("[4/5] Building without default features...");
    run_cargo(&["test", "--quiet", "--no-default-features"])?;
    println!("✓ Sequential build passes\n");

    println!("[5/5] Verifying scoring constants against README...");
    verify_constants()?;
    println!("✓ Constants aligned\n");

    println!("==========================================");
    println!("✓ ALL VERIFICATION CHECKS PASSED");
    println!("==========================================");

    Ok(())
}

fn test() -> Result<()> {
    run_cargo(&["test"])
}

fn check() -> Result<()> {
    println!("Running quick checks...\n");

    println!("[1/3] cargo check...");
    run_cargo(&["check", "--all-targets"])?;

    println!("[2/3] cargo test...");
    run_cargo(&["test", "--quiet"])?;

    println!("[3/3] cargo clippy...");
    run_cargo(&["clippy", "--quiet", "--", "-D", "warnings"])?;

    println!("\n✓ Quick checks passed");
    Ok(())
}

fn bench() -> Result<()> {
    run_cargo(&["bench"])
}

/// Run each fuzz target for a bounded time.
fn fuzz(seconds: Option<&str>) -> Result<()> {
    let seconds: u64 = match seconds {
        Some(s) => s.parse().with_context(|| format!("invalid seconds: {}", s))?,
        None => 60,
    };
    let fuzz_dir = project_root()?.join("fuzz");
    for target in FUZZ_TARGETS {
        println!("fuzzing {} for {}s...", target, seconds);
        let status = Command::new("cargo")
            .args(["+nightly", "fuzz", "run", target, "--"])
            .arg(format!("-max_total_time={}", seconds))
            .current_dir(&fuzz_dir)
            .status()
            .context("Failed to run cargo fuzz (is cargo-fuzz installed?)")?;
        if !status.success() {
            bail!("fuzz target {} found a failure", target);
        }
    }
    Ok(())
}

// ============================================================================
// Helper functions
// ============================================================================

fn project_root() -> Result<PathBuf> {
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => env::current_dir().context("Failed to read current directory")?,
    };

    // xtask is in project_root/xtask, so go up one level
    let root = manifest_dir.parent().unwrap_or(&manifest_dir);
    Ok(root.to_path_buf())
}

fn run_cargo(args: &[&str]) -> Result<()> {
    let root = project_root()?;

    let status = Command::new("cargo")
        .args(args)
        .current_dir(&root)
        .status()
        .with_context(|| format!("Failed to run cargo {:?}", args))?;

    if !status.success() {
        bail!("cargo {:?} failed", args);
    }

    Ok(())
}

fn check_invariant_markers() -> Result<()> {
    let root = project_root()?;
    let src_dir = root.join("src");

    let output = Command::new("grep")
        .args(["-r", "INVARIANT:", "--include=*.rs"])
        .current_dir(&src_dir)
        .output()
        .context("Failed to run grep")?;

    let count = output.stdout.split(|&b| b == b'\n').filter(|l| !l.is_empty()).count();

    if count < 5 {
        bail!(
            "Expected at least 5 INVARIANT markers, found {}. Someone may have removed safety comments!",
            count
        );
    }

    Ok(())
}

/// The README documents the ranking constants; make sure the code still agrees.
fn verify_constants() -> Result<()> {
    let root = project_root()?;

    let core_rs = std::fs::read_to_string(root.join("src/scoring/core.rs"))
        .context("Failed to read src/scoring/core.rs")?;
    let readme = std::fs::read_to_string(root.join("README.md")).context("Failed to read README.md")?;

    for name in [
        "VOTES_WEIGHT",
        "VISITS_WEIGHT",
        "FEATURED_BONUS",
        "DECAY_OFFSET_DAYS",
        "DECAY_EXPONENT",
    ] {
        let code = extract_const(&core_rs, name)
            .with_context(|| format!("{} not found in scoring/core.rs", name))?;
        let doc = extract_readme_value(&readme, name)
            .with_context(|| format!("{} not documented in README.md", name))?;
        if (code - doc).abs() > f64::EPSILON {
            bail!("{}: code has {}, README has {}", name, code, doc);
        }
    }

    Ok(())
}

fn extract_const(content: &str, name: &str) -> Option<f64> {
    // Look for "pub const NAME: f64 = 1.5;"
    content
        .lines()
        .find(|line| line.contains(&format!("const {}:", name)))
        .and_then(|line| line.split('=').nth(1))
        .and_then(|rhs| rhs.trim().trim_end_matches(';').trim().parse().ok())
}

fn extract_readme_value(content: &str, name: &str) -> Option<f64> {
    // Look for "| `NAME` | 1.5 | ..."
    content
        .lines()
        .find(|line| line.contains(&format!("`{}`", name)))
        .and_then(|line| line.split('|').nth(2))
        .and_then(|cell| cell.trim().parse().ok())
}
