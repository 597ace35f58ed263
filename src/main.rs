// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pulse::index::persist::{read_snapshot, SnapshotHeader};
use pulse::{
    AnalysisId, JsonListingSource, JsonlCrawlSource, ListingSource, PulseConfig, RebuildReport,
    RefreshPolicy, Refresher, SiteIndex,
};

mod cli;
use cli::display::*;
use cli::{Cli, Commands};

fn main() {
    init_tracing();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays clean for results. `RUST_LOG` overrides.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = PulseConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = cli.crawl_dir {
        config.crawl_dir = dir;
    }
    if let Some(dir) = cli.index_dir {
        config.index_dir = dir;
    }

    match cli.command {
        Commands::Rebuild { quiet } => cmd_rebuild(&config, quiet),
        Commands::Lookup { id } => cmd_lookup(&config, id),
        Commands::Search { query, limit, json } => {
            cmd_search(&config, &query, limit.unwrap_or(config.search.default_limit), json)
        }
        Commands::Rank { file, viewer, json } => cmd_rank(&file, viewer.as_deref(), json),
        Commands::Inspect { file } => cmd_inspect(&file),
        Commands::Watch { rounds } => cmd_watch(&config, rounds),
    }
}

fn open_index(config: &PulseConfig) -> Result<SiteIndex> {
    SiteIndex::open(
        &config.index_dir,
        config.keep_snapshots,
        config.rebuild_options(),
    )
    .with_context(|| format!("opening index at {}", config.index_dir.display()))
}

fn cmd_rebuild(config: &PulseConfig, quiet: bool) -> Result<()> {
    let index = open_index(config)?;
    let source = JsonlCrawlSource::new(&config.crawl_dir);

    #[cfg(feature = "parallel")]
    let report = if quiet {
        index.rebuild(&source)?
    } else {
        let progress = indicatif::ProgressBar::new(0);
        progress.set_style(
            indicatif::ProgressStyle::with_template("{bar:40} {pos}/{len} sites ({elapsed})")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
        );
        let report = index.rebuild_with_progress(&source, &progress);
        progress.finish_and_clear();
        report?
    };

    #[cfg(not(feature = "parallel"))]
    let report = {
        let _ = quiet;
        index.rebuild(&source)?
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &RebuildReport) {
    section_top("REBUILD");
    field(
        "generation",
        &paint(Tone::Accent, &[BOLD], &report.generation.to_string()),
    );
    field("records", &report.records.to_string());
    field("meta tags", &report.stats.tags.to_string());
    field("tagless sites", &report.stats.tagless_sites.to_string());
    field("orphan tags", &report.stats.orphan_tags.to_string());
    field("elapsed", &format!("{:.2?}", report.elapsed));
    field(
        "snapshot",
        &report
            .persisted
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "not written".to_string()),
    );
    section_bot();
}

fn cmd_lookup(config: &PulseConfig, id: i64) -> Result<()> {
    let index = open_index(config)?;
    let record = index.get(AnalysisId(id))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn cmd_search(config: &PulseConfig, query: &str, limit: usize, json: bool) -> Result<()> {
    let index = open_index(config)?;
    if index.generation() == 0 {
        bail!(
            "no index snapshot in {}; run `pulse rebuild` first",
            config.index_dir.display()
        );
    }
    let hits = index.search(query, limit);

    if json {
        for hit in &hits {
            println!("{}", serde_json::to_string(hit)?);
        }
        return Ok(());
    }

    section_top(&format!("SEARCH \"{}\"", query));
    for hit in &hits {
        let title = hit.title.as_deref().unwrap_or("(untitled)");
        row(&format!(
            " {} {}",
            paint(Tone::Muted, &[], &format!("{:>8}", hit.id)),
            pad_right(title, 40)
        ));
        row(&format!("          {}", paint(Tone::Info, &[DIM], &hit.url)));
    }
    field("results", &hits.len().to_string());
    field("generation", &index.generation().to_string());
    section_bot();
    Ok(())
}

fn cmd_rank(file: &Path, viewer: Option<&str>, json: bool) -> Result<()> {
    let snapshot = JsonListingSource::new(file)
        .snapshot()
        .with_context(|| format!("reading listings from {}", file.display()))?;
    let ranked = snapshot.rank(viewer)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    section_top("RANKING");
    for (position, entry) in ranked.iter().enumerate() {
        let name = if entry.listing.name.is_empty() {
            entry.listing.url.as_str()
        } else {
            entry.listing.name.as_str()
        };
        let featured = if entry.listing.is_featured {
            paint(Tone::Warn, &[BOLD], "★")
        } else {
            " ".to_string()
        };
        row(&format!(
            " {:>3}. {} {} {} {}",
            position + 1,
            score_value(entry.score),
            featured,
            vote_marker(entry.user_vote),
            pad_right(name, 40)
        ));
    }
    field("ranked", &ranked.len().to_string());
    field(
        "excluded",
        &(snapshot.listings.len() - ranked.len()).to_string(),
    );
    section_bot();
    Ok(())
}

fn cmd_inspect(file: &Path) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let header = SnapshotHeader::read(&bytes).context("reading snapshot header")?;

    section_top("SNAPSHOT");
    field("file", &file.display().to_string());
    field("size", &format_size(bytes.len()));
    field("format version", &header.version.to_string());
    field("generation", &header.generation.to_string());
    field("records", &header.record_count.to_string());
    field("payload", &format_size(header.payload_len as usize));

    match read_snapshot(file) {
        Ok(generation) => {
            field("checksum", &paint(Tone::Good, &[BOLD], "ok"));
            if let Some(built_at) = generation.built_at() {
                field("built at", &built_at.to_rfc3339());
            }
            field("source version", &generation.source_version().to_string());
            let tagged = generation.scan(|r| r.meta_content.is_some()).len();
            field("with meta tags", &tagged.to_string());
            section_bot();
            Ok(())
        }
        Err(e) => {
            field("checksum", &paint(Tone::Bad, &[BOLD], "FAILED"));
            section_bot();
            Err(e.into())
        }
    }
}

fn cmd_watch(config: &PulseConfig, rounds: u64) -> Result<()> {
    let interval = match config.refresh_policy() {
        RefreshPolicy::Periodic { interval } => interval,
        RefreshPolicy::OnWrite => bail!(
            "refresh.policy is on_write; `watch` needs the periodic policy (writers rebuild in-process)"
        ),
    };

    let index = Arc::new(open_index(config)?);
    let source = Arc::new(JsonlCrawlSource::new(&config.crawl_dir));
    let retry = config.retry_policy();
    tracing::info!(
        policy = config.refresh_policy().name(),
        staleness_bound_secs = config
            .refresh_policy()
            .staleness_bound(Duration::ZERO, &retry)
            .as_secs(),
        "watching crawl directory"
    );

    let refresher = Refresher::spawn(Arc::clone(&index), source, interval, retry)?;
    while rounds == 0 || refresher.rounds() < rounds {
        std::thread::sleep(Duration::from_millis(200));
    }
    let failures = refresher.failures();
    refresher.shutdown()?;
    println!(
        "{} rounds, {} failed, generation {}",
        rounds,
        failures,
        index.generation()
    );
    Ok(())
}
