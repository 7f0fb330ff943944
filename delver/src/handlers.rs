use anyhow::{Context, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use delver_core::persist::write_waf_report;
use delver_core::report::{render_json, render_report};
use delver_core::{
    ProbeOutcome, ScanEvent, ScanEventCallback, ScanOptions, ScanState, ScanTarget,
    ShutdownSignal, execute_scan, load_wordlist, sanitize_folder_name,
};
use delver_scanner::identity::parse_proxy_list;
use delver_scanner::paths::clamp_depth;
use delver_scanner::{
    Classification, IdentityRotator, Prober, SimilarityThresholds, WafDetection, WafProbe,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;

pub const DEFAULT_WORDLIST: &str = include_str!("../wordlists/default.txt");

/// Directory under the working directory that holds per-target results.
pub const OUTPUT_ROOT: &str = "output";

pub fn print_banner() {
    println!(
        "{}",
        r#"
     _      _
  __| | ___| |_   _____ _ __
 / _` |/ _ \ \ \ / / _ \ '__|
| (_| |  __/ |\ V /  __/ |
 \__,_|\___|_| \_/ \___|_|
"#
        .bright_cyan()
        .bold()
    );
    println!(
        "  {} {}\n",
        "web path discovery".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}

/// Install the fmt subscriber on stderr. Repeated calls are ignored.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    let _ = io::stdout().flush();
    let mut response = String::new();
    if io::stdin().read_line(&mut response).is_err() {
        return String::new();
    }
    response.trim().to_lowercase()
}

// Helper functions for the scan handler

/// Expand `~` in a user supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Explicit output directory, or `output/<sanitized-host>`.
pub fn resolve_output_dir(output: Option<&PathBuf>, target: &ScanTarget) -> PathBuf {
    match output {
        Some(dir) => dir.clone(),
        None => Path::new(OUTPUT_ROOT).join(sanitize_folder_name(target)),
    }
}

pub fn resolve_proxies(raw: Option<&String>) -> Vec<String> {
    raw.map(|list| parse_proxy_list(list)).unwrap_or_default()
}

/// Thresholds must be finite ratios in `[0, 1]`.
pub fn resolve_thresholds(length: f64, text: f64) -> Result<SimilarityThresholds, String> {
    for (name, value) in [("length", length), ("text", text)] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(format!(
                "The {} threshold must be between 0 and 1 (got {})",
                name, value
            ));
        }
    }
    Ok(SimilarityThresholds { length, text })
}

/// Turn `scan` arguments into scan options, loading the wordlist.
pub fn build_scan_options(args: &ArgMatches) -> Result<ScanOptions, String> {
    let raw_url = args
        .get_one::<String>("url")
        .ok_or_else(|| "A target URL must be provided with --url".to_string())?;
    let target = ScanTarget::parse(raw_url)?;

    let wordlist_arg = args
        .get_one::<String>("wordlist-file")
        .map(String::as_str)
        .unwrap_or("~/.config/delver/wordlists/default.txt");
    let wordlist_path = expand_path(wordlist_arg);
    let wordlist = load_wordlist(&wordlist_path).map_err(|e| {
        format!(
            "{}\nRun 'delver init' to install the default wordlist, or pass -w <PATH>.",
            e
        )
    })?;

    let output_dir = resolve_output_dir(args.get_one::<PathBuf>("output"), &target);

    let mut options = ScanOptions::new(target, wordlist, output_dir);
    if let Some(depth) = args.get_one::<usize>("depth") {
        options.max_depth = *depth;
    }
    if let Some(threads) = args.get_one::<usize>("threads") {
        options.threads = *threads;
    }
    if let Some(timeout) = args.get_one::<u64>("timeout") {
        options.timeout_secs = *timeout;
    }
    options.proxies = resolve_proxies(args.get_one::<String>("proxies"));

    let defaults = SimilarityThresholds::default();
    options.thresholds = resolve_thresholds(
        args.get_one::<f64>("length-threshold")
            .copied()
            .unwrap_or(defaults.length),
        args.get_one::<f64>("text-threshold")
            .copied()
            .unwrap_or(defaults.text),
    )?;

    Ok(options)
}

/// One colored line for a hit, `None` for everything that is not reported.
pub fn format_outcome(outcome: &ProbeOutcome) -> Option<String> {
    let status = outcome
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "---".to_string());
    match outcome.classification {
        Classification::Valid => Some(format!(
            "  {} {} {}",
            "✓".green().bold(),
            status.green(),
            outcome.url.bright_white()
        )),
        Classification::Protected => Some(format!(
            "  {} {} {} {}",
            "⚠".yellow().bold(),
            status.yellow(),
            outcome.url.bright_white(),
            format!("({})", outcome.note).dimmed()
        )),
        _ => None,
    }
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.cyan} depth {msg} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
    )
    .map(|style| style.progress_chars("=>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn progress_callback(pb: ProgressBar) -> ScanEventCallback {
    Arc::new(move |event: &ScanEvent| match event {
        ScanEvent::BaselineReady { established } => {
            if !established {
                pb.println(format!(
                    "{} Baseline unavailable, soft 404 detection disabled",
                    "⚠".yellow().bold()
                ));
            }
        }
        ScanEvent::DepthStarted { depth, candidates } => {
            pb.set_length(*candidates as u64);
            pb.set_position(0);
            pb.set_message(depth.to_string());
        }
        ScanEvent::Probed(outcome) => {
            pb.inc(1);
            if let Some(line) = format_outcome(outcome) {
                pb.println(line);
            }
        }
    })
}

async fn fingerprint_waf(options: &ScanOptions, quiet: bool) -> anyhow::Result<Vec<WafDetection>> {
    let identity = Arc::new(IdentityRotator::with_proxies(
        options.target.as_str(),
        options.proxies.clone(),
    ));
    let prober = Prober::with_timeout(identity, options.timeout_secs)?;

    if !quiet {
        println!("{} Fingerprinting WAF...", "→".blue());
    }
    let detections = WafProbe::new(&prober).detect(options.target.as_str()).await;

    let report_path = write_waf_report(&options.output_dir, &detections).with_context(|| {
        format!(
            "Failed to write WAF report to {}",
            options.output_dir.display()
        )
    })?;

    if !quiet {
        if detections.is_empty() {
            println!("  {} No WAF detected", "✓".green());
        } else {
            for detection in &detections {
                println!(
                    "  {} WAF detected: {}",
                    "⚠".yellow().bold(),
                    detection.name.bright_white()
                );
            }
        }
        println!(
            "  {} {}\n",
            "ℹ".blue(),
            report_path.display().to_string().dimmed()
        );
    }

    Ok(detections)
}

pub async fn handle_scan(args: &ArgMatches) -> anyhow::Result<()> {
    let quiet = args.get_flag("quiet");
    let skip_waf = args.get_flag("skip-waf");
    let json = args
        .get_one::<String>("format")
        .is_some_and(|f| f == "json");

    let mut options = build_scan_options(args).map_err(|e| anyhow!(e))?;

    if !quiet {
        println!("\n🔎 Scanning {}", options.target.as_str().bright_white());
        println!("Wordlist: {} entries", options.wordlist.len());
        println!("Max depth: {}", clamp_depth(options.max_depth));
        println!("Workers: {}", options.threads);
        if !options.proxies.is_empty() {
            println!("Proxies: {}", options.proxies.len());
        }
        println!("Output: {}\n", options.output_dir.display());
    }

    if !skip_waf {
        options.waf_detections = fingerprint_waf(&options, quiet || json).await?;
    }

    let shutdown = ShutdownSignal::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.trigger();
        }
    });

    let pb = if quiet || json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(progress_style());

    let report = execute_scan(options, shutdown, Some(progress_callback(pb.clone())))
        .await
        .context("Scan could not start")?;
    pb.finish_and_clear();

    if json {
        println!("{}", render_json(&report)?);
        return Ok(());
    }

    if report.state == ScanState::Aborted {
        println!("\n{} Scan interrupted by user", "⚠".yellow().bold());
    } else {
        println!("\n{} Scan complete!", "✓".green().bold());
    }
    print!("{}", render_report(&report));

    Ok(())
}

// Init handler

/// Outcome of installing the bundled wordlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed(PathBuf),
    AlreadyPresent(PathBuf),
}

/// Write the bundled wordlist to `<config_dir>/wordlists/default.txt`.
/// An existing file is only replaced when `overwrite` is set.
pub fn install_default_wordlist(config_dir: &Path, overwrite: bool) -> io::Result<InstallOutcome> {
    let wordlist_dir = config_dir.join("wordlists");
    let wordlist_path = wordlist_dir.join("default.txt");

    if wordlist_path.exists() && !overwrite {
        return Ok(InstallOutcome::AlreadyPresent(wordlist_path));
    }

    fs::create_dir_all(&wordlist_dir)?;
    fs::write(&wordlist_path, DEFAULT_WORDLIST)?;
    Ok(InstallOutcome::Installed(wordlist_path))
}

pub fn handle_init(args: &ArgMatches) -> anyhow::Result<()> {
    print_divider();
    println!("{}", "  DELVER INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let config_arg = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or("~/.config/delver/");
    let force = args.get_flag("force");
    let config_dir = expand_path(config_arg);
    let wordlist_path = config_dir.join("wordlists").join("default.txt");

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    let mut overwrite = force;
    if wordlist_path.exists() && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("A wordlist already exists:");
        println!(
            "  {} {}",
            "•".yellow(),
            wordlist_path.display().to_string().bright_white()
        );
        println!();

        let response = print_prompt("Do you want to overwrite it? [y/N]:");
        println!();

        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return Ok(());
        }
        overwrite = true;
    }

    println!("{} Installing default wordlist...", "→".blue());
    let outcome = install_default_wordlist(&config_dir, overwrite).with_context(|| {
        format!(
            "Failed to install wordlist into {}",
            config_dir.display()
        )
    })?;

    let path = match outcome {
        InstallOutcome::Installed(path) | InstallOutcome::AlreadyPresent(path) => path,
    };
    let line_count = DEFAULT_WORDLIST
        .lines()
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .count();

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Wordlist: {} ({} entries)",
        "✓".green().bold(),
        path.display().to_string().bright_white(),
        line_count.to_string().cyan()
    );
    println!();

    Ok(())
}
