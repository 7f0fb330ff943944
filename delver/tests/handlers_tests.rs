use delver::handlers::*;
use delver::command_argument_builder;
use delver_core::wordlist::parse_wordlist;
use delver_core::{ProbeOutcome, ScanTarget};
use delver_scanner::Classification;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn scan_matches(extra: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["delver", "scan"];
    argv.extend_from_slice(extra);
    let matches = command_argument_builder()
        .try_get_matches_from(argv)
        .unwrap();
    matches.subcommand_matches("scan").unwrap().clone()
}

fn write_wordlist(dir: &Path, content: &str) -> String {
    let path = dir.join("words.txt");
    fs::write(&path, content).unwrap();
    path.display().to_string()
}

// ============================================================================
// Argument Parsing Tests
// ============================================================================

#[test]
fn test_scan_requires_url() {
    let result = command_argument_builder().try_get_matches_from(["delver", "scan"]);
    assert!(result.is_err());
}

#[test]
fn test_scan_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let wordlist = write_wordlist(temp_dir.path(), "admin\nlogin\n");

    let args = scan_matches(&["-u", "example.com", "-w", &wordlist]);
    let options = build_scan_options(&args).unwrap();

    assert_eq!(options.target.as_str(), "https://example.com");
    assert_eq!(options.wordlist, vec!["admin", "login"]);
    assert_eq!(options.max_depth, 1);
    assert_eq!(options.threads, 10);
    assert_eq!(options.timeout_secs, 10);
    assert_eq!(options.output_dir, PathBuf::from("output/example_com"));
    assert_eq!(options.thresholds.length, 0.98);
    assert_eq!(options.thresholds.text, 0.94);
}

#[test]
fn test_scan_explicit_options() {
    let temp_dir = TempDir::new().unwrap();
    let wordlist = write_wordlist(temp_dir.path(), "admin\n");
    let output = temp_dir.path().join("results");
    let output_arg = output.display().to_string();

    let args = scan_matches(&[
        "-u",
        "http://127.0.0.1:8080/",
        "-w",
        &wordlist,
        "-d",
        "3",
        "-t",
        "1",
        "--timeout",
        "5",
        "-o",
        &output_arg,
        "--proxies",
        "http://proxy-a:8080, ,http://proxy-b:8080",
        "--length-threshold",
        "0.9",
        "--text-threshold",
        "0.8",
    ]);
    let options = build_scan_options(&args).unwrap();

    assert_eq!(options.target.as_str(), "http://127.0.0.1:8080");
    assert_eq!(options.max_depth, 3);
    assert_eq!(options.threads, 1);
    assert_eq!(options.timeout_secs, 5);
    assert_eq!(options.output_dir, output);
    assert_eq!(
        options.proxies,
        vec!["http://proxy-a:8080", "http://proxy-b:8080"]
    );
    assert_eq!(options.thresholds.length, 0.9);
    assert_eq!(options.thresholds.text, 0.8);
}

#[test]
fn test_scan_rejects_non_http_target() {
    let temp_dir = TempDir::new().unwrap();
    let wordlist = write_wordlist(temp_dir.path(), "admin\n");

    let args = scan_matches(&["-u", "ftp://example.com", "-w", &wordlist]);
    assert!(build_scan_options(&args).is_err());
}

#[test]
fn test_scan_missing_wordlist_suggests_init() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.txt").display().to_string();

    let args = scan_matches(&["-u", "example.com", "-w", &missing]);
    let err = build_scan_options(&args).unwrap_err();
    assert!(err.contains("not found"));
    assert!(err.contains("delver init"));
}

#[test]
fn test_scan_rejects_out_of_range_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let wordlist = write_wordlist(temp_dir.path(), "admin\n");

    let args = scan_matches(&[
        "-u",
        "example.com",
        "-w",
        &wordlist,
        "--text-threshold",
        "1.5",
    ]);
    let err = build_scan_options(&args).unwrap_err();
    assert!(err.contains("text threshold"));
}

#[test]
fn test_format_must_be_known() {
    let result = command_argument_builder().try_get_matches_from([
        "delver", "scan", "-u", "example.com", "-f", "xml",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_global_flags_after_subcommand() {
    let matches = command_argument_builder()
        .try_get_matches_from(["delver", "scan", "-u", "example.com", "-q", "-v"])
        .unwrap();
    assert!(matches.get_flag("quiet"));
    assert!(matches.get_flag("verbose"));
}

// ============================================================================
// Helper Tests
// ============================================================================

#[test]
fn test_resolve_output_dir_default() {
    let target = ScanTarget::parse("https://www.example.com:8443/app").unwrap();
    assert_eq!(
        resolve_output_dir(None, &target),
        PathBuf::from("output/www_example_com_8443")
    );
}

#[test]
fn test_resolve_output_dir_explicit() {
    let target = ScanTarget::parse("example.com").unwrap();
    let explicit = PathBuf::from("/tmp/delver-results");
    assert_eq!(resolve_output_dir(Some(&explicit), &target), explicit);
}

#[test]
fn test_resolve_proxies_absent() {
    assert!(resolve_proxies(None).is_empty());
}

#[test]
fn test_resolve_thresholds_bounds() {
    assert!(resolve_thresholds(0.0, 1.0).is_ok());
    assert!(resolve_thresholds(-0.1, 0.9).is_err());
    assert!(resolve_thresholds(0.9, f64::NAN).is_err());
}

#[test]
fn test_expand_path_tilde() {
    let expanded = expand_path("~/wordlists/default.txt");
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.ends_with("wordlists/default.txt"));
}

#[test]
fn test_format_outcome_reports_hits_only() {
    let outcome = |classification, status| ProbeOutcome {
        depth: 1,
        url: "http://example.com/admin".to_string(),
        classification,
        status,
        note: "access controlled".to_string(),
    };

    let valid = format_outcome(&outcome(Classification::Valid, Some(200))).unwrap();
    assert!(valid.contains("http://example.com/admin"));
    assert!(valid.contains("200"));

    let protected = format_outcome(&outcome(Classification::Protected, Some(403))).unwrap();
    assert!(protected.contains("403"));
    assert!(protected.contains("access controlled"));

    assert!(format_outcome(&outcome(Classification::Soft404, Some(200))).is_none());
    assert!(format_outcome(&outcome(Classification::Redirect, Some(301))).is_none());
    assert!(format_outcome(&outcome(Classification::NotFound, Some(404))).is_none());
    assert!(format_outcome(&outcome(Classification::Error, None)).is_none());
}

// ============================================================================
// Init Tests
// ============================================================================

#[test]
fn test_bundled_wordlist_is_usable() {
    let words = parse_wordlist(DEFAULT_WORDLIST);
    assert!(words.len() > 50);
    assert!(words.contains(&"admin".to_string()));
    assert!(words.iter().all(|w| !w.starts_with('#')));
}

#[test]
fn test_install_default_wordlist() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("delver");

    let outcome = install_default_wordlist(&config_dir, false).unwrap();
    let expected = config_dir.join("wordlists").join("default.txt");

    assert_eq!(outcome, InstallOutcome::Installed(expected.clone()));
    assert_eq!(fs::read_to_string(&expected).unwrap(), DEFAULT_WORDLIST);
}

#[test]
fn test_install_keeps_existing_wordlist_without_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let wordlist_dir = temp_dir.path().join("wordlists");
    fs::create_dir_all(&wordlist_dir).unwrap();
    let path = wordlist_dir.join("default.txt");
    fs::write(&path, "custom\n").unwrap();

    let outcome = install_default_wordlist(temp_dir.path(), false).unwrap();
    assert_eq!(outcome, InstallOutcome::AlreadyPresent(path.clone()));
    assert_eq!(fs::read_to_string(&path).unwrap(), "custom\n");

    let outcome = install_default_wordlist(temp_dir.path(), true).unwrap();
    assert_eq!(outcome, InstallOutcome::Installed(path.clone()));
    assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_WORDLIST);
}
