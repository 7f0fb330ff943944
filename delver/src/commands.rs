use crate::CLAP_STYLING;
use clap::{arg, command};

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("delver")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("delver")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Enable debug logging on stderr")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Installs the bundled default wordlist on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location of the delver configuration directory")
                        .default_value("~/.config/delver/"),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite an existing wordlist without asking")
                        .required(false),
                ),
        )
        .subcommand(
            command!("scan")
                .about(
                    "Brute-force paths below a target up to a given depth, filtering soft 404 \
                pages against a baseline.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The target to scan (https:// is assumed when no scheme is given)"),
                )
                .arg(
                    arg!(-d --"depth" <DEPTH>)
                        .required(false)
                        .help("Maximum number of path segments to combine (1-4)")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1"),
                )
                .arg(
                    arg!(-w --"wordlist-file" <PATH>)
                        .required(false)
                        .help("Path to wordlist file")
                        .default_value("~/.config/delver/wordlists/default.txt"),
                )
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Directory for result files (default: output/<host>)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of concurrent probes. 1 scans strictly in order.")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"proxies" <LIST>)
                        .required(false)
                        .help("Comma-separated proxy URIs, rotated round-robin")
                        .env("DELVER_PROXIES"),
                )
                .arg(
                    arg!(--"skip-waf")
                        .required(false)
                        .help("Skip WAF fingerprinting before the scan")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"length-threshold" <RATIO>)
                        .required(false)
                        .help("Length similarity above which a page counts as a soft 404")
                        .value_parser(clap::value_parser!(f64))
                        .default_value("0.98"),
                )
                .arg(
                    arg!(--"text-threshold" <RATIO>)
                        .required(false)
                        .help("Text similarity above which a page counts as a soft 404")
                        .value_parser(clap::value_parser!(f64))
                        .default_value("0.94"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Summary format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
}
