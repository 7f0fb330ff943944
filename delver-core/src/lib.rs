pub mod error;
pub mod persist;
pub mod report;
pub mod scan;
pub mod target;
pub mod wordlist;

pub use error::CoreError;
pub use scan::{
    Orchestrator, ProbeOutcome, ScanEvent, ScanEventCallback, ScanOptions, ScanReport, ScanState,
    ScanStats, ShutdownSignal, StatsSnapshot, execute_scan,
};
pub use target::{ScanTarget, sanitize_folder_name};
pub use wordlist::load_wordlist;
