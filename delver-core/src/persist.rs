// Per-depth result files and the WAF report

use delver_scanner::WafDetection;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub const WAF_REPORT_FILE: &str = "waf_detected.txt";

pub fn depth_file_name(depth: usize) -> String {
    format!("depth_{}.txt", depth)
}

/// Appends hits to `depth_{N}.txt` files, opening each on first use.
///
/// All writes go through one lock so concurrent workers never interleave
/// partial lines. Handles are closed when the writer is dropped.
#[derive(Debug)]
pub struct DepthWriter {
    output_dir: PathBuf,
    files: Mutex<HashMap<usize, File>>,
}

impl DepthWriter {
    /// Create the output directory if needed.
    pub fn create(output_dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            files: Mutex::new(HashMap::new()),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn path_for(&self, depth: usize) -> PathBuf {
        self.output_dir.join(depth_file_name(depth))
    }

    /// Append `"{url}\tstatus={status}\t{note}\n"` to the file for `depth`.
    pub fn append(&self, depth: usize, url: &str, status: u16, note: &str) -> io::Result<()> {
        let line = format!("{}\tstatus={}\t{}\n", url, status, note);
        let mut files = self
            .files
            .lock()
            .map_err(|_| io::Error::other("depth file lock poisoned"))?;

        let file = match files.entry(depth) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = self.output_dir.join(depth_file_name(depth));
                debug!("Opening {}", path.display());
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                entry.insert(file)
            }
        };
        file.write_all(line.as_bytes())
    }

    /// Flush every open file.
    pub fn flush(&self) -> io::Result<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| io::Error::other("depth file lock poisoned"))?;
        for file in files.values_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Write `waf_detected.txt` into `output_dir`, replacing any previous report.
pub fn write_waf_report(output_dir: &Path, detections: &[WafDetection]) -> io::Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(WAF_REPORT_FILE);

    let mut content = String::new();
    if detections.is_empty() {
        content.push_str("No WAF Detected\n");
    } else {
        for detection in detections {
            match detection.notes {
                Some(ref notes) => {
                    content.push_str(&format!("WAF Detected: {} ({})\n", detection.name, notes))
                }
                None => content.push_str(&format!("WAF Detected: {}\n", detection.name)),
            }
        }
    }

    fs::write(&path, content)?;
    Ok(path)
}
