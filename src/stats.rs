//! Backup statistics.

use std::fmt;

/// Counters collected by one backup run.
///
/// Built by the selector and finished once with the archive size; a fresh
/// value is produced for every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupStats {
    /// Source patterns processed.
    pub sources: u64,
    /// Source patterns skipped because they lie inside an ignored path.
    pub ignored_sources: u64,
    /// Files selected for the archive.
    pub files: u64,
    /// Files excluded by the ignore list.
    pub ignored_files: u64,
    /// Total size of the selected files.
    pub src_bytes: u64,
    /// Size of the written archive.
    pub dest_bytes: u64,
    pub warnings: u64,
    pub errors: u64,
}

impl BackupStats {
    /// Returns these statistics with the final archive size recorded.
    pub fn with_dest_bytes(self, dest_bytes: u64) -> Self {
        Self { dest_bytes, ..self }
    }

    /// Returns these statistics with one more error counted.
    pub fn with_error(self) -> Self {
        Self {
            errors: self.errors + 1,
            ..self
        }
    }
}

impl fmt::Display for BackupStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Sources", self.sources.to_string()),
            ("Ignored sources", self.ignored_sources.to_string()),
            ("Files", self.files.to_string()),
            ("Ignored files", self.ignored_files.to_string()),
            ("Source size", format_bytes(self.src_bytes)),
            ("Archive size", format_bytes(self.dest_bytes)),
            ("Warnings", self.warnings.to_string()),
        ];
        for (label, value) in rows {
            writeln!(f, "{:<17}{value}", format!("{label}:"))?;
        }
        write!(f, "{:<17}{}", "Errors:", self.errors)
    }
}

/// Formats a byte count with binary units, e.g. `1.5 KiB`.
pub fn format_bytes(num_bytes: u64) -> String {
    const UNITS: [&str; 8] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"];
    let mut value = num_bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{value:.1} {unit}B");
        }
        value /= 1024.0;
    }
    format!("{value:.1} YiB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.0 B");
        assert_eq!(format_bytes(10), "10.0 B");
        assert_eq!(format_bytes(1024), "1.0 KiB");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
        assert_eq!(format_bytes(u64::MAX), "16.0 EiB");
    }

    #[test]
    fn test_with_dest_bytes_keeps_counters() {
        let stats = BackupStats {
            sources: 2,
            files: 3,
            src_bytes: 30,
            ..Default::default()
        };
        let done = stats.with_dest_bytes(12).with_error();
        assert_eq!(done.files, 3);
        assert_eq!(done.src_bytes, 30);
        assert_eq!(done.dest_bytes, 12);
        assert_eq!(done.errors, 1);
        assert_eq!(stats.dest_bytes, 0);
    }

    #[test]
    fn test_summary_lists_counters() {
        let stats = BackupStats {
            files: 1,
            ignored_files: 1,
            src_bytes: 10,
            ..Default::default()
        };
        let summary = stats.to_string();
        assert!(summary.contains("Files:           1"));
        assert!(summary.contains("Ignored files:   1"));
        assert!(summary.contains("Source size:     10.0 B"));
    }
}
