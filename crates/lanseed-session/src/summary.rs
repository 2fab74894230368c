//! Status lines shown by the tray.

use std::collections::HashMap;

use lanseed_torrent_core::{SessionStatusSnapshot, TorrentId, TorrentRecord};

use crate::views::TorrentViews;

/// Counts and status lines summarising the session for the tray.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Visible active downloads.
    pub downloading: usize,
    /// Tracked downloads that completed.
    pub finished: usize,
    /// Visible active uploads.
    pub uploading: usize,
    /// Payload download rate in bytes per second.
    pub download_rate: u64,
    /// Payload upload rate in bytes per second.
    pub upload_rate: u64,
}

impl SessionSummary {
    /// Summarise the current view state.
    #[must_use]
    pub fn compute(
        views: &TorrentViews,
        records: &HashMap<TorrentId, TorrentRecord>,
        status: &SessionStatusSnapshot,
    ) -> Self {
        let finished = views
            .downloads()
            .kept()
            .filter_map(|id| records.get(id))
            .filter(|record| record.status().state().is_complete())
            .count();
        Self {
            downloading: views.downloads().len(),
            finished,
            uploading: views.uploads().len(),
            download_rate: status.payload_download_rate(),
            upload_rate: status.payload_upload_rate(),
        }
    }

    /// Tray lines, top to bottom.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        if self.downloading == 0 {
            let uploads = match self.uploading {
                0 => "No upload running.".to_string(),
                1 => format!("1 upload with {}.", format_speed(self.upload_rate)),
                count => format!("{count} uploads with {}.", format_speed(self.upload_rate)),
            };
            return vec!["No download queued.".to_string(), uploads];
        }

        let total = self.downloading + self.finished;
        let noun = if total == 1 { "download" } else { "downloads" };
        vec![
            format!("{} of {total} {noun} finished.", self.finished),
            format!(
                "DL: {}, UL: {}",
                format_speed(self.download_rate),
                format_speed(self.upload_rate)
            ),
        ]
    }
}

/// Render a transfer rate with a binary unit.
///
/// Rates below 900 B/s are shown in bytes; each larger unit takes over at 900
/// of the previous one. Two decimals are shown below 10, one below 100.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_speed(bytes_per_second: u64) -> String {
    const KIB: u64 = 1_024;
    const MIB: u64 = KIB * 1_024;
    const GIB: u64 = MIB * 1_024;

    if bytes_per_second < 900 {
        return format!("{bytes_per_second:>4} B/s");
    }
    let (divisor, unit) = if bytes_per_second < KIB * 900 {
        (KIB, "KiB/s")
    } else if bytes_per_second < MIB * 900 {
        (MIB, "MiB/s")
    } else {
        (GIB, "GiB/s")
    };
    let rate = bytes_per_second as f64 / divisor as f64;
    if rate < 10.0 {
        format!("{rate:>4.2} {unit}")
    } else if rate < 100.0 {
        format!("{rate:>4.1} {unit}")
    } else {
        format!("{rate:>4.0} {unit}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_units_switch_at_900() {
        assert_eq!(format_speed(0), "   0 B/s");
        assert_eq!(format_speed(899), " 899 B/s");
        assert_eq!(format_speed(900), "0.88 KiB/s");
        assert_eq!(format_speed(20 * 1_024), "20.0 KiB/s");
        assert_eq!(format_speed(500 * 1_024), " 500 KiB/s");
        assert_eq!(format_speed(3 * 1_024 * 1_024), "3.00 MiB/s");
        assert_eq!(format_speed(950 * 1_024 * 1_024), "0.93 GiB/s");
    }

    #[test]
    fn idle_session_lines() {
        let summary = SessionSummary {
            downloading: 0,
            finished: 0,
            uploading: 0,
            download_rate: 0,
            upload_rate: 0,
        };
        assert_eq!(
            summary.lines(),
            vec!["No download queued.", "No upload running."]
        );

        let seeding = SessionSummary {
            uploading: 2,
            upload_rate: 2_048,
            ..summary
        };
        assert_eq!(seeding.lines()[1], "2 uploads with 2.00 KiB/s.");
    }

    #[test]
    fn downloading_session_lines() {
        let summary = SessionSummary {
            downloading: 2,
            finished: 1,
            uploading: 0,
            download_rate: 100,
            upload_rate: 1_024 * 1_024,
        };
        assert_eq!(
            summary.lines(),
            vec![
                "1 of 3 downloads finished.",
                "DL:  100 B/s, UL: 1.00 MiB/s"
            ]
        );
    }
}
