//! Human-readable durations for catalog display.

/// Format milliseconds as `mm:ss`, or `hh:mm:ss` once the hour field is non-zero.
///
/// Sub-second precision is truncated.
pub fn human_time_interval(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;

    if hours == 0 {
        format!("{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}
