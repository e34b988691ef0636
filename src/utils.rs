use std::time::Duration;

/// Screenshot file for the `sequence`-th visited page
pub fn screenshot_filename(sequence: usize) -> String {
    format!("{sequence}.png")
}

/// Human-readable elapsed time for log lines
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}
