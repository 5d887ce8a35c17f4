//! Progress indicators for long-running loads.

use indicatif::{ProgressBar, ProgressStyle};

/// Create a spinner that counts records as a lazy reader drains.
pub fn records_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}: {human_pos} records ({per_sec})")
            .expect("Invalid progress bar template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
