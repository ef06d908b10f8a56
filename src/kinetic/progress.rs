use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Counts finished global-axis evaluations and prints a progress line to stdout.
pub struct ProgressTracker {
    counter: AtomicUsize,
    total: usize,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            counter: AtomicUsize::new(0),
            total,
            start_time: Instant::now(),
        }
    }

    pub fn inc(&self) {
        let current = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        if self.total == 0 {
            return;
        }

        // every 5% or every 1000 evaluations
        if current % 1000 == 0 || (current * 20) % self.total == 0 {
            let percent = (current * 100) / self.total;
            let elapsed = self.start_time.elapsed().as_secs_f64();
            let remaining = elapsed * (self.total as f64) / (current as f64) - elapsed;

            print!(
                "\rKinetic matrices: {}/{} ({}%) ETA: {}",
                current,
                self.total,
                percent,
                format_duration(remaining.max(0.0))
            );
            let _ = std::io::stdout().flush();
        }
    }

    pub fn count(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        println!();
        tracing::debug!(
            evaluations = self.count(),
            seconds = self.start_time.elapsed().as_secs_f64(),
            "kinetic matrices complete"
        );
    }
}

fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
