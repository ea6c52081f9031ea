//! Console progress for `codeask ask`
//!
//! Prints each engine event as one styled line while the analysis runs.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use console::style;

use crate::engine::{EventKind, ProgressEvent, ProgressReporter};

/// Renders engine events to stderr so stdout carries only the answer.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    quiet: bool,
    events: AtomicUsize,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            events: AtomicUsize::new(0),
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.load(Ordering::Relaxed)
    }

    /// Plain-text line for one event, without styling.
    pub fn format_event(event: &ProgressEvent) -> String {
        if event.total > 0 {
            format!(
                "[{}/{}] {}: {}",
                event.iteration, event.total, event.step, event.message
            )
        } else {
            format!("{}: {}", event.step, event.message)
        }
    }
}

#[async_trait]
impl ProgressReporter for ConsoleReporter {
    async fn report(&self, event: ProgressEvent) {
        self.events.fetch_add(1, Ordering::Relaxed);
        if self.quiet {
            return;
        }

        let line = Self::format_event(&event);
        match event.kind {
            EventKind::Progress => eprintln!("{} {}", style("▶").cyan().bold(), style(line).bold()),
            EventKind::Step => eprintln!("  {} {}", style("·").dim(), line),
            EventKind::Result => eprintln!("{} {}", style("✓").green(), event.message),
            EventKind::Error => eprintln!("{} {}", style("✗").red(), line),
        }
    }
}
