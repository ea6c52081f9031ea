pub mod commands;
pub mod progress;
pub mod ui;

pub use progress::ConsoleReporter;
pub use ui::Output;
