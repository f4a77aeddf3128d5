//! Terminal output utilities
//!
//! Status lines go to stdout, problems to stderr.

use coastwalk_core::error::Error;
use owo_colors::OwoColorize;
use std::time::Duration;

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a step message (for multi-step operations)
    pub fn step(step: usize, total: usize, message: &str) {
        println!("{} {}", format!("[{}/{}]", step, total).dimmed(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }

    /// Print a structured error with its code, context and suggestion
    pub fn report(error: &Error) {
        eprintln!("{}", render_report(error));
    }
}

/// Plain-text rendering used by [`Status::report`]
pub fn render_report(error: &Error) -> String {
    let report = error.to_report();
    let mut out = format!("{} [{}] {}", "✗".red(), report.code_str, report.message);
    if let Some(context) = &report.context {
        out.push_str(&format!("\n  {} {}", "context:".dimmed(), context));
    }
    if let Some(source) = &report.source {
        out.push_str(&format!("\n  {} {}", "caused by:".dimmed(), source));
    }
    if let Some(suggestion) = &report.suggestion {
        out.push_str(&format!("\n  {} {}", "hint:".cyan(), suggestion));
    }
    out
}

/// Format a duration for display
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f32();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs % 60.0;
        format!("{}m {:.0}s", mins, remaining_secs)
    }
}

/// Format a coastline distance: metres under 1 km, otherwise km
pub fn format_distance_km(km: f64) -> String {
    if !km.is_finite() {
        "no coastline".to_string()
    } else if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else if km < 100.0 {
        format!("{:.2} km", km)
    } else {
        format!("{:.0} km", km)
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs_f32(5.5)), "5.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance_km(0.25), "250 m");
        assert_eq!(format_distance_km(5.559), "5.56 km");
        assert_eq!(format_distance_km(402.6), "403 km");
        assert_eq!(format_distance_km(f64::INFINITY), "no coastline");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(1, "region", "regions"), "1 region");
        assert_eq!(format_count(38, "region", "regions"), "38 regions");
    }

    #[test]
    fn test_render_report() {
        let error = Error::no_region_data("JP-13").with_context("resolving 関東");
        let text = render_report(&error);
        assert!(text.contains("E5002"));
        assert!(text.contains("No processed geometry for JP-13"));
        assert!(text.contains("resolving 関東"));
        assert!(text.contains("coastwalk process"));
    }
}
