//! CLI output formatting.
//!
//! Every formatter returns lines instead of printing, so the text can be
//! tested directly and printed by whichever thread owns stdout. The `print_*`
//! wrappers are thin conveniences for the binary.
//!
//! # Output Format
//!
//! ## Run
//!
//! ```text
//! Found 2 images. Generating 4 variants...
//! Processed 1/4: beach.jpg (1200x600) (with custom crop) - 2.4 MB → 180.2 KB (92.7% smaller)
//! Error processing harbour.jpg (300x200): Failed to decode ...
//! ...
//! Done: 3 written, 1 failed
//! ```
//!
//! ## Sizes
//!
//! ```text
//! [x] Featured (1200x600)
//! [ ] Large (800x600)
//! ```

use crate::naming::display_name;
use crate::process::{BatchSummary, ProcessEvent};
use crate::session::Preview;
use crate::types::TargetSize;

const KB: u64 = 1024;
const MB: u64 = 1024 * 1024;

/// Human-readable byte count: `512 B`, `12.3 KB`, `4.56 MB`.
pub fn format_size(bytes: u64) -> String {
    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    }
}

/// Relative change from `before` to `after`, e.g. `"75.0% smaller"`.
pub fn format_reduction(before: u64, after: u64) -> Option<String> {
    if before == 0 {
        return None;
    }
    let change = (before as f64 - after as f64) / before as f64 * 100.0;
    Some(if change >= 0.0 {
        format!("{:.1}% smaller", change)
    } else {
        format!("{:.1}% larger", -change)
    })
}

fn size_tag(size: &TargetSize) -> String {
    format!("({}x{})", size.width, size.height)
}

/// Format a single batch event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Queued { sources, total } => {
            vec![format!(
                "Found {} image{}. Generating {} variant{}...",
                sources,
                if *sources == 1 { "" } else { "s" },
                total,
                if *total == 1 { "" } else { "s" },
            )]
        }
        ProcessEvent::ItemProcessed {
            completed,
            total,
            source,
            size,
            original_bytes,
            output_bytes,
            focus_applied,
            overlays,
            ..
        } => {
            let mut line = format!(
                "Processed {}/{}: {} {}",
                completed,
                total,
                display_name(source),
                size_tag(size)
            );
            if *focus_applied {
                line.push_str(" (with custom crop)");
            }
            if *overlays {
                line.push_str(" (with overlays)");
            }
            line.push_str(&format!(
                " - {} \u{2192} {}",
                format_size(*original_bytes),
                format_size(*output_bytes)
            ));
            if let Some(reduction) = format_reduction(*original_bytes, *output_bytes) {
                line.push_str(&format!(" ({})", reduction));
            }
            vec![line]
        }
        ProcessEvent::ItemFailed {
            source, size, error, ..
        } => {
            vec![format!(
                "Error processing {} {}: {}",
                display_name(source),
                size_tag(size),
                error
            )]
        }
        // Progress is implied by the per-item counters.
        ProcessEvent::Progress { .. } => Vec::new(),
        ProcessEvent::Stopped { reason } => vec![format!("Stopped: {}", reason)],
        ProcessEvent::Completed { summary } => format_summary(summary),
    }
}

/// Closing lines for a finished run.
pub fn format_summary(summary: &BatchSummary) -> Vec<String> {
    let mut lines = Vec::new();
    if summary.cancelled {
        lines.push(format!(
            "Cancelled after {}/{} variants",
            summary.completed, summary.total
        ));
    }
    if summary.all_succeeded() {
        lines.push("All images processed successfully!".to_string());
    } else {
        lines.push(format!(
            "Done: {} written, {} failed",
            summary.succeeded, summary.failed
        ));
    }
    let (before, after) = summary.byte_totals();
    if summary.succeeded > 0 {
        let mut total = format!(
            "    Total: {} \u{2192} {}",
            format_size(before),
            format_size(after)
        );
        if let Some(reduction) = format_reduction(before, after) {
            total.push_str(&format!(" ({})", reduction));
        }
        lines.push(total);
    }
    lines
}

/// Catalog listing with selection marks.
pub fn format_sizes(catalog: &[TargetSize], selected: &[String]) -> Vec<String> {
    catalog
        .iter()
        .map(|size| {
            let mark = if selected.iter().any(|l| l == &size.label) { "x" } else { " " };
            format!("[{}] {}", mark, size)
        })
        .collect()
}

/// Summary of a rendered preview.
pub fn format_preview(preview: &Preview, written_to: &std::path::Path) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Preview: {} at {}",
            display_name(&preview.source),
            preview.size
        ),
        format!(
            "    Original: {}x{}, {}",
            preview.original.width(),
            preview.original.height(),
            format_size(preview.original_bytes)
        ),
    ];
    match preview.estimated_bytes {
        Some(bytes) => lines.push(format!("    Estimated output: {}", format_size(bytes))),
        None => lines.push("    Estimated output: unknown".to_string()),
    }
    lines.push(format!("    Written: {}", written_to.display()));
    lines
}

pub fn print_sizes(catalog: &[TargetSize], selected: &[String]) {
    for line in format_sizes(catalog, selected) {
        println!("{}", line);
    }
}

pub fn print_preview(preview: &Preview, written_to: &std::path::Path) {
    for line in format_preview(preview, written_to) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ItemOutcome, ItemResult};
    use std::path::PathBuf;

    fn size(label: &str, w: u32, h: u32) -> TargetSize {
        TargetSize::new(label, w, h).unwrap()
    }

    // =========================================================================
    // Size formatting
    // =========================================================================

    #[test]
    fn size_bytes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn size_kilobytes() {
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
    }

    #[test]
    fn size_megabytes() {
        assert_eq!(format_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.50 MB");
    }

    #[test]
    fn reduction_direction() {
        assert_eq!(format_reduction(1000, 250).as_deref(), Some("75.0% smaller"));
        assert_eq!(format_reduction(1000, 1500).as_deref(), Some("50.0% larger"));
        assert_eq!(format_reduction(0, 10), None);
    }

    // =========================================================================
    // Process event formatting
    // =========================================================================

    #[test]
    fn queued_line() {
        let lines = format_process_event(&ProcessEvent::Queued { sources: 2, total: 4 });
        assert_eq!(lines, vec!["Found 2 images. Generating 4 variants..."]);
    }

    #[test]
    fn queued_line_singular() {
        let lines = format_process_event(&ProcessEvent::Queued { sources: 1, total: 1 });
        assert_eq!(lines, vec!["Found 1 image. Generating 1 variant..."]);
    }

    #[test]
    fn processed_line_with_flags() {
        let event = ProcessEvent::ItemProcessed {
            completed: 1,
            total: 4,
            source: PathBuf::from("/photos/beach.jpg"),
            size: size("Featured", 1200, 600),
            output: PathBuf::from("/out/1200x600/beach.jpg"),
            original_bytes: 2048,
            output_bytes: 512,
            focus_applied: true,
            overlays: true,
        };
        assert_eq!(
            format_process_event(&event),
            vec![
                "Processed 1/4: beach.jpg (1200x600) (with custom crop) (with overlays) - 2.0 KB \u{2192} 512 B (75.0% smaller)"
            ]
        );
    }

    #[test]
    fn processed_line_without_flags() {
        let event = ProcessEvent::ItemProcessed {
            completed: 2,
            total: 2,
            source: PathBuf::from("a.png"),
            size: size("Thumbnail", 300, 200),
            output: PathBuf::from("out/300x200/a.jpg"),
            original_bytes: 100,
            output_bytes: 100,
            focus_applied: false,
            overlays: false,
        };
        assert_eq!(
            format_process_event(&event),
            vec!["Processed 2/2: a.png (300x200) - 100 B \u{2192} 100 B (0.0% smaller)"]
        );
    }

    #[test]
    fn failed_line_names_file() {
        let event = ProcessEvent::ItemFailed {
            completed: 3,
            total: 4,
            source: PathBuf::from("/photos/harbour.jpg"),
            size: size("Thumbnail", 300, 200),
            error: "bad data".to_string(),
        };
        assert_eq!(
            format_process_event(&event),
            vec!["Error processing harbour.jpg (300x200): bad data"]
        );
    }

    #[test]
    fn progress_is_silent() {
        assert!(format_process_event(&ProcessEvent::Progress { percent: 50 }).is_empty());
    }

    #[test]
    fn stopped_line() {
        let lines = format_process_event(&ProcessEvent::Stopped {
            reason: "No output sizes selected".to_string(),
        });
        assert_eq!(lines, vec!["Stopped: No output sizes selected"]);
    }

    // =========================================================================
    // Summary formatting
    // =========================================================================

    fn written(before: u64, after: u64) -> ItemResult {
        ItemResult {
            source: "a.jpg".into(),
            size: size("T", 10, 10),
            outcome: ItemOutcome::Written {
                path: "out/10x10/a.jpg".into(),
                original_bytes: before,
                output_bytes: after,
                focus_applied: false,
            },
        }
    }

    #[test]
    fn summary_all_succeeded() {
        let summary = BatchSummary {
            total: 1,
            completed: 1,
            succeeded: 1,
            failed: 0,
            cancelled: false,
            results: vec![written(4096, 1024)],
        };
        assert_eq!(
            format_summary(&summary),
            vec![
                "All images processed successfully!",
                "    Total: 4.0 KB \u{2192} 1.0 KB (75.0% smaller)"
            ]
        );
    }

    #[test]
    fn summary_with_failures_and_cancel() {
        let summary = BatchSummary {
            total: 4,
            completed: 2,
            succeeded: 1,
            failed: 1,
            cancelled: true,
            results: vec![written(100, 50)],
        };
        let lines = format_summary(&summary);
        assert_eq!(lines[0], "Cancelled after 2/4 variants");
        assert_eq!(lines[1], "Done: 1 written, 1 failed");
    }

    #[test]
    fn summary_nothing_written_has_no_totals() {
        let summary = BatchSummary {
            total: 1,
            completed: 1,
            succeeded: 0,
            failed: 1,
            cancelled: false,
            results: vec![],
        };
        assert_eq!(format_summary(&summary), vec!["Done: 0 written, 1 failed"]);
    }

    #[test]
    fn sizes_listing_marks_selection() {
        let catalog = vec![size("Featured", 1200, 600), size("Large", 800, 600)];
        assert_eq!(
            format_sizes(&catalog, &["Large".to_string()]),
            vec!["[ ] Featured (1200x600)", "[x] Large (800x600)"]
        );
    }
}
