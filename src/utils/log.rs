// src/utils/log.rs

//! Run-progress formatting on top of the `log` facade.
//!
//! Headers, numbered steps and summaries share one layout so a run reads
//! the same whether it is started once or by the scheduler.

const RULE_WIDTH: usize = 60;

/// Log a debug message
pub fn debug(message: &str) {
    log::debug!("{message}");
}

/// Log an info message
pub fn info(message: &str) {
    log::info!("{message}");
}

/// Log a warning message
pub fn warn(message: &str) {
    log::warn!("{message}");
}

/// Log an error message
pub fn error(message: &str) {
    log::error!("{message}");
}

/// Log a completion message
pub fn success(message: &str) {
    log::info!("[OK] {message}");
}

/// Log a boxed header line.
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    log::info!("{border}");
    log::info!("  {title}");
    log::info!("{border}");
}

/// Log a step in a process.
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("{}", format_step(step_num, total, message));
}

/// Log a separator line.
pub fn separator() {
    log::info!("{}", "─".repeat(RULE_WIDTH));
}

/// Log a sub-item (indented).
pub fn sub_item(message: &str) {
    log::info!("    {message}");
}

/// Log a summary section.
pub fn summary(title: &str, items: &[(&str, String)]) {
    for line in summary_lines(title, items) {
        log::info!("{line}");
    }
}

fn format_step(step_num: usize, total: usize, message: &str) -> String {
    format!("[STEP {step_num}/{total}] {message}")
}

fn summary_lines(title: &str, items: &[(&str, String)]) -> Vec<String> {
    std::iter::once(format!("[SUMMARY] {title}"))
        .chain(items.iter().map(|(key, value)| format!("    {key}: {value}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_step() {
        assert_eq!(format_step(2, 5, "Deduplicate"), "[STEP 2/5] Deduplicate");
    }

    #[test]
    fn test_summary_lines() {
        let lines = summary_lines(
            "Run complete",
            &[("Collected", "4".to_string()), ("Unique", "3".to_string())],
        );
        assert_eq!(
            lines,
            vec![
                "[SUMMARY] Run complete",
                "    Collected: 4",
                "    Unique: 3"
            ]
        );
    }
}
