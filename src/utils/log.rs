//! Logging utilities with colored output and a progress bar.
//!
//! Every line the pipeline prints goes through the `log!` macro so that
//! build logs share one layout: a colored `[module]` prefix followed by the
//! message. Single-line messages are truncated to the terminal width.
//!
//! # Example
//!
//! ```ignore
//! log!("latex"; "converting {}", slug);
//! log!("warn"; "skipping {}: main.tex not found", slug);
//!
//! let progress = Progress::new("posts", dirs.len());
//! progress.inc();
//! progress.finish();
//! ```

use colored::{ColoredString, Colorize};
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType, size},
};
use std::{
    io::{IsTerminal, Write, stdout},
    sync::{
        Mutex, OnceLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

/// Cached terminal width (fetched once on first use)
static TERMINAL_WIDTH: OnceLock<usize> = OnceLock::new();

/// Whether a progress bar currently occupies the last terminal line
static BAR_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Width used when stdout is not a terminal (CI logs, pipes).
const FALLBACK_WIDTH: usize = 120;

/// Length of brackets around module name: "[]"
const BRACKET_LEN: usize = 2;
/// Space after prefix: "[module] " <- this space
const SPACE_AFTER_PREFIX: usize = 1;
/// Bar wrapper: " []" (space + brackets around progress bar)
const BAR_WRAPPER_LEN: usize = 3;
/// Space before count: "...] 42/100" <- this space
const SPACE_BEFORE_COUNT: usize = 1;
const MIN_BAR_WIDTH: usize = 10;
const MAX_BAR_WIDTH: usize = 40;

/// Calculate total prefix length for a module name.
#[inline]
const fn calc_prefix_len(module_len: usize) -> usize {
    module_len + BRACKET_LEN + SPACE_AFTER_PREFIX
}

fn get_terminal_width() -> usize {
    *TERMINAL_WIDTH.get_or_init(|| {
        if stdout().is_terminal() {
            size().map(|(w, _)| w as usize).unwrap_or(FALLBACK_WIDTH)
        } else {
            FALLBACK_WIDTH
        }
    })
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::utils::log::log($module, &format!($($arg)*))
    }};
}

/// Log a message with a colored module prefix.
///
/// Long single-line messages are cut at the terminal width. Lines are
/// written under the stdout lock, so posts processed on different threads
/// never interleave within a line.
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module, &module.to_ascii_lowercase());
    let max_msg_len = get_terminal_width().saturating_sub(calc_prefix_len(module.len()));
    let message = fit_message(message, max_msg_len);

    let mut stdout = stdout().lock();
    let bar_active = BAR_ACTIVE.load(Ordering::SeqCst);
    if bar_active {
        execute!(stdout, cursor::MoveUp(1)).ok();
        execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
    } else if stdout.is_terminal() {
        execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    }
    writeln!(stdout, "{prefix} {message}").ok();
    if bar_active {
        // keep the line reserved for the bar; it is redrawn on the next tick
        writeln!(stdout).ok();
    }
    stdout.flush().ok();
}

// ============================================================================
// Progress Bar
// ============================================================================

/// A single progress bar drawn on the last terminal line.
///
/// Log lines printed while the bar is active are written above it. Nothing
/// is drawn when stdout is not a terminal or there is at most one item.
pub struct Progress {
    prefix: ColoredString,
    prefix_len: usize,
    total: usize,
    current: AtomicUsize,
    enabled: bool,
    lock: Mutex<()>,
}

impl Progress {
    pub fn new(module: &'static str, total: usize) -> Self {
        let enabled = total > 1 && stdout().is_terminal();
        if enabled {
            let mut stdout = stdout().lock();
            writeln!(stdout).ok();
            stdout.flush().ok();
            BAR_ACTIVE.store(true, Ordering::SeqCst);
        }

        Self {
            prefix: colorize_prefix(module, &module.to_ascii_lowercase()),
            prefix_len: calc_prefix_len(module.len()),
            total,
            current: AtomicUsize::new(0),
            enabled,
            lock: Mutex::new(()),
        }
    }

    /// Count one finished item.
    pub fn inc(&self) {
        let current = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        if self.enabled {
            self.display(current);
        }
    }

    fn display(&self, current: usize) {
        let _guard = self.lock.lock().ok();

        let count = format!("{current}/{}", self.total);
        let bar = render_bar(current, self.total, self.bar_width(count.len()));

        let mut stdout = stdout().lock();
        execute!(stdout, cursor::MoveUp(1)).ok();
        execute!(stdout, Clear(ClearType::CurrentLine)).ok();
        writeln!(stdout, "{} [{bar}] {count}", self.prefix).ok();
        stdout.flush().ok();
    }

    fn bar_width(&self, count_len: usize) -> usize {
        let overhead = self.prefix_len + BAR_WRAPPER_LEN + SPACE_BEFORE_COUNT + count_len;
        get_terminal_width()
            .saturating_sub(overhead)
            .clamp(MIN_BAR_WIDTH, MAX_BAR_WIDTH)
    }

    /// Clear the bar from the terminal.
    pub fn finish(&self) {
        if !self.enabled || !BAR_ACTIVE.swap(false, Ordering::SeqCst) {
            return;
        }
        let _guard = self.lock.lock().ok();
        let mut stdout = stdout().lock();
        execute!(stdout, cursor::MoveUp(1)).ok();
        execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
        stdout.flush().ok();
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Filled/empty cells for `current` of `total` in a bar of `width` cells.
fn render_bar(current: usize, total: usize, width: usize) -> String {
    let filled = if total > 0 {
        (current.min(total) * width) / total
    } else {
        0
    };
    "█".repeat(filled) + &"░".repeat(width - filled)
}

/// Apply color to a module prefix based on module type.
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module_lower {
        "error" => prefix.bright_red().bold(),
        "warn" => prefix.bright_magenta().bold(),
        "build" | "done" => prefix.bright_green().bold(),
        "tikz" | "pandoc" => prefix.bright_blue().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Multi-line messages carry tool diagnostics and are printed whole.
#[inline]
fn fit_message(message: &str, max_len: usize) -> &str {
    if message.contains('\n') {
        message
    } else {
        truncate_str(message, max_len)
    }
}

/// Truncate a string to fit within max_len bytes, on a char boundary.
#[inline]
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_prefix_len() {
        // "tikz" -> "[tikz] " = 4 + 2 + 1
        assert_eq!(calc_prefix_len(4), 7);
        assert_eq!(calc_prefix_len(0), 3);
    }

    #[test]
    fn test_truncate_str_fits() {
        assert_eq!(truncate_str("main.tex", 20), "main.tex");
        assert_eq!(truncate_str("main.tex", 8), "main.tex");
    }

    #[test]
    fn test_truncate_str_cuts() {
        assert_eq!(truncate_str("converting post", 10), "converting");
        assert_eq!(truncate_str("abc", 0), "");
    }

    #[test]
    fn test_fit_message_keeps_multiline() {
        let message = format!(
            "failed to compile lab-retreat-2026-results-fig-3: {}\n! Undefined control sequence.",
            "x".repeat(120)
        );
        assert_eq!(fit_message(&message, 113), message);
        assert_eq!(fit_message("converting post", 10), "converting");
    }

    #[cfg(unix)]
    #[test]
    fn test_fit_message_keeps_toolchain_error() {
        use crate::utils::command::{exec, to_cmd_vec, to_os};

        let script = "echo '! Undefined control sequence.'; echo '! Emergency stop.'; exit 1";
        let err = exec(None, &to_cmd_vec(["sh"]), &[to_os("-c"), to_os(script)]).unwrap_err();
        let message = format!("failed to compile lab-retreat-2026-results-fig-3: {err:#}");

        let shown = fit_message(&message, FALLBACK_WIDTH - calc_prefix_len("tikz".len()));
        assert!(shown.contains("! Undefined control sequence."));
        assert!(shown.ends_with("! Emergency stop."));
    }

    #[test]
    fn test_render_bar() {
        assert_eq!(render_bar(0, 4, 4), "░░░░");
        assert_eq!(render_bar(2, 4, 4), "██░░");
        assert_eq!(render_bar(4, 4, 4), "████");
        // overshoot and empty totals stay within the width
        assert_eq!(render_bar(9, 4, 4), "████");
        assert_eq!(render_bar(1, 0, 3), "░░░");
    }

    #[test]
    fn test_progress_counts_without_terminal() {
        let progress = Progress::new("posts", 1);
        assert!(!progress.enabled);
        progress.inc();
        progress.inc();
        assert_eq!(progress.current.load(Ordering::Relaxed), 2);
        progress.finish();
    }

    #[test]
    fn test_truncate_str_multibyte_boundary() {
        // "ö" is 2 bytes; cutting inside it backs off to the previous boundary
        assert_eq!(truncate_str("Gödel", 2), "G");
        assert_eq!(truncate_str("Gödel", 3), "Gö");
    }
}
