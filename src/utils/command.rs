//! External command execution.
//!
//! The pipeline shells out to three toolchains (`latex`, `dvisvgm`, `pandoc`).
//! All of them are run through the `exec!` macro, which captures output,
//! filters known noise, and turns a non-zero exit into an error carrying the
//! first meaningful stderr lines.

use crate::log;
use anyhow::{Context, Result, bail};
use std::{
    ffi::OsString,
    path::Path,
    process::{Command, Output, Stdio},
};

// ============================================================================
// Macros
// ============================================================================

/// Run an external tool in a working directory.
///
/// Arguments may be anything convertible into an `OsString` (`&str`,
/// `String`, `&Path`); empty arguments are dropped.
///
/// ```ignore
/// exec!(post_dir; &config.build.pandoc.command; source, "-o", output)?;
/// ```
#[macro_export]
macro_rules! exec {
    ($dir:expr; $cmd:expr; $($arg:expr),* $(,)?) => {{
        $crate::utils::command::exec(
            Some($dir),
            &$crate::utils::command::to_cmd_vec($cmd),
            &$crate::utils::command::filter_args(&[$($crate::utils::command::to_os($arg)),*]),
        )
    }};
}

// ============================================================================
// Argument Conversion
// ============================================================================

/// Convert to OsString.
#[inline]
pub fn to_os<S: Into<OsString>>(s: S) -> OsString {
    s.into()
}

/// Trait for converting to command vector.
pub trait ToCmd {
    fn to_cmd(self) -> Vec<OsString>;
}

impl<const N: usize> ToCmd for [&str; N] {
    #[inline]
    fn to_cmd(self) -> Vec<OsString> {
        self.into_iter().map(OsString::from).collect()
    }
}

impl ToCmd for &Vec<String> {
    #[inline]
    fn to_cmd(self) -> Vec<OsString> {
        self.iter().map(OsString::from).collect()
    }
}

/// Convert command to Vec<OsString>.
#[inline]
pub fn to_cmd_vec<C: ToCmd>(cmd: C) -> Vec<OsString> {
    cmd.to_cmd()
}

/// Filter out empty args.
#[inline]
pub fn filter_args(args: &[OsString]) -> Vec<OsString> {
    args.iter().filter(|a| !a.is_empty()).cloned().collect()
}

// ============================================================================
// Command Execution
// ============================================================================

/// Execute a command to completion and capture its output.
///
/// stdin is closed so an interactive prompt (e.g. latex asking for a missing
/// file) ends the run instead of blocking the build.
///
/// # Errors
/// Returns error if the command cannot be spawned or exits non-zero.
pub fn exec(root: Option<&Path>, cmd: &[OsString], args: &[OsString]) -> Result<Output> {
    let (name, mut command) = prepare(root, cmd, args)?;

    let output = command
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to execute `{name}`"))?;

    check_output(&name, &output)?;
    Ok(output)
}

/// Prepare a Command from components.
fn prepare(root: Option<&Path>, cmd: &[OsString], args: &[OsString]) -> Result<(String, Command)> {
    let name = cmd
        .first()
        .and_then(|s| s.to_str())
        .context("Empty command")?
        .to_owned();

    let mut command = Command::new(&cmd[0]);
    command.args(&cmd[1..]).args(args);

    if let Some(dir) = root {
        command.current_dir(dir);
    }

    Ok((name, command))
}

// ============================================================================
// Output Filtering
// ============================================================================

/// Number of stderr/stdout lines attached to a failure.
const ERROR_CONTEXT_LINES: usize = 8;

/// Lines that carry no information for the build log.
///
/// latex example:
///   This is pdfTeX, Version 3.141592653-2.6-1.40.25 (TeX Live 2023)
///    restricted \write18 enabled.
///   entering extended mode
///
/// pandoc example:
///   [WARNING] Could not convert TeX math \mathbb{R}, rendering as TeX
const NOISE_PREFIXES: &[&str] = &[
    "this is pdftex",
    "this is e-tex",
    "this is tex",
    "restricted \\write18",
    "entering extended mode",
    "latex2e <",
    "l3 programming layer",
    "document class:",
    "[warning] could not convert tex math",
];

fn is_noise(line: &str) -> bool {
    let lower = line.trim().to_ascii_lowercase();
    lower.is_empty() || NOISE_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Collect the first meaningful lines of a command's diagnostics.
///
/// latex reports errors on stdout (lines starting with `!`), other tools on
/// stderr, so both streams are searched, stderr first.
fn extract_error(stdout: &str, stderr: &str) -> String {
    let latex_errors: Vec<&str> = stdout
        .lines()
        .filter(|line| line.starts_with('!'))
        .take(ERROR_CONTEXT_LINES)
        .collect();

    let lines: Vec<&str> = stderr
        .lines()
        .filter(|line| !is_noise(line))
        .take(ERROR_CONTEXT_LINES)
        .collect();

    match (lines.is_empty(), latex_errors.is_empty()) {
        (false, _) => lines.join("\n"),
        (true, false) => latex_errors.join("\n"),
        (true, true) => String::new(),
    }
}

/// Turn a non-zero exit into an error, and surface warnings on success.
fn check_output(name: &str, output: &Output) -> Result<()> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        let detail = extract_error(&stdout, &stderr);
        if detail.is_empty() {
            bail!("`{name}` failed with {}", output.status);
        }
        bail!("`{name}` failed with {}:\n{detail}", output.status);
    }

    for line in stderr.lines().filter(|line| !is_noise(line)) {
        log!(name; "{}", line.trim());
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cmd_vec_array() {
        let cmd = to_cmd_vec(["dvisvgm", "--exact"]);
        assert_eq!(cmd, vec![OsString::from("dvisvgm"), OsString::from("--exact")]);
    }

    #[test]
    fn test_to_cmd_vec_vec() {
        let v = vec!["latex".to_string(), "-halt-on-error".to_string()];
        let cmd = to_cmd_vec(&v);
        assert_eq!(cmd.len(), 2);
        assert_eq!(cmd[0], OsString::from("latex"));
    }

    #[test]
    fn test_filter_args_drops_empty() {
        let args = [OsString::from("-s"), OsString::from(""), OsString::from("--mathjax")];
        assert_eq!(filter_args(&args), vec![OsString::from("-s"), OsString::from("--mathjax")]);
    }

    #[test]
    fn test_prepare_empty_command() {
        assert!(prepare(None, &[], &[]).is_err());
    }

    #[test]
    fn test_prepare_name() {
        let cmd = to_cmd_vec(["pandoc", "--from=latex"]);
        let (name, _) = prepare(None, &cmd, &[]).unwrap();
        assert_eq!(name, "pandoc");
    }

    #[test]
    fn test_is_noise() {
        assert!(is_noise("This is pdfTeX, Version 3.14"));
        assert!(is_noise("   "));
        assert!(!is_noise("! Undefined control sequence."));
    }

    #[test]
    fn test_extract_error_prefers_stderr() {
        let err = extract_error("! Emergency stop.", "entering extended mode\npandoc: file not found");
        assert_eq!(err, "pandoc: file not found");
    }

    #[test]
    fn test_extract_error_falls_back_to_latex_bang_lines() {
        let stdout = "This is pdfTeX\n! Undefined control sequence.\nl.12 \\foo\n! Emergency stop.";
        let err = extract_error(stdout, "");
        assert_eq!(err, "! Undefined control sequence.\n! Emergency stop.");
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_nonzero_exit_is_error() {
        let result = exec(None, &to_cmd_vec(["false"]), &[]);
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_success() {
        let output = exec(None, &to_cmd_vec(["echo"]), &[to_os("hello")]).unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }
}
