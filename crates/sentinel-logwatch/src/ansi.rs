use once_cell::sync::Lazy;
use regex::Regex;

/// CSI sequences (colours, cursor moves) and OSC sequences (window titles).
static RE_ANSI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)").unwrap()
});

/// Remove terminal colour and style escape sequences.
pub fn strip_ansi(line: &str) -> String {
    RE_ANSI.replace_all(line, "").into_owned()
}

/// The form of a raw log line that triggers are matched against.
pub fn clean_line(line: &str) -> String {
    strip_ansi(line).trim().to_string()
}
