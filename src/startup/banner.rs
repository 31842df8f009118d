//! Boxed banner printed when the packager starts.

use std::path::PathBuf;

/// Total banner width including the border.
const BANNER_WIDTH: usize = 80;

const PROJECT_URL: &str = "https://github.com/facebook/react-native";

/// Draw `text` inside a box, word-wrapped. Blank lines separate paragraphs.
pub fn format_banner(text: &str) -> String {
    let inner = BANNER_WIDTH - 4;
    let horizontal = "─".repeat(BANNER_WIDTH - 2);
    let mut out = format!(" ┌{}┐\n", horizontal);

    let blank = format!(" │{}│\n", " ".repeat(BANNER_WIDTH - 2));
    out.push_str(&blank);
    for line in text.lines() {
        for wrapped in wrap(line, inner) {
            out.push_str(&format!(" │ {:<width$} │\n", wrapped, width = inner));
        }
    }
    out.push_str(&blank);

    out.push_str(&format!(" └{}┘\n", horizontal));
    out
}

fn wrap(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    lines.push(current);
    lines
}

/// Banner announcing the port.
pub fn startup_banner(port: u16) -> String {
    format_banner(&format!(
        "Running packager on port {}.\n\n\
         Keep this packager running while developing on any JS projects. \
         Feel free to close this tab and run your own packager instance if you prefer.\n\n\
         {}",
        port, PROJECT_URL
    ))
}

/// Listing of the directories searched for sources.
pub fn roots_listing(roots: &[PathBuf]) -> String {
    let mut out = String::from("Looking for JS files in\n");
    for root in roots {
        out.push_str("   ");
        out.push_str(&root.display().to_string());
        out.push('\n');
    }
    out.push('\n');
    out
}
