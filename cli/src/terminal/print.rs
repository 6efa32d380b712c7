//! Fixed-width terminal output. Everything goes through [`print`], so lines
//! are rendered by the logging pipeline and never tear the scan spinner.

use colored::*;
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::terminal::colors;

pub const TOTAL_WIDTH: usize = 64;
pub const PRINT_TARGET: &str = "nmapr::print";
pub const PRINT_FIELD: &str = "raw_msg";

const KEY_WIDTH: usize = 9;

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

pub fn blank() {
    print("");
}

pub fn banner(no_banner: bool, q_level: u8) {
    if no_banner || q_level > 0 {
        return;
    }
    let title = format!("⟦ NMAPR v{} ⟧ ", env!("CARGO_PKG_VERSION"));
    let side = "═".repeat(TOTAL_WIDTH.saturating_sub(title.width()) / 2);
    print(&format!(
        "{}{}{}",
        side.color(colors::SEPARATOR),
        title.color(colors::PRIMARY).bold(),
        side.color(colors::SEPARATOR)
    ));
}

/// A section title centered in a line of dashes.
pub fn header(title: &str, q_level: u8) {
    if q_level > 0 {
        return;
    }
    let title = format!("⟦ {} ⟧", title.to_uppercase());
    let dashes = TOTAL_WIDTH.saturating_sub(title.width());
    let (left, right) = (dashes / 2, dashes - dashes / 2);
    print(&format!(
        "{}{}{}",
        "─".repeat(left).color(colors::SEPARATOR),
        title.color(colors::PRIMARY),
        "─".repeat(right).color(colors::SEPARATOR)
    ));
}

pub fn separator() {
    print(&"═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR).to_string());
}

/// `> key.....: value`, the value in the default text color.
pub fn aligned_line(key: &str, value: impl AsRef<str>) {
    let dots = ".".repeat((KEY_WIDTH + 1).saturating_sub(key.width()));
    print(&format!(
        "{} {}{}{} {}",
        ">".color(colors::SEPARATOR),
        key.color(colors::PRIMARY),
        dots.color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR),
        value.as_ref().color(colors::TEXT_DEFAULT)
    ));
}

pub fn tree_head(idx: usize, name: &str) {
    print(&format!(
        "{}{}{} {}",
        "[".color(colors::SEPARATOR),
        idx.to_string().color(colors::ACCENT),
        "]".color(colors::SEPARATOR),
        name.color(colors::PRIMARY)
    ));
}

pub fn as_tree_one_level(details: &[(String, ColoredString)]) {
    for (i, (key, value)) in details.iter().enumerate() {
        let branch = if i + 1 == details.len() { "└─" } else { "├─" };
        let dots = ".".repeat(KEY_WIDTH.saturating_sub(key.width()));
        print(&format!(
            " {} {}{}{} {}",
            branch.color(colors::SEPARATOR),
            key.color(colors::TEXT_DEFAULT),
            dots.color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value
        ));
    }
}

pub fn centerln(msg: &str) {
    let pad = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    print(&format!("{pad}{msg}"));
}
