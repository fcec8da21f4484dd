use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Stylize};
use scrobble_mirror::history_store::HistoryStats;
use scrobble_mirror::sync::{RefreshStats, SyncStats};
use unicode_width::UnicodeWidthStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_styles() -> Styles {
    clap::builder::Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

/// Colors by role in the run summaries.
mod palette {
    use crossterm::style::Color;

    pub const FRAME: Color = Color::Rgb { r: 0, g: 255, b: 255 };
    pub const HIGHLIGHT_MARK: Color = Color::Rgb { r: 255, g: 0, b: 255 };
    pub const MARK: Color = Color::Rgb { r: 180, g: 100, b: 255 };
    pub const OK: Color = Color::Rgb { r: 0, g: 255, b: 136 };
    pub const WARN: Color = Color::Rgb { r: 255, g: 165, b: 0 };
    pub const FAIL: Color = Color::Rgb { r: 255, g: 85, b: 85 };
    pub const LABEL: Color = Color::Rgb { r: 128, g: 128, b: 128 };
    pub const VALUE: Color = Color::Rgb { r: 255, g: 255, b: 255 };
}

mod glyphs {
    pub const TOP_LEFT: &str = "╭";
    pub const TOP_RIGHT: &str = "╮";
    pub const BOTTOM_LEFT: &str = "╰";
    pub const BOTTOM_RIGHT: &str = "╯";
    pub const RULE: &str = "─";
    pub const BULLET: &str = "●";
    pub const DIAMOND: &str = "◆";
    pub const CHECK: &str = "✓";
    pub const CROSS: &str = "✗";
    pub const WARNING: &str = "⚠";
}

const SECTION_WIDTH: usize = 60;

// ═══════════════════════════════════════════════════════════════════════════════
// Status Indicators
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_success(message: &str) {
    println!(" {} {}", glyphs::CHECK.with(palette::OK).bold(), message.with(palette::OK));
}

pub fn print_error(message: &str) {
    eprintln!(" {} {}", glyphs::CROSS.with(palette::FAIL).bold(), message.with(palette::FAIL));
}

pub fn print_warning(message: &str) {
    println!(" {} {}", glyphs::WARNING.with(palette::WARN).bold(), message.with(palette::WARN));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sections
// ═══════════════════════════════════════════════════════════════════════════════

fn rule(width: usize) -> String {
    glyphs::RULE.repeat(width)
}

pub fn print_section_header(title: &str) {
    // Title plus its surrounding spaces, centered in the rule.
    let used = title.width() + 2;
    let left = SECTION_WIDTH.saturating_sub(used) / 2;
    let right = SECTION_WIDTH.saturating_sub(used + left);

    println!();
    println!(
        "{}{} {} {}{}",
        glyphs::TOP_LEFT.with(palette::FRAME),
        rule(left).with(palette::FRAME),
        title.with(palette::FRAME).bold().attribute(Attribute::Italic),
        rule(right).with(palette::FRAME),
        glyphs::TOP_RIGHT.with(palette::FRAME)
    );
}

pub fn print_section_footer() {
    println!(
        "{}{}{}",
        glyphs::BOTTOM_LEFT.with(palette::FRAME),
        rule(SECTION_WIDTH).with(palette::FRAME),
        glyphs::BOTTOM_RIGHT.with(palette::FRAME)
    );
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        glyphs::BULLET.with(palette::MARK),
        format!("{}:", key).with(palette::LABEL),
        value.with(palette::VALUE)
    );
}

/// Same as [`print_key_value`], for the headline figure of a section.
pub fn print_key_value_highlight(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        glyphs::DIAMOND.with(palette::HIGHLIGHT_MARK),
        format!("{}:", key).with(palette::FRAME).bold(),
        value.with(palette::OK).bold()
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Run summaries
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_sync_summary(title: &str, stats: &SyncStats) {
    print_section_header(title);
    print_key_value_highlight("Merged", &stats.merged.to_string());
    print_key_value("Fetched", &stats.fetched.to_string());
    print_key_value("Pages", &stats.pages.to_string());
    if stats.skipped > 0 {
        print_key_value("Skipped (no timestamp)", &stats.skipped.to_string());
    }
    print_section_footer();
}

pub fn print_refresh_summary(title: &str, stats: &RefreshStats) {
    print_section_header(title);
    print_key_value_highlight("Refreshed", &stats.refreshed.to_string());
    print_key_value("Candidates", &stats.candidates.to_string());
    print_key_value("Not found", &stats.not_found.to_string());
    print_section_footer();
    if stats.failed > 0 {
        print_warning(&format!(
            "{} lookups failed and will be retried on the next run",
            stats.failed
        ));
    }
}

pub fn print_history_stats(stats: &HistoryStats) {
    print_section_header("History");
    print_key_value("Scrobbles", &stats.scrobbles.to_string());
    print_key_value("Loves", &stats.loves.to_string());
    print_key_value("Artists", &stats.artists.to_string());
    print_key_value("Albums", &stats.albums.to_string());
    print_key_value("Tracks", &stats.tracks.to_string());
    print_section_footer();
}
