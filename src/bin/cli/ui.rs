//! Terminal output for the `snapclean` binary.

use std::io::{self, IsTerminal};
use std::time::{Duration, Instant};

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use nu_ansi_term::{Color, Style};

/// When to emit ANSI styling on stdout.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

struct Palette {
    heading: Style,
    label: Style,
    ok: Style,
    note: Style,
    warn: Style,
}

impl Palette {
    fn ansi() -> Self {
        Self {
            heading: Style::new().fg(Color::Cyan).bold(),
            label: Style::new().dimmed(),
            ok: Style::new().fg(Color::Green).bold(),
            note: Style::new().fg(Color::Blue).bold(),
            warn: Style::new().fg(Color::Yellow).bold(),
        }
    }
}

pub struct Ui {
    palette: Option<Palette>,
    quiet: bool,
}

impl Ui {
    /// Quiet output suppresses everything but warnings.
    pub fn new(color: ColorChoice, quiet: bool) -> Self {
        let paint = !quiet
            && match color {
                ColorChoice::Auto => io::stdout().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            };

        #[cfg(windows)]
        if paint {
            let _ = nu_ansi_term::enable_ansi_support();
        }

        Self {
            palette: paint.then(Palette::ansi),
            quiet,
        }
    }

    fn paint(&self, pick: impl FnOnce(&Palette) -> Style, text: &str) -> String {
        match &self.palette {
            Some(palette) => pick(palette).paint(text).to_string(),
            None => text.to_string(),
        }
    }

    pub fn ok(&self, message: &str) {
        if !self.quiet {
            println!("{} {message}", self.paint(|p| p.ok, "ok:"));
        }
    }

    pub fn note(&self, message: &str) {
        if !self.quiet {
            println!("{} {message}", self.paint(|p| p.note, "note:"));
        }
    }

    /// Always printed, on stderr.
    pub fn warn(&self, message: &str) {
        eprintln!("{} {message}", self.paint(|p| p.warn, "warning:"));
    }

    /// Prints `rows` as an aligned label/value block under `title`. Nothing
    /// is printed for an empty block.
    pub fn table(&self, title: &str, rows: &[(&str, String)]) {
        if self.quiet || rows.is_empty() {
            return;
        }
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        println!();
        println!("{}", self.paint(|p| p.heading, title));
        for (label, value) in rows {
            let label = format!("{label:<width$}");
            println!("  {}  {value}", self.paint(|p| p.label, &label));
        }
    }

    pub fn spinner(&self, label: &str) -> Spinner<'_> {
        let bar = (!self.quiet).then(|| {
            let style = ProgressStyle::with_template("{spinner} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            let bar = ProgressBar::new_spinner().with_style(style);
            bar.set_message(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        });
        Spinner {
            ui: self,
            bar,
            label: label.to_string(),
            started: Instant::now(),
            done: false,
        }
    }
}

/// Spinner covering the whole clean, relabelled as each phase starts.
///
/// Dropped without [`Spinner::finish`], it clears itself and warns which
/// phase was cut short.
pub struct Spinner<'a> {
    ui: &'a Ui,
    bar: Option<ProgressBar>,
    label: String,
    started: Instant,
    done: bool,
}

impl Spinner<'_> {
    pub fn phase(&mut self, label: &str) {
        self.label = label.to_string();
        if let Some(bar) = &self.bar {
            bar.set_message(self.label.clone());
        }
    }

    /// Prints a warning without tearing the spinner line.
    pub fn warn(&self, message: &str) {
        match &self.bar {
            Some(bar) => bar.suspend(|| self.ui.warn(message)),
            None => self.ui.warn(message),
        }
    }

    pub fn finish(mut self) -> Duration {
        self.done = true;
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        self.started.elapsed()
    }
}

impl Drop for Spinner<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        self.ui.warn(&format!(
            "stopped during '{}' after {}",
            self.label,
            format_duration(self.started.elapsed())
        ));
    }
}

pub fn format_duration(duration: Duration) -> String {
    match duration.as_millis() {
        ms if ms < 1_000 => format!("{ms}ms"),
        _ => format!("{:.2}s", duration.as_secs_f64()),
    }
}

/// Binary (1024-based) units, two decimals above bytes.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}
