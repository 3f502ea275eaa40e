//! Plain-text and markdown rendering of a [`Report`].

use std::sync::LazyLock;

use regex::Regex;

use crate::aggregate::{Failure, Menu, Report};
use crate::food::Food;

/// Longest dish title shown before truncation.
pub const TITLE_MAX_LENGTH: usize = 100;

/// Longest title inferred from a description.
pub const INFERRED_TITLE_MAX_LENGTH: usize = 50;

/// Partial word at the end of a cut description and the separators before
/// it. `,-:` is a range, so digits and `/` count as separators too.
static TRAILING_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ .,-:;!]+[^ ]+$").expect("trailing word pattern is valid"));

/// Shown for a dish with neither a name nor a description.
pub const UNNAMED_DISH: &str = "(unnamed dish)";

/// How to print a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub color: bool,
    pub verbose: bool,
    pub markdown: bool,
    /// Hide plugin failures.
    pub quiet: bool,
    pub with_stacktrace: bool,
}

/// ANSI escape codes, or nothing.
#[derive(Debug, Clone, Copy)]
struct Palette {
    heading: &'static str,
    subheading: &'static str,
    error: &'static str,
    reset: &'static str,
}

impl Palette {
    const PLAIN: Self = Self {
        heading: "",
        subheading: "",
        error: "",
        reset: "",
    };

    const ANSI: Self = Self {
        heading: "\x1b[1m\x1b[95m",
        subheading: "\x1b[4m\x1b[94m",
        error: "\x1b[91m",
        reset: "\x1b[0m",
    };
}

/// Indenting line buffer.
struct Printer {
    out: String,
    indent: usize,
    palette: Palette,
}

impl Printer {
    fn line(&mut self, text: &str, color: &str) {
        let lines: Vec<&str> = if text.is_empty() {
            vec![""]
        } else {
            text.lines().collect()
        };
        for line in lines {
            for _ in 0..self.indent {
                self.out.push_str("  ");
            }
            if color.is_empty() {
                self.out.push_str(line);
            } else {
                self.out.push_str(color);
                self.out.push_str(line);
                self.out.push_str(self.palette.reset);
            }
            self.out.push('\n');
        }
    }

    fn indented(&mut self, f: impl FnOnce(&mut Self)) {
        self.indent += 1;
        f(self);
        self.indent -= 1;
    }

    fn newline(&mut self) {
        self.out.push('\n');
    }
}

/// Render `report` as printable text.
pub fn render(report: &Report, options: &RenderOptions) -> String {
    let palette = if options.color && !options.markdown {
        Palette::ANSI
    } else {
        Palette::PLAIN
    };
    let mut printer = Printer {
        out: String::new(),
        indent: 0,
        palette,
    };

    if !options.markdown {
        let day = report.date.format("%A");
        let date = report.date.format("%d-%m-%Y");
        printer.out.push_str(&format!(
            "{}Menu for {}{day}{} ({date})\n\n",
            palette.subheading, palette.heading, palette.reset
        ));
    }

    let show_failures = !options.quiet && !report.failures.is_empty();
    if report.menus.is_empty() && !show_failures {
        printer.line("No restaurants found.", "");
        return printer.out;
    }

    for menu in &report.menus {
        describe_menu(&mut printer, menu, options);
    }
    if show_failures {
        for failure in &report.failures {
            describe_failure(&mut printer, failure, options);
        }
    }

    printer.out
}

fn describe_menu(printer: &mut Printer, menu: &Menu, options: &RenderOptions) {
    let prefix = if options.markdown { "## " } else { "" };
    let heading = printer.palette.heading;
    printer.line(&format!("{prefix}{}", menu.restaurant), heading);

    printer.indented(|p| {
        if menu.dishes.is_empty() {
            p.line("(no menu)", "");
        }
        for dish in &menu.dishes {
            describe_dish(p, dish, options);
        }
    });
    printer.newline();
}

fn describe_dish(printer: &mut Printer, dish: &Food, options: &RenderOptions) {
    let prefix = if options.markdown { "* " } else { "" };
    let subheading = printer.palette.subheading;
    let title = dish_title(dish);
    let title = if title.is_empty() { UNNAMED_DISH } else { &title };
    printer.line(&format!("{prefix}{title}"), subheading);

    let description = dish.description().trim();
    if options.verbose && !description.is_empty() {
        printer.indented(|p| p.line(&format!("{prefix}{description}"), ""));
    }
}

fn describe_failure(printer: &mut Printer, failure: &Failure, options: &RenderOptions) {
    let prefix = if options.markdown { "## " } else { "" };
    let heading = printer.palette.heading;
    let error = printer.palette.error;
    printer.line(&format!("{prefix}{}", failure.label()), heading);

    printer.indented(|p| {
        p.line(&format!("Plugin Error ({}):", failure.error.kind()), "");
        p.indented(|p| {
            p.line(&failure.error.to_string(), "");
            if options.with_stacktrace {
                if let Some(stack) = failure.error.stack() {
                    p.newline();
                    p.line(stack.trim_end(), error);
                }
            }
        });
    });
    printer.newline();
}

/// Title shown for a dish.
///
/// The dish name with newlines folded and length capped; when a plugin only
/// supplied a description, a title is inferred from it.
pub fn dish_title(food: &Food) -> String {
    let dish = food.dish().trim().replace('\n', " ");
    if dish.is_empty() {
        infer_title(food.description().trim())
    } else {
        truncate(&dish, TITLE_MAX_LENGTH)
    }
}

fn truncate(text: &str, max_length: usize) -> String {
    if text.chars().count() > max_length {
        let mut cut: String = text.chars().take(max_length).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

/// Shorten a description into a title, preferring to cut at a word boundary.
pub fn infer_title(description: &str) -> String {
    let chars: Vec<char> = description.chars().collect();
    if chars.len() <= INFERRED_TITLE_MAX_LENGTH {
        return description.to_string();
    }

    let cut: String = chars[..INFERRED_TITLE_MAX_LENGTH - 3].iter().collect();
    let cut = cut.trim();
    if chars[INFERRED_TITLE_MAX_LENGTH - 2] == ' ' {
        return format!("{cut}...");
    }
    format!("{}...", TRAILING_WORD.replace(cut, ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginError;
    use chrono::NaiveDate;

    fn report() -> Report {
        let mut report = Report::new(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        report.menus.push(Menu {
            restaurant: "Bistro A".into(),
            dishes: vec![Food::new("Soup", " Tomato soup\n")],
        });
        report.menus.push(Menu {
            restaurant: "Closed".into(),
            dishes: Vec::new(),
        });
        report.failures.push(Failure {
            plugin: "bistro_b".into(),
            restaurant: Some("Bistro B".into()),
            error: PluginError::Runtime {
                entry: "food",
                message: "menu page moved".into(),
                stack: Some("    at food (bistro_b.js:3)\n".into()),
            },
        });
        report
    }

    #[test]
    fn plain_listing() {
        let out = render(&report(), &RenderOptions::default());
        assert_eq!(
            out,
            "Menu for Monday (19-10-2026)\n\n\
             Bistro A\n  Soup\n\n\
             Closed\n  (no menu)\n\n\
             Bistro B\n  Plugin Error (RuntimeError):\n    food() failed: menu page moved\n\n"
        );
    }

    #[test]
    fn verbose_markdown_with_stacktrace() {
        let options = RenderOptions {
            verbose: true,
            markdown: true,
            with_stacktrace: true,
            ..RenderOptions::default()
        };
        let out = render(&report(), &options);
        assert!(!out.contains("Menu for"));
        assert!(out.starts_with("## Bistro A\n  * Soup\n    * Tomato soup\n"));
        assert!(out.contains("      at food (bistro_b.js:3)\n"));
    }

    #[test]
    fn quiet_hides_failures() {
        let options = RenderOptions {
            quiet: true,
            ..RenderOptions::default()
        };
        let out = render(&report(), &options);
        assert!(!out.contains("Bistro B"));
        assert!(!out.contains("Plugin Error"));
    }

    #[test]
    fn color_wraps_names() {
        let options = RenderOptions {
            color: true,
            ..RenderOptions::default()
        };
        let out = render(&report(), &options);
        assert!(out.contains("\x1b[1m\x1b[95mBistro A\x1b[0m"));
        assert!(out.contains("  \x1b[4m\x1b[94mSoup\x1b[0m"));
    }

    #[test]
    fn empty_report() {
        let report = Report::new(NaiveDate::from_ymd_opt(2026, 10, 24).unwrap());
        let out = render(&report, &RenderOptions::default());
        assert_eq!(out, "Menu for Saturday (24-10-2026)\n\nNo restaurants found.\n");
    }

    #[test]
    fn dish_titles_are_cleaned() {
        assert_eq!(dish_title(&Food::new(" Fisk:\nTorsk ", "")), "Fisk: Torsk");
        let long = "x".repeat(120);
        assert_eq!(dish_title(&Food::new(long, "")), format!("{}...", "x".repeat(100)));
    }

    #[test]
    fn short_descriptions_become_titles() {
        assert_eq!(dish_title(&Food::new("", " Pulled pork ")), "Pulled pork");
    }

    #[test]
    fn empty_dish_still_gets_a_line() {
        let mut report = Report::new(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        report.menus.push(Menu {
            restaurant: "Bistro".into(),
            dishes: vec![Food::new("", "")],
        });
        let out = render(&report, &RenderOptions::default());
        assert_eq!(out, "Menu for Monday (19-10-2026)\n\nBistro\n  (unnamed dish)\n\n");
    }

    #[test]
    fn blank_text_prints_an_indented_line() {
        let mut printer = Printer {
            out: String::new(),
            indent: 1,
            palette: Palette::PLAIN,
        };
        printer.line("", "");
        assert_eq!(printer.out, "  \n");
    }

    #[test]
    fn digits_count_as_separators_when_inferring() {
        let description = "Fish and chips with mushy peas and tartare, 2 for 1 every Friday";
        assert_eq!(
            infer_title(description),
            "Fish and chips with mushy peas and tartare..."
        );
    }

    #[test]
    fn failures_follow_all_menus() {
        let out = render(&report(), &RenderOptions::default());
        let failure = out.find("Bistro B").unwrap();
        assert!(out.find("Bistro A").unwrap() < failure);
        assert!(out.find("Closed").unwrap() < failure);
    }

    #[test]
    fn infers_title_at_word_boundary() {
        // Position 48 is a space: keep the 47-character cut.
        let description = format!("{} {}", "a".repeat(48), "tail of the description");
        assert_eq!(infer_title(&description), format!("{}...", "a".repeat(47)));

        let description =
            "Grilled halloumi with roasted vegetables, tzatziki and warm pita bread";
        assert_eq!(
            infer_title(description),
            "Grilled halloumi with roasted vegetables..."
        );
    }
}
