//! Core CLI loop, dispatch, and shell context helpers.

use std::fs;
use std::io;

use chrono::{Datelike, Local, NaiveDate};
use dialoguer::{theme::ColorfulTheme, Confirm};
use strsim::levenshtein;
use uuid::Uuid;

use crate::book::{Category, CategoryFilter, Expense, LineItem, MonthKey, RecurringRule};
use crate::cli::output;
use crate::cli::state::ViewState;
use crate::errors::ExpenseError;
use crate::store::{Backup, ExpenseStore, JsonStore};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_HEADER: &str = " Su      Mo      Tu      We      Th      Fr      Sa";

struct CommandSpec {
    name: &'static str,
    usage: &'static str,
    summary: &'static str,
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "add",
        usage: "add <name> <amount> <category> [date] [memo…]",
        summary: "Record an expense (date defaults to today).",
    },
    CommandSpec {
        name: "rm",
        usage: "rm <id-prefix>",
        summary: "Delete an expense from the displayed month.",
    },
    CommandSpec {
        name: "radd",
        usage: "radd <name> <amount> <category> <day> [start]",
        summary: "Add a monthly recurring rule (start defaults to this month).",
    },
    CommandSpec {
        name: "rls",
        usage: "rls",
        summary: "List recurring rules, inactive ones included.",
    },
    CommandSpec {
        name: "rrm",
        usage: "rrm <id-prefix>",
        summary: "Delete a recurring rule and all of its firings.",
    },
    CommandSpec {
        name: "cal",
        usage: "cal",
        summary: "Calendar of per-day totals for the displayed month.",
    },
    CommandSpec {
        name: "day",
        usage: "day [date]",
        summary: "Itemised list for the selected date.",
    },
    CommandSpec {
        name: "select",
        usage: "select <date>",
        summary: "Select a date (follows it into its month).",
    },
    CommandSpec {
        name: "sums",
        usage: "sums",
        summary: "Per-category totals for the displayed month.",
    },
    CommandSpec {
        name: "month",
        usage: "month <prev|next|YYYY-MM>",
        summary: "Navigate the displayed month.",
    },
    CommandSpec {
        name: "filter",
        usage: "filter <essential|invest|spend|all>",
        summary: "Toggle the category filter (same category twice clears it).",
    },
    CommandSpec {
        name: "export",
        usage: "export <path>",
        summary: "Write a JSON backup of the whole book.",
    },
    CommandSpec {
        name: "import",
        usage: "import <path>",
        summary: "Apply a JSON backup, all-or-nothing.",
    },
    CommandSpec {
        name: "help",
        usage: "help",
        summary: "Show this list.",
    },
    CommandSpec {
        name: "exit",
        usage: "exit",
        summary: "Leave the shell.",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Core(#[from] ExpenseError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Core(#[from] ExpenseError),
}

pub struct ShellContext {
    mode: CliMode,
    store: JsonStore,
    view: ViewState,
    theme: ColorfulTheme,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let store = JsonStore::open_default()?;
        Ok(Self::with_store(mode, store))
    }

    /// The engine takes the target month explicitly; the clock is read only
    /// here, to pick the initially displayed month.
    pub fn with_store(mode: CliMode, mut store: JsonStore) -> Self {
        let today = Local::now().date_naive();
        let view = ViewState::bind(&mut store, today);
        Self {
            mode,
            store,
            view,
            theme: ColorfulTheme::default(),
        }
    }

    pub(crate) fn command_names() -> Vec<&'static str> {
        COMMANDS.iter().map(|spec| spec.name).collect()
    }

    pub(crate) fn prompt(&self) -> String {
        let filter = if self.view.filter.is_all() {
            String::new()
        } else {
            format!(" [{}]", self.view.filter)
        };
        format!("{}{}> ", self.view.month(), filter)
    }

    /// Tokenises one input line and runs the command it names. Unparseable
    /// lines (unbalanced quotes) warn and continue; they are user typos,
    /// not command failures.
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let tokens = match shell_words::split(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                output::warning(err.to_string());
                return Ok(LoopControl::Continue);
            }
        };
        let Some(raw) = tokens.first() else {
            return Ok(LoopControl::Continue);
        };
        let command = raw.to_lowercase();
        let args: Vec<&str> = tokens.iter().skip(1).map(String::as_str).collect();
        self.dispatch(&command, raw, &args)
    }

    fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let result = match command {
            "help" => self.cmd_help(),
            "add" => self.cmd_add(args),
            "rm" => self.cmd_remove_expense(args),
            "radd" => self.cmd_add_rule(args),
            "rls" => self.cmd_list_rules(),
            "rrm" => self.cmd_remove_rule(args),
            "cal" => self.cmd_calendar(),
            "day" => self.cmd_day(args),
            "select" => self.cmd_select(args),
            "sums" => self.cmd_sums(),
            "month" => self.cmd_month(args),
            "filter" => self.cmd_filter(args),
            "export" => self.cmd_export(args),
            "import" => self.cmd_import(args),
            "exit" | "quit" => Err(CommandError::ExitRequested),
            _ => {
                self.suggest_command(raw);
                Ok(())
            }
        };
        match result {
            Ok(()) => Ok(LoopControl::Continue),
            Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
            Err(err) => Err(err),
        }
    }

    fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let mut suggestions: Vec<_> = COMMANDS
            .iter()
            .map(|spec| (levenshtein(spec.name, input), spec.name))
            .collect();
        suggestions.sort_by_key(|(distance, _)| *distance);

        if let Some((distance, best)) = suggestions.first() {
            if *distance <= 3 {
                output::info(format!("Suggestion: `{}`?", best));
            }
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Confirm::with_theme(&self.theme)
            .with_prompt("Exit shell?")
            .default(true)
            .interact()
            .map_err(|err| CliError::Io(io::Error::other(err)))
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => Ok(()),
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::info("Use `help` for usage details.");
                Ok(())
            }
            other => {
                output::error(other.to_string());
                Ok(())
            }
        }
    }

    fn confirm(&self, prompt: &str) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()?)
    }

    fn cmd_help(&self) -> CommandResult {
        output::section("Commands");
        for spec in COMMANDS {
            output::line(format!("  {:<48} {}", spec.usage, spec.summary));
        }
        Ok(())
    }

    fn cmd_add(&mut self, args: &[&str]) -> CommandResult {
        if args.len() < 3 {
            return Err(usage("add"));
        }
        let name = args[0];
        let amount = parse_amount(args[1])?;
        let category: Category = args[2].parse()?;
        let (date, memo_args) = match args.get(3) {
            Some(raw) if looks_like_date(raw) => (parse_date(raw)?, &args[4..]),
            _ => (Local::now().date_naive(), &args[3..]),
        };
        let memo = memo_args.join(" ");

        let expense = Expense::new(name, amount, category, date, memo)?;
        let id = self.store.add_expense(expense)?;
        self.view.select(&mut self.store, date);
        self.view.sync();
        output::success(format!(
            "Recorded `{}` ({}) on {} [{}].",
            name,
            format_amount(amount),
            date,
            short_id(id)
        ));
        Ok(())
    }

    fn cmd_remove_expense(&mut self, args: &[&str]) -> CommandResult {
        let prefix = args.first().ok_or_else(|| usage("rm"))?;
        let matches: Vec<&Expense> = self
            .view
            .expenses()
            .iter()
            .filter(|expense| short_matches(expense.id, prefix))
            .collect();
        let expense = match matches.as_slice() {
            [] => {
                // Absent ids are a no-op at the store; from the shell we at
                // least tell the user nothing matched this month.
                output::info(format!(
                    "No expense in {} matches `{}`; nothing to delete.",
                    self.view.month(),
                    prefix
                ));
                return Ok(());
            }
            [single] => (*single).clone(),
            _ => {
                return Err(CommandError::InvalidArguments(format!(
                    "`{}` is ambiguous ({} matches); give more characters",
                    prefix,
                    matches.len()
                )))
            }
        };

        if !self.confirm(&format!(
            "Delete `{}` ({}) from {}?",
            expense.name,
            format_amount(expense.amount),
            expense.date
        ))? {
            output::info("Kept.");
            return Ok(());
        }
        self.store.delete_expense(expense.id)?;
        self.view.sync();
        output::success(format!("Deleted `{}`.", expense.name));
        Ok(())
    }

    fn cmd_add_rule(&mut self, args: &[&str]) -> CommandResult {
        if args.len() < 4 {
            return Err(usage("radd"));
        }
        let name = args[0];
        let amount = parse_amount(args[1])?;
        let category: Category = args[2].parse()?;
        let day: u32 = args[3].parse().map_err(|_| {
            CommandError::InvalidArguments(format!("invalid day `{}` (use 1..=31)", args[3]))
        })?;
        let start: MonthKey = match args.get(4) {
            Some(raw) => raw.parse()?,
            None => self.view.month(),
        };

        let rule = RecurringRule::new(name, amount, category, day, start)?;
        let id = self.store.add_rule(rule)?;
        self.view.sync();
        output::success(format!(
            "Recurring `{}` ({}) fires monthly on day {} from {} [{}].",
            name,
            format_amount(amount),
            day,
            start,
            short_id(id)
        ));
        Ok(())
    }

    fn cmd_list_rules(&mut self) -> CommandResult {
        self.view.sync();
        let mut rules: Vec<RecurringRule> = self.view.rules().to_vec();
        if rules.is_empty() {
            output::info("Nothing here :o");
            return Ok(());
        }
        rules.sort_by_key(|rule| std::cmp::Reverse(rule.amount));

        output::section(format!("Recurring rules ({})", rules.len()));
        for rule in &rules {
            let start = match rule.resolved_start() {
                Some(start) => format!("from {}", start),
                None => "start unresolved, never fires".to_string(),
            };
            let flag = if rule.active { "" } else { "  [inactive]" };
            output::line(format!(
                "  {}  {:<20} {:>12}  day {:>2}  {}  {}{}",
                short_id(rule.id),
                rule.name,
                format_amount(rule.amount),
                rule.day,
                rule.category,
                start,
                flag
            ));
        }
        Ok(())
    }

    fn cmd_remove_rule(&mut self, args: &[&str]) -> CommandResult {
        let prefix = args.first().ok_or_else(|| usage("rrm"))?;
        let matches: Vec<&RecurringRule> = self
            .view
            .rules()
            .iter()
            .filter(|rule| short_matches(rule.id, prefix))
            .collect();
        let rule = match matches.as_slice() {
            [] => {
                output::info(format!(
                    "No recurring rule matches `{}`; nothing to delete.",
                    prefix
                ));
                return Ok(());
            }
            [single] => (*single).clone(),
            _ => {
                return Err(CommandError::InvalidArguments(format!(
                    "`{}` is ambiguous ({} matches); give more characters",
                    prefix,
                    matches.len()
                )))
            }
        };

        if !self.confirm(&format!(
            "Delete rule `{}`? Every past and future firing disappears with it.",
            rule.name
        ))? {
            output::info("Kept.");
            return Ok(());
        }
        self.store.delete_rule(rule.id)?;
        self.view.sync();
        output::success(format!("Deleted rule `{}`.", rule.name));
        Ok(())
    }

    fn cmd_calendar(&mut self) -> CommandResult {
        self.view.sync();
        let month = self.view.month();
        let views = self.view.views();

        let mut title = month_label(month);
        if !self.view.filter.is_all() {
            title.push_str(&format!(" — {} only", self.view.filter));
        }
        output::section(title);
        output::line(WEEKDAY_HEADER);

        let offset = month.first_day().weekday().num_days_from_sunday();
        let mut row = "        ".repeat(offset as usize);
        let mut column = offset;
        for day in 1..=month.days() {
            let total = views.daily.get(&day).copied().unwrap_or(0);
            let cell = if total == 0 {
                format!("{:>3}     ", day)
            } else {
                format!("{:>3}{:>5}", day, compact_amount(total))
            };
            row.push_str(&cell);
            column += 1;
            if column == 7 {
                output::line(row.trim_end());
                row = String::new();
                column = 0;
            }
        }
        if !row.trim().is_empty() {
            output::line(row.trim_end());
        }
        Ok(())
    }

    fn cmd_day(&mut self, args: &[&str]) -> CommandResult {
        if let Some(raw) = args.first() {
            let date = parse_date(raw)?;
            self.view.select(&mut self.store, date);
        }
        self.view.sync();
        let views = self.view.views();

        output::section(self.view.selected().to_string());
        if views.detail.is_empty() {
            output::info("Nothing here :o");
            return Ok(());
        }
        for item in &views.detail {
            output::line(format_line_item(item));
        }
        Ok(())
    }

    fn cmd_select(&mut self, args: &[&str]) -> CommandResult {
        let raw = args.first().ok_or_else(|| usage("select"))?;
        let date = parse_date(raw)?;
        self.view.select(&mut self.store, date);
        output::info(format!("Selected {}.", date));
        Ok(())
    }

    fn cmd_sums(&mut self) -> CommandResult {
        self.view.sync();
        let sums = self.view.views().sums;
        output::section(format!("{} by category", month_label(self.view.month())));
        for category in Category::ALL {
            let marker = if self.view.filter == CategoryFilter::Only(category) {
                "▶"
            } else {
                " "
            };
            output::line(format!(
                " {} {:<10} {:>14}",
                marker,
                category,
                format_amount(sums.get(category))
            ));
        }
        output::line(format!("   {:<10} {:>14}", "total", format_amount(sums.total())));
        Ok(())
    }

    fn cmd_month(&mut self, args: &[&str]) -> CommandResult {
        let target = match args.first() {
            Some(&"prev") => self.view.month().previous(),
            Some(&"next") => self.view.month().next(),
            Some(raw) => raw.parse()?,
            None => return Err(usage("month")),
        };
        self.view.show_month(&mut self.store, target);
        self.cmd_calendar()
    }

    fn cmd_filter(&mut self, args: &[&str]) -> CommandResult {
        let raw = args.first().ok_or_else(|| usage("filter"))?;
        if raw.eq_ignore_ascii_case("all") {
            self.view.filter = CategoryFilter::All;
        } else {
            let category: Category = raw.parse()?;
            self.view.filter.toggle(category);
        }
        output::info(format!("Filter: {}.", self.view.filter));
        Ok(())
    }

    fn cmd_export(&mut self, args: &[&str]) -> CommandResult {
        let path = args.first().ok_or_else(|| usage("export"))?;
        let backup = self.store.export();
        fs::write(path, backup.to_json()?)?;
        output::success(format!(
            "Exported {} expenses and {} rules to {}.",
            backup.expenses.len(),
            backup.recurring.len(),
            path
        ));
        Ok(())
    }

    fn cmd_import(&mut self, args: &[&str]) -> CommandResult {
        let path = args.first().ok_or_else(|| usage("import"))?;
        let raw = fs::read_to_string(path)?;
        let backup = Backup::from_json(&raw)?;
        let (expenses, rules) = (backup.expenses.len(), backup.recurring.len());
        self.store.import(backup)?;
        self.view.sync();
        output::success(format!(
            "Imported {} expenses and {} rules from {}.",
            expenses, rules, path
        ));
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn view(&self) -> &ViewState {
        &self.view
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &JsonStore {
        &self.store
    }
}

fn usage(name: &str) -> CommandError {
    let spec = COMMANDS
        .iter()
        .find(|spec| spec.name == name)
        .expect("usage() is only called with registered command names");
    CommandError::InvalidArguments(format!("Usage: {}", spec.usage))
}

pub(crate) fn parse_date(input: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        CommandError::InvalidArguments(format!("invalid date `{}` (use YYYY-MM-DD)", input))
    })
}

fn looks_like_date(input: &str) -> bool {
    input.len() == 10 && input.as_bytes()[4] == b'-' && input.as_bytes()[7] == b'-'
}

fn parse_amount(input: &str) -> Result<i64, CommandError> {
    let amount: i64 = input.replace(',', "").parse().map_err(|_| {
        CommandError::InvalidArguments(format!("invalid amount `{}` (use a whole number)", input))
    })?;
    if amount <= 0 {
        return Err(CommandError::InvalidArguments(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(amount)
}

fn short_id(id: Uuid) -> String {
    let mut short = id.simple().to_string();
    short.truncate(8);
    short
}

fn short_matches(id: Uuid, prefix: &str) -> bool {
    id.simple()
        .to_string()
        .starts_with(&prefix.to_ascii_lowercase())
}

fn month_label(month: MonthKey) -> String {
    format!("{} {}", MONTH_NAMES[(month.month() - 1) as usize], month.year())
}

/// Thousands-separated amount, e.g. `1,234,000`.
fn format_amount(amount: i64) -> String {
    let digits = amount.abs().to_string();
    let mut grouped = String::new();
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Short form for calendar cells, e.g. `12k` for 12,300.
fn compact_amount(amount: i64) -> String {
    if amount >= 10_000 {
        format!("{}k", amount / 1000)
    } else {
        amount.to_string()
    }
}

fn format_line_item(item: &LineItem) -> String {
    let tag = if item.recurring {
        "recurring".to_string()
    } else {
        short_id(item.source_id)
    };
    let memo = if item.memo.is_empty() {
        String::new()
    } else {
        format!("  — {}", item.memo)
    };
    format!(
        "  [{:>9}] {:<20} {:>12}  {}{}",
        tag,
        item.name,
        format_amount(item.amount),
        item.category,
        memo
    )
}

#[cfg(test)]
pub(crate) fn process_script(lines: &[&str]) -> Result<ShellContext, CommandError> {
    let temp = tempfile::TempDir::new().expect("temp dir");
    let store = JsonStore::open(temp.path().join("book.json")).expect("json store");
    let mut app = ShellContext::with_store(CliMode::Script, store);
    // Keep the scratch directory alive for the context's lifetime.
    let _ = temp.into_path();
    for line in lines {
        match app.process_line(line)? {
            LoopControl::Continue => {}
            LoopControl::Exit => break,
        }
    }
    Ok(app)
}
