// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;

use split_bill::{
    load_csv, logging, settle, write_csv, Config, ExpenseStore, ExpenseSummary, NewExpense,
    SqliteExpenseStore, SubjectCatalog,
};

const USAGE: &str = "\
Usage: split-bill [command]

Commands:
  ui                                          Interactive terminal UI (default)
  add <participant> <amount> <description>    Record an expense
  list                                        Show all expenses
  settle                                      Balances and who pays whom
  summary                                     Totals by participant and description
  update <id> <participant> <amount> <description>
  delete <id>                                 Remove one expense
  clear                                       Remove all expenses
  import <file.csv>                           Import participant,amount,description[,timestamp]
  export <file.csv>                           Export all expenses
  subjects                                    List the PDF search catalog";

fn main() -> Result<()> {
    logging::init("warn");

    let args: Vec<String> = env::args().skip(1).collect();
    let config = Config::from_env().context("Failed to load configuration")?;

    match args.first().map(String::as_str) {
        None | Some("ui") => run_ui_mode(&config),
        Some("add") => run_add(&config, &args[1..]),
        Some("list") => run_list(&config),
        Some("settle") => run_settle(&config),
        Some("summary") => run_summary(&config),
        Some("update") => run_update(&config, &args[1..]),
        Some("delete") => run_delete(&config, &args[1..]),
        Some("clear") => run_clear(&config),
        Some("import") => run_import(&config, &args[1..]),
        Some("export") => run_export(&config, &args[1..]),
        Some("subjects") => {
            run_subjects();
            Ok(())
        }
        Some("help") | Some("--help") | Some("-h") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command: {}\n", other);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn open_store(config: &Config) -> Result<SqliteExpenseStore> {
    SqliteExpenseStore::open(&config.database_path, config.participants.clone()).with_context(
        || format!("Failed to open database {}", config.database_path.display()),
    )
}

/// `<participant> <amount> <description words...>`
fn parse_expense(args: &[String]) -> Result<NewExpense> {
    if args.len() < 3 {
        bail!("expected <participant> <amount> <description>");
    }
    let amount: f64 = args[1]
        .parse()
        .with_context(|| format!("Amount '{}' is not a number", args[1]))?;
    Ok(NewExpense::new(&args[0], amount, &args[2..].join(" ")))
}

fn run_add(config: &Config, args: &[String]) -> Result<()> {
    let input = parse_expense(args)?;
    let mut store = open_store(config)?;

    match store.create(input) {
        Ok(record) => {
            println!("✓ Expense added successfully!");
            println!("  {}  {}  ₹{:.2}  {}", record.id, record.participant, record.amount, record.description);
            Ok(())
        }
        Err(e @ split_bill::SplitBillError::InvalidRecord { .. }) => {
            eprintln!("❌ Please enter valid details: {}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn run_list(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let records = store.list()?;

    if records.is_empty() {
        println!("No expenses added yet.");
        return Ok(());
    }

    println!("{:<36}  {:<16}  {:>10}  {:<17}  Description", "Id", "Participant", "Amount", "Date");
    for r in &records {
        println!(
            "{:<36}  {:<16}  {:>10.2}  {:<17}  {}",
            r.id,
            r.participant,
            r.amount,
            r.timestamp.format("%Y-%m-%d %H:%M"),
            r.description
        );
    }
    Ok(())
}

fn run_settle(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let records = store.list()?;

    let report = match settle(&records) {
        Ok(report) => report,
        Err(e) if e.is_empty_input() => {
            println!("No expenses added yet. Nothing to settle.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Total Bill: ₹{:.2}", report.total);
    println!("Equal share: ₹{:.2} ({} participants)", report.equal_share, report.participant_count);
    println!("\nEach User Should Receive/Pay:");
    for line in &report.participants {
        println!("  {}", line.status.describe(&line.participant));
    }

    println!();
    if report.transfers.is_empty() {
        println!("Everyone is settled.");
    }
    for transfer in &report.transfers {
        println!("  {}", transfer.describe());
    }
    println!("\n{}", report.summary());
    Ok(())
}

fn run_summary(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let summary = ExpenseSummary::from_records(&store.list()?);

    if summary.expense_count == 0 {
        println!("No expenses to summarize.");
        return Ok(());
    }

    println!("Total Expenses by User");
    for group in &summary.by_participant {
        println!("  {:<20} ₹{:>10.2}  ({} expenses)", group.label, group.amount, group.count);
    }
    println!("\nTotal Expenses by Description");
    for group in &summary.by_description {
        println!("  {:<20} ₹{:>10.2}  ({} expenses)", group.label, group.amount, group.count);
    }
    println!("\nTotal: ₹{:.2} over {} expenses", summary.total, summary.expense_count);
    Ok(())
}

fn run_update(config: &Config, args: &[String]) -> Result<()> {
    let id = args.first().context("expected <id>")?;
    let input = parse_expense(&args[1..])?;
    let mut store = open_store(config)?;

    let record = store.update(id, input)?;
    println!("✓ Expense updated successfully!");
    println!("  {}  {}  ₹{:.2}  {}", record.id, record.participant, record.amount, record.description);
    Ok(())
}

fn run_delete(config: &Config, args: &[String]) -> Result<()> {
    let id = args.first().context("expected <id>")?;
    let mut store = open_store(config)?;

    if store.delete(id)? {
        println!("✓ Expense deleted successfully!");
    } else {
        println!("No expense with id {}", id);
    }
    Ok(())
}

fn run_clear(config: &Config) -> Result<()> {
    let mut store = open_store(config)?;
    let removed = store.delete_all()?;
    println!("✓ All expenses deleted successfully! ({} removed)", removed);
    Ok(())
}

fn run_import(config: &Config, args: &[String]) -> Result<()> {
    let path = Path::new(args.first().context("expected <file.csv>")?);

    println!("📂 Loading CSV...");
    let rows = load_csv(path).with_context(|| format!("Failed to read {}", path.display()))?;
    println!("✓ Loaded {} rows from CSV", rows.len());

    let mut store = open_store(config)?;
    let summary = store.import(rows)?;

    println!("✓ Inserted: {} expenses", summary.inserted);
    println!("✓ Skipped duplicates: {}", summary.duplicates);
    println!("✓ Database contains {} expenses", store.count()?);
    Ok(())
}

fn run_export(config: &Config, args: &[String]) -> Result<()> {
    let path = Path::new(args.first().context("expected <file.csv>")?);
    let store = open_store(config)?;

    let written = write_csv(path, &store.list()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✓ Exported {} expenses to {}", written, path.display());
    Ok(())
}

fn run_subjects() {
    let catalog = SubjectCatalog::default();
    for category in catalog.categories() {
        println!("{}", category.name);
        for subject in &category.subjects {
            println!("  - {}", subject);
        }
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    let mut store = open_store(config)?;
    let records = store.list()?;

    let mut app = ui::App::new(records);
    ui::run_ui(&mut app, &mut store)?;

    println!("✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin split-bill-server --features server");
    std::process::exit(1);
}
