use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use invoice_desk::api::{ApiClient, BankDirectory, InvoicePayload, InvoiceSource};
use invoice_desk::config::{
    config_dir, load_config, resolve_output_dir, SessionStore, CONFIG_TEMPLATE,
};
use invoice_desk::error::{InvoiceError, Result};
use invoice_desk::invoice::{
    DocumentOptions, ExpenseEdit, InvoiceDocument, InvoiceView, ItemEdit, Mode, RateMode,
    ViewScope,
};
use invoice_desk::pdf::{download_file_name, export, BusyIndicator, ExportMode, TypstBackend};
use invoice_desk::render::{format_amount, format_number, render, render_text, resolve_bank_panel, theme};

#[derive(Parser)]
#[command(name = "invoice-desk")]
#[command(version, about = "Review, edit and export hierarchical invoices", long_about = None)]
struct Cli {
    /// Path to config directory (default: XDG config dir or ~/.invoice-desk)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a config.toml template
    Init,

    /// List invoice templates from the backend
    Templates {
        /// Only show templates whose name or description contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// List bank records from the backend
    Banks,

    /// Fetch an invoice and start a fresh session for it
    Load {
        /// Template id
        template: String,

        /// Read the print-view payload from a JSON file instead of the backend
        #[arg(long, value_name = "FILE")]
        payload: Option<PathBuf>,

        /// Display name of the template
        #[arg(long)]
        name: Option<String>,
    },

    /// List loaded invoices
    Sessions,

    /// Show an invoice
    Show { template: String },

    /// Enter editing mode, or leave it and save changes
    Edit { template: String },

    /// Edit a line item
    Set {
        template: String,

        /// Line item number (1-based)
        #[arg(value_parser = parse_row)]
        row: usize,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Flat, Daily, Monthly or Hourly
        #[arg(long)]
        mode: Option<RateMode>,

        #[arg(long)]
        duration: Option<String>,

        #[arg(long)]
        rate: Option<String>,

        #[arg(long)]
        currency: Option<String>,
    },

    /// Edit invoice and due dates (YYYY-MM-DD, empty to clear)
    Date {
        template: String,

        #[arg(long)]
        invoice: Option<String>,

        #[arg(long)]
        due: Option<String>,
    },

    /// Set the tax percent
    Tax {
        template: String,

        #[arg(allow_hyphen_values = true)]
        percent: String,
    },

    /// Manage the extra expenses of a line item
    Expense {
        template: String,

        #[command(subcommand)]
        action: ExpenseAction,
    },

    /// Choose which line items are shown and counted
    Scope {
        template: String,

        #[command(subcommand)]
        scope: ScopeArg,
    },

    /// Show or hide the expenses of a line item
    Expand {
        template: String,

        #[arg(value_parser = parse_row)]
        row: usize,
    },

    /// Pick a colour theme by number (1-4) or name
    Theme { template: String, theme: String },

    /// Bind a bank record to the invoice, or 'none' to unbind
    Bank { template: String, bank: String },

    /// Discard local edits and return to the loaded invoice
    Reset { template: String },

    /// Export the invoice as a paginated PDF
    Export {
        template: String,

        /// Open the PDF in the system viewer for printing instead of saving it
        #[arg(long, conflicts_with = "output")]
        print: bool,

        /// Output file (default: output_dir/Invoice_<id>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ExpenseAction {
    /// Fill in the pending expense of a row
    Draft {
        #[arg(value_parser = parse_row)]
        row: usize,

        #[command(flatten)]
        fields: ExpenseFields,
    },

    /// Add the pending expense of a row, optionally filling it in first
    Add {
        #[arg(value_parser = parse_row)]
        row: usize,

        #[command(flatten)]
        fields: ExpenseFields,
    },

    /// Edit a saved expense
    Set {
        #[arg(value_parser = parse_row)]
        row: usize,

        /// Expense number within the row (1-based)
        #[arg(value_parser = parse_row)]
        index: usize,

        #[command(flatten)]
        fields: ExpenseFields,
    },

    /// Remove a saved expense
    Remove {
        #[arg(value_parser = parse_row)]
        row: usize,

        #[arg(value_parser = parse_row)]
        index: usize,
    },
}

#[derive(Args)]
struct ExpenseFields {
    #[arg(long)]
    label: Option<String>,

    #[arg(long)]
    amount: Option<String>,

    #[arg(long)]
    duration: Option<String>,

    #[arg(long)]
    currency: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    mode: Option<RateMode>,
}

impl From<ExpenseFields> for ExpenseEdit {
    fn from(fields: ExpenseFields) -> Self {
        ExpenseEdit {
            label: fields.label,
            amount: fields.amount,
            duration: fields.duration,
            currency: fields.currency,
            description: fields.description,
            rate_mode: fields.mode,
        }
    }
}

#[derive(Subcommand)]
enum ScopeArg {
    /// All line items
    Full,
    /// A single line item
    Individual {
        #[arg(value_parser = parse_row)]
        row: usize,
    },
}

/// 1-based number on the command line, zero-based index inside
fn parse_row(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("'{s}' is not a row number (rows start at 1)")),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };
    debug!(config_dir = %cfg_dir.display(), "using config directory");

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Templates { search } => cmd_templates(&cfg_dir, search.as_deref()),
        Commands::Banks => cmd_banks(&cfg_dir),
        Commands::Load {
            template,
            payload,
            name,
        } => cmd_load(&cfg_dir, &template, payload.as_deref(), name),
        Commands::Sessions => cmd_sessions(&cfg_dir),
        Commands::Show { template } => cmd_show(&cfg_dir, &template),
        Commands::Edit { template } => cmd_edit(&cfg_dir, &template),
        Commands::Set {
            template,
            row,
            name,
            description,
            mode,
            duration,
            rate,
            currency,
        } => {
            let edit = ItemEdit {
                name,
                description,
                rate_mode: mode,
                duration,
                rate_amount: rate,
                currency,
            };
            Session::update(&cfg_dir, &template, |doc| {
                doc.edit_item(row, &edit)?;
                let charges = doc.line_charges(row);
                println!("Row {} total: {}", row + 1, format_amount(charges.total()));
                Ok(())
            })
        }
        Commands::Date {
            template,
            invoice,
            due,
        } => Session::update(&cfg_dir, &template, |doc| {
            doc.set_dates(invoice.as_deref(), due.as_deref())?;
            let (invoice_date, due_date) = doc.edit_dates();
            println!("Invoice date: {}", or_dash(invoice_date));
            println!("Due date:     {}", or_dash(due_date));
            Ok(())
        }),
        Commands::Tax { template, percent } => Session::update(&cfg_dir, &template, |doc| {
            doc.set_tax_percent(&percent)?;
            Ok(())
        }),
        Commands::Expense { template, action } => cmd_expense(&cfg_dir, &template, action),
        Commands::Scope { template, scope } => Session::update(&cfg_dir, &template, |doc| {
            let scope = match scope {
                ScopeArg::Full => ViewScope::Full,
                ScopeArg::Individual { row } => ViewScope::Individual(row),
            };
            doc.set_scope(scope)?;
            Ok(())
        }),
        Commands::Expand { template, row } => Session::update(&cfg_dir, &template, |doc| {
            let expanded = doc.toggle_expand(row)?;
            let state = if expanded { "shown" } else { "hidden" };
            println!("Expenses of row {} {state}", row + 1);
            Ok(())
        }),
        Commands::Theme {
            template,
            theme: choice,
        } => {
            let index = theme::resolve(&choice)?;
            Session::update(&cfg_dir, &template, |doc| {
                doc.set_theme(index);
                println!("Theme: {}", theme::THEMES[index].name);
                Ok(())
            })
        }
        Commands::Bank { template, bank } => Session::update(&cfg_dir, &template, |doc| {
            let bank_id = if bank.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(bank.clone())
            };
            doc.select_bank(bank_id)?;
            match doc.bank_id() {
                Some(id) => println!("Bank {id} selected"),
                None => println!("No bank selected"),
            }
            Ok(())
        }),
        Commands::Reset { template } => Session::update(&cfg_dir, &template, |doc| {
            doc.reset();
            println!("Discarded local changes");
            Ok(())
        }),
        Commands::Export {
            template,
            print,
            output,
        } => cmd_export(&cfg_dir, &template, print, output),
    }
}

/// A loaded invoice together with where it is stored
struct Session {
    store: SessionStore,
    template: String,
    doc: InvoiceDocument,
}

impl Session {
    fn open(cfg_dir: &Path, template: &str) -> Result<Self> {
        let config = load_config(cfg_dir)?;
        let store = SessionStore::new(cfg_dir);
        let doc = store.load(template, &config.document_options())?;
        Ok(Self {
            store,
            template: template.to_string(),
            doc,
        })
    }

    fn save(&self) -> Result<()> {
        self.store.save(&self.template, &self.doc)
    }

    /// Apply `f` to the stored document, persist it and print the totals
    fn update<F>(cfg_dir: &Path, template: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut InvoiceDocument) -> Result<()>,
    {
        let mut session = Session::open(cfg_dir, template)?;
        f(&mut session.doc)?;
        session.save()?;
        print_totals(&session.doc);
        Ok(())
    }
}

fn print_totals(doc: &InvoiceDocument) {
    let totals = doc.totals();
    println!(
        "Subtotal: {}  Tax ({}%): {}  Grand Total: {}",
        format_amount(totals.subtotal),
        format_number(totals.tax_percent),
        format_amount(totals.tax_amount),
        format_amount(totals.grand_total),
    );
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    if cfg_dir.exists() {
        return Err(InvoiceError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir.join("output"))?;
    fs::create_dir_all(cfg_dir.join("sessions"))?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;

    println!("Initialized invoice-desk config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Point it at your backend:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Find a template:           invoice-desk templates");
    println!("  3. Load its invoice:          invoice-desk load <template-id>");

    Ok(())
}

#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "CURRENCY")]
    currency: String,
    #[tabled(rename = "PROJECTS")]
    projects: usize,
}

#[derive(Tabled)]
struct BankRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "COUNTRY")]
    country: String,
    #[tabled(rename = "ACCOUNT")]
    account: String,
}

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "TEMPLATE")]
    template: String,
    #[tabled(rename = "INVOICE")]
    invoice: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "MODE")]
    mode: String,
    #[tabled(rename = "ITEMS")]
    items: usize,
    #[tabled(rename = "GRAND TOTAL")]
    total: String,
}

fn cmd_templates(cfg_dir: &Path, search: Option<&str>) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let client = ApiClient::new(&config.api);
    let templates = client.templates()?;

    let rows: Vec<TemplateRow> = templates
        .iter()
        .filter(|(_, t)| search.map_or(true, |s| t.matches(s)))
        .map(|(key, t)| TemplateRow {
            id: t.id.clone().unwrap_or_else(|| key.clone()),
            name: t.name.clone(),
            description: t.description.clone().unwrap_or_default(),
            currency: t.currency.clone().unwrap_or_default(),
            projects: t.project_ids.len().max(t.projects.len()),
        })
        .collect();

    if rows.is_empty() {
        println!("No templates found.");
        return Ok(());
    }

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn cmd_banks(cfg_dir: &Path) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let banks = ApiClient::new(&config.api).banks()?;

    if banks.is_empty() {
        println!("No banks available.");
        return Ok(());
    }

    let rows: Vec<BankRow> = banks
        .iter()
        .map(|b| BankRow {
            id: b.key().unwrap_or("-").to_string(),
            name: b.name.clone(),
            country: b.country.clone(),
            account: b.account_number.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn read_payload(path: &Path) -> Result<InvoicePayload> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| InvoiceError::PayloadParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Template name from the backend; a missing name is not fatal
fn template_name(source: &dyn InvoiceSource, template: &str) -> String {
    match source.templates() {
        Ok(templates) => templates
            .get(template)
            .map(|t| t.name.clone())
            .unwrap_or_default(),
        Err(e) => {
            warn!(template, error = %e, "could not fetch template name");
            String::new()
        }
    }
}

fn cmd_load(
    cfg_dir: &Path,
    template: &str,
    payload_path: Option<&Path>,
    name: Option<String>,
) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let options: DocumentOptions = config.document_options();

    let (payload, name) = match payload_path {
        Some(path) => (read_payload(path)?, name.unwrap_or_default()),
        None => {
            let client = ApiClient::new(&config.api);
            let payload = client.print_view(template)?;
            let name = name.unwrap_or_else(|| template_name(&client, template));
            (payload, name)
        }
    };

    let view = InvoiceView::from_payload(template, &name, &payload, &options);
    let mut doc = InvoiceDocument::new(view, options);
    match theme::resolve(&config.appearance.theme) {
        Ok(index) => doc.set_theme(index),
        Err(e) => warn!(error = %e, "falling back to the default theme"),
    }

    SessionStore::new(cfg_dir).save(template, &doc)?;

    println!(
        "Loaded {} with {} line item(s)",
        doc.baseline().invoice_id,
        doc.items().len()
    );
    print_totals(&doc);
    Ok(())
}

fn cmd_sessions(cfg_dir: &Path) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let docs = SessionStore::new(cfg_dir).list(&config.document_options())?;

    if docs.is_empty() {
        println!("No invoices loaded.");
        println!("Load one with: invoice-desk load <template-id>");
        return Ok(());
    }

    let rows: Vec<SessionRow> = docs
        .iter()
        .map(|doc| {
            let view = doc.baseline();
            SessionRow {
                template: view.template_id.clone(),
                invoice: view.invoice_id.clone(),
                name: view.template_name.clone(),
                mode: match doc.mode() {
                    Mode::Viewing => "viewing".to_string(),
                    Mode::Editing => "editing".to_string(),
                },
                items: doc.items().len(),
                total: format_amount(doc.totals().grand_total),
            }
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn not_available(template: &str) {
    println!("Invoice data for template '{template}' is not yet available.");
    println!("Run 'invoice-desk load {template}' to fetch it.");
}

fn cmd_show(cfg_dir: &Path, template: &str) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let store = SessionStore::new(cfg_dir);
    let Some(doc) = store.try_load(template, &config.document_options())? else {
        not_available(template);
        return Ok(());
    };

    let client = ApiClient::new(&config.api);
    let panel = resolve_bank_panel(&doc, &client as &dyn BankDirectory);
    print!("{}", render_text(&render(&doc, &panel, config.appearance.dark)));
    Ok(())
}

fn cmd_edit(cfg_dir: &Path, template: &str) -> Result<()> {
    let mut session = Session::open(cfg_dir, template)?;
    let mut sink = session.store.change_sink(template);

    match session.doc.toggle_editing(&mut sink)? {
        Mode::Editing => println!(
            "Editing {}. Run 'invoice-desk edit {template}' again to save.",
            session.doc.baseline().invoice_id
        ),
        Mode::Viewing => println!("Saved changes to {}", sink.path().display()),
    }

    session.save()?;
    print_totals(&session.doc);
    Ok(())
}

fn cmd_expense(cfg_dir: &Path, template: &str, action: ExpenseAction) -> Result<()> {
    Session::update(cfg_dir, template, |doc| match action {
        ExpenseAction::Draft { row, fields } => {
            doc.edit_draft(row, &fields.into())?;
            println!(
                "Pending expense on row {}: {}",
                row + 1,
                format_amount(doc.line_charges(row).pending)
            );
            Ok(())
        }
        ExpenseAction::Add { row, fields } => {
            doc.edit_draft(row, &fields.into())?;
            if doc.confirm_draft(row)? {
                println!(
                    "Added expense {} to row {}",
                    doc.saved_expenses(row).len(),
                    row + 1
                );
            } else {
                println!("Nothing to add: the pending expense on row {} is empty", row + 1);
            }
            Ok(())
        }
        ExpenseAction::Set { row, index, fields } => {
            doc.edit_expense(row, index, &fields.into())?;
            Ok(())
        }
        ExpenseAction::Remove { row, index } => {
            let removed = doc.remove_expense(row, index)?;
            let label = if removed.label.is_empty() {
                "expense"
            } else {
                removed.label.as_str()
            };
            println!("Removed {label} from row {}", row + 1);
            Ok(())
        }
    })
}

struct StderrBusy;

impl BusyIndicator for StderrBusy {
    fn start(&self) {
        eprintln!("Generating PDF...");
    }

    fn finish(&self) {
        debug!("PDF generation finished");
    }
}

fn cmd_export(cfg_dir: &Path, template: &str, print: bool, output: Option<PathBuf>) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let store = SessionStore::new(cfg_dir);
    let doc = store.try_load(template, &config.document_options())?;

    let rendered = doc.as_ref().map(|doc| {
        let client = ApiClient::new(&config.api);
        let panel = resolve_bank_panel(doc, &client as &dyn BankDirectory);
        render(doc, &panel, config.appearance.dark)
    });

    let mode = if print {
        ExportMode::Print
    } else {
        let path = match (output, &rendered) {
            (Some(path), _) => path,
            (None, Some(r)) => resolve_output_dir(&config.pdf.output_dir, cfg_dir)
                .join(download_file_name(&r.invoice_id)),
            (None, None) => PathBuf::new(),
        };
        ExportMode::Download(path)
    };

    let backend = match rendered {
        Some(_) => TypstBackend::new()?,
        None => TypstBackend::default(),
    };

    match export(rendered.as_ref(), &mode, &backend, &StderrBusy)? {
        Some(path) if print => println!("Opened {} for printing", path.display()),
        Some(path) => println!("Saved: {}", path.display()),
        None => not_available(template),
    }
    Ok(())
}
