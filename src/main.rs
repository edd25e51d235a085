use chargeable::application::engine::ChargeEngine;
use chargeable::config::ChargeConfig;
use chargeable::domain::chargeable::ChargeArgs;
use chargeable::domain::invoice::{INVOICE_KIND, Invoice};
use chargeable::domain::payer::Customer;
use chargeable::domain::ports::{ChargeStoreBox, LeaseStoreBox};
use chargeable::error::Result as ChargeResult;
use chargeable::infrastructure::in_memory::{InMemoryChargeStore, InMemoryLeaseStore};
use chargeable::infrastructure::processor::InMemoryProcessor;
use chargeable::interfaces::csv::charge_writer::ChargeWriter;
use chargeable::interfaces::csv::customer_reader::CustomerReader;
use chargeable::interfaces::csv::operation_reader::{Operation, OperationReader, OperationType};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Operations CSV file (type, invoice, customer, amount, reason)
    input: PathBuf,

    /// Customers CSV file (customer, token, active)
    #[arg(long)]
    customers: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Override the minimum chargeable amount, in cents
    #[arg(long)]
    min_charge: Option<u64>,

    /// Override the maximum chargeable amount, in cents
    #[arg(long)]
    max_charge: Option<u64>,

    /// Override the lease duration, in seconds
    #[arg(long)]
    lock_ttl_secs: Option<u64>,

    /// Override the charge currency
    #[arg(long)]
    currency: Option<String>,
}

impl Cli {
    fn load_config(&self) -> ChargeResult<ChargeConfig> {
        let mut config = match &self.config {
            Some(path) => ChargeConfig::from_path(path)?,
            None => ChargeConfig::default(),
        };
        if let Some(min) = self.min_charge {
            config.minimum_charge_amount = min;
        }
        if let Some(max) = self.max_charge {
            config.maximum_charge_amount = max;
        }
        if let Some(ttl) = self.lock_ttl_secs {
            config.lock_ttl_secs = ttl;
        }
        if let Some(currency) = &self.currency {
            config.currency = currency.clone();
        }
        Ok(config)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> ChargeResult<(ChargeStoreBox, LeaseStoreBox)> {
    use chargeable::infrastructure::rocksdb::RocksDBStore;

    if let Some(db_path) = db_path {
        let store = RocksDBStore::open(db_path)?;
        return Ok((Box::new(store.clone()), Box::new(store)));
    }
    Ok((
        Box::new(InMemoryChargeStore::new()),
        Box::new(InMemoryLeaseStore::new()),
    ))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> ChargeResult<(ChargeStoreBox, LeaseStoreBox)> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }
    Ok((
        Box::new(InMemoryChargeStore::new()),
        Box::new(InMemoryLeaseStore::new()),
    ))
}

fn read_customers(path: Option<&PathBuf>) -> Result<HashMap<String, Customer>> {
    let mut customers = HashMap::new();
    let Some(path) = path else {
        return Ok(customers);
    };
    let file = File::open(path).into_diagnostic()?;
    for customer in CustomerReader::new(file).customers() {
        match customer {
            Ok(customer) => {
                customers.insert(customer.id.clone(), customer);
            }
            Err(e) => eprintln!("Error reading customer: {}", e),
        }
    }
    Ok(customers)
}

/// Pulls a previously stored invoice into `invoices` if this batch has not
/// seen it yet.
async fn load_invoice(
    engine: &ChargeEngine,
    invoices: &mut BTreeMap<u64, Invoice>,
    id: u64,
) -> ChargeResult<()> {
    if invoices.contains_key(&id) {
        return Ok(());
    }
    if let Some(record) = engine.find(INVOICE_KIND, id).await? {
        let total = record.charge_amount.unwrap_or(0);
        invoices.insert(id, Invoice::from_record(record, None, total));
    }
    Ok(())
}

async fn apply(
    engine: &ChargeEngine,
    invoices: &mut BTreeMap<u64, Invoice>,
    customers: &HashMap<String, Customer>,
    op: Operation,
) -> ChargeResult<()> {
    let customer = op.customer.as_ref().and_then(|id| customers.get(id)).cloned();
    load_invoice(engine, invoices, op.invoice).await?;

    match op.r#type {
        OperationType::Charge => {
            let invoice = invoices
                .entry(op.invoice)
                .or_insert_with(|| Invoice::new(op.invoice, None, 0));
            if customer.is_some() {
                invoice.customer = customer;
            }
            if let Some(amount) = op.amount {
                invoice.total = amount;
            }
            let paid = engine.charge(invoice, &ChargeArgs::new()).await?;
            info!(invoice = op.invoice, paid, "charge processed");
        }
        OperationType::Refund => {
            let Some(invoice) = invoices.get_mut(&op.invoice) else {
                eprintln!("Unknown invoice {}", op.invoice);
                return Ok(());
            };
            let refunded = engine
                .refund(invoice, op.amount, op.reason.unwrap_or_default())
                .await?;
            info!(invoice = op.invoice, refunded, "refund processed");
        }
        OperationType::Void => {
            let invoice = invoices
                .entry(op.invoice)
                .or_insert_with(|| Invoice::new(op.invoice, customer, op.amount.unwrap_or(0)));
            invoice.voided = true;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = cli.load_config().into_diagnostic()?;
    let customers = read_customers(cli.customers.as_ref())?;
    let (store, leases) = open_stores(cli.db_path.clone()).into_diagnostic()?;
    let engine = ChargeEngine::new(store, leases, Box::new(InMemoryProcessor::new()), config)
        .into_diagnostic()?;

    let mut invoices = BTreeMap::new();
    let file = File::open(&cli.input).into_diagnostic()?;
    for op_result in OperationReader::new(file).operations() {
        match op_result {
            Ok(op) => {
                if let Err(e) = apply(&engine, &mut invoices, &customers, op).await {
                    eprintln!("Error processing operation: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {}", e);
            }
        }
    }

    let stdout = io::stdout();
    let mut writer = ChargeWriter::new(stdout.lock());
    writer
        .write_records(invoices.values().map(|invoice| &invoice.record))
        .into_diagnostic()?;

    Ok(())
}
