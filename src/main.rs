//! slotdb - inspect and edit heap-file tables described by a catalog file

use anyhow::{bail, Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use slotdb::access::{collect_tuples, PageStore, RecordId, Tuple, Value};
use slotdb::config::DbConfig;
use slotdb::database::Database;
use slotdb::storage::PageId;
use slotdb::transaction::Permissions;
use std::path::PathBuf;

/// slotdb - a heap-file storage engine
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Catalog file listing one table per line
    #[arg(short, long, default_value = "catalog.txt")]
    catalog: PathBuf,

    /// JSON config file; the flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bytes per page [default: 4096]
    #[arg(long)]
    page_size: Option<usize>,

    /// Pages cached by the buffer pool [default: 50]
    #[arg(long)]
    pool_pages: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the tables in the catalog
    Tables,
    /// Print every tuple of a table
    Scan { table: String },
    /// Insert one tuple; values are given in field order
    Insert { table: String, values: Vec<String> },
    /// Delete the tuple stored at a page and slot
    Delete { table: String, page: u32, slot: usize },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match &args.config {
        Some(path) => DbConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DbConfig::default(),
    };
    if let Some(page_size) = args.page_size {
        config = config.with_page_size(page_size);
    }
    if let Some(pages) = args.pool_pages {
        config = config.with_buffer_pool_pages(pages);
    }
    let db = Database::open(config, &args.catalog)
        .with_context(|| format!("Failed to open catalog {}", args.catalog.display()))?;

    match args.command {
        Command::Tables => list_tables(&db),
        Command::Scan { table } => scan(&db, &table),
        Command::Insert { table, values } => insert(&db, &table, &values),
        Command::Delete { table, page, slot } => delete(&db, &table, page, slot),
    }
}

fn list_tables(db: &Database) -> Result<()> {
    let catalog = db.catalog();
    for table_id in catalog.table_ids() {
        let name = catalog.table_name(table_id)?;
        let file = catalog.table_file(table_id)?;
        let pk = catalog.primary_key(table_id)?.unwrap_or_default();
        println!(
            "{}\t{}\t[{}]\tpk={}\tpages={}",
            table_id,
            name,
            file.schema(),
            pk,
            file.num_pages()?
        );
    }
    Ok(())
}

fn scan(db: &Database, table: &str) -> Result<()> {
    let table_id = db.catalog().table_id(table)?;
    let txn = db.begin();
    let mut cursor = db.scan(txn, table_id)?;
    for tuple in collect_tuples(&mut cursor)? {
        println!("{}", tuple);
    }
    db.buffer_pool().transaction_complete(txn, true);
    Ok(())
}

fn insert(db: &Database, table: &str, values: &[String]) -> Result<()> {
    let table_id = db.catalog().table_id(table)?;
    let schema = db.catalog().schema(table_id)?;
    if values.len() != schema.num_fields() {
        bail!(
            "Table {} has {} fields, got {} values",
            table,
            schema.num_fields(),
            values.len()
        );
    }

    let fields = schema
        .types()
        .zip(values)
        .map(|(field_type, text)| {
            Value::parse(field_type, text)
                .with_context(|| format!("Invalid {} value: {:?}", field_type, text))
        })
        .collect::<Result<Vec<_>>>()?;

    let txn = db.begin();
    let mut tuple = Tuple::new(schema, fields)?;
    let record_id = db.buffer_pool().insert_tuple(txn, table_id, &mut tuple)?;
    db.buffer_pool().flush_pages(txn)?;
    db.buffer_pool().transaction_complete(txn, true);
    println!("Inserted at page {} slot {}", record_id.page_id.page_number, record_id.slot);
    Ok(())
}

fn delete(db: &Database, table: &str, page: u32, slot: usize) -> Result<()> {
    let table_id = db.catalog().table_id(table)?;
    let txn = db.begin();
    let page_id = PageId::new(table_id, page);

    let file = db.catalog().table_file(table_id)?;
    if page >= file.num_pages()? {
        bail!("Table {} has no page {}", table, page);
    }
    let page_ref = db.buffer_pool().get_page(txn, page_id, Permissions::ReadWrite)?;
    let tuple = page_ref.read().tuple_at(slot).cloned();
    let Some(tuple) = tuple else {
        bail!("No tuple at {:?}", RecordId::new(page_id, slot));
    };

    db.buffer_pool().delete_tuple(txn, &tuple)?;
    db.buffer_pool().flush_pages(txn)?;
    db.buffer_pool().transaction_complete(txn, true);
    println!("Deleted {}", tuple);
    Ok(())
}
