use anyhow::Context;
use chrono::DateTime;
use clap::{Parser, Subcommand};
use lootcase_core::{
    Catalog, EconomyConfig, InventoryItem, ReplayRng, Session, SqliteStore, DEFAULT_DB_PATH,
};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lootcase", about = "Open cases, sell and upgrade skins from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// SQLite file holding balance and inventory
    #[arg(long, env = "LOOTCASE_DB", default_value = DEFAULT_DB_PATH)]
    db: String,
    /// Case catalog JSON
    #[arg(long, env = "LOOTCASE_CATALOG", default_value = "data/cases.json")]
    catalog: String,
    /// Economy config JSON, reference values when absent
    #[arg(long, env = "LOOTCASE_CONFIG")]
    config: Option<String>,
    /// Replay seed; draws are OS-random when absent
    #[arg(long, env = "LOOTCASE_SEED")]
    seed: Option<String>,
    /// Nonce paired with --seed
    #[arg(long, default_value_t = 0)]
    nonce: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// List cases with their drop odds
    Cases,
    /// Buy and open a case
    Open { case_id: u64 },
    /// Sell an inventory item at its listed price
    Sell { item_id: u64 },
    /// Gamble the listed items for a one-tier promotion of the first
    Upgrade {
        #[arg(required = true)]
        item_ids: Vec<u64>,
        /// Success chance override in percent (single item only)
        #[arg(long)]
        chance: Option<u8>,
    },
    /// Show every item in the inventory
    Inventory,
    /// Balance, inventory value and the most valuable items
    Stats {
        #[arg(default_value_t = 5)]
        top: usize,
    },
    /// Export the inventory to CSV path
    ExportCsv { path: String },
    /// Restore the starting balance and empty the inventory
    Reset,
}

type CliSession = Session<SqliteStore, Box<dyn RngCore>>;

fn open_session(cli: &Cli) -> anyhow::Result<CliSession> {
    let catalog = Catalog::load(&cli.catalog)
        .with_context(|| format!("loading catalog {}", cli.catalog))?;
    let config = match &cli.config {
        Some(path) => {
            EconomyConfig::load(path).with_context(|| format!("loading config {path}"))?
        }
        None => EconomyConfig::default(),
    };
    let rng: Box<dyn RngCore> = match &cli.seed {
        Some(seed) => {
            let rng = ReplayRng::new(seed.as_str(), cli.nonce);
            println!("seed hash {} nonce {}", rng.seed_hash_hex(), rng.nonce());
            Box::new(rng)
        }
        None => Box::new(StdRng::from_entropy()),
    };
    let store = SqliteStore::open(&cli.db).with_context(|| format!("opening {}", cli.db))?;
    debug!(db = %cli.db, "store opened");
    Ok(Session::start(store, catalog, config, rng)?)
}

fn print_item(item: &InventoryItem) {
    let acquired = i64::try_from(item.id)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let knife = if item.is_knife { " ★" } else { "" };
    println!(
        "#{:>14} {:<18} {:<36} {:>9} {}{}",
        item.id,
        item.rarity.as_str(),
        item.name,
        item.price,
        acquired,
        knife
    );
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
    let cli = Cli::parse();
    let mut session = open_session(&cli)?;

    match cli.command {
        Commands::Cases => {
            for case in &session.catalog().cases {
                println!(
                    "[{}] {} ${} ({} items)",
                    case.id,
                    case.name,
                    case.price,
                    case.skins.len()
                );
                for odds in session.odds(case.id)? {
                    println!(
                        "    {:<18} {:>9.4}%",
                        odds.rarity.as_str(),
                        odds.probability * 100.0
                    );
                }
            }
        }
        Commands::Open { case_id } => {
            let opening = session.open_case(case_id)?;
            session.settle();
            println!("Paid ${}, unboxed:", opening.price_paid);
            print_item(&opening.item);
            println!("Balance ${}", opening.balance);
        }
        Commands::Sell { item_id } => {
            let sold = session.sell_item(item_id)?;
            println!("Sold {} for ${}. Balance ${}", sold.name, sold.price, session.balance());
        }
        Commands::Upgrade { item_ids, chance } => {
            let outcome = session.upgrade(&item_ids, chance)?;
            session.settle();
            println!("Chance {}%, rolled {:.2}", outcome.chance, outcome.roll);
            match &outcome.promoted {
                Some(item) => {
                    println!("Upgrade succeeded:");
                    print_item(item);
                }
                None => println!("Upgrade failed"),
            }
            for lost in &outcome.items_lost {
                println!("Lost {} ({})", lost.name, lost.rarity);
            }
        }
        Commands::Inventory => {
            if session.inventory().is_empty() {
                println!("Inventory is empty");
            }
            for item in session.inventory() {
                print_item(item);
            }
        }
        Commands::Stats { top } => {
            let summary = session.summary(top);
            let candidates = session.ledger().state().upgrade_candidates().count();
            println!("Balance          ${}", session.balance());
            println!("Items            {}", summary.item_count);
            println!("Inventory value  ${}", summary.total_value);
            println!("Upgradeable      {}", candidates);
            for item in &summary.featured {
                print_item(item);
            }
        }
        Commands::ExportCsv { path } => {
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record([
                "id",
                "name",
                "weapon",
                "skin",
                "rarity",
                "price",
                "is_knife",
                "upgraded_from",
                "upgraded_at",
            ])?;
            for item in session.inventory() {
                wtr.write_record([
                    item.id.to_string(),
                    item.name.clone(),
                    item.weapon.clone(),
                    item.skin.clone(),
                    item.rarity.to_string(),
                    item.price.to_string(),
                    item.is_knife.to_string(),
                    item.upgraded_from.map(|r| r.to_string()).unwrap_or_default(),
                    item.upgraded_at.map(|ts| ts.to_rfc3339()).unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
            println!("Exported {} items to {}", session.inventory().len(), path);
        }
        Commands::Reset => {
            session.reset()?;
            println!("Balance reset to ${}", session.balance());
        }
    }

    Ok(())
}
