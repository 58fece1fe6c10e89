//! overlaycache CLI
//!
//! Inspect and maintain an overlay cache file.

use clap::{Args, Parser, Subcommand};
use overlaycache::{CacheStore, Config, OverlayKind, RegionCoord, RECORD_LEN};
use tracing_subscriber::{fmt, EnvFilter};

/// overlaycache CLI
#[derive(Parser, Debug)]
#[command(name = "overlaycache-cli")]
#[command(about = "CLI for the overlay cache")]
#[command(version)]
struct Cli {
    /// Cache file
    #[arg(short, long, default_value = "./cache.db")]
    cache: String,

    #[command(subcommand)]
    command: Commands,
}

/// Identifies one record
#[derive(Args, Debug)]
struct Target {
    /// Overlay name
    overlay: String,

    /// Sub-variant suffix
    #[arg(short, long)]
    suffix: Option<String>,

    /// Region x
    #[arg(allow_hyphen_values = true)]
    x: i32,

    /// Region z
    #[arg(allow_hyphen_values = true)]
    z: i32,
}

impl Target {
    fn overlay(&self) -> OverlayKind {
        match &self.suffix {
            Some(suffix) => OverlayKind::with_sub_variants(&self.overlay, [suffix.as_str()]),
            None => OverlayKind::new(&self.overlay),
        }
    }

    fn coord(&self) -> RegionCoord {
        RegionCoord::new(self.x, self.z)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a record as a 32x32 grid
    Get(Target),

    /// Store a record with every value set to FILL
    Set {
        #[command(flatten)]
        target: Target,

        /// Value for all entries
        #[arg(allow_hyphen_values = true)]
        fill: i32,
    },

    /// Delete a record
    Del(Target),

    /// Delete a region from every table
    Invalidate {
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        z: i32,
    },

    /// Delete and recreate the cache file
    Clear,

    /// List cache tables
    Tables,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,overlaycache=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Cli::parse();

    let config = match Config::builder().cache_path(&args.cache).build() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut store = match CacheStore::open(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to open cache: {}", e);
            std::process::exit(1);
        }
    };

    let result = run(&mut store, args.command);

    drop(store);
    overlaycache::run_exit_hooks();

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(store: &mut CacheStore, command: Commands) -> overlaycache::Result<()> {
    match command {
        Commands::Get(target) => {
            let overlay = target.overlay();
            let suffix = target.suffix.as_deref();
            // Never create tables on a read; an absent table is a miss
            if !store.contains_table(&overlay, suffix)? {
                println!("(miss)");
                return Ok(());
            }
            match store.get_data(&overlay, suffix, target.coord())? {
                Some(values) => {
                    for row in values.chunks(32) {
                        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                        println!("{}", line.join(" "));
                    }
                }
                None => println!("(miss)"),
            }
        }
        Commands::Set { target, fill } => {
            let overlay = target.overlay();
            store.init_tables(&[&overlay])?;
            let values = [fill; RECORD_LEN];
            store.set_data(&overlay, target.suffix.as_deref(), target.coord(), &values)?;
            println!("OK");
        }
        Commands::Del(target) => {
            let overlay = target.overlay();
            let suffix = target.suffix.as_deref();
            if store.contains_table(&overlay, suffix)? {
                store.delete_data(&overlay, suffix, target.coord())?;
            }
            println!("OK");
        }
        Commands::Invalidate { x, z } => {
            store.delete_region(RegionCoord::new(x, z))?;
            println!("OK");
        }
        Commands::Clear => {
            store.clear()?;
            println!("OK");
        }
        Commands::Tables => {
            for table in store.known_tables() {
                println!("{}", table);
            }
        }
    }
    Ok(())
}
