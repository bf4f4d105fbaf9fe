//! # embercache Server Entry Point
//!
//! Binary entry point for the cache server.
//!
//! ## Usage
//!
//! ```bash
//! # Defaults: LRU, best-fit, 2560 x 40KiB pages, 4 workers, port 7171
//! embercache
//!
//! # Pick a policy and port
//! embercache --policy sieve --port 9000
//!
//! # Small geometry for experiments
//! embercache --page-size 1024 --pages 256 --strategy first-fit
//! ```

use std::sync::Arc;

use eyre::{bail, Result, WrapErr};

use embercache::{Cache, CacheConfig, CacheServer};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = CacheConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-v" => {
                println!("embercache {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--policy" => {
                config.policy = next_value(&args, &mut i, "--policy")?
                    .parse()
                    .map_err(|e: String| eyre::eyre!(e))?;
            }
            "--strategy" => {
                config.strategy = next_value(&args, &mut i, "--strategy")?
                    .parse()
                    .map_err(|e: String| eyre::eyre!(e))?;
            }
            "--port" => {
                config.port = parse_number(next_value(&args, &mut i, "--port")?, "--port")?;
            }
            "--workers" => {
                config.worker_count =
                    parse_number(next_value(&args, &mut i, "--workers")?, "--workers")?;
            }
            "--pages" => {
                config.num_pages = parse_number(next_value(&args, &mut i, "--pages")?, "--pages")?;
            }
            "--page-size" => {
                config.page_size =
                    parse_number(next_value(&args, &mut i, "--page-size")?, "--page-size")?;
            }
            arg => {
                bail!("Unknown option: {arg} (try --help)");
            }
        }
        i += 1;
    }

    config.validate()?;

    let cache = Arc::new(Cache::new(&config).wrap_err("failed to initialize cache")?);
    let server = CacheServer::bind(&config, Arc::clone(&cache))?;
    let addr = server.local_addr()?;

    println!("embercache listening on {addr}");
    println!("  policy:   {}", config.policy.name());
    println!("  strategy: {}", config.strategy.name());
    println!(
        "  pages:    {} x {} bytes ({:.1} MB)",
        config.num_pages,
        config.page_size,
        config.capacity_bytes() as f64 / (1024.0 * 1024.0)
    );
    println!("  workers:  {}", config.worker_count);

    server.serve()
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(|s| s.as_str())
        .ok_or_else(|| eyre::eyre!("{flag} requires a value"))
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| eyre::eyre!("{flag}: invalid number '{value}'"))
}

fn print_usage() {
    println!("embercache - networked page cache with defragmentation");
    println!();
    println!("USAGE:");
    println!("  embercache [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  --policy <lru|fifo|sieve|clock>      Eviction policy (default: lru)");
    println!("  --strategy <best-fit|first-fit>      Allocation strategy (default: best-fit)");
    println!("  --port <port>                        TCP port (default: 7171)");
    println!("  --workers <count>                    Worker threads (default: 4)");
    println!("  --pages <count>                      Backing store pages (default: 2560)");
    println!("  --page-size <bytes>                  Page size in bytes (default: 40960)");
    println!("  --help, -h                           Show this help");
    println!("  --version, -v                        Show version");
}
