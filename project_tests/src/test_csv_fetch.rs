//! # CSV Feed Live Fetch Test
//!
//! Fetches the upstream CSV once, with the same client and headers the relay
//! uses, and prints what came back. Nothing is written to the store.

use clap::Parser;
use lib_common::IngestConfig;
use lib_common::ingestors::{HttpSnapshotSource, SnapshotSource};
use lib_common::store::DELIMITER;
use lib_common::store::csv_rows::parse_records;

#[derive(Parser, Debug)]
#[clap(about = "Fetch the CSV feed once and summarise it")]
struct Args {
    /// Endpoint to fetch instead of the default feed.
    #[clap(long)]
    url: Option<String>,

    /// Data rows to print.
    #[clap(long, default_value_t = 5)]
    rows: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = IngestConfig::default();
    if let Some(url) = args.url {
        config.url = url;
    }
    config.validate()?;

    let source = HttpSnapshotSource::new(&config)?;
    println!("[*] Requesting {} ...", source.url());

    match source.fetch().await {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            let records = match parse_records(&text, DELIMITER) {
                Ok(records) => records,
                Err(e) => {
                    eprintln!("\n[ERROR] Snapshot is not valid CSV ({} bytes):", bytes.len());
                    eprintln!(">>> {}", e);
                    std::process::exit(1);
                }
            };

            println!("\n[SUCCESS] {} bytes received", bytes.len());
            println!("-----------------------------------------------");
            match records.split_first() {
                Some((header, rows)) => {
                    println!("header ({} columns): {}", header.len(), header.join(" | "));
                    for row in rows.iter().take(args.rows) {
                        println!("  {}", row.join(" | "));
                    }
                    println!("[INFO] {} data rows", rows.len());
                }
                None => println!("[WARN] Snapshot has no records"),
            }
            println!("-----------------------------------------------");
        }
        Err(e) => {
            eprintln!("\n[ERROR] Fetch failed ({:?}):", e.class());
            eprintln!(">>> {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
