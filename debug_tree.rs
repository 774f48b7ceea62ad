// Run with: cargo run -p filestamp-core --example debug_tree -- /path/to/scan

use filestamp_core::{ChecksumConfig, TreeConfig, TreeMessage, TreeScanner};
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn main() {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    println!("Scanning: {:?}", path);

    let config = TreeConfig {
        checksums: Some(ChecksumConfig::default()),
        ..TreeConfig::default()
    };
    let (rx, handle) = TreeScanner::new(config).scan(path);

    let start = Instant::now();
    let mut last_print = Instant::now();

    for msg in rx {
        match msg {
            TreeMessage::Progress(p) => {
                let now = Instant::now();
                if now.duration_since(last_print) > Duration::from_secs(1) {
                    println!(
                        "[{:>6.1}s] files={:<8} dirs={:<8} hashed={:<12} errors={:<4} path={:?}",
                        start.elapsed().as_secs_f64(),
                        p.files_scanned,
                        p.dirs_scanned,
                        p.bytes_hashed,
                        p.errors,
                        p.current_path
                            .as_ref()
                            .map(|p| p.to_string_lossy().to_string())
                            .unwrap_or_default()
                    );
                    last_print = now;
                }
            }
            TreeMessage::Completed => {
                println!("[{:>6.1}s] COMPLETED", start.elapsed().as_secs_f64());
            }
            TreeMessage::Cancelled => {
                println!("[{:>6.1}s] CANCELLED", start.elapsed().as_secs_f64());
            }
            _ => {}
        }
    }

    match handle.join() {
        Ok(Ok(snapshot)) => println!(
            "\nFinal: {} entries, {} bytes, signature {}",
            snapshot.len(),
            snapshot.total_size(),
            snapshot.signature()
        ),
        Ok(Err(e)) => eprintln!("\nScan failed: {}", e),
        Err(_) => eprintln!("\nScan thread panicked"),
    }
}
