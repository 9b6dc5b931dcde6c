//! Compare set/scan throughput of every backend over the same bit pattern

use bitarray::{BitArrayConfig, BucketGeometry, Result};
use std::time::Instant;

fn main() -> Result<()> {
    println!("Backend Throughput - Unified Interface");

    // Test parameters
    let capacity = 1 << 20;
    let writes = 200_000;
    println!("Capacity: {capacity} bits, {writes} writes per backend");

    let dir = std::env::temp_dir();
    let configs = [
        BitArrayConfig::InMemory { capacity },
        BitArrayConfig::Sparse {
            geometry: BucketGeometry::new(capacity / 4096, 4096)?,
        },
        BitArrayConfig::SyncFile {
            path: dir.join("throughput_sync.bits"),
            capacity,
        },
        BitArrayConfig::Mmap {
            path: dir.join("throughput_mmap.bits"),
            capacity,
        },
    ];

    for config in &configs {
        let mut bits = config.open()?;
        bits.clear()?;

        let start = Instant::now();
        for i in 0..writes {
            bits.set_bit((i * 7919) % capacity)?;
        }
        let write_time = start.elapsed();

        let start = Instant::now();
        let highest = bits.highest_bit_set()?;
        let ones = bits.count_ones()?;
        let scan_time = start.elapsed();

        println!("\n{config:?}");
        println!(
            "  writes: {:.3}s ({:.0} bits/s)",
            write_time.as_secs_f64(),
            writes as f64 / write_time.as_secs_f64()
        );
        println!("  scan: {scan_time:?}, highest = {highest:?}, ones = {ones}");
        bits.close()?;
    }

    // Clean up
    for config in &configs {
        if let BitArrayConfig::SyncFile { path, .. } | BitArrayConfig::Mmap { path, .. } = config {
            let _ = std::fs::remove_file(path);
        }
    }
    println!("\nCleaned up test files");
    Ok(())
}
