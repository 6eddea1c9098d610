use reaper_env::memory::{process_memory, total_ram};

fn main() {
    println!("Total RAM: {:?} bytes", total_ram());

    let start = std::time::Instant::now();
    match process_memory() {
        Some(sample) => {
            println!("Process memory:");
            println!("  Resident: {} bytes", sample.used);
            println!("  Total:    {} bytes", sample.total);
            println!("  Limit:    {} bytes", sample.limit);
            println!("  Usage:    {:.1}%", sample.usage_ratio() * 100.0);
        }
        None => println!("Process memory telemetry unavailable on this platform"),
    }
    println!("Sampled in {} microseconds", start.elapsed().as_micros());
}
