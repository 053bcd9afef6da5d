//! Memory load worker
//!
//! Holds the requested amount of resident memory until terminated.
//! The size argument follows the shared grammar: digits plus MB or GB.

use clap::Parser;
use optimizer_stress::size::parse_size_arg;
use std::thread;
use std::time::Duration;

const PAGE: usize = 4096;

#[derive(Debug, Parser)]
#[command(
    name = "memory-stress",
    about = "Holds a fixed amount of memory, e.g. 100MB or 1GB"
)]
struct Args {
    /// Amount of memory to hold, e.g. 100MB or 1GB
    #[arg(value_parser = parse_size_arg)]
    size: u64,
}

fn main() {
    let args = Args::parse();
    let bytes = args.size as usize;

    println!("Occupying {bytes} bytes of memory");
    let mut buffer = vec![0u8; bytes];

    // Touch every page so the allocation is actually resident, not just
    // reserved address space.
    let mut offset = 0;
    while offset < buffer.len() {
        buffer[offset] = 1;
        offset += PAGE;
    }

    loop {
        thread::sleep(Duration::from_secs(60));
        if let Some(first) = buffer.first_mut() {
            *first = first.wrapping_add(1);
        }
        std::hint::black_box(&buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_argument_follows_the_grammar() {
        let args = Args::try_parse_from(["memory-stress", "100MB"]).unwrap();
        assert_eq!(args.size, 104_857_600);

        let args = Args::try_parse_from(["memory-stress", "1GB"]).unwrap();
        assert_eq!(args.size, 1_073_741_824);
    }

    #[test]
    fn malformed_sizes_refuse_to_start() {
        assert!(Args::try_parse_from(["memory-stress", "100"]).is_err());
        assert!(Args::try_parse_from(["memory-stress", "100KB"]).is_err());
        assert!(Args::try_parse_from(["memory-stress"]).is_err());
    }
}
