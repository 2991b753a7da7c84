//! Synthetic ITCH 5.0 feed generator.
//!
//! Writes a coherent binary order flow (directory, adds, executions,
//! cancels, deletes, replaces) to a file or stdout, for testing and
//! benchmarking. Order references are tracked so downstream messages
//! hit live orders most of the time.

use byteorder::{BigEndian, ByteOrder};
use itch_feed::{message_size, Symbol};
use rand::Rng;
use std::env;
use std::fs::File;
use std::io::Write;

const SYMBOLS: [&[u8]; 4] = [b"AAPL", b"MSFT", b"GOOGL", b"AMZN"];

fn header(tag: u8, locate: u16, ts: u64) -> Vec<u8> {
    let mut buf = vec![0u8; message_size(tag)];
    buf[0] = tag;
    BigEndian::write_u16(&mut buf[1..3], locate);
    BigEndian::write_uint(&mut buf[5..11], ts, 6);
    buf
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = env::args().collect();

    let output_path = args.get(1).cloned().unwrap_or_else(|| "/tmp/itch_feed.bin".to_string());
    let message_count: usize = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(100_000);

    let mut output: Box<dyn Write> = if output_path == "stdout" {
        Box::new(std::io::stdout())
    } else {
        Box::new(File::create(&output_path)?)
    };

    let mut rng = rand::thread_rng();
    let mut next_order_ref = 1_000u64;
    let mut live: Vec<(u64, u16)> = Vec::new();
    // Nanoseconds since midnight, starting at 9:30.
    let mut ts = 34_200_000_000_000u64;

    eprintln!("Generating {} messages to {}", message_count, output_path);

    // Announce the universe first.
    for (i, name) in SYMBOLS.iter().enumerate() {
        let locate = i as u16 + 1;
        let mut msg = header(b'R', locate, ts);
        msg[11..19].copy_from_slice(Symbol::new(name).as_bytes());
        msg[19] = b'Q';
        msg[20] = b'N';
        BigEndian::write_u32(&mut msg[21..25], 100);
        output.write_all(&msg)?;
    }

    for i in 0..message_count {
        ts += rng.gen_range(100..50_000);
        let locate = rng.gen_range(1..=SYMBOLS.len() as u16);
        let roll = rng.gen_range(0u32..100);

        if live.is_empty() || roll < 45 {
            // Add order
            let order_ref = next_order_ref;
            next_order_ref += 1;
            let mut msg = header(b'A', locate, ts);
            BigEndian::write_u64(&mut msg[11..19], order_ref);
            msg[19] = if rng.gen_bool(0.5) { b'B' } else { b'S' };
            BigEndian::write_u32(&mut msg[20..24], rng.gen_range(1..1000) * 100);
            msg[24..32].copy_from_slice(Symbol::new(SYMBOLS[locate as usize - 1]).as_bytes());
            let drift: i64 = rng.gen_range(-50_000..50_000);
            BigEndian::write_u32(&mut msg[32..36], (1_500_000 + drift) as u32);
            output.write_all(&msg)?;
            live.push((order_ref, locate));
        } else {
            let victim = rng.gen_range(0..live.len());
            let (order_ref, locate) = live[victim];

            if roll < 65 {
                // Partial execution
                let mut msg = header(b'E', locate, ts);
                BigEndian::write_u64(&mut msg[11..19], order_ref);
                BigEndian::write_u32(&mut msg[19..23], rng.gen_range(1..100));
                BigEndian::write_u64(&mut msg[23..31], i as u64 + 1);
                output.write_all(&msg)?;
            } else if roll < 75 {
                // Partial cancel
                let mut msg = header(b'X', locate, ts);
                BigEndian::write_u64(&mut msg[11..19], order_ref);
                BigEndian::write_u32(&mut msg[19..23], rng.gen_range(1..100));
                output.write_all(&msg)?;
            } else if roll < 90 {
                // Delete
                let mut msg = header(b'D', locate, ts);
                BigEndian::write_u64(&mut msg[11..19], order_ref);
                output.write_all(&msg)?;
                live.swap_remove(victim);
            } else {
                // Replace with a new reference
                let new_ref = next_order_ref;
                next_order_ref += 1;
                let mut msg = header(b'U', locate, ts);
                BigEndian::write_u64(&mut msg[11..19], order_ref);
                BigEndian::write_u64(&mut msg[19..27], new_ref);
                BigEndian::write_u32(&mut msg[27..31], rng.gen_range(1..1000) * 100);
                let drift: i64 = rng.gen_range(-50_000..50_000);
                BigEndian::write_u32(&mut msg[31..35], (1_500_000 + drift) as u32);
                output.write_all(&msg)?;
                live[victim] = (new_ref, locate);
            }
        }

        if i > 0 && i % 100_000 == 0 {
            eprintln!("Generated {} messages", i);
        }
    }

    eprintln!("Feed generation complete: {} messages, {} orders still live", message_count, live.len());
    Ok(())
}
