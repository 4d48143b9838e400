/*!
 * Spin Condvar Probe
 *
 * Ping-pongs a turn counter between two threads through a pair of spin
 * condvars and reports round-trip latency quantiles plus the table's spin
 * statistics.
 *
 * Usage: spincond-probe [ROUNDS]
 */

use parking_lot::Mutex;
use spincond::core::sync::{lifecycle, SpinCondvar};
use spincond::init_tracing;
use spincond::monitoring::RunSpan;
use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

const DEFAULT_ROUNDS: u32 = 10_000;

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let rounds = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<u32>()?,
        None => DEFAULT_ROUNDS,
    };

    let table = lifecycle().init();
    info!(
        rounds,
        spin_iterations = table.spin_iterations(),
        "starting ping-pong probe"
    );

    let mut samples = {
        let run = RunSpan::new("ping_pong");
        let _entered = run.enter();
        let samples = ping_pong(rounds);
        run.record_iterations(rounds as u64);
        samples
    };
    samples.sort_unstable();

    if !samples.is_empty() {
        info!(
            min_ns = samples[0].as_nanos() as u64,
            p50_ns = quantile(&samples, 0.50).as_nanos() as u64,
            p99_ns = quantile(&samples, 0.99).as_nanos() as u64,
            max_ns = samples[samples.len() - 1].as_nanos() as u64,
            "round-trip latency"
        );
    }

    if let Some(report) = lifecycle().shutdown() {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn ping_pong(rounds: u32) -> Vec<Duration> {
    let state = Arc::new((Mutex::new(0u32), SpinCondvar::new(), SpinCondvar::new()));

    let peer = state.clone();
    let responder = thread::spawn(move || {
        let (lock, ping, pong) = &*peer;
        let mut turn = lock.lock();
        for round in 0..rounds {
            while *turn != round * 2 + 1 {
                ping.wait(&mut turn);
            }
            *turn += 1;
            pong.notify_one();
        }
    });

    let (lock, ping, pong) = &*state;
    let mut samples = Vec::with_capacity(rounds as usize);
    let mut turn = lock.lock();
    for round in 0..rounds {
        let start = Instant::now();
        *turn = round * 2 + 1;
        ping.notify_one();
        while *turn != round * 2 + 2 {
            pong.wait(&mut turn);
        }
        samples.push(start.elapsed());
    }
    drop(turn);

    if responder.join().is_err() {
        tracing::error!("responder thread panicked");
    }
    samples
}

fn quantile(sorted: &[Duration], p: f64) -> Duration {
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx]
}
