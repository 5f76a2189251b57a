use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Duration as Minutes, NaiveDateTime};
use ulid::Ulid;

use covers::clock::ManualClock;
use covers::engine::{Engine, InMemoryStore, find_table, recompute};
use covers::model::*;
use covers::notify::NotifyHub;
use covers::request::{Arrival, BookingRequest};

const SLOT: i64 = 30; // minutes between booking slots

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

fn opening() -> NaiveDateTime {
    parse_time("2024-08-08 11:00").unwrap()
}

/// Deterministic xorshift so runs are comparable.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn synthetic_floor(n_tables: u32) -> Vec<Table> {
    let capacities = [2, 2, 4, 4, 4, 6, 8];
    (1..=n_tables)
        .map(|id| Table::new(id, capacities[id as usize % capacities.len()], "Hall"))
        .collect()
}

fn request(rng: &mut Rng) -> (u32, NaiveDateTime) {
    let party = rng.below(8) as u32 + 1;
    let start = opening() + Minutes::minutes(SLOT * rng.below(20) as i64);
    (party, start)
}

/// Fill the book the way the engine would, without the engine around it.
fn fill(tables: &[Table], n: usize, rng: &mut Rng) -> Vec<Reservation> {
    let mut reservations = Vec::with_capacity(n);
    for _ in 0..n {
        let (party, start) = request(rng);
        let table_id = find_table(tables, &reservations, party, start, 120, None);
        reservations.push(Reservation {
            id: Ulid::new(),
            contact: Contact::default(),
            party_size: party,
            time: format_time(start),
            duration_minutes: Some(120),
            status: ReservationStatus::Open,
            table_id,
            last_modified: opening(),
        });
    }
    reservations
}

fn phase1_allocation(tables: &[Table], reservations: &[Reservation], rng: &mut Rng) {
    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let mut misses = 0;
    for _ in 0..n {
        let (party, start) = request(rng);
        let t = Instant::now();
        if find_table(tables, reservations, party, start, 120, None).is_none() {
            misses += 1;
        }
        latencies.push(t.elapsed());
    }
    println!("  {n} lookups against {} reservations, {misses} misses", reservations.len());
    print_latency("find_table", &mut latencies);
}

fn phase2_recompute(tables: &[Table], reservations: &[Reservation]) {
    let n = 200;
    let mut latencies = Vec::with_capacity(n);
    for i in 0..n {
        let now = opening() + Minutes::minutes(i as i64 * 3);
        let t = Instant::now();
        let derived = recompute(tables.to_vec(), reservations, now);
        latencies.push(t.elapsed());
        std::hint::black_box(derived);
    }
    print_latency("recompute", &mut latencies);
}

async fn phase3_engine_bookings(tables: Vec<Table>, rng: &mut Rng) {
    let state = FloorState {
        tables,
        ..FloorState::default()
    };
    let engine = Engine::open(
        Arc::new(InMemoryStore::new(state)),
        Arc::new(NotifyHub::new()),
        Arc::new(ManualClock::new(opening())),
        120,
    )
    .await
    .unwrap();

    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();
    for _ in 0..n {
        let (party_size, at) = request(rng);
        let t = Instant::now();
        engine
            .create_reservation(BookingRequest {
                contact: Contact::default(),
                party_size,
                arrival: Arrival::At(at),
            })
            .await
            .unwrap();
        latencies.push(t.elapsed());
    }
    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} bookings in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("create_reservation", &mut latencies);
}

#[tokio::main]
async fn main() {
    let n_tables: u32 = std::env::var("COVERS_BENCH_TABLES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(200);
    let n_reservations: usize = std::env::var("COVERS_BENCH_RESERVATIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5000);

    println!("=== covers stress benchmark ===");
    println!("floor: {n_tables} tables, {n_reservations} reservations\n");

    let mut rng = Rng(0x9E37_79B9_7F4A_7C15);
    let tables = synthetic_floor(n_tables);

    println!("[setup]");
    let t = Instant::now();
    let reservations = fill(&tables, n_reservations, &mut rng);
    let assigned = reservations.iter().filter(|r| r.table_id.is_some()).count();
    println!("  filled in {:.2}s, {assigned} assigned", t.elapsed().as_secs_f64());

    println!("\n[phase 1] allocation latency");
    phase1_allocation(&tables, &reservations, &mut rng);

    println!("\n[phase 2] status recomputation latency");
    phase2_recompute(&tables, &reservations);

    println!("\n[phase 3] engine booking throughput (in-memory store)");
    phase3_engine_bookings(tables, &mut rng).await;

    println!("\n=== done ===");
}
