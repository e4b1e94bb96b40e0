use std::time::{Duration, Instant};

use tokio_postgres::{Config, NoTls};
use ulid::Ulid;

const HOUR: i64 = 3_600_000; // 1 hour in ms

async fn connect(host: &str, port: u16) -> tokio_postgres::Client {
    let mut config = Config::new();
    config
        .host(host)
        .port(port)
        .dbname(format!("bench_{}", Ulid::new()))
        .user("admin")
        .password("roomward");

    let (client, conn) = config.connect(NoTls).await.expect("connect failed");
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            eprintln!("connection error: {e}");
        }
    });
    client
}

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
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

struct Room {
    id: Ulid,
    capacity: u32,
}

/// Create a location and a room inside the caller's tenant.
async fn seed_room(client: &tokio_postgres::Client, room: &Room) {
    let lid = Ulid::new();
    client
        .batch_execute(&format!(
            "INSERT INTO locations (id, name, address) VALUES ('{lid}', 'Bench Campus', '1 Bench Way')"
        ))
        .await
        .unwrap();
    client
        .batch_execute(&format!(
            "INSERT INTO rooms (id, location_id, name, capacity) VALUES ('{}', '{lid}', 'bench', {})",
            room.id, room.capacity
        ))
        .await
        .unwrap();
}

async fn request(client: &tokio_postgres::Client, room_id: Ulid, start: i64, end: i64) -> Ulid {
    let id = Ulid::new();
    client
        .batch_execute(&format!(
            r#"INSERT INTO reservations (id, room_id, start, "end", purpose, attendees) VALUES ('{id}', '{room_id}', {start}, {end}, 'bench', 2)"#
        ))
        .await
        .unwrap();
    id
}

async fn approve(client: &tokio_postgres::Client, id: Ulid) {
    client
        .batch_execute(&format!(
            "UPDATE reservations SET status = 'APPROVED' WHERE id = '{id}'"
        ))
        .await
        .unwrap();
}

async fn setup(client: &tokio_postgres::Client) -> Vec<Room> {
    let capacities = [4, 4, 4, 4, 4, 8, 8, 8, 16, 16];
    let mut rooms = Vec::new();

    for &cap in &capacities {
        let room = Room {
            id: Ulid::new(),
            capacity: cap,
        };
        seed_room(client, &room).await;
        rooms.push(room);
    }

    println!("  created {} rooms", rooms.len());
    rooms
}

/// Request + approve cycles on a single room, one after the other. The
/// approval path takes the per-room write lock and runs the conflict scan,
/// so this measures the full decision round trip.
async fn phase1_sequential(host: &str, port: u16, room: &Room) {
    let client = connect(host, port).await;
    seed_room(&client, room).await;
    let rid = room.id;

    let n = 1000;
    let mut request_lat = Vec::with_capacity(n);
    let mut approve_lat = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n {
        let s = (i as i64) * HOUR;
        let e = s + HOUR;
        let t = Instant::now();
        let resv = request(&client, rid, s, e).await;
        request_lat.push(t.elapsed());

        let t = Instant::now();
        approve(&client, resv).await;
        approve_lat.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = (n * 2) as f64 / elapsed.as_secs_f64();
    println!(
        "  {n} request+approve cycles in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
    print_latency("request latency", &mut request_lat);
    print_latency("approve latency", &mut approve_lat);
}

async fn phase2_concurrent(host: &str, port: u16, rooms: &[Room]) {
    let n_tasks = 10;
    let n_per_task = 200;

    let start = Instant::now();
    let mut handles = Vec::new();

    for i in 0..n_tasks {
        let host = host.to_string();
        let rid = rooms[i % rooms.len()].id;
        let cap = rooms[i % rooms.len()].capacity;

        handles.push(tokio::spawn(async move {
            // Each task gets its own tenant (unique dbname from connect())
            let client = connect(&host, port).await;
            seed_room(&client, &Room { id: rid, capacity: cap }).await;

            for j in 0..n_per_task {
                let s = (j as i64) * HOUR;
                let e = s + HOUR;
                let resv = request(&client, rid, s, e).await;
                approve(&client, resv).await;
            }
        }));
    }

    for h in handles {
        h.await.unwrap();
    }

    let elapsed = start.elapsed();
    let total = n_tasks * n_per_task;
    let ops = (total * 2) as f64 / elapsed.as_secs_f64();
    println!(
        "  {n_tasks} tenants x {n_per_task} cycles = {total} bookings in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
}

async fn phase3_read_under_load(host: &str, port: u16) {
    // Writer tasks: keep booking in their own tenants in the background
    let stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let mut writer_handles = Vec::new();
    for _ in 0..5 {
        let host = host.to_string();
        let stop = stop.clone();
        writer_handles.push(tokio::spawn(async move {
            let client = connect(&host, port).await;
            let room = Room {
                id: Ulid::new(),
                capacity: 8,
            };
            seed_room(&client, &room).await;
            let mut i = 0i64;
            while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                let s = i * HOUR;
                let resv = request(&client, room.id, s, s + HOUR).await;
                approve(&client, resv).await;
                i += 1;
            }
        }));
    }

    // Reader tasks: availability point queries over a busy calendar
    let n_readers = 10;
    let reads_per_reader = 500;
    let mut reader_handles = Vec::new();

    for _ in 0..n_readers {
        let host = host.to_string();
        reader_handles.push(tokio::spawn(async move {
            let client = connect(&host, port).await;
            let room = Room {
                id: Ulid::new(),
                capacity: 8,
            };
            seed_room(&client, &room).await;
            // A non-trivial calendar: 50 approved one-hour bookings
            for i in 0..50 {
                let s = (i as i64) * HOUR;
                let resv = request(&client, room.id, s, s + HOUR).await;
                approve(&client, resv).await;
            }

            let rid = room.id;
            let mut latencies = Vec::with_capacity(reads_per_reader);
            for i in 0..reads_per_reader {
                let s = ((i % 100) as i64) * HOUR;
                let e = s + HOUR;
                let t = Instant::now();
                client
                    .simple_query(&format!(
                        r#"SELECT * FROM availability WHERE room_id = '{rid}' AND start = {s} AND "end" = {e}"#
                    ))
                    .await
                    .unwrap();
                latencies.push(t.elapsed());
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for h in reader_handles {
        all_latencies.extend(h.await.unwrap());
    }

    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    for h in writer_handles {
        let _ = h.await;
    }

    print_latency("availability query", &mut all_latencies);
}

async fn phase4_connection_storm(host: &str, port: u16) {
    let n_conns = 50;
    let ops_per_conn = 10;

    let start = Instant::now();
    let mut handles = Vec::new();
    let success = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));

    for _ in 0..n_conns {
        let host = host.to_string();
        let success = success.clone();
        handles.push(tokio::spawn(async move {
            let client = connect(&host, port).await;
            let room = Room {
                id: Ulid::new(),
                capacity: 6,
            };
            seed_room(&client, &room).await;

            for i in 0..ops_per_conn {
                let s = (i as i64) * HOUR;
                request(&client, room.id, s, s + HOUR).await;
            }
            success.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }));
    }

    for h in handles {
        let _ = h.await;
    }

    let elapsed = start.elapsed();
    let ok = success.load(std::sync::atomic::Ordering::Relaxed);
    println!(
        "  {n_conns} connections, {ops_per_conn} requests each: {ok}/{n_conns} succeeded in {:.2}s",
        elapsed.as_secs_f64()
    );
}

#[tokio::main]
async fn main() {
    let host = std::env::var("ROOMWARD_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port: u16 = std::env::var("ROOMWARD_PORT")
        .unwrap_or_else(|_| "5433".into())
        .parse()
        .expect("invalid ROOMWARD_PORT");

    println!("=== roomward stress benchmark ===");
    println!("target: {host}:{port}\n");

    // Each phase uses its own tenant (unique dbname) to avoid interference

    println!("[setup]");
    let setup_client = connect(&host, port).await;
    let rooms = setup(&setup_client).await;
    drop(setup_client);

    println!("\n[phase 1] sequential request+approve throughput");
    phase1_sequential(&host, port, &rooms[9]).await;

    println!("\n[phase 2] concurrent tenant write throughput");
    phase2_concurrent(&host, port, &rooms).await;

    println!("\n[phase 3] availability latency under write load");
    phase3_read_under_load(&host, port).await;

    println!("\n[phase 4] connection storm");
    phase4_connection_storm(&host, port).await;

    println!("\n=== benchmark complete ===");
}
