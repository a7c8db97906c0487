use chrono::{Duration as ChronoDuration, Utc};
use colored::*;
use governor::{Quota, RateLimiter};
use hdrhistogram::Histogram;
use reqwest::Client;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

const DURATION_SECS: u64 = 20;
const BASE_URL: &str = "http://localhost:8000";

struct Target {
    name: &'static str,
    method: &'static str,
    url: String,
    body: Option<serde_json::Value>,
}

#[tokio::main]
async fn main() {
    println!("{}", "🚀 Starting Benchmark Suite".bold().green());
    println!("Target URL: {}", BASE_URL);

    let client = Client::builder()
        .pool_max_idle_per_host(1000)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();

    if client.get(format!("{}/health", BASE_URL)).send().await.is_err() {
        eprintln!("{}", "❌ Server is NOT reachable at localhost:8000. Please start it first.".red().bold());
        return;
    }

    println!("\n{}", "⚙️  Setting up benchmark data...".yellow());
    let club_id = setup_club(&client).await;
    let resource_id = setup_resource(&client, &club_id).await;

    println!("{}", "✅ Data created successfully.".green());
    println!("   Club ID:     {}", club_id);
    println!("   Resource ID: {}", resource_id);

    let tomorrow = (Utc::now() + ChronoDuration::days(1)).date_naive();

    let targets = vec![
        Target {
            name: "Health Check (Public)",
            method: "GET",
            url: format!("{}/health", BASE_URL),
            body: None,
        },
        Target {
            name: "Availability (Public Read)",
            method: "GET",
            url: format!(
                "{}/api/v1/{}/resources/{}/availability?date={}",
                BASE_URL, club_id, resource_id, tomorrow
            ),
            body: None,
        },
        Target {
            name: "Create Reservation (Hot Path)",
            method: "POST",
            url: format!("{}/api/v1/{}/reservations", BASE_URL, club_id),
            body: Some(json!({
                "resource_id": resource_id,
                "start_time": tomorrow.and_hms_opt(10, 0, 0).unwrap().and_utc().to_rfc3339(),
                "end_time": tomorrow.and_hms_opt(11, 0, 0).unwrap().and_utc().to_rfc3339(),
                "price_minor": 45000
            })),
        },
    ];

    let rps_stages = vec![10, 50, 200, 1000];

    for target in targets {
        println!("\n{}", "=".repeat(60));
        println!("Benchmarking Endpoint: {}", target.name.cyan().bold());
        println!("URL: {}", target.url);
        println!("{}", "=".repeat(60));

        println!("{:<10} | {:<15} | {:<15} | {:<15}", "RPS", "Mean (ms)", "P99 (ms)", "Success Rate");
        println!("{:-<10}-+-{:-<15}-+-{:-<15}-+-{:-<15}", "", "", "", "");

        for &rps in &rps_stages {
            run_stage(&client, &target, rps).await;
        }
    }

    println!(
        "\n{}",
        "Note: after the first success, reservation creates report 409 Conflict by design.".dimmed()
    );
}

async fn setup_club(client: &Client) -> String {
    let slug = format!("bench-{}", Uuid::new_v4());
    let res = client
        .post(format!("{}/api/v1/clubs", BASE_URL))
        .json(&json!({
            "slug": slug,
            "name": "Benchmark Sports Club",
            "timezone": "Europe/Berlin",
            "currency": "EUR"
        }))
        .send()
        .await
        .expect("Failed to send club create request");

    if !res.status().is_success() {
        panic!("Failed to create club: status {}", res.status());
    }

    let body: Value = res.json().await.expect("Failed to parse club response");
    body["club_id"].as_str().expect("No club_id").to_string()
}

async fn setup_resource(client: &Client, club_id: &str) -> String {
    let res = client
        .post(format!("{}/api/v1/{}/resources", BASE_URL, club_id))
        .json(&json!({
            "resource_type": "COURT",
            "name": "Benchmark Court",
            "open_time": "08:00",
            "close_time": "22:00"
        }))
        .send()
        .await
        .expect("Failed to create resource");

    if !res.status().is_success() {
        let status = res.status();
        let txt = res.text().await.unwrap_or_default();
        panic!("Failed to create resource. Status: {}. Body: {}", status, txt);
    }

    let body: Value = res.json().await.unwrap();
    body["id"].as_str().expect("No resource id").to_string()
}

async fn run_stage(client: &Client, target: &Target, rps: u32) {
    let limiter = Arc::new(RateLimiter::direct(
        Quota::per_second(NonZeroU32::new(rps).unwrap())
    ));

    let (tx, mut rx) = mpsc::channel(50000);
    let start_time = Instant::now();
    let duration = Duration::from_secs(DURATION_SECS);

    loop {
        if start_time.elapsed() > duration {
            break;
        }

        if limiter.check().is_ok() {
            let client = client.clone();
            let url = target.url.clone();
            let body = target.body.clone();
            let method = target.method;
            let tx = tx.clone();

            tokio::spawn(async move {
                let req_start = Instant::now();
                let res = match method {
                    "GET" => client.get(&url).send().await,
                    "POST" => {
                        let mut req = client
                            .post(&url)
                            .header("X-Principal-Id", "bench-user")
                            .header("X-Principal-Email", "bench@example.com");
                        if let Some(b) = body {
                            req = req.json(&b);
                        }
                        req.send().await
                    }
                    _ => client.get(&url).send().await,
                };
                let latency = req_start.elapsed();

                // The reservation hot path answers 409 once the slot is
                // held; that is a correct answer, not a failure.
                let success = match res {
                    Ok(r) => r.status().is_success() || r.status().as_u16() == 409,
                    Err(_) => false,
                };

                let _ = tx.send((latency, success)).await;
            });
        } else {
            tokio::task::yield_now().await;
        }
    }

    drop(tx);

    let mut histogram = Histogram::<u64>::new(3).unwrap();
    let mut successes = 0;
    let mut total = 0;

    while let Some((latency, success)) = rx.recv().await {
        total += 1;
        if success { successes += 1; }
        histogram.record(latency.as_micros() as u64).unwrap();
    }

    let mean_ms = histogram.mean() / 1000.0;
    let p99_ms = histogram.value_at_quantile(0.99) as f64 / 1000.0;
    let success_rate = if total > 0 { (successes as f64 / total as f64) * 100.0 } else { 0.0 };

    println!(
        "{:<10} | {:<15.2} | {:<15.2} | {:<14.1}%",
        rps,
        mean_ms,
        p99_ms,
        success_rate
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
}
