//! Job cache walkthrough.
//!
//! With `ACCULYNX_API_KEY` set, the cache is loaded from the live API.
//! Without it, a generated in-memory account is used instead.
//!
//! ```text
//! cargo run --example job_cache -- BNX-5179
//! ```

use acculynx::{
    AccuLynxClient, CacheConfig, InMemoryJobSource, JobService, JobSource, LookupStrategy, Result,
};

async fn walkthrough<S: JobSource + 'static>(service: JobService<S>, needle: &str) -> Result<()> {
    println!("1. Initial refresh and background loop...");
    let report = service.start().await?;
    println!(
        "   ✓ {} jobs cached in {:?} ({} pages, {} failed)\n",
        report.jobs, report.duration, report.pages, report.failed_pages
    );

    println!("2. Lookup by job number ({}):", needle);
    match service.job_by_number(needle).await {
        Some(job) => println!("   ✓ {} {:?}\n", job.id, job.job_name),
        None => println!("   - not cached\n"),
    }

    println!("3. Substring search ({}):", needle);
    let hits = service.search_jobs(needle).await;
    for job in hits.iter().take(10) {
        println!(
            "   {} {}",
            job.job_number.as_deref().unwrap_or("-"),
            job.job_name.as_deref().unwrap_or("")
        );
    }
    println!("   ✓ {} matches\n", hits.len());

    if let Some(first) = hits.first() {
        println!("4. Lookup by id with each strategy:");
        for strategy in [LookupStrategy::Fresh, LookupStrategy::Refresh, LookupStrategy::Bypass] {
            let found = service.find_job(&first.id, strategy).await?;
            println!("   {}: {}", strategy, if found.is_some() { "found" } else { "missing" });
        }
        println!();
    }

    if let Some(at) = service.last_refresh().await {
        println!("Snapshot captured at {}", at.to_rfc3339());
    }

    service.shutdown().await;
    println!("✓ Background refresh stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .ok();

    let needle = std::env::args().nth(1).unwrap_or_else(|| "BNX-51".to_string());
    let config = CacheConfig::from_env()?;

    println!("\n=== AccuLynx - Job Cache Example ===\n");

    if std::env::var(acculynx::config::ENV_API_KEY).is_ok() {
        let client = AccuLynxClient::from_env()?;
        walkthrough(JobService::new(client, config), &needle).await
    } else {
        println!("ACCULYNX_API_KEY not set, using a generated account\n");
        let source = InMemoryJobSource::numbered(240, "BNX");
        walkthrough(JobService::new(source, config), &needle).await
    }
}
