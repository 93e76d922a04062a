use std::error::Error;

use tracing::debug;

use super::Backend;
use crate::api::HealthResponse;

pub async fn run_health(backend: &Backend) -> Result<(), Box<dyn Error>> {
    let url = backend.health_url();
    debug!(%url, "Probing backend health");

    let response = match backend.client.get(&url).send().await {
        Ok(response) => response,
        Err(err) => {
            eprintln!("❌ Backend unreachable at {url}: {err}");
            std::process::exit(1);
        }
    };

    if !response.status().is_success() {
        eprintln!("❌ Backend answered {} at {url}", response.status());
        std::process::exit(1);
    }

    let health: HealthResponse = response.json().await?;
    println!("✅ {url}: {}", health.status);
    for (key, value) in &health.details {
        println!("  {key}: {value}");
    }
    Ok(())
}
