use std::time::Duration;

use anyhow::anyhow;
use reqwest::Client;
use tracing::{error, info};

/// Pings the backend until it answers or `num_attempts` is used up. Any HTTP
/// response counts as reachable; only transport failures are retried.
pub async fn check_api_connection(
    api_base_url: &str,
    num_attempts: u32,
    pause: Duration,
) -> Result<(), anyhow::Error> {
    info!("Attempting to connect to the health API at {}", api_base_url);

    let mut attempts = 0;
    let mut err: Option<anyhow::Error> = None;
    let client = Client::new();

    while attempts < num_attempts {
        info!("Attempt to connect to the health API {} of {}", attempts + 1, num_attempts);
        match client
            .get(format!("{}/patient-records/ping", api_base_url))
            .send()
            .await
        {
            Ok(res) => {
                info!("Health API connection successful \u{2705} (HTTP {})", res.status());
                return Ok(());
            }
            Err(e) => {
                error!(
                    "Failed to connect to the health API. Attempt {} of {}: {}",
                    attempts + 1,
                    num_attempts,
                    e
                );
                err = Some(anyhow!(e));
            }
        }
        attempts += 1;
        if attempts < num_attempts {
            tokio::time::sleep(pause).await;
        }
    }
    Err(err.unwrap_or_else(|| anyhow!("Failed to connect to the health API")))
}
