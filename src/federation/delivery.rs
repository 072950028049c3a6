//! Activity delivery
//!
//! Posts signed activities to remote inboxes.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;

use super::client::ApClient;
use crate::error::AppError;
use crate::metrics::ACTIVITIES_SENT_TOTAL;

const MAX_CONCURRENT: usize = 10;

/// Deduplicate identical inbox URIs, keeping the first occurrence.
fn unique_inbox_targets<T>(targets: Vec<(String, T)>) -> Vec<(String, T)> {
    let mut seen = HashSet::new();
    targets
        .into_iter()
        .filter(|(inbox_uri, _)| seen.insert(inbox_uri.clone()))
        .collect()
}

/// Activity delivery service
#[derive(Clone)]
pub struct ActivityDelivery {
    client: Arc<ApClient>,
}

impl ActivityDelivery {
    pub fn new(client: Arc<ApClient>) -> Self {
        Self { client }
    }

    /// Deliver one serialized activity to one inbox
    ///
    /// # Errors
    /// Returns error if delivery fails (network, signature, rejection)
    pub async fn deliver_to_inbox(&self, inbox_uri: &str, body: Vec<u8>) -> Result<(), AppError> {
        let response = self.client.post(body, inbox_uri).await?;

        if !response.status().is_success() {
            return Err(AppError::Federation(format!(
                "Inbox {} rejected activity: HTTP {}",
                inbox_uri,
                response.status()
            )));
        }

        tracing::info!("Successfully delivered activity to {}", inbox_uri);
        Ok(())
    }

    /// Deliver each `(inbox, body)` pair, at most ten at a time.
    ///
    /// Failures are logged and reported per target, never propagated.
    pub async fn deliver_all(
        &self,
        activity_type: &'static str,
        targets: Vec<(String, Vec<u8>)>,
    ) -> Vec<DeliveryResult> {
        let total_targets = targets.len();
        let targets = unique_inbox_targets(targets);
        tracing::info!(
            "Delivering {} to {} unique inboxes (deduplicated from {} total)",
            activity_type,
            targets.len(),
            total_targets
        );

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT));
        let mut tasks = Vec::with_capacity(targets.len());

        for (inbox_uri, body) in targets {
            let semaphore = semaphore.clone();
            let delivery = self.clone();

            tasks.push(tokio::spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => delivery.deliver_to_inbox(&inbox_uri, body).await,
                    Err(e) => Err(AppError::Internal(e.into())),
                };

                let status = if result.is_ok() { "success" } else { "failure" };
                ACTIVITIES_SENT_TOTAL
                    .with_label_values(&[activity_type, status])
                    .inc();
                if let Err(e) = &result {
                    tracing::error!(inbox = %inbox_uri, error = %e, "error while sending activity");
                }

                DeliveryResult {
                    inbox_uri,
                    success: result.is_ok(),
                    error: result.err().map(|e| e.to_string()),
                }
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(result) => results.push(result),
                Err(e) => tracing::error!("Delivery task failed: {}", e),
            }
        }

        let success_count = results.iter().filter(|r| r.success).count();
        tracing::info!(
            "Batch delivery complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}

/// Result of a delivery attempt
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    /// Target inbox URI
    pub inbox_uri: String,
    pub success: bool,
    /// Error message if failed
    pub error: Option<String>,
}
