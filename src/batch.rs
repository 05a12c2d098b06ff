//! Concurrent processing of many messages.
//!
//! Each message runs on its own blocking worker with its own scan state; the
//! registry is shared read-only. One message failing (or its worker
//! panicking) never affects the others.

use crate::delivery_status::BounceReport;
use crate::message::{split_message, Headers};
use crate::provider::Registry;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Caller's name for the message, e.g. its file path.
    pub label: String,
    pub headers: Headers,
    pub body: String,
    /// SMTP reply code known from outside the body, if any.
    pub reply_code: Option<u16>,
}

impl BatchItem {
    /// Read a decoded message from disk and split it into headers and body.
    pub fn from_file(path: &str, reply_code: Option<u16>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Error reading {}: {}", path, e))?;
        let (headers, body) = split_message(&raw);
        Ok(Self {
            label: path.to_string(),
            headers,
            body,
            reply_code,
        })
    }
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub label: String,
    pub result: anyhow::Result<BounceReport>,
}

/// Process `items` with at most `concurrency` messages in flight. Outcomes
/// are returned in input order.
pub async fn process_batch(
    registry: Arc<Registry>,
    items: Vec<BatchItem>,
    concurrency: usize,
) -> Vec<BatchOutcome> {
    let jobs = items
        .into_iter()
        .map(|item| {
            let label = item.label.clone();
            let job = move |registry: &Registry| -> anyhow::Result<BounceReport> {
                Ok(registry.process(&item.headers, &item.body, item.reply_code)?)
            };
            (label, job)
        })
        .collect();
    run(registry, jobs, concurrency).await
}

/// Read and process message files. A file that cannot be read yields an
/// error outcome in its place, so outcomes line up with `paths`.
pub async fn process_files(
    registry: Arc<Registry>,
    paths: Vec<String>,
    concurrency: usize,
    reply_code: Option<u16>,
) -> Vec<BatchOutcome> {
    let jobs = paths
        .into_iter()
        .map(|path| {
            let label = path.clone();
            let job = move |registry: &Registry| -> anyhow::Result<BounceReport> {
                let item = BatchItem::from_file(&path, reply_code)?;
                Ok(registry.process(&item.headers, &item.body, item.reply_code)?)
            };
            (label, job)
        })
        .collect();
    run(registry, jobs, concurrency).await
}

async fn run<F>(registry: Arc<Registry>, jobs: Vec<(String, F)>, concurrency: usize) -> Vec<BatchOutcome>
where
    F: FnOnce(&Registry) -> anyhow::Result<BounceReport> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(jobs.len());

    for (label, job) in jobs {
        let registry = Arc::clone(&registry);
        let semaphore = Arc::clone(&semaphore);

        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let report = tokio::task::spawn_blocking(move || job(registry.as_ref())).await??;
            Ok::<_, anyhow::Error>(report)
        });
        handles.push((label, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (label, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("Worker for {} failed: {}", label, e)),
        };
        if let Err(e) = &result {
            log::debug!("{}: {}", label, e);
        }
        outcomes.push(BatchOutcome { label, result });
    }

    outcomes
}
