use std::future::Future;

use promjson_model::Family;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::decode::RecordSource;
use crate::error::{BoxError, CoreError, CoreResult};
use crate::normalize::normalize;
use crate::proto::MetricFamily;

/// Default number of raw records buffered between producer and consumer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of the bounded record queue; values below 1 are raised to 1.
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Producer task feeding raw records through a bounded queue to the consumer.
///
/// The producer opens the input, decodes records and sends them in order. It suspends while
/// the queue is full and closes it after the last record or a fatal error. The consumer side
/// normalizes each record into a [`Family`] and finally joins the producer to learn its outcome.
///
/// Dropping a `Pipeline` before it is joined aborts the producer.
pub struct Pipeline {
    rx: mpsc::Receiver<MetricFamily>,
    producer: Option<JoinHandle<Result<usize, CoreError>>>,
}

impl Pipeline {
    /// Spawn the producer. `open` resolves to the record source, for example after an HTTP
    /// request completed; its error is reported as [`CoreError::Source`].
    pub fn spawn<F>(open: F, cfg: &PipelineConfig) -> Self
    where
        F: Future<Output = Result<Box<dyn RecordSource>, BoxError>> + Send + 'static,
    {
        let capacity = cfg.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        debug!(capacity, "spawning pipeline producer");

        let producer = tokio::spawn(async move {
            let source = open.await.map_err(CoreError::Source)?;
            produce(source, tx).await
        });
        Self {
            rx,
            producer: Some(producer),
        }
    }

    /// Spawn the producer over an already opened source.
    pub fn from_source(source: Box<dyn RecordSource>, cfg: &PipelineConfig) -> Self {
        Self::spawn(async move { Ok::<_, BoxError>(source) }, cfg)
    }

    /// Next normalized family, or `None` once the producer closed the queue.
    pub async fn next_family(&mut self) -> Option<Family> {
        self.rx.recv().await.map(|mf| normalize(&mf))
    }

    /// Drain the queue into `out`, then join the producer.
    ///
    /// Families received before a producer failure stay in `out`. Returns the number of
    /// families appended.
    pub async fn collect_into(mut self, out: &mut Vec<Family>) -> CoreResult<usize> {
        let mut appended = 0;
        while let Some(family) = self.next_family().await {
            out.push(family);
            appended += 1;
        }
        self.finish().await?;
        Ok(appended)
    }

    /// Drain the whole stream into a vector.
    pub async fn collect(self) -> CoreResult<Vec<Family>> {
        let mut out = Vec::new();
        self.collect_into(&mut out).await?;
        Ok(out)
    }

    /// Stop consuming and wait for the producer.
    ///
    /// Pending records are discarded; a producer blocked on the full queue stops quietly.
    /// Returns the number of records the producer sent.
    pub async fn finish(mut self) -> CoreResult<usize> {
        self.rx.close();
        while self.rx.recv().await.is_some() {}
        self.join().await
    }

    async fn join(&mut self) -> CoreResult<usize> {
        let Some(handle) = self.producer.take() else {
            return Ok(0);
        };
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(CoreError::Producer(e.to_string())),
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(handle) = self.producer.take() {
            handle.abort();
        }
    }
}

#[instrument(level = "debug", skip_all, fields(strategy = source.strategy()))]
async fn produce(
    mut source: Box<dyn RecordSource>,
    tx: mpsc::Sender<MetricFamily>,
) -> CoreResult<usize> {
    let mut records = 0;
    while let Some(mf) = source.next_record().await? {
        if tx.send(mf).await.is_err() {
            debug!(records, "consumer gone, stopping producer");
            return Ok(records);
        }
        records += 1;
    }
    debug!(records, "producer finished");
    Ok(records)
}
