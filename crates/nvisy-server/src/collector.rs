//! [`Collector`]: fan-in for multiple components' outputs into one shared
//! input, with no ordering guarantee across them.
//!
//! [`futures::stream::select_all`] polls every input [`Receiver`] each
//! round and picks uniformly among whichever are ready, rather than
//! favoring earlier ones -- a burst on one input can't starve the others.

use futures::stream::StreamExt;
use tokio::task::JoinHandle;

use crate::component::{Receiver, Sender};

/// Merges every receiver in `inputs` into `output`, closing `output` once
/// every input has closed.
pub struct Collector;

impl Collector {
    /// Spawns the collector.
    ///
    /// `inputs` must be non-empty -- an empty collector would never close
    /// its output, since there'd be nothing to signal it should.
    pub fn spawn(inputs: Vec<Receiver>, output: Sender) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut merged = futures::stream::select_all(inputs);
            while let Some(job) = merged.next().await {
                if output.send(job).await.is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::channel;
    use crate::job::Job;

    #[tokio::test]
    async fn collector_merges_all_inputs_and_closes_when_all_close() {
        let (tx_a, rx_a) = channel();
        let (tx_b, rx_b) = channel();
        let (out_tx, out_rx) = channel();
        let handle = Collector::spawn(vec![rx_a, rx_b], out_tx);

        let (job_a, _wa) = Job::new(Box::new("a"));
        let (job_b, _wb) = Job::new(Box::new("b"));
        tx_a.send(job_a).await.unwrap();
        tx_b.send(job_b).await.unwrap();

        let mut seen = vec![
            *out_rx.recv().await.unwrap().request::<&str>().unwrap(),
            *out_rx.recv().await.unwrap().request::<&str>().unwrap(),
        ];
        seen.sort_unstable();
        assert_eq!(seen, vec!["a", "b"]);

        drop(tx_a);
        drop(tx_b);
        handle.await.unwrap();
        assert!(out_rx.recv().await.is_err());
    }
}
