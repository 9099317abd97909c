//! Sequencer service wiring
//!
//! Runs the sequencer on a dedicated task fed by a multi-producer queue,
//! so every mutation is serialized by a single consumer. Callers hold a
//! cloneable handle and await their response on a oneshot channel. A
//! caller that gives up before its reply arrives simply drops the
//! receiver; positions already reserved for it stay burned and become
//! holes for the log layer to fill.

use tokenlog_protocol::{TokenRequest, TokenResponse};
use tokio::sync::{mpsc, oneshot};

use crate::error::{Result, SequencerError};
use crate::sequencer::Sequencer;

const REQUEST_QUEUE_DEPTH: usize = 128;

type RequestEnvelope = (TokenRequest, oneshot::Sender<Result<TokenResponse>>);

/// Task-side half: owns the sequencer and drains the queue
pub struct SequencerService {
    sequencer: Sequencer,
    requests: mpsc::Receiver<RequestEnvelope>,
}

/// Caller-side half: submits requests to the service task
#[derive(Clone)]
pub struct SequencerHandle {
    requests: mpsc::Sender<RequestEnvelope>,
}

impl SequencerService {
    /// Spawn the service task and return a handle to it
    ///
    /// The task runs until every handle is dropped.
    pub fn spawn(sequencer: Sequencer) -> SequencerHandle {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let service = Self {
            sequencer,
            requests: rx,
        };
        tokio::spawn(service.run());
        SequencerHandle { requests: tx }
    }

    async fn run(mut self) {
        tracing::info!(
            tail = self.sequencer.global_tail(),
            "sequencer service started"
        );

        while let Some((req, reply)) = self.requests.recv().await {
            let resp = self.sequencer.handle(&req);
            // A dropped reply receiver means the caller timed out; the
            // response is lost but the positions remain issued.
            let _ = reply.send(resp);
        }

        tracing::info!(
            tail = self.sequencer.global_tail(),
            "sequencer service stopped"
        );
    }
}

impl SequencerHandle {
    /// Submit a token request and await the serialized response
    pub async fn request(&self, req: TokenRequest) -> Result<TokenResponse> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send((req, tx))
            .await
            .map_err(|_| SequencerError::ServiceUnavailable)?;
        rx.await.map_err(|_| SequencerError::ServiceUnavailable)?
    }
}
