//! Response sinks
//!
//! Every request handled by the gateway is answered exactly once through a
//! [`Response`]: either `on_result` or `on_error`, never both.
//!
//! [`OneshotResponse`] bridges a sink onto a `tokio::sync::oneshot` channel for
//! async callers:
//!
//! ```rust
//! use rvoip_telephony_core::response::{OneshotResponse, Response};
//!
//! # tokio_test::block_on(async {
//! let (sink, outcome) = OneshotResponse::<u32, String>::channel();
//! sink.on_result(&"request", 7);
//! assert_eq!(outcome.await.unwrap(), Ok(7));
//! # })
//! ```

use std::fmt;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

/// Callback receiving the single outcome of a request
pub trait Response<Req: ?Sized, T, E> {
    fn on_result(&self, request: &Req, result: T);

    fn on_error(&self, request: &Req, error: E);
}

/// Sink that forwards the outcome into a oneshot channel
pub struct OneshotResponse<T, E> {
    tx: Mutex<Option<oneshot::Sender<Result<T, E>>>>,
}

impl<T, E> OneshotResponse<T, E> {
    /// Create a sink and the receiver its outcome arrives on
    pub fn channel() -> (Self, oneshot::Receiver<Result<T, E>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Mutex::new(Some(tx)) }, rx)
    }

    /// Whether an outcome has already been delivered
    pub fn is_completed(&self) -> bool {
        self.tx.lock().is_none()
    }

    fn complete<Req: fmt::Display + ?Sized>(&self, request: &Req, outcome: Result<T, E>) {
        let Some(tx) = self.tx.lock().take() else {
            warn!("Dropping second response for {}", request);
            return;
        };
        if tx.send(outcome).is_err() {
            warn!("Receiver for {} is gone, response discarded", request);
        }
    }
}

impl<Req, T, E> Response<Req, T, E> for OneshotResponse<T, E>
where
    Req: fmt::Display + ?Sized,
{
    fn on_result(&self, request: &Req, result: T) {
        self.complete(request, Ok(result));
    }

    fn on_error(&self, request: &Req, error: E) {
        self.complete(request, Err(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_oneshot_delivers_error() {
        let (sink, rx) = OneshotResponse::<u32, String>::channel();
        sink.on_error("req-1", "boom".to_string());
        assert!(sink.is_completed());
        assert_eq!(rx.await.unwrap(), Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_second_outcome_is_dropped() {
        let (sink, rx) = OneshotResponse::<u32, String>::channel();
        sink.on_result("req-1", 1);
        sink.on_error("req-1", "late".to_string());
        assert_eq!(rx.await.unwrap(), Ok(1));
    }

    #[test]
    fn test_closed_receiver_is_tolerated() {
        let (sink, rx) = OneshotResponse::<u32, String>::channel();
        drop(rx);
        sink.on_result("req-1", 1);
        assert!(sink.is_completed());
    }
}
