use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::oneshot;

use crate::error::{AppError, Result};

/// The request currently holding the waiter slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub request_name: String,
    pub issued_at: DateTime<Local>,
}

struct Armed<T> {
    pending: PendingRequest,
    tx: oneshot::Sender<T>,
}

/// Single-slot bridge between a completion callback and the flow that issued
/// the call.
///
/// At most one wait can be armed at a time. `signal` only releases the armed
/// wait when the tag matches; anything else is dropped.
pub struct ResponseWaiter<T> {
    slot: Mutex<Option<Armed<T>>>,
}

impl<T> Default for ResponseWaiter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResponseWaiter<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Armed<T>>> {
        // The slot holds no invariants a panicking holder could break.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Arm the slot for `tag`. Fails if another request is outstanding.
    pub fn arm(&self, tag: &str) -> Result<WaitHandle<'_, T>> {
        let (tx, rx) = oneshot::channel();
        let mut slot = self.lock();
        if let Some(armed) = slot.as_ref() {
            return Err(AppError::Busy {
                tag: armed.pending.request_name.clone(),
            });
        }
        *slot = Some(Armed {
            pending: PendingRequest {
                request_name: tag.to_string(),
                issued_at: Local::now(),
            },
            tx,
        });

        Ok(WaitHandle {
            waiter: self,
            tag: tag.to_string(),
            rx,
        })
    }

    /// Release the armed wait if its tag matches. Returns whether a waiter
    /// was released.
    pub fn signal(&self, tag: &str, value: T) -> bool {
        let armed = {
            let mut slot = self.lock();
            match slot.as_ref() {
                Some(armed) if armed.pending.request_name == tag => slot.take(),
                _ => None,
            }
        };

        match armed {
            Some(armed) => armed.tx.send(value).is_ok(),
            None => false,
        }
    }

    pub fn is_armed_for(&self, tag: &str) -> bool {
        self.lock()
            .as_ref()
            .map(|armed| armed.pending.request_name == tag)
            .unwrap_or(false)
    }

    pub fn pending(&self) -> Option<PendingRequest> {
        self.lock().as_ref().map(|armed| armed.pending.clone())
    }

    /// Clear the slot unconditionally.
    pub fn disarm(&self) {
        self.lock().take();
    }

    fn disarm_tag(&self, tag: &str) {
        let mut slot = self.lock();
        if slot
            .as_ref()
            .map(|armed| armed.pending.request_name == tag)
            .unwrap_or(false)
        {
            slot.take();
        }
    }
}

/// Receiving half of an armed wait. Dropping it disarms the slot.
pub struct WaitHandle<'a, T> {
    waiter: &'a ResponseWaiter<T>,
    tag: String,
    rx: oneshot::Receiver<T>,
}

impl<T> WaitHandle<'_, T> {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Suspend until the matching `signal`. `None` waits forever; with a
    /// limit the slot is disarmed and `AppError::Timeout` returned.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Result<T> {
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut self.rx).await {
                Ok(received) => received,
                Err(_) => {
                    return Err(AppError::Timeout {
                        tag: self.tag.clone(),
                    })
                }
            },
            None => (&mut self.rx).await,
        };

        received.map_err(|_| {
            AppError::message(format!(
                "wait for `{}` was disarmed before completion",
                self.tag
            ))
        })
    }
}

impl<T> Drop for WaitHandle<'_, T> {
    fn drop(&mut self) {
        self.waiter.disarm_tag(&self.tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn matching_signal_releases_wait() {
        let waiter = ResponseWaiter::new();
        let handle = waiter.arm("opt10081_req").unwrap();

        assert!(waiter.signal("opt10081_req", 7));
        assert_eq!(handle.wait(None).await.unwrap(), 7);
        assert!(waiter.pending().is_none());
    }

    #[tokio::test]
    async fn foreign_tag_keeps_wait_suspended() {
        let waiter = ResponseWaiter::new();
        let handle = waiter.arm("opt10081_req:005930").unwrap();

        assert!(!waiter.signal("opt10081_req:000660", 1));
        assert!(waiter.is_armed_for("opt10081_req:005930"));

        let err = handle
            .wait(Some(Duration::from_millis(20)))
            .await
            .expect_err("stale signal must not release the wait");
        assert!(matches!(err, AppError::Timeout { .. }));
    }

    #[test]
    fn signal_without_armed_wait_is_dropped() {
        let waiter: ResponseWaiter<u8> = ResponseWaiter::new();
        assert!(!waiter.signal("anything", 3));
        assert!(waiter.pending().is_none());
    }

    #[test]
    fn second_arm_is_rejected_while_outstanding() {
        let waiter: ResponseWaiter<u8> = ResponseWaiter::new();
        let _first = waiter.arm("first").unwrap();

        let second = waiter.arm("second");
        match second {
            Err(AppError::Busy { tag }) => assert_eq!(tag, "first"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("second arm should fail"),
        };
    }

    #[tokio::test]
    async fn timeout_disarms_so_late_signal_is_dropped() {
        let waiter = ResponseWaiter::new();
        let handle = waiter.arm("slow").unwrap();

        assert!(handle.wait(Some(Duration::from_millis(10))).await.is_err());
        assert!(waiter.pending().is_none());
        assert!(!waiter.signal("slow", 1u8));
    }

    #[tokio::test]
    async fn unbounded_wait_stays_pending_without_signal() {
        let waiter: ResponseWaiter<u8> = ResponseWaiter::new();
        let handle = waiter.arm("never").unwrap();

        let outcome =
            tokio::time::timeout(Duration::from_millis(30), handle.wait(None)).await;
        assert!(outcome.is_err(), "wait without a limit must not resolve");
        assert!(waiter.pending().is_none(), "cancelled wait releases the slot");
    }

    #[test]
    fn dropping_handle_releases_slot() {
        let waiter: ResponseWaiter<u8> = ResponseWaiter::new();
        {
            let handle = waiter.arm("dropped").unwrap();
            assert_eq!(waiter.pending().unwrap().request_name, handle.tag());
        }
        assert!(waiter.arm("next").is_ok());
    }
}
