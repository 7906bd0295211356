//! Concurrent per-peer verification.
//!
//! Each peer's check runs on a worker of a bounded rayon pool and reports through its
//! own single-slot channel. The caller's thread collects the outcomes in registry order,
//! so completion order never affects the verdict.
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        mpsc::{sync_channel, Receiver},
        Arc,
    },
    time::Instant,
};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error, warn, Span};

use crate::collections::{TypedUsize, VecMap};

use super::api::{ProtocolError, ProtocolResult, VerificationError};

/// Per-party outcome of a fan-out. Our own entry is always `true`.
pub type Verdict<P> = VecMap<P, bool>;

/// A single peer's check. May borrow round data for the duration of the fan-out.
pub type VerifyTask<'a> = Box<dyn FnOnce() -> Result<bool, VerificationError> + Send + 'a>;

#[derive(Clone)]
pub struct VerificationFanout {
    pool: Arc<ThreadPool>,
}

impl VerificationFanout {
    pub fn new(concurrency: usize) -> ProtocolResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|i| format!("verify-{}", i))
            .build()
            .map_err(|err| {
                error!("failed to build verification pool: {}", err);
                ProtocolError::Fatal
            })?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn concurrency(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run every task and return the verdict for all `party_count` parties.
    ///
    /// A task that errors or panics yields `false`. A peer without a task yields `false`.
    /// A task for `me` is skipped: self is trusted.
    pub fn verify_all<P>(
        &self,
        party_count: usize,
        me: TypedUsize<P>,
        tasks: Vec<(TypedUsize<P>, VerifyTask<'_>)>,
    ) -> ProtocolResult<Verdict<P>> {
        if me.as_usize() >= party_count {
            error!("own index {} out of bounds {}", me, party_count);
            return Err(ProtocolError::Fatal);
        }

        self.pool.in_place_scope(|scope| {
            let mut receivers: VecMap<P, Option<Receiver<bool>>> =
                (0..party_count).map(|_| None).collect();

            for (peer, task) in tasks {
                if peer == me {
                    warn!("skip verification task for self {}", me);
                    continue;
                }
                let slot = receivers.get_mut(peer)?;
                if slot.is_some() {
                    error!("duplicate verification task for peer {}", peer);
                    return Err(ProtocolError::Fatal);
                }
                let (tx, rx) = sync_channel(1);
                *slot = Some(rx);

                let span = Span::current();
                scope.spawn(move |_| {
                    span.in_scope(|| {
                        let timer = Instant::now();
                        let ok = match catch_unwind(AssertUnwindSafe(task)) {
                            Ok(Ok(ok)) => ok,
                            Ok(Err(err)) => {
                                warn!("peer {} verification error: {}", peer, err);
                                false
                            }
                            Err(_) => {
                                error!("peer {} verification panicked", peer);
                                false
                            }
                        };
                        debug!(
                            "peer {} verification {} in {} ms",
                            peer,
                            if ok { "passed" } else { "failed" },
                            timer.elapsed().as_millis()
                        );
                        // the receiver is gone only if collection already failed
                        let _ = tx.send(ok);
                    })
                });
            }

            receivers.map2_result(|(peer, rx)| {
                Ok(match rx {
                    None if peer == me => true,
                    None => {
                        warn!("no verification task for peer {}", peer);
                        false
                    }
                    Some(rx) => rx.recv().unwrap_or_else(|_| {
                        error!("peer {} verification dropped its result", peer);
                        false
                    }),
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
        thread,
        time::Duration,
    };

    use tracing_test::traced_test;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct TestParty;

    fn index(i: usize) -> TypedUsize<TestParty> {
        TypedUsize::from_usize(i)
    }

    #[test]
    #[traced_test]
    fn verdict_in_registry_order_despite_completion_order() {
        let fanout = VerificationFanout::new(4).unwrap();
        let finished = Mutex::new(Vec::new());
        // peer 3 finishes first, then 1, then 2
        let delays = [0, 60, 120, 0];
        let outcomes = [true, true, false, false];

        let tasks = (1..4)
            .map(|i| {
                let finished = &finished;
                (
                    index(i),
                    task(move || {
                        thread::sleep(Duration::from_millis(delays[i]));
                        finished.lock().unwrap().push(i);
                        Ok(outcomes[i])
                    }),
                )
            })
            .collect();

        let verdict = fanout.verify_all(4, index(0), tasks).unwrap();
        assert_eq!(verdict.into_vec(), vec![true, true, false, false]);
        assert_eq!(*finished.lock().unwrap(), vec![3, 1, 2]);
    }

    fn task<'a>(
        f: impl FnOnce() -> Result<bool, VerificationError> + Send + 'a,
    ) -> VerifyTask<'a> {
        Box::new(f)
    }

    #[test]
    #[traced_test]
    fn errors_and_panics_are_failures() {
        let fanout = VerificationFanout::new(2).unwrap();
        let tasks = vec![
            (index(0), task(|| Ok(true))),
            (
                index(1),
                task(|| Err(VerificationError::MalformedProof("short".into()))),
            ),
            (index(2), task(|| panic!("verifier bug"))),
        ];
        let verdict = fanout.verify_all(4, index(3), tasks).unwrap();
        assert_eq!(verdict.into_vec(), vec![true, false, false, true]);
        assert!(logs_contain("verification error: malformed proof: short"));
        assert!(logs_contain("verification panicked"));
    }

    #[test]
    fn self_is_trusted_without_work() {
        let fanout = VerificationFanout::new(1).unwrap();
        let calls = AtomicUsize::new(0);
        let tasks = vec![
            (
                index(0),
                task(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(false)
                }),
            ),
            (
                index(1),
                task(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(true)
                }),
            ),
        ];
        let verdict = fanout.verify_all(2, index(0), tasks).unwrap();
        assert_eq!(verdict.into_vec(), vec![true, true]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn verify_inside_async_runtime() {
        let fanout = VerificationFanout::new(2).unwrap();
        let tasks = vec![
            (index(1), task(|| Ok(true))),
            (index(2), task(|| Ok(false))),
        ];
        let verdict = fanout.verify_all(3, index(0), tasks).unwrap();
        assert_eq!(verdict.into_vec(), vec![true, true, false]);
    }

    #[test]
    fn missing_task_fails_duplicate_is_fatal() {
        let fanout = VerificationFanout::new(2).unwrap();
        let verdict = fanout.verify_all(3, index(0), vec![]).unwrap();
        assert_eq!(verdict.into_vec(), vec![true, false, false]);

        let tasks = vec![(index(1), task(|| Ok(true))), (index(1), task(|| Ok(true)))];
        assert_eq!(
            fanout.verify_all(3, index(0), tasks).unwrap_err(),
            ProtocolError::Fatal
        );
        assert!(fanout.verify_all(2, index(2), vec![]).is_err());
    }
}
