//! Dedicated single-threaded executor for context-bound work.
//!
//! Exactly one OS thread owns the state built by the init closure; every
//! operation on that state is marshaled here as a job. Jobs run in FIFO
//! order, so a job queued before another is always observed first.

use std::thread::{self, JoinHandle};

use tracing::warn;

use crate::error::PipelineError;

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Handle to a thread that owns a state value and drains a job queue
/// until the handle is dropped.
pub struct RenderThread<S> {
    tx: Option<flume::Sender<Job<S>>>,
    handle: Option<JoinHandle<()>>,
}

impl<S: 'static> RenderThread<S> {
    /// Spawn the executor. `init` runs on the new thread; a failure there
    /// is reported back to the spawner and the thread exits.
    pub fn spawn<F>(name: &str, init: F) -> Result<Self, PipelineError>
    where
        F: FnOnce() -> Result<S, PipelineError> + Send + 'static,
    {
        let (tx, rx) = flume::unbounded::<Job<S>>();
        let (ready_tx, ready_rx) = flume::bounded::<Result<(), PipelineError>>(1);

        let handle = thread::Builder::new().name(name.to_owned()).spawn(move || {
            let mut state = match init() {
                Ok(state) => {
                    let _ = ready_tx.send(Ok(()));
                    state
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            for job in rx.iter() {
                job(&mut state);
            }
        })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                tx: Some(tx),
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(PipelineError::ContextClosed)
            }
        }
    }

    fn sender(&self) -> Result<&flume::Sender<Job<S>>, PipelineError> {
        self.tx.as_ref().ok_or(PipelineError::ContextClosed)
    }

    /// Run `f` on the executor thread and block until it returns.
    pub fn invoke<R, F>(&self, f: F) -> Result<R, PipelineError>
    where
        R: Send + 'static,
        F: FnOnce(&mut S) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = flume::bounded(1);
        self.sender()?
            .send(Box::new(move |state: &mut S| {
                let _ = reply_tx.send(f(state));
            }))
            .map_err(|_| PipelineError::ContextClosed)?;
        reply_rx.recv().map_err(|_| PipelineError::ContextClosed)
    }

    /// Queue `f` without waiting for it to run.
    pub fn post<F>(&self, f: F) -> Result<(), PipelineError>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.sender()?
            .send(Box::new(f))
            .map_err(|_| PipelineError::ContextClosed)
    }
}

impl<S> Drop for RenderThread<S> {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("render thread panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_returns_closure_value() {
        let thread = RenderThread::spawn("test-exec", || Ok(7u32)).unwrap();
        let doubled = thread.invoke(|state| *state * 2).unwrap();
        assert_eq!(doubled, 14);
    }

    #[test]
    fn jobs_run_in_fifo_order() {
        let thread = RenderThread::spawn("test-exec", || Ok(Vec::<u32>::new())).unwrap();
        for i in 0..16 {
            thread.post(move |state| state.push(i)).unwrap();
        }
        let seen = thread.invoke(|state| state.clone()).unwrap();
        assert_eq!(seen, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn init_failure_is_reported_to_spawner() {
        let result = RenderThread::<u32>::spawn("test-exec", || Err(PipelineError::NoAdapter));
        assert!(matches!(result, Err(PipelineError::NoAdapter)));
    }

    #[test]
    fn state_mutations_are_visible_across_jobs() {
        let thread = RenderThread::spawn("test-exec", || Ok(0u64)).unwrap();
        thread.post(|state| *state += 40).unwrap();
        thread.post(|state| *state += 2).unwrap();
        assert_eq!(thread.invoke(|state| *state).unwrap(), 42);
    }
}
