use std::future::Future;
use std::sync::mpsc::{self, Receiver, Sender};

use tridash::TridashError;
use tridash::fetch::{Generation, RequestTracker};

type Outcome<T> = (Generation, Result<T, TridashError>);

/// Runs API calls off the UI thread. Results come back through channels polled once per frame.
pub(crate) struct Worker {
    runtime: tokio::runtime::Runtime,
    ctx: egui::Context,
}

impl Worker {
    pub(crate) fn new(ctx: egui::Context) -> Result<Self, TridashError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|e| TridashError::RuntimeError { source: e })?;
        Ok(Self { runtime, ctx })
    }
}

/// One kind of request issued by a view. Starting a new one supersedes whatever is still in
/// flight, so a slow stale response can never overwrite a newer one.
pub(crate) struct Fetch<T> {
    tracker: RequestTracker,
    tx: Sender<Outcome<T>>,
    rx: Receiver<Outcome<T>>,
    in_flight: bool,
}

impl<T: Send + 'static> Fetch<T> {
    pub(crate) fn new(name: &'static str) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tracker: RequestTracker::named(name),
            tx,
            rx,
            in_flight: false,
        }
    }

    pub(crate) fn start<F>(&mut self, worker: &Worker, request: F)
    where
        F: Future<Output = Result<T, TridashError>> + Send + 'static,
    {
        let generation = self.tracker.begin();
        let tx = self.tx.clone();
        let ctx = worker.ctx.clone();
        worker.runtime.spawn(async move {
            let result = request.await;
            // the view may be gone already, nothing to deliver to then
            let _ = tx.send((generation, result));
            ctx.request_repaint();
        });
        self.in_flight = true;
    }

    /// Latest current result, if one arrived since the last poll.
    pub(crate) fn poll(&mut self) -> Option<Result<T, TridashError>> {
        let mut latest = None;
        while let Ok((generation, result)) = self.rx.try_recv() {
            if let Some(result) = self.tracker.accept(generation, result) {
                self.in_flight = false;
                latest = Some(result);
            }
        }
        latest
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub(crate) fn cancel(&mut self) {
        self.tracker.invalidate();
        self.in_flight = false;
    }
}
