//! The shared poller clock.
//!
//! The loader owns one [`Scheduler`] and calls [`Scheduler::tick`] once per tick. Each applet may
//! register one poller, which fires every `period` ticks. Applets reach their poller through a
//! [`PollerHandle`], which can change the period and ask for an immediate poll.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use dock_shared_util::AppletName;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::task::TaskTracker;

use crate::{applet::Handler, util::run_guarded};

/// The periodic task of an applet. The three steps run in order on the same worker.
#[derive(Debug, Clone)]
pub struct PollerSpec {
    pub pre: Option<Handler<()>>,
    pub poll: Handler<()>,
    pub post: Option<Handler<()>>,
}

impl PollerSpec {
    pub fn new(poll: Handler<()>) -> Self {
        PollerSpec { pre: None, poll, post: None }
    }
}

/// Applet side of the poller. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PollerHandle {
    name: AppletName,
    period: Arc<AtomicU64>,
    tick: Duration,
    restart: UnboundedSender<AppletName>,
}

impl PollerHandle {
    pub fn new(name: AppletName, tick: Duration, restart: UnboundedSender<AppletName>) -> Self {
        PollerHandle { name, period: Arc::new(AtomicU64::new(1)), tick, restart }
    }

    /// Ask for a poll right away. The request is dropped if a poll is already running.
    pub fn restart(&self) {
        if self.restart.send(self.name.clone()).is_err() {
            log::debug!("Poller restart of {} ignored, the host is stopping", self.name);
        }
    }

    /// Period in ticks, at least 1.
    pub fn period(&self) -> u64 {
        self.period.load(Ordering::Relaxed)
    }

    pub fn set_period(&self, ticks: u64) {
        self.period.store(ticks.max(1), Ordering::Relaxed);
    }

    /// Set the period from a duration, rounded up to whole ticks.
    pub fn set_interval(&self, interval: Duration) {
        let tick = self.tick.as_millis().max(1);
        let ticks = interval.as_millis().div_ceil(tick);
        self.set_period(u64::try_from(ticks).unwrap_or(u64::MAX));
    }
}

#[derive(Debug)]
struct PollerRecord {
    period: Arc<AtomicU64>,
    phase: u64,
    in_flight: Arc<AtomicBool>,
    spec: Arc<PollerSpec>,
}

#[derive(Debug)]
pub struct Scheduler {
    pollers: BTreeMap<AppletName, PollerRecord>,
    tracker: TaskTracker,
    tick: Duration,
}

impl Scheduler {
    pub fn new(tick: Duration, tracker: TaskTracker) -> Self {
        Scheduler { pollers: BTreeMap::new(), tracker, tick }
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick
    }

    /// Register the poller of an applet, replacing any previous one. The poller is primed, so
    /// the next tick fires it.
    pub fn register(&mut self, handle: &PollerHandle, spec: PollerSpec) {
        let period = handle.period.clone();
        let phase = period.load(Ordering::Relaxed);
        let record = PollerRecord { period, phase, in_flight: Arc::default(), spec: Arc::new(spec) };
        self.pollers.insert(handle.name.clone(), record);
    }

    pub fn deregister(&mut self, name: &AppletName) -> bool {
        self.pollers.remove(name).is_some()
    }

    pub fn contains(&self, name: &AppletName) -> bool {
        self.pollers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.pollers.len()
    }

    pub fn is_in_flight(&self, name: &AppletName) -> bool {
        self.pollers.get(name).map_or(false, |poller| poller.in_flight.load(Ordering::SeqCst))
    }

    /// Advance the clock by one tick, firing every poller that is due.
    pub fn tick(&mut self) {
        let tracker = &self.tracker;
        for (name, poller) in self.pollers.iter_mut() {
            let period = poller.period.load(Ordering::Relaxed).max(1);
            if poller.phase + 1 >= period {
                poller.phase = 0;
                fire(tracker, name, poller);
            } else {
                poller.phase += 1;
            }
        }
    }

    /// Fire the poller of `name` now and restart its count. Returns whether a poll was started.
    pub fn restart(&mut self, name: &AppletName) -> bool {
        let Some(poller) = self.pollers.get_mut(name) else {
            log::debug!("Restart requested for {}, which has no poller", name);
            return false;
        };
        poller.phase = 0;
        fire(&self.tracker, name, poller)
    }
}

fn fire(tracker: &TaskTracker, name: &AppletName, poller: &PollerRecord) -> bool {
    if poller.in_flight.swap(true, Ordering::SeqCst) {
        log::debug!("Poll of {} still running, skipping this round", name);
        return false;
    }
    let spec = poller.spec.clone();
    let in_flight = poller.in_flight.clone();
    let name = name.clone();
    tracker.spawn(async move {
        if let Some(pre) = &spec.pre {
            run_guarded(&format!("before polling {}", name), pre.call(())).await;
        }
        run_guarded(&format!("polling {}", name), spec.poll.call(())).await;
        if let Some(post) = &spec.post {
            run_guarded(&format!("after polling {}", name), post.call(())).await;
        }
        in_flight.store(false, Ordering::SeqCst);
    });
    true
}
