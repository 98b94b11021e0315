//! Session driver: owns the machine and executes its effects.
//!
//! All inputs (user commands, visibility changes, prompt answers) and the
//! one-second tick are serialised onto a single task. Every effect of a
//! transition is applied before the next input is looked at, so a tick can
//! never land after the pause or stop that cancelled it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::error::{RemoteError, ValidationError};
use crate::events::Event;
use crate::finalizer::Finalizer;
use crate::notify::Notifier;
use crate::observer::{ResumeChoice, Visibility, VisibilityObserver};
use crate::timer::{Effect, FocusMachine, TimerConfig};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// How long [`SessionDriver::run`] waits for in-flight mirror writes on exit.
pub const DEFAULT_MIRROR_TIMEOUT: Duration = Duration::from_secs(10);

/// User-issued operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Configure(TimerConfig),
    Start(TimerConfig),
    Pause,
    Resume,
    Stop,
    Reset,
    /// Publish the current state as an [`Event::StateSnapshot`].
    Snapshot,
}

/// Anything the driver reacts to besides the tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    Visibility(Visibility),
    Choice(ResumeChoice),
}

impl From<Command> for Input {
    fn from(command: Command) -> Self {
        Input::Command(command)
    }
}

enum Wake {
    Input(Option<Input>),
    Tick,
}

pub struct SessionDriver {
    machine: FocusMachine,
    observer: VisibilityObserver,
    finalizer: Finalizer,
    notifier: Arc<dyn Notifier>,
    reminders_enabled: bool,
    events: mpsc::UnboundedSender<Event>,
    ticker: Option<Interval>,
    pending_mirrors: Vec<JoinHandle<Result<(), RemoteError>>>,
    mirror_timeout: Duration,
}

impl SessionDriver {
    pub fn new(
        machine: FocusMachine,
        finalizer: Finalizer,
        notifier: Arc<dyn Notifier>,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            machine,
            observer: VisibilityObserver::new(),
            finalizer,
            notifier,
            reminders_enabled: true,
            events,
            ticker: None,
            pending_mirrors: Vec::new(),
            mirror_timeout: DEFAULT_MIRROR_TIMEOUT,
        }
    }

    /// Turn the halfway reminder on or off.
    pub fn with_reminders(mut self, enabled: bool) -> Self {
        self.reminders_enabled = enabled;
        self
    }

    /// Upper bound on the shutdown wait for remote mirror writes.
    pub fn with_mirror_timeout(mut self, timeout: Duration) -> Self {
        self.mirror_timeout = timeout;
        self
    }

    pub fn machine(&self) -> &FocusMachine {
        &self.machine
    }

    pub fn observer(&self) -> &VisibilityObserver {
        &self.observer
    }

    pub fn finalizer(&self) -> &Finalizer {
        &self.finalizer
    }

    /// True while a tick source is armed.
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    /// Mirror writes started by this driver that have not finished yet.
    pub fn pending_mirror_count(&self) -> usize {
        self.pending_mirrors.iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait for outstanding mirror writes, giving up after the mirror timeout.
    /// Writes still running at the deadline are aborted.
    pub async fn flush_mirrors(&mut self) {
        if self.pending_mirrors.is_empty() {
            return;
        }
        let deadline = Instant::now() + self.mirror_timeout;
        for mut handle in self.pending_mirrors.drain(..) {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => warn!(error = %err, "mirror task failed"),
                Err(_) => {
                    warn!("mirror write still running at shutdown; abandoning it");
                    handle.abort();
                }
            }
        }
    }

    /// Process one input. Must be called within a tokio runtime.
    ///
    /// # Errors
    /// A rejected start or configure returns the validation error after the
    /// rejection has been published; the machine is unchanged.
    pub fn handle(&mut self, input: Input) -> Result<(), ValidationError> {
        let now = Utc::now();
        let effects = match input {
            Input::Command(Command::Configure(config)) => {
                if !self.machine.configure(config)? {
                    debug!("configure ignored while a session is active");
                }
                Vec::new()
            }
            Input::Command(Command::Start(config)) => match self.machine.start(config, now) {
                Ok(effects) => effects,
                Err(err) => {
                    self.publish(Event::StartRejected {
                        message: err.to_string(),
                        at: now,
                    });
                    return Err(err);
                }
            },
            Input::Command(Command::Pause) => self.machine.pause(now),
            Input::Command(Command::Resume) => self.machine.resume(now),
            Input::Command(Command::Stop) => self.machine.stop(now),
            Input::Command(Command::Reset) => self.machine.reset(now),
            Input::Command(Command::Snapshot) => {
                vec![Effect::Publish(self.machine.snapshot(now))]
            }
            Input::Visibility(next) => self.observer.on_change(next, &mut self.machine, now),
            Input::Choice(choice) => self.observer.answer(choice, &mut self.machine, now),
        };
        self.apply(effects);
        Ok(())
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) {
        let effects = self.machine.tick(Utc::now());
        self.apply(effects);
    }

    /// Drive the session until the input channel closes, wait for pending
    /// mirror writes, then hand the driver back.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<Input>) -> Self {
        loop {
            let wake = tokio::select! {
                biased;
                input = inputs.recv() => Wake::Input(input),
                () = next_tick(&mut self.ticker) => Wake::Tick,
            };

            match wake {
                Wake::Input(Some(input)) => {
                    if let Err(err) = self.handle(input) {
                        debug!(error = %err, "input rejected");
                    }
                }
                Wake::Input(None) => break,
                Wake::Tick => self.tick(),
            }
        }
        debug!(phase = ?self.machine.phase(), "input channel closed; driver stopping");
        self.ticker = None;
        self.flush_mirrors().await;
        self
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            trace!(?effect, "applying effect");
            match effect {
                Effect::StartTicking => {
                    let mut interval = tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.ticker = Some(interval);
                }
                Effect::StopTicking => self.ticker = None,
                Effect::ScheduleReminder {
                    after_secs,
                    category,
                } => {
                    if !self.reminders_enabled {
                        continue;
                    }
                    if self.notifier.schedule_reminder(after_secs, category).is_none() {
                        debug!("notifications unavailable; reminder skipped");
                    }
                }
                Effect::CancelReminders => self.notifier.cancel_all_pending(),
                Effect::Finalize(snapshot) => {
                    let done = self.finalizer.finalize(&snapshot);
                    if done.persisted.local.is_err() {
                        warn!(session_id = %done.record.id, "session summary not stored locally");
                    }
                    if let Some(handle) = done.persisted.remote {
                        self.pending_mirrors.retain(|h| !h.is_finished());
                        self.pending_mirrors.push(handle);
                    }
                    self.publish(Event::SessionSummary { record: done.record });
                }
                Effect::PromptResume { distraction_count } => {
                    self.publish(Event::ResumePrompt {
                        distraction_count,
                        at: Utc::now(),
                    });
                }
                Effect::Publish(event) => self.publish(event),
            }
        }
    }

    fn publish(&self, event: Event) {
        let kind = event.kind();
        if self.events.send(event).is_err() {
            trace!(kind, "no event subscriber");
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Anonymous, AuthProvider};
    use crate::notify::ReminderHandle;
    use crate::storage::{Database, MirrorFuture, RemoteMirror, SessionRecord, SessionSinks};
    use crate::timer::{Category, Phase};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Reminders {
        scheduled: Mutex<Vec<u64>>,
        cancels: Mutex<u32>,
    }

    impl Notifier for Reminders {
        fn notify_completion(&self, _category: Category, _duration_min: u64) {}

        fn schedule_reminder(&self, after_secs: u64, _category: Category) -> Option<ReminderHandle> {
            self.scheduled.lock().unwrap().push(after_secs);
            None
        }

        fn cancel_all_pending(&self) {
            *self.cancels.lock().unwrap() += 1;
        }
    }

    fn driver() -> (SessionDriver, mpsc::UnboundedReceiver<Event>, Arc<Reminders>) {
        let notifier = Arc::new(Reminders::default());
        let sinks = SessionSinks::new(Box::new(Database::open_memory().unwrap()), Arc::new(Anonymous));
        let finalizer = Finalizer::new(sinks, notifier.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = SessionDriver::new(FocusMachine::default(), finalizer, notifier.clone(), tx);
        (driver, rx, notifier)
    }

    struct SignedIn;

    impl AuthProvider for SignedIn {
        fn current_user_id(&self) -> Option<String> {
            Some("u-1".into())
        }
    }

    /// Accepts every push after `delay`.
    struct SlowMirror {
        delay: Duration,
        stored: AtomicUsize,
    }

    impl RemoteMirror for SlowMirror {
        fn push<'a>(&'a self, _user_id: &'a str, _record: &'a SessionRecord) -> MirrorFuture<'a> {
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                self.stored.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    fn mirrored_driver(delay: Duration) -> (SessionDriver, Arc<SlowMirror>) {
        let mirror = Arc::new(SlowMirror {
            delay,
            stored: AtomicUsize::new(0),
        });
        let notifier = Arc::new(Reminders::default());
        let sinks = SessionSinks::new(Box::new(Database::open_memory().unwrap()), Arc::new(SignedIn))
            .with_remote(mirror.clone());
        let finalizer = Finalizer::new(sinks, notifier.clone());
        let (tx, _rx) = mpsc::unbounded_channel();
        let driver = SessionDriver::new(FocusMachine::default(), finalizer, notifier, tx);
        (driver, mirror)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn start(minutes: u32, category: Category) -> Input {
        Command::Start(TimerConfig::new(minutes, category)).into()
    }

    #[tokio::test(start_paused = true)]
    async fn start_arms_ticker_and_pause_drops_it() {
        let (mut driver, mut rx, _) = driver();
        driver.handle(start(5, Category::Coding)).unwrap();
        assert!(driver.is_ticking());

        driver.handle(Command::Pause.into()).unwrap();
        assert!(!driver.is_ticking());
        assert_eq!(driver.machine().phase(), Phase::Paused);

        let kinds: Vec<_> = drain(&mut rx).iter().map(Event::kind).collect();
        assert_eq!(kinds, vec!["session_started", "timer_paused"]);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_start_is_published() {
        let (mut driver, mut rx, _) = driver();
        let missing = TimerConfig {
            duration_min: 25,
            category: None,
        };
        let err = driver.handle(Command::Start(missing).into()).unwrap_err();
        assert_eq!(err, ValidationError::MissingCategory);
        assert_eq!(driver.machine().phase(), Phase::Idle);
        assert!(!driver.is_ticking());

        let events = drain(&mut rx);
        assert!(matches!(events.as_slice(), [Event::StartRejected { .. }]));
    }

    #[tokio::test(start_paused = true)]
    async fn completion_publishes_summary() {
        let (mut driver, mut rx, _) = driver();
        driver.handle(start(1, Category::Reading)).unwrap();
        for _ in 0..60 {
            driver.tick();
        }
        assert_eq!(driver.machine().phase(), Phase::Completed);
        assert!(!driver.is_ticking());

        let summary = drain(&mut rx)
            .into_iter()
            .find_map(|e| match e {
                Event::SessionSummary { record } => Some(record),
                _ => None,
            })
            .unwrap();
        assert!(summary.completed);
        assert_eq!(summary.duration_min, 1);
        assert_eq!(driver.finalizer().sinks().list_all().unwrap(), vec![summary]);
    }

    #[tokio::test(start_paused = true)]
    async fn halfway_reminder_is_forwarded_once() {
        let (mut driver, _rx, notifier) = driver();
        driver.handle(start(10, Category::Study)).unwrap();
        for _ in 0..400 {
            driver.tick();
        }
        assert_eq!(*notifier.scheduled.lock().unwrap(), vec![240]);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_reminders_are_not_scheduled() {
        let (driver, _rx, notifier) = driver();
        let mut driver = driver.with_reminders(false);
        driver.handle(start(10, Category::Study)).unwrap();
        for _ in 0..400 {
            driver.tick();
        }
        assert!(notifier.scheduled.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn background_prompts_on_return() {
        let (mut driver, mut rx, _) = driver();
        driver.handle(start(25, Category::Project)).unwrap();
        driver.handle(Input::Visibility(Visibility::Background)).unwrap();
        assert!(!driver.is_ticking());
        driver.handle(Input::Visibility(Visibility::Active)).unwrap();
        assert!(driver.observer().prompt_pending());

        driver.handle(Input::Choice(ResumeChoice::Resume)).unwrap();
        assert!(driver.is_ticking());
        assert_eq!(driver.machine().distraction_count(), 1);

        let kinds: Vec<_> = drain(&mut rx).iter().map(Event::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "session_started",
                "timer_paused",
                "distraction_recorded",
                "resume_prompt",
                "timer_resumed"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_counts_down_in_real_seconds() {
        let (driver, mut events, _) = driver();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(driver.run(rx));

        tx.send(start(2, Category::Coding)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30_500)).await;
        tx.send(Command::Snapshot.into()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let remaining = drain(&mut events).into_iter().find_map(|e| match e {
            Event::StateSnapshot { remaining_secs, .. } => Some(remaining_secs),
            _ => None,
        });
        assert_eq!(remaining, Some(90));

        tokio::time::sleep(Duration::from_secs(120)).await;
        drop(tx);
        let driver = task.await.unwrap();
        assert_eq!(driver.machine().phase(), Phase::Completed);
        assert!(drain(&mut events)
            .iter()
            .any(|e| matches!(e, Event::SessionSummary { record } if record.completed)));
    }

    #[tokio::test(start_paused = true)]
    async fn paused_session_does_not_tick() {
        let (driver, _events, _) = driver();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(driver.run(rx));

        tx.send(start(1, Category::Coding)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        tx.send(Command::Pause.into()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;
        drop(tx);

        let driver = task.await.unwrap();
        assert_eq!(driver.machine().phase(), Phase::Paused);
        assert_eq!(driver.machine().remaining_secs(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn run_waits_for_mirror_write_after_stop() {
        let (driver, mirror) = mirrored_driver(Duration::from_secs(3));
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(driver.run(rx));

        tx.send(start(1, Category::Coding)).await.unwrap();
        tx.send(Command::Stop.into()).await.unwrap();
        drop(tx);

        let driver = task.await.unwrap();
        assert_eq!(mirror.stored.load(Ordering::SeqCst), 1);
        assert_eq!(driver.pending_mirror_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_mirror_write_is_abandoned_at_timeout() {
        let (driver, mirror) = mirrored_driver(Duration::from_secs(600));
        let driver = driver.with_mirror_timeout(Duration::from_secs(5));
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(driver.run(rx));

        let begun = Instant::now();
        tx.send(start(1, Category::Coding)).await.unwrap();
        tx.send(Command::Stop.into()).await.unwrap();
        drop(tx);

        let driver = task.await.unwrap();
        assert!(begun.elapsed() < Duration::from_secs(60));
        assert_eq!(mirror.stored.load(Ordering::SeqCst), 0);
        assert_eq!(driver.pending_mirror_count(), 0);
        assert_eq!(driver.finalizer().sinks().list_all().unwrap().len(), 1);
    }
}
