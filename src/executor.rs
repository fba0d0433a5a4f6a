//! Handler dispatch and trigger pipeline.
//!
//! Executes one sequential pass over a record stream. Each record is
//! pushed through every registered handler, in registration order, before
//! the next record is read. When a handler asks for a trigger, the
//! matching callback runs immediately with the live handler registry,
//! before the next handler sees the same record.
//!
//! Error containment:
//! - a non-fatal [`HandlerError`] parks only the handler that raised it;
//! - a fatal one (including the graceful [`HandlerError::Stop`]) ends the
//!   pass at once.
//!
//! The finalization callback registered with [`Analysis::on_finish`]
//! runs exactly once per pass, however the pass ended.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{HandlerError, PipelineError, SourceError};
use crate::handler::{Handler, HandlerRegistry};
use crate::record::EventRecord;

/// Trigger callback: reads (and usually resets) the handlers.
pub type TriggerFn = Box<dyn FnMut(&mut HandlerRegistry) -> Result<(), HandlerError>>;

/// Finalization callback.
pub type FinishFn = Box<dyn FnMut(&mut HandlerRegistry, &RunSummary)>;

/// How a pass ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunOutcome {
    /// The input ran out.
    #[default]
    Completed,
    /// A graceful stop was requested.
    Stopped,
    /// A fatal condition ended the pass.
    Aborted,
}

/// Counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records dispatched to the handlers.
    pub records: usize,
    pub triggers_fired: usize,
    /// Times a handler was parked by a non-fatal condition.
    pub handler_faults: usize,
    /// Non-fatal conditions returned by trigger callbacks.
    pub callback_faults: usize,
    pub outcome: RunOutcome,
}

enum Halt {
    Stop,
    Abort(PipelineError),
}

/// The analysis pipeline: handlers, trigger callbacks, and a finalizer.
#[derive(Default)]
pub struct Analysis {
    registry: HandlerRegistry,
    triggers: Vec<(String, TriggerFn)>,
    finalizer: Option<FinishFn>,
    stop: Arc<AtomicBool>,
}

impl Analysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`, after those already registered.
    pub fn register_handler<H: Handler>(&mut self, name: &str, handler: H) {
        self.registry.register(name, handler);
    }

    /// Register the callback run when a handler returns `name`.
    pub fn register_trigger<F>(&mut self, name: &str, callback: F)
    where
        F: FnMut(&mut HandlerRegistry) -> Result<(), HandlerError> + 'static,
    {
        let callback: TriggerFn = Box::new(callback);
        match self.triggers.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = callback,
            None => self.triggers.push((name.to_string(), callback)),
        }
    }

    /// Register the finalization step.
    pub fn on_finish<F>(&mut self, callback: F)
    where
        F: FnMut(&mut HandlerRegistry, &RunSummary) + 'static,
    {
        self.finalizer = Some(Box::new(callback));
    }

    /// Flag checked before each record; setting it stops the pass gracefully.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// Run a pass over already-decoded records.
    pub fn run_records<I>(&mut self, records: I) -> Result<RunSummary, PipelineError>
    where
        I: IntoIterator<Item = EventRecord>,
    {
        self.run(records.into_iter().map(Ok))
    }

    /// Run one pass over a record stream.
    ///
    /// Returns the summary when the input ran out or a graceful stop was
    /// requested, and the fatal condition otherwise. Either way the
    /// finalizer has run once by the time this returns.
    pub fn run<I>(&mut self, records: I) -> Result<RunSummary, PipelineError>
    where
        I: IntoIterator<Item = Result<EventRecord, SourceError>>,
    {
        let mut summary = RunSummary::default();
        let mut halt = None;

        for item in records {
            if self.stop.load(Ordering::Relaxed) {
                halt = Some(Halt::Stop);
                break;
            }
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    halt = Some(Halt::Abort(e.into()));
                    break;
                }
            };
            summary.records += 1;
            if let Err(h) = self.dispatch(&record, &mut summary) {
                halt = Some(h);
                break;
            }
        }

        // End of input (or a graceful stop) also ends the game in progress.
        if !matches!(halt, Some(Halt::Abort(_)))
            && let Err(h) = self.finish_handlers(&mut summary)
        {
            halt = Some(h);
        }

        let result = match halt {
            None => Ok(()),
            Some(Halt::Stop) => {
                summary.outcome = RunOutcome::Stopped;
                Ok(())
            }
            Some(Halt::Abort(e)) => {
                summary.outcome = RunOutcome::Aborted;
                Err(e)
            }
        };

        if let Some(finalizer) = self.finalizer.as_mut() {
            finalizer(&mut self.registry, &summary);
        }

        log::info!(
            "pass {:?}: {} records, {} triggers, {} handler faults",
            summary.outcome,
            summary.records,
            summary.triggers_fired,
            summary.handler_faults
        );
        result.map(|()| summary)
    }

    fn dispatch(&mut self, record: &EventRecord, summary: &mut RunSummary) -> Result<(), Halt> {
        for i in 0..self.registry.len() {
            let entry = &mut self.registry.entries_mut()[i];
            if entry.fault.is_some() {
                continue;
            }
            match entry.handler.handle(record) {
                Ok(None) => {}
                Ok(Some(trigger)) => {
                    let handler = entry.name.clone();
                    self.fire(&handler, &trigger, summary)?;
                }
                Err(error) => self.contain(i, error, summary)?,
            }
        }
        Ok(())
    }

    fn finish_handlers(&mut self, summary: &mut RunSummary) -> Result<(), Halt> {
        for i in 0..self.registry.len() {
            let entry = &mut self.registry.entries_mut()[i];
            if entry.fault.is_some() {
                continue;
            }
            match entry.handler.finish() {
                Ok(None) => {}
                Ok(Some(trigger)) => {
                    let handler = entry.name.clone();
                    self.fire(&handler, &trigger, summary)?;
                }
                Err(error) => self.contain(i, error, summary)?,
            }
        }
        Ok(())
    }

    /// Park the handler on a non-fatal condition, halt on a fatal one.
    fn contain(
        &mut self,
        index: usize,
        error: HandlerError,
        summary: &mut RunSummary,
    ) -> Result<(), Halt> {
        let entry = &mut self.registry.entries_mut()[index];
        if error == HandlerError::Stop {
            log::info!("handler '{}' requested stop", entry.name);
            return Err(Halt::Stop);
        }
        if error.is_fatal() {
            return Err(Halt::Abort(PipelineError::Handler {
                handler: entry.name.clone(),
                error,
            }));
        }
        log::warn!("handler '{}' parked: {error}", entry.name);
        entry.fault = Some(error);
        summary.handler_faults += 1;
        Ok(())
    }

    fn fire(&mut self, handler: &str, trigger: &str, summary: &mut RunSummary) -> Result<(), Halt> {
        let Some((_, callback)) = self.triggers.iter_mut().find(|(n, _)| n == trigger) else {
            return Err(Halt::Abort(PipelineError::UnknownTrigger {
                handler: handler.to_string(),
                trigger: trigger.to_string(),
            }));
        };
        log::debug!("handler '{handler}' fired trigger '{trigger}'");
        summary.triggers_fired += 1;

        match callback(&mut self.registry) {
            Ok(()) => Ok(()),
            Err(HandlerError::Stop) => Err(Halt::Stop),
            Err(error) if error.is_fatal() => Err(Halt::Abort(PipelineError::Trigger {
                trigger: trigger.to_string(),
                error,
            })),
            Err(error) => {
                log::warn!("trigger '{trigger}' failed: {error}");
                summary.callback_faults += 1;
                Ok(())
            }
        }
    }
}
