use anyhow::Result;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Instant;
use tracing::{info, debug, warn, error, Span};

use crate::output::config::OutputConfig;
use crate::output::types::Envelope;
use crate::output::Emitter;

pub trait PhaseSpan {
    fn name(&self) -> &'static str;
    fn span(&self) -> Span;
}

pub trait OpMarker {
    const NAME: &'static str;
    type Phase: PhaseSpan;
    fn root_span() -> Span;
}

/// Typed logging handle for one operation. In JSON log mode every line
/// carries `op` and the key/value details as fields; in text mode details
/// are appended to the message.
pub struct LogCtx<O: OpMarker> {
    json: bool,
    _marker: PhantomData<O>,
}

impl<O: OpMarker> LogCtx<O> {
    pub(crate) fn new(json: bool) -> Self { Self { json, _marker: PhantomData } }

    fn op_name(&self) -> &'static str { O::NAME }

    pub fn root_span(&self) -> Span { O::root_span() }

    pub fn root_span_kv<'a, T>(&self, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.root_span();
        let details = kv_to_string(fields);
        if details.is_empty() {
            debug!(op = %self.op_name(), "start");
        } else {
            debug!(op = %self.op_name(), details = %details, "start");
        }
        span
    }

    pub fn span(&self, ph: &O::Phase) -> Span {
        debug!(op = %self.op_name(), phase = ph.name(), "span_start");
        ph.span()
    }

    pub fn info(&self, msg: impl AsRef<str>) { if self.json { info!(op = %self.op_name(), "{}", msg.as_ref()); } else { info!("{}", msg.as_ref()); } }
    pub fn warn(&self, msg: impl AsRef<str>) { if self.json { warn!(op = %self.op_name(), "{}", msg.as_ref()); } else { warn!("{}", msg.as_ref()); } }
    pub fn error(&self, msg: impl AsRef<str>) { if self.json { error!(op = %self.op_name(), "{}", msg.as_ref()); } else { error!("{}", msg.as_ref()); } }

    pub fn info_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { info!(op = %self.op_name(), details = %details, "{}", msg); }
        else { info!("{} {}", msg, details); }
    }

    pub fn debug_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { debug!(op = %self.op_name(), details = %details, "{}", msg); }
        else { debug!("{} {}", msg, details); }
    }

    pub fn warn_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { warn!(op = %self.op_name(), details = %details, "{}", msg); }
        else { warn!("{} {}", msg, details); }
    }

    pub fn error_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { error!(op = %self.op_name(), details = %details, "{}", msg); }
        else { error!("{} {}", msg, details); }
    }

    /// Emits the command's structured result on stdout.
    pub fn result<T: Serialize>(&self, result: &T, started: Option<Instant>) -> Result<()> {
        let env = Envelope::result(self.op_name(), result, started.map(|t| t.elapsed().as_millis()))?;
        Emitter::from_env(OutputConfig::from_env()).emit(&env)?;
        Ok(())
    }
}

fn kv_to_string<'a, T>(kv: T) -> String
where
    T: IntoIterator<Item = (&'a str, String)>,
{
    let mut parts: Vec<String> = Vec::new();
    for (k, v) in kv { parts.push(format!("{}={}", k, v)); }
    parts.join(" ")
}
