pub mod convert;
pub mod date;
pub mod geoip;
pub mod grok;
pub mod gsub;
pub mod json;
pub mod kv;
pub mod remove;
pub mod rename;
pub mod ruby;
pub mod script;
pub mod select;
pub mod split;
pub mod user_agent;

use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::{Error, Result};
use crate::prog::ingest;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// One configured transformation step, compiled once per backend.
pub trait Processor: std::fmt::Debug {
    /// Stable identifier used in diagnostics and error reports.
    fn name(&self) -> &'static str;

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>>;

    fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<FilterBlock>;
}

pub fn register_all(reg: &mut Registry) {
    reg.register("convert", convert::make);
    reg.register("date", date::make);
    reg.register("geoip", geoip::make);
    reg.register("grok", grok::make);
    reg.register("gsub", gsub::make);
    reg.register("json", json::make);
    reg.register("kv", kv::make);
    reg.register("remove", remove::make);
    reg.register("rename", rename::make);
    reg.register("ruby", ruby::make);
    reg.register("script", script::make);
    reg.register("select", select::make);
    reg.register("split", split::make);
    reg.register("user_agent", user_agent::make);
}

/// Deserialize a kind-specific config record, mapping failures (missing
/// required fields, unknown options) to configuration errors.
pub(crate) fn parse_config<T: DeserializeOwned>(kind: &str, raw: &Value) -> Result<T> {
    serde_json::from_value(raw.clone())
        .map_err(|e| Error::Config(format!("processor '{}': {}", kind, e)))
}
