use super::{parse_config, Processor};
use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::{Error, Result};
use crate::prog::ingest;
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Painless script step. Only expressible on the ingest target.
#[derive(Debug)]
pub struct Script {
    code: String,
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    #[serde(default)]
    code: String,
    #[serde(default)]
    id: String,
}

impl Config {
    fn validate(&self) -> Result<()> {
        if self.code.is_empty() && self.id.is_empty() {
            return Err(Error::Config("code or script id required".to_string()));
        }
        if !self.code.is_empty() && !self.id.is_empty() {
            return Err(Error::Config("only code or id allowed".to_string()));
        }
        Ok(())
    }
}

pub fn make(_reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("script", raw)?;
    config.validate()?;

    Ok(Box::new(Script {
        code: config.code.replace('\n', ""),
        id: config.id,
    }))
}

impl Processor for Script {
    fn name(&self) -> &'static str {
        "script"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        let mut params = Map::new();
        params.insert("lang".to_string(), json!("painless"));
        if !self.code.is_empty() {
            params.insert("source".to_string(), json!(self.code));
        }
        if !self.id.is_empty() {
            params.insert("id".to_string(), json!(self.id));
        }

        Ok(ingest::single_processor("script", params))
    }

    fn compile_logstash(&self, _ctx: &mut LogstashCtx) -> Result<FilterBlock> {
        Err(Error::UnsupportedTarget {
            processor: "script",
            target: "logstash",
        })
    }
}
