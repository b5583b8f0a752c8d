use super::{parse_config, Processor};
use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::Result;
use crate::prog::ingest;
use crate::prog::logstash::{self as ls, Block, Filter, Params};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug)]
pub struct Geoip {
    field: String,
    to: String,
    drop_field: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    field: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    drop_field: bool,
}

pub fn make(_reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("geoip", raw)?;
    Ok(Box::new(Geoip {
        field: config.field,
        to: config.to,
        drop_field: config.drop_field,
    }))
}

impl Processor for Geoip {
    fn name(&self) -> &'static str {
        "geoip"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        let mut params = Map::new();
        params.insert("field".to_string(), json!(self.field));
        if !self.to.is_empty() {
            params.insert("target_field".to_string(), json!(self.to));
        }

        let mut ps = ingest::single_processor("geoip", params);
        if self.drop_field {
            ps.push(ingest::remove_field(&self.field));
        }
        Ok(ps)
    }

    fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<FilterBlock> {
        let mut params = Params::new();
        params.insert("source", ls::normalize_field(&self.field));
        params.target(&self.to);
        params.drop_field(self.drop_field, &self.field);

        Ok(FilterBlock {
            block: ls::verbose_block(
                ctx.verbose,
                "geoip",
                Block::one(Filter::new("geoip", params).into_stmt()),
            ),
            failure_tags: Vec::new(),
        })
    }
}
