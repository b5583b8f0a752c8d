use super::{parse_config, Processor};
use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::Result;
use crate::prog::ingest;
use crate::prog::logstash::{self as ls, Block, Filter, Params};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug)]
pub struct UserAgent {
    field: String,
    to: String,
    drop_field: bool,
    ignore_failure: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    field: String,
    #[serde(default, rename = "target_field")]
    to: String,
    #[serde(default)]
    drop_field: bool,
    #[serde(default)]
    ignore_failure: bool,
}

pub fn make(_reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("user_agent", raw)?;
    Ok(Box::new(UserAgent {
        field: config.field,
        to: config.to,
        drop_field: config.drop_field,
        ignore_failure: config.ignore_failure,
    }))
}

impl Processor for UserAgent {
    fn name(&self) -> &'static str {
        "user_agent"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        let mut params = Map::new();
        params.insert("field".to_string(), json!(self.field));
        if !self.to.is_empty() {
            params.insert("target_field".to_string(), json!(self.to));
        }
        if self.ignore_failure {
            params.insert("ignore_failure".to_string(), json!(true));
        }

        let mut ps = ingest::single_processor("user_agent", params);
        if self.drop_field {
            ps.push(ingest::remove_field(&self.field));
        }
        Ok(ps)
    }

    /// The useragent filter has no failure tagging of its own: the tag
    /// is armed up front and removed again by the filter on success, so
    /// it survives only when the filter bails out.
    fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<FilterBlock> {
        let failure_tag = if self.ignore_failure {
            String::new()
        } else {
            ctx.create_tag("_failure_useragent")
        };

        let mut params = Params::new();
        params.insert("source", ls::normalize_field(&self.field));
        params.target(&self.to);
        params.drop_field(self.drop_field, &self.field);
        params.remove_tag(&failure_tag);

        let mut block = Block::one(Filter::new("useragent", params).into_stmt());
        let failure_tags = if failure_tag.is_empty() {
            Vec::new()
        } else {
            block = ls::run_with_tags(block, &[failure_tag.clone()]);
            vec![failure_tag]
        };

        Ok(FilterBlock {
            block: ls::verbose_block(ctx.verbose, "useragent", block),
            failure_tags,
        })
    }
}
