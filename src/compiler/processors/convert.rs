use super::{parse_config, Processor};
use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::Result;
use crate::prog::ingest;
use crate::prog::logstash::{self as ls, Block, Filter, Params};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug)]
pub struct Convert {
    field: String,
    to: String,
    conv_type: ConvType,
    ignore_missing: bool,
    ignore_failure: bool,
    drop_field: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ConvType {
    Bool,
    #[serde(alias = "int")]
    Integer,
    Float,
    String,
}

impl ConvType {
    fn ingest_name(self) -> &'static str {
        match self {
            ConvType::Bool => "bool",
            ConvType::Integer => "integer",
            ConvType::Float => "float",
            ConvType::String => "string",
        }
    }

    fn logstash_name(self) -> &'static str {
        match self {
            ConvType::Bool => "boolean",
            ConvType::Integer => "integer",
            ConvType::Float => "float",
            ConvType::String => "string",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    field: String,
    #[serde(default, rename = "target_field")]
    to: String,
    #[serde(rename = "type")]
    conv_type: ConvType,
    #[serde(default = "default_true")]
    ignore_missing: bool,
    #[serde(default)]
    ignore_failure: bool,
    #[serde(default)]
    drop_field: bool,
}

fn default_true() -> bool {
    true
}

pub fn make(_reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("convert", raw)?;
    Ok(Box::new(Convert {
        field: config.field,
        to: config.to,
        conv_type: config.conv_type,
        ignore_missing: config.ignore_missing,
        ignore_failure: config.ignore_failure,
        drop_field: config.drop_field,
    }))
}

impl Processor for Convert {
    fn name(&self) -> &'static str {
        "convert"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        let mut params = Map::new();
        params.insert("field".to_string(), json!(self.field));
        params.insert("type".to_string(), json!(self.conv_type.ingest_name()));
        if !self.to.is_empty() {
            params.insert("target_field".to_string(), json!(self.to));
        }
        if self.ignore_missing {
            params.insert("ignore_missing".to_string(), json!(true));
        }
        if self.ignore_failure {
            params.insert("ignore_failure".to_string(), json!(true));
        }

        let mut ps = ingest::single_processor("convert", params);
        if self.drop_field {
            ps.push(ingest::remove_field(&self.field));
        }
        Ok(ps)
    }

    /// The mutate filter converts in place; a distinct target needs a
    /// copy first.
    fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<FilterBlock> {
        let mut block = Block::new();

        let target = if !self.to.is_empty() && self.to != self.field {
            let mut copy = Params::new();
            copy.insert(
                "copy",
                json!({ ls::normalize_field(&self.field): ls::normalize_field(&self.to) }),
            );
            block.push(Filter::new("mutate", copy).into_stmt());
            &self.to
        } else {
            &self.field
        };

        let mut params = Params::new();
        params.insert(
            "convert",
            json!({ ls::normalize_field(target): self.conv_type.logstash_name() }),
        );
        params.drop_field(self.drop_field, &self.field);
        block.push(Filter::new("mutate", params).into_stmt());

        Ok(FilterBlock {
            block: ls::verbose_block(ctx.verbose, "convert", block),
            failure_tags: Vec::new(),
        })
    }
}
