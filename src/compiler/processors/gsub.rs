use super::{parse_config, Processor};
use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::Result;
use crate::prog::ingest;
use crate::prog::logstash::{self as ls, Block, Filter, Params};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug)]
pub struct Gsub {
    field: String,
    pattern: String,
    replacement: String,
    to: String,
    ignore_missing: bool,
    ignore_failure: bool,
    drop_field: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    field: String,
    pattern: String,
    replacement: String,
    #[serde(default, rename = "target_field")]
    to: String,
    #[serde(default)]
    ignore_missing: bool,
    #[serde(default)]
    ignore_failure: bool,
    #[serde(default)]
    drop_field: bool,
}

pub fn make(_reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("gsub", raw)?;
    Ok(Box::new(Gsub {
        field: config.field,
        pattern: config.pattern,
        replacement: config.replacement,
        to: config.to,
        ignore_missing: config.ignore_missing,
        ignore_failure: config.ignore_failure,
        drop_field: config.drop_field,
    }))
}

impl Processor for Gsub {
    fn name(&self) -> &'static str {
        "gsub"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        let mut params = Map::new();
        params.insert("field".to_string(), json!(self.field));
        params.insert("pattern".to_string(), json!(self.pattern));
        params.insert("replacement".to_string(), json!(self.replacement));
        if !self.to.is_empty() {
            params.insert("target_field".to_string(), json!(self.to));
        }
        if self.ignore_missing {
            params.insert("ignore_missing".to_string(), json!(true));
        }
        if self.ignore_failure {
            params.insert("ignore_failure".to_string(), json!(true));
        }

        let mut ps = ingest::single_processor("gsub", params);
        if self.drop_field {
            ps.push(ingest::remove_field(&self.field));
        }
        Ok(ps)
    }

    /// mutate gsub substitutes in place; a distinct target needs a copy
    /// first.
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
            "gsub",
            vec![
                ls::normalize_field(target),
                self.pattern.clone(),
                self.replacement.clone(),
            ],
        );
        params.drop_field(self.drop_field, &self.field);
        block.push(Filter::new("mutate", params).into_stmt());

        Ok(FilterBlock {
            block: ls::verbose_block(ctx.verbose, "gsub", block),
            failure_tags: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prog::logstash::Statement;

    #[test]
    fn pattern_and_replacement_are_required() {
        assert!(make(&Registry::new(), &json!({"field": "msg"})).is_err());
        assert!(make(&Registry::new(), &json!({"field": "msg", "pattern": "-"})).is_err());
    }

    #[test]
    fn logstash_renders_gsub_triple() {
        let p = make(
            &Registry::new(),
            &json!({"field": "msg", "pattern": "-", "replacement": "_"}),
        )
        .unwrap();
        let mut ctx = LogstashCtx::new(false, false);
        let blk = p.compile_logstash(&mut ctx).unwrap();

        let Statement::Filter(f) = &blk.block.0[0] else {
            panic!("expected filter");
        };
        assert_eq!(f.params.0["gsub"], json!(["[msg]", "-", "_"]));
    }
}
