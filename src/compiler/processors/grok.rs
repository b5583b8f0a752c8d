use super::{parse_config, Processor};
use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::{Error, Result};
use crate::prog::ingest;
use crate::prog::logstash::{self as ls, Block, Filter, Params};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct Grok {
    field: String,
    patterns: Vec<String>,
    definitions: BTreeMap<String, String>,
    ignore_missing: bool,
    drop_field: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    field: String,
    #[serde(default)]
    pattern: String,
    #[serde(default)]
    patterns: Vec<String>,
    #[serde(default)]
    definitions: BTreeMap<String, String>,
    #[serde(default)]
    ignore_missing: bool,
    #[serde(default)]
    drop_field: bool,
}

impl Config {
    fn validate(&self) -> Result<()> {
        if !self.pattern.is_empty() && !self.patterns.is_empty() {
            return Err(Error::Config(
                "set `pattern` or `patterns` setting only".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn make(_reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("grok", raw)?;
    config.validate()?;

    let patterns = if !config.pattern.is_empty() {
        vec![config.pattern]
    } else {
        config.patterns
    };

    Ok(Box::new(Grok {
        field: config.field,
        patterns,
        definitions: config.definitions,
        ignore_missing: config.ignore_missing,
        drop_field: config.drop_field,
    }))
}

impl Processor for Grok {
    fn name(&self) -> &'static str {
        "grok"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        let mut params = Map::new();
        params.insert("field".to_string(), json!(self.field));
        params.insert("patterns".to_string(), json!(self.patterns));
        if !self.definitions.is_empty() {
            params.insert("pattern_definitions".to_string(), json!(self.definitions));
        }
        if self.ignore_missing {
            params.insert("ignore_missing".to_string(), json!(true));
        }

        let mut ps = ingest::single_processor("grok", params);
        if self.drop_field {
            ps.push(ingest::remove_field(&self.field));
        }
        Ok(ps)
    }

    fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<FilterBlock> {
        let mut params = Params::new();
        params.insert(
            "match",
            json!({ ls::normalize_field(&self.field): self.patterns }),
        );
        if !self.definitions.is_empty() {
            params.insert("pattern_definitions", json!(self.definitions));
        }
        params.drop_field(self.drop_field, &self.field);

        // grok writes dotted capture names; flatten them afterwards
        let mut de_dot = Params::new();
        de_dot.insert("nested", true);

        let mut block = Block::one(Filter::new("grok", params).into_stmt());
        block.push(Filter::new("de_dot", de_dot).into_stmt());

        if self.ignore_missing {
            block = ls::ignore_missing(&self.field, block);
        }

        Ok(FilterBlock {
            block: ls::verbose_block(ctx.verbose, "grok", block),
            failure_tags: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prog::logstash::Statement;

    #[test]
    fn pattern_and_patterns_are_mutually_exclusive() {
        let err = make(
            &Registry::new(),
            &json!({"field": "message", "pattern": "%{IP:ip}", "patterns": ["%{IP:ip}"]}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("pattern"));
    }

    #[test]
    fn ignore_missing_wraps_block_in_field_check() {
        let p = make(
            &Registry::new(),
            &json!({"field": "message", "pattern": "%{IP:ip}", "ignore_missing": true}),
        )
        .unwrap();

        let mut ctx = LogstashCtx::new(false, false);
        let blk = p.compile_logstash(&mut ctx).unwrap();

        let Statement::Conditional(cond) = &blk.block.0[0] else {
            panic!("expected guarding conditional");
        };
        assert_eq!(cond.cases[0].cond.0, "[message]");
        assert_eq!(cond.cases[0].block.0.len(), 2); // grok + de_dot
    }

    #[test]
    fn pattern_definitions_only_emitted_when_present() {
        let p = make(&Registry::new(), &json!({"field": "message", "pattern": "%{IP:ip}"})).unwrap();
        let steps = p.compile_ingest().unwrap();
        let v = serde_json::to_value(&steps[0]).unwrap();
        assert!(!v["grok"].as_object().unwrap().contains_key("pattern_definitions"));
    }
}
