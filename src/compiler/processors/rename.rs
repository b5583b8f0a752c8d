use super::{parse_config, Processor};
use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::Result;
use crate::prog::ingest;
use crate::prog::logstash::{self as ls, Block, Filter, Params};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug)]
pub struct Rename {
    field: String,
    to: String,
    ignore_missing: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    field: String,
    to: String,
    // default differs from other variants on purpose; see DESIGN.md
    #[serde(default = "default_true")]
    ignore_missing: bool,
}

fn default_true() -> bool {
    true
}

pub fn make(_reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("rename", raw)?;
    Ok(Box::new(Rename {
        field: config.field,
        to: config.to,
        ignore_missing: config.ignore_missing,
    }))
}

impl Processor for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        let mut params = Map::new();
        params.insert("field".to_string(), json!(self.field));
        params.insert("target_field".to_string(), json!(self.to));
        if self.ignore_missing {
            params.insert("ignore_missing".to_string(), json!(true));
        }

        Ok(ingest::single_processor("rename", params))
    }

    fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<FilterBlock> {
        let mut params = Params::new();
        params.insert(
            "rename",
            json!({ ls::normalize_field(&self.field): ls::normalize_field(&self.to) }),
        );

        Ok(FilterBlock {
            block: ls::verbose_block(
                ctx.verbose,
                "rename",
                Block::one(Filter::new("mutate", params).into_stmt()),
            ),
            failure_tags: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prog::logstash::Statement;

    #[test]
    fn ignore_missing_defaults_to_true() {
        let p = make(&Registry::new(), &json!({"field": "a", "to": "b"})).unwrap();
        let steps = p.compile_ingest().unwrap();
        let v = serde_json::to_value(&steps[0]).unwrap();
        assert_eq!(v["rename"]["ignore_missing"], json!(true));
    }

    #[test]
    fn both_fields_are_required() {
        assert!(make(&Registry::new(), &json!({"field": "a"})).is_err());
        assert!(make(&Registry::new(), &json!({"to": "b"})).is_err());
    }

    #[test]
    fn logstash_renders_mutate_rename() {
        let p = make(&Registry::new(), &json!({"field": "a.b", "to": "c"})).unwrap();
        let mut ctx = LogstashCtx::new(false, false);
        let blk = p.compile_logstash(&mut ctx).unwrap();

        let Statement::Filter(f) = &blk.block.0[0] else {
            panic!("expected filter");
        };
        assert_eq!(f.name, "mutate");
        assert_eq!(f.params.0["rename"], json!({"[a][b]": "[c]"}));
        assert!(blk.failure_tags.is_empty());
    }
}
