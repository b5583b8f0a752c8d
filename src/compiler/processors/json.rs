use super::{parse_config, Processor};
use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::Result;
use crate::prog::ingest;
use crate::prog::logstash::{self as ls, Block, Filter, Params};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug)]
pub struct Json {
    field: String,
    to: String,
    ignore_failure: bool,
    drop_field: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    field: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    ignore_failure: bool,
    #[serde(default)]
    drop_field: bool,
}

pub fn make(_reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("json", raw)?;
    Ok(Box::new(Json {
        field: config.field,
        to: config.to,
        ignore_failure: config.ignore_failure,
        drop_field: config.drop_field,
    }))
}

impl Processor for Json {
    fn name(&self) -> &'static str {
        "json"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        let mut params = Map::new();
        params.insert("field".to_string(), json!(self.field));
        if !self.to.is_empty() {
            params.insert("target_field".to_string(), json!(self.to));
        } else {
            params.insert("add_to_root".to_string(), json!(true));
        }
        if self.ignore_failure {
            params.insert("ignore_failure".to_string(), json!(true));
        }

        let mut ps = ingest::single_processor("json", params);
        if self.drop_field {
            ps.push(ingest::remove_field(&self.field));
        }
        Ok(ps)
    }

    fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<FilterBlock> {
        let failure_tag = if self.ignore_failure {
            String::new()
        } else {
            ctx.create_tag("_failure_json")
        };

        let mut params = Params::new();
        params.insert("source", ls::normalize_field(&self.field));
        params.target(&self.to);
        if !failure_tag.is_empty() {
            params.insert("tag_on_failure", vec![failure_tag.clone()]);
        }
        params.drop_field(self.drop_field, &self.field);

        let failure_tags = if failure_tag.is_empty() {
            Vec::new()
        } else {
            vec![failure_tag]
        };

        Ok(FilterBlock {
            block: ls::verbose_block(
                ctx.verbose,
                "json",
                Block::one(Filter::new("json", params).into_stmt()),
            ),
            failure_tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prog::logstash::Statement;

    #[test]
    fn no_target_expands_into_root() {
        let p = make(&Registry::new(), &json!({"field": "payload"})).unwrap();
        let steps = p.compile_ingest().unwrap();
        let v = serde_json::to_value(&steps[0]).unwrap();
        assert_eq!(v["json"]["add_to_root"], json!(true));
        assert!(!v["json"].as_object().unwrap().contains_key("target_field"));
    }

    #[test]
    fn explicit_target_suppresses_add_to_root() {
        let p = make(&Registry::new(), &json!({"field": "payload", "to": "doc"})).unwrap();
        let steps = p.compile_ingest().unwrap();
        let v = serde_json::to_value(&steps[0]).unwrap();
        assert_eq!(v["json"]["target_field"], json!("doc"));
        assert!(!v["json"].as_object().unwrap().contains_key("add_to_root"));
    }

    #[test]
    fn logstash_failure_surfaces_through_tag_on_failure() {
        let p = make(&Registry::new(), &json!({"field": "payload"})).unwrap();
        let mut ctx = LogstashCtx::new(false, false);
        let blk = p.compile_logstash(&mut ctx).unwrap();

        assert_eq!(blk.failure_tags.len(), 1);
        let Statement::Filter(f) = &blk.block.0[0] else {
            panic!("expected filter");
        };
        assert_eq!(f.name, "json");
        assert_eq!(f.params.0["tag_on_failure"], json!([blk.failure_tags[0]]));
    }
}
