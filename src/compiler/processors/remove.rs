use super::{parse_config, Processor};
use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::Result;
use crate::prog::ingest;
use crate::prog::logstash::{self as ls, Block, Filter, Params};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug)]
pub struct Remove {
    field: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    field: String,
}

pub fn make(_reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("remove", raw)?;
    Ok(Box::new(Remove {
        field: config.field,
    }))
}

impl Processor for Remove {
    fn name(&self) -> &'static str {
        "remove"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        let mut params = Map::new();
        params.insert("field".to_string(), json!(self.field));
        Ok(ingest::single_processor("remove", params))
    }

    fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<FilterBlock> {
        let mut params = Params::new();
        params.remove_field(&self.field);

        Ok(FilterBlock {
            block: ls::verbose_block(
                ctx.verbose,
                "remove",
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
    fn field_is_required() {
        assert!(make(&Registry::new(), &json!({})).is_err());
    }

    #[test]
    fn logstash_renders_mutate_remove_field() {
        let p = make(&Registry::new(), &json!({"field": "tmp"})).unwrap();
        let mut ctx = LogstashCtx::new(false, false);
        let blk = p.compile_logstash(&mut ctx).unwrap();

        let Statement::Filter(f) = &blk.block.0[0] else {
            panic!("expected filter");
        };
        assert_eq!(f.name, "mutate");
        assert_eq!(f.params.0["remove_field"], json!(["[tmp]"]));
    }
}
