use super::{parse_config, Processor};
use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::{Error, Result};
use crate::prog::ingest;
use crate::prog::logstash::{self as ls, Block, Filter, Params};
use serde::Deserialize;
use serde_json::Value;

/// Raw ruby filter code. Only expressible on the logstash target.
#[derive(Debug)]
pub struct Ruby {
    code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    code: String,
}

pub fn make(_reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("ruby", raw)?;
    Ok(Box::new(Ruby {
        code: config.code,
    }))
}

impl Processor for Ruby {
    fn name(&self) -> &'static str {
        "ruby"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        Err(Error::UnsupportedTarget {
            processor: "ruby",
            target: "ingest",
        })
    }

    // failure tag: the filter's own tag_on_exception (default
    // `_rubyexception`) is not wired into the guard machinery here
    fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<FilterBlock> {
        let mut params = Params::new();
        params.insert("code", self.code.replace('\n', "; "));

        Ok(FilterBlock {
            block: ls::verbose_block(
                ctx.verbose,
                "ruby",
                Block::one(Filter::new("ruby", params).into_stmt()),
            ),
            failure_tags: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prog::logstash::Statement;
    use serde_json::json;

    #[test]
    fn ingest_target_is_rejected() {
        let p = make(&Registry::new(), &json!({"code": "event.set('a', 1)"})).unwrap();
        let err = p.compile_ingest().unwrap_err();
        assert_eq!(err.to_string(), "ruby not supported on 'ingest' target");
    }

    #[test]
    fn newlines_become_statement_separators() {
        let p = make(
            &Registry::new(),
            &json!({"code": "event.set('a', 1)\nevent.set('b', 2)"}),
        )
        .unwrap();
        let mut ctx = LogstashCtx::new(false, false);
        let blk = p.compile_logstash(&mut ctx).unwrap();

        let Statement::Filter(f) = &blk.block.0[0] else {
            panic!("expected filter");
        };
        assert_eq!(
            f.params.0["code"],
            json!("event.set('a', 1); event.set('b', 2)")
        );
    }
}
