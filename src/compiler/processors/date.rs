use super::{parse_config, Processor};
use crate::compiler::logstash::{FilterBlock, LogstashCtx};
use crate::compiler::registry::Registry;
use crate::error::{Error, Result};
use crate::prog::logstash::{self as ls, Block, Filter, Params};
use crate::prog::ingest;
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug)]
pub struct Date {
    field: String,
    to: String,
    formats: Vec<String>,
    locale: String,
    timezone: String,
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
    format: String,
    #[serde(default)]
    formats: Vec<String>,
    #[serde(default)]
    locale: String,
    #[serde(default)]
    timezone: String,
    #[serde(default)]
    drop_field: bool,
    #[serde(default)]
    ignore_failure: bool,
}

impl Config {
    fn validate(&self) -> Result<()> {
        if !self.formats.is_empty() && !self.format.is_empty() {
            return Err(Error::Config("format and formats is configured".to_string()));
        }
        Ok(())
    }
}

pub fn make(_reg: &Registry, raw: &Value) -> Result<Box<dyn Processor>> {
    let config: Config = parse_config("date", raw)?;
    config.validate()?;

    // normalize the single-format shorthand to the list form
    let formats = if !config.format.is_empty() {
        vec![config.format]
    } else {
        config.formats
    };

    Ok(Box::new(Date {
        field: config.field,
        to: config.to,
        formats,
        locale: config.locale,
        timezone: config.timezone,
        drop_field: config.drop_field,
        ignore_failure: config.ignore_failure,
    }))
}

impl Processor for Date {
    fn name(&self) -> &'static str {
        "date"
    }

    fn compile_ingest(&self) -> Result<Vec<ingest::Processor>> {
        let mut params = Map::new();
        params.insert("field".to_string(), json!(self.field));
        params.insert("formats".to_string(), json!(self.formats));
        if !self.to.is_empty() {
            params.insert("target_field".to_string(), json!(self.to));
        }
        if !self.timezone.is_empty() {
            params.insert("timezone".to_string(), json!(self.timezone));
        }
        if !self.locale.is_empty() {
            params.insert("locale".to_string(), json!(self.locale));
        }
        if self.ignore_failure {
            params.insert("ignore_failure".to_string(), json!(true));
        }

        let mut ps = ingest::single_processor("date", params);
        if self.drop_field {
            ps.push(ingest::remove_field(&self.field));
        }
        Ok(ps)
    }

    fn compile_logstash(&self, ctx: &mut LogstashCtx) -> Result<FilterBlock> {
        let failure_tag = if self.ignore_failure {
            String::new()
        } else {
            ctx.create_tag("_failure_date")
        };

        let mut match_list = vec![ls::normalize_field(&self.field)];
        match_list.extend(self.formats.iter().cloned());

        let mut params = Params::new();
        params.insert("match", match_list);
        if !failure_tag.is_empty() {
            params.insert("tag_on_failure", failure_tag.clone());
        }
        params.target(&self.to);
        params.drop_field(self.drop_field, &self.field);
        if !self.timezone.is_empty() {
            params.insert("timezone", self.timezone.clone());
        }
        if !self.locale.is_empty() {
            params.insert("locale", self.locale.clone());
        }

        let block = ls::verbose_block(
            ctx.verbose,
            "date",
            Block::one(Filter::new("date", params).into_stmt()),
        );
        let failure_tags = if failure_tag.is_empty() {
            Vec::new()
        } else {
            vec![failure_tag]
        };

        Ok(FilterBlock {
            block,
            failure_tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prog::logstash::Statement;

    fn load(raw: Value) -> Box<dyn Processor> {
        make(&Registry::new(), &raw).unwrap()
    }

    #[test]
    fn format_and_formats_are_mutually_exclusive() {
        let err = make(
            &Registry::new(),
            &json!({"field": "ts", "format": "ISO8601", "formats": ["UNIX"]}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("format and formats"));
    }

    #[test]
    fn single_format_is_normalized_to_list() {
        let p = load(json!({"field": "ts", "format": "ISO8601"}));
        let steps = p.compile_ingest().unwrap();
        let v = serde_json::to_value(&steps[0]).unwrap();
        assert_eq!(v["date"]["formats"], json!(["ISO8601"]));
    }

    #[test]
    fn missing_field_fails() {
        assert!(make(&Registry::new(), &json!({"format": "ISO8601"})).is_err());
    }

    #[test]
    fn optional_params_stay_sparse() {
        let p = load(json!({"field": "ts", "formats": ["UNIX"]}));
        let steps = p.compile_ingest().unwrap();
        let v = serde_json::to_value(&steps[0]).unwrap();
        let obj = v["date"].as_object().unwrap();
        assert!(!obj.contains_key("target_field"));
        assert!(!obj.contains_key("timezone"));
        assert!(!obj.contains_key("locale"));
        assert!(!obj.contains_key("ignore_failure"));
    }

    #[test]
    fn drop_field_appends_remove_step() {
        let p = load(json!({"field": "ts", "formats": ["UNIX"], "drop_field": true}));
        let steps = p.compile_ingest().unwrap();
        assert_eq!(steps.len(), 2);
        let v = serde_json::to_value(&steps[1]).unwrap();
        assert_eq!(v, json!({"remove": {"field": "ts"}}));
    }

    #[test]
    fn logstash_block_carries_failure_tag() {
        let p = load(json!({"field": "ts", "formats": ["UNIX"]}));
        let mut ctx = LogstashCtx::new(false, false);
        let blk = p.compile_logstash(&mut ctx).unwrap();

        assert_eq!(blk.failure_tags.len(), 1);
        assert!(blk.failure_tags[0].starts_with("_failure_date_"));

        let Statement::Filter(f) = &blk.block.0[0] else {
            panic!("expected filter");
        };
        assert_eq!(f.name, "date");
        assert_eq!(f.params.0["match"], json!(["[ts]", "UNIX"]));
        assert_eq!(f.params.0["tag_on_failure"], json!(blk.failure_tags[0]));
    }

    #[test]
    fn ignore_failure_suppresses_tag() {
        let p = load(json!({"field": "ts", "formats": ["UNIX"], "ignore_failure": true}));
        let mut ctx = LogstashCtx::new(false, false);
        let blk = p.compile_logstash(&mut ctx).unwrap();
        assert!(blk.failure_tags.is_empty());
    }
}
