pub mod format;

use crate::error::Result;
use format::FormatCtx;
use serde_json::{Map, Value};
use std::io::Write;

/// Logstash filter pipeline. `pipeline_id` scopes the whole block behind
/// a metadata check so several generated pipelines can share one config.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub pipeline_id: Option<String>,
    pub description: String,
    pub block: Block,
}

/// Statement of the filter language. Conditionals nest arbitrarily; the
/// target language has no other control flow.
#[derive(Debug, Clone)]
pub enum Statement {
    Filter(Filter),
    Conditional(Conditional),
}

#[derive(Debug, Clone, Default)]
pub struct Block(pub Vec<Statement>);

#[derive(Debug, Clone)]
pub struct Filter {
    pub name: String,
    pub params: Params,
}

#[derive(Debug, Clone)]
pub struct Conditional {
    pub cases: Vec<Case>,
    pub else_block: Block,
}

#[derive(Debug, Clone)]
pub struct Case {
    pub cond: Expression,
    pub block: Block,
}

#[derive(Debug, Clone)]
pub struct Expression(pub String);

/// Order-insensitive parameter map rendered as `key => value` pairs.
#[derive(Debug, Clone, Default)]
pub struct Params(pub Map<String, Value>);

impl Block {
    pub fn new() -> Self {
        Block(Vec::new())
    }

    pub fn one(stmt: Statement) -> Self {
        Block(vec![stmt])
    }

    pub fn push(&mut self, stmt: Statement) {
        self.0.push(stmt);
    }

    pub fn append(&mut self, other: Block) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn format(&self, ctx: &mut FormatCtx) -> Result<()> {
        for stmt in &self.0 {
            stmt.format(ctx)?;
        }
        Ok(())
    }
}

impl Statement {
    fn format(&self, ctx: &mut FormatCtx) -> Result<()> {
        match self {
            Statement::Filter(f) => f.format(ctx),
            Statement::Conditional(c) => c.format(ctx),
        }
    }
}

impl Filter {
    pub fn new(name: &str, params: Params) -> Self {
        Filter {
            name: name.to_string(),
            params,
        }
    }

    pub fn into_stmt(self) -> Statement {
        Statement::Filter(self)
    }

    fn format(&self, ctx: &mut FormatCtx) -> Result<()> {
        if self.params.0.is_empty() {
            return ctx.write(&format!("{} {{}}\n", self.name));
        }

        ctx.write(&format!("{} ", self.name))?;
        format::write_params(ctx, &self.params)
    }
}

impl Conditional {
    pub fn into_stmt(self) -> Statement {
        Statement::Conditional(self)
    }

    fn format(&self, ctx: &mut FormatCtx) -> Result<()> {
        let Some((if_case, elif_cases)) = self.cases.split_first() else {
            return self.else_block.format(ctx);
        };

        ctx.write(&format!("if {} {{\n", if_case.cond.0))?;
        ctx.with_indent(|ctx| if_case.block.format(ctx))?;

        for case in elif_cases {
            ctx.write(&format!("}} elif {} {{\n", case.cond.0))?;
            ctx.with_indent(|ctx| case.block.format(ctx))?;
        }

        if !self.else_block.is_empty() {
            ctx.write("} else {\n")?;
            ctx.with_indent(|ctx| self.else_block.format(ctx))?;
        }

        ctx.write("}\n")
    }
}

impl Params {
    pub fn new() -> Self {
        Params(Map::new())
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Emit a `target` parameter, only when a target is actually set.
    pub fn target(&mut self, field: &str) {
        if !field.is_empty() {
            self.insert("target", normalize_field(field));
        }
    }

    pub fn drop_field(&mut self, drop: bool, name: &str) {
        if drop {
            self.remove_field(name);
        }
    }

    pub fn remove_field(&mut self, name: &str) {
        self.insert("remove_field", vec![normalize_field(name)]);
    }

    pub fn remove_tag(&mut self, tag: &str) {
        if !tag.is_empty() {
            self.insert("remove_tag", vec![tag.to_string()]);
        }
    }
}

/// Rewrite a dotted field path into the target language's selector
/// syntax: `a.b.c` becomes `[a][b][c]`.
pub fn normalize_field(field: &str) -> String {
    field
        .split('.')
        .map(|part| format!("[{}]", part))
        .collect::<Vec<_>>()
        .join("")
}

/// Wrap a block so it only runs when `field` is present on the event.
pub fn ignore_missing(field: &str, block: Block) -> Block {
    Block::one(
        Conditional {
            cases: vec![Case {
                cond: Expression(normalize_field(field)),
                block,
            }],
            else_block: Block::new(),
        }
        .into_stmt(),
    )
}

/// Diagnostic filter dumping the full event, tagged with `name`.
pub fn print_event_debug(name: &str) -> Filter {
    let mut params = Params::new();
    params.insert("init", "require 'json'");
    params.insert(
        "code",
        format!(
            "puts '{}'; puts JSON.pretty_generate(event); puts '=' * 80",
            name
        ),
    );
    Filter::new("ruby", params)
}

/// Arm `tags` on the event before running `block`.
pub fn run_with_tags(block: Block, tags: &[String]) -> Block {
    let mut params = Params::new();
    params.insert("add_tag", tags.to_vec());
    let mut out = Block::one(Filter::new("mutate", params).into_stmt());
    out.append(block);
    out
}

pub fn verbose_block(verbose: bool, name: &str, mut block: Block) -> Block {
    if verbose {
        block.push(print_event_debug(name).into_stmt());
    }
    block
}

pub fn serialize(out: &mut dyn Write, p: &Pipeline) -> Result<()> {
    let mut ctx = FormatCtx::new(out);

    let mut block = p.block.clone();
    if let Some(id) = p.pipeline_id.as_deref().filter(|id| !id.is_empty()) {
        let mut params = Params::new();
        params.remove_field("@metadata.pipeline");
        let mut guarded = Block::one(Filter::new("mutate", params).into_stmt());
        guarded.append(block);

        let expr = format!("[@metadata][pipeline] == \"{}\"", id);
        block = Block::one(
            Conditional {
                cases: vec![Case {
                    cond: Expression(expr),
                    block: guarded,
                }],
                else_block: Block::new(),
            }
            .into_stmt(),
        );
    }

    if !p.description.is_empty() {
        for line in p.description.split('\n') {
            ctx.write(&format!("# {}\n", line))?;
        }
    }

    ctx.write("filter {\n")?;
    ctx.with_indent(|ctx| block.format(ctx))?;
    ctx.write("}\n")
}
