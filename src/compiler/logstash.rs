use crate::compiler::processors::Processor;
use crate::error::Result;
use crate::prog::logstash::{Block, Case, Conditional, Expression, Filter, Params};

/// Shared state for one logstash compilation: diagnostics flags plus the
/// counter backing unique failure-tag minting.
pub struct LogstashCtx {
    pub verbose: bool,
    pub disable_errors: bool,
    tag_count: u32,
}

impl LogstashCtx {
    pub fn new(verbose: bool, disable_errors: bool) -> Self {
        LogstashCtx {
            verbose,
            disable_errors,
            tag_count: 0,
        }
    }

    /// Mint a unique failure tag. Tags are never reused within one
    /// compilation, so later guards can identify the failing unit.
    pub fn create_tag(&mut self, name: &str) -> String {
        self.tag_count += 1;
        let stem = if name.is_empty() { "_logstash_tag" } else { name };
        format!("{}_{}", stem, self.tag_count)
    }
}

/// Compiled unit: a block of statements plus the failure tags the block
/// may leave on the event.
#[derive(Debug, Clone, Default)]
pub struct FilterBlock {
    pub block: Block,
    pub failure_tags: Vec<String>,
}

impl FilterBlock {
    pub fn append(&mut self, other: FilterBlock) {
        self.block.append(other.block);
        self.add_tags(other.failure_tags);
    }

    pub fn add_filter(&mut self, f: Filter) {
        self.block.push(f.into_stmt());
    }

    /// Add tags, silently dropping duplicates.
    pub fn add_tags(&mut self, tags: impl IntoIterator<Item = String>) {
        for tag in tags {
            if !self.failure_tags.contains(&tag) {
                self.failure_tags.push(tag);
            }
        }
    }
}

/// Compile a processor sequence into one block, synthesizing error
/// handling for a target language with no native per-step try/catch.
///
/// Each unit is compiled independently; units with failure tags are
/// wrapped in a tag-check conditional whose else-branch continues into
/// the remainder of the pipeline, linked bottom-up. `on_error` supplies
/// the block run when a unit's guard fires; the tags that block itself
/// introduces are what the whole compilation reports upwards (the
/// per-unit tags are stripped locally and never leak).
pub fn compile_processors(
    ctx: &mut LogstashCtx,
    on_error: &dyn Fn(&str, &[String]) -> FilterBlock,
    procs: &[Box<dyn Processor>],
) -> Result<FilterBlock> {
    if procs.is_empty() {
        return Ok(FilterBlock::default());
    }

    // compile processors to individual blocks, in input order
    let mut blocks = Vec::with_capacity(procs.len());
    for p in procs {
        let blk = p.compile_logstash(ctx)?;

        let mut tags = Vec::new();
        for tag in blk.failure_tags {
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        blocks.push(FilterBlock {
            block: blk.block,
            failure_tags: tags,
        });
    }

    // create a conditional per block that can fail
    let mut conds: Vec<Option<Conditional>> = blocks.iter().map(|_| None).collect();
    let mut result = FilterBlock::default();
    if !ctx.disable_errors {
        for (i, blk) in blocks.iter().enumerate() {
            let Some(guard) = fail_tags_condition(&blk.failure_tags) else {
                continue;
            };

            let err_blk = on_error(procs[i].name(), &blk.failure_tags);
            result.add_tags(err_blk.failure_tags);

            // strip the unit's own tags so they don't reach later guards
            let mut params = Params::new();
            params.insert("remove_tag", blk.failure_tags.clone());
            let mut on_fail = Block::one(Filter::new("mutate", params).into_stmt());
            on_fail.append(err_blk.block);

            conds[i] = Some(Conditional {
                cases: vec![Case {
                    cond: Expression(guard),
                    block: on_fail,
                }],
                else_block: Block::new(),
            });
        }
    }

    // link conditionals and execution blocks bottom-up: the accumulator
    // is the complete continuation of the pipeline suffix
    let linked = blocks
        .into_iter()
        .zip(conds)
        .rev()
        .fold(Block::new(), |acc, (unit, cond)| match cond {
            None => {
                let mut blk = unit.block;
                blk.append(acc);
                blk
            }
            Some(mut cond) => {
                cond.else_block = acc;
                let mut blk = unit.block;
                blk.push(cond.into_stmt());
                blk
            }
        });

    result.block = linked;
    Ok(result)
}

/// Disjunction over "tag present" checks; `None` when the unit has no
/// failure mode.
fn fail_tags_condition(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }

    let cmps: Vec<String> = tags
        .iter()
        .map(|tag| format!("(\"{}\" in [tags])", tag))
        .collect();
    Some(cmps.join(" or "))
}

/// Generated ruby filter with explicit failure tagging: the tag is armed
/// before the filter runs and removed again when the filter succeeds.
pub fn make_ruby(code: &str, failure_tag: &str, extra: Option<Params>) -> Block {
    let mut params = Params::new();
    params.insert("code", code);
    params.remove_tag(failure_tag);
    if let Some(extra) = extra {
        for (k, v) in extra.0 {
            params.0.insert(k, v);
        }
    }

    let mut blk = Block::new();
    if !failure_tag.is_empty() {
        let mut arm = Params::new();
        arm.insert("add_tag", vec![failure_tag.to_string()]);
        blk.push(Filter::new("mutate", arm).into_stmt());
    }

    blk.push(Filter::new("ruby", params).into_stmt());
    blk
}

/// Default error-reporting policy: append a human readable diagnostic to
/// the event's error message field, keeping any prior message.
pub fn error_reporter() -> impl Fn(&str, &[String]) -> FilterBlock {
    |filter: &str, tags: &[String]| {
        let msg = format!("filter {} (tags: [{}]) failed", filter, tags.join(", "));
        let code = format!(
            "msg='{}'; field='[error][message]'; old=event.get(field); \
             event.set(field, old ? [event.get(field), msg].join(' : ') : msg)",
            msg
        );
        FilterBlock {
            block: make_ruby(&code, "", None),
            failure_tags: Vec::new(),
        }
    }
}
