use crate::error::Result;
use serde_json::{Map, Value};
use std::io::Write;

use super::Params;

const INDENT: &str = "    ";

/// Indentation-tracking output cursor. Indent is inserted lazily at the
/// start of the next non-empty line, so callers can emit text in
/// arbitrary fragments.
pub struct FormatCtx<'a> {
    out: &'a mut dyn Write,
    depth: usize,
    indent_required: bool,
}

impl<'a> FormatCtx<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        FormatCtx {
            out,
            depth: 0,
            indent_required: false,
        }
    }

    /// Run `f` one indent level deeper. The level is restored on every
    /// exit path, including errors.
    pub fn with_indent<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.depth += 1;
        let res = f(self);
        self.depth -= 1;
        res
    }

    pub fn write(&mut self, s: &str) -> Result<()> {
        let mut rest = s;
        loop {
            match rest.find('\n') {
                None => {
                    if !rest.is_empty() {
                        self.write_line(rest)?;
                        self.indent_required = false;
                    }
                    return Ok(());
                }
                Some(idx) => {
                    let (line, tail) = rest.split_at(idx + 1);
                    self.write_line(line)?;
                    self.indent_required = true;
                    rest = tail;
                }
            }
        }
    }

    fn write_line(&mut self, s: &str) -> Result<()> {
        // blank lines carry no indent
        if self.indent_required && s != "\n" {
            for _ in 0..self.depth {
                self.out.write_all(INDENT.as_bytes())?;
            }
        }
        self.out.write_all(s.as_bytes())?;
        Ok(())
    }
}

/// Render a parameter map as `{ key => value, ... }` text.
pub fn write_params(ctx: &mut FormatCtx, params: &Params) -> Result<()> {
    ParamPrinter::new(ctx).object(&params.0)
}

/// Recursive fold over the parameter value model. Tracks, per nesting
/// level, whether the next element is the first one (comma placement)
/// and whether the enclosing context is an array (whether the key step
/// applies at all).
struct ParamPrinter<'a, 'b> {
    ctx: &'a mut FormatCtx<'b>,
    first: BoolStack,
    in_array: BoolStack,
}

impl<'a, 'b> ParamPrinter<'a, 'b> {
    fn new(ctx: &'a mut FormatCtx<'b>) -> Self {
        ParamPrinter {
            ctx,
            first: BoolStack::new(),
            in_array: BoolStack::new(),
        }
    }

    fn object(&mut self, map: &Map<String, Value>) -> Result<()> {
        self.elem_next()?;
        self.ctx.write("{")?;

        self.enter(false);
        let res = self.object_body(map);
        self.exit();
        res?;

        if self.in_array.depth() == 0 {
            // top level object closes the statement
            self.ctx.write("\n}\n")
        } else {
            self.ctx.write("\n}")
        }
    }

    fn object_body(&mut self, map: &Map<String, Value>) -> Result<()> {
        for (key, value) in map {
            self.key(key)?;
            self.value(value)?;
        }
        Ok(())
    }

    fn array(&mut self, values: &[Value]) -> Result<()> {
        self.elem_next()?;
        self.ctx.write("[\n")?;

        self.enter(true);
        let res = self.array_body(values);
        self.exit();
        res?;

        self.ctx.write("\n]")
    }

    fn array_body(&mut self, values: &[Value]) -> Result<()> {
        for value in values {
            self.value(value)?;
        }
        Ok(())
    }

    fn key(&mut self, key: &str) -> Result<()> {
        let bracketed = key.starts_with('[') && key.ends_with(']');
        if self.in_array.depth() > 1 || bracketed {
            self.ctx.write(&format!("\n{} => ", quote(key)))
        } else {
            self.ctx.write(&format!("\n{} => ", key))
        }
    }

    fn value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.scalar("\"\"".to_string()),
            Value::Bool(b) => self.scalar(b.to_string()),
            Value::Number(n) => self.scalar(n.to_string()),
            Value::String(s) => self.scalar(quote(s)),
            Value::Array(values) => self.array(values),
            Value::Object(map) => self.object(map),
        }
    }

    fn scalar(&mut self, text: String) -> Result<()> {
        self.elem_next()?;
        self.ctx.write(&text)
    }

    /// Emit the element separator when inside an array and not at the
    /// first element.
    fn elem_next(&mut self) -> Result<()> {
        if !self.in_array.current {
            return Ok(());
        }

        if self.first.current {
            self.first.current = false;
            return Ok(());
        }

        self.ctx.write(",\n")
    }

    fn enter(&mut self, is_array: bool) {
        self.first.push(true);
        self.in_array.push(is_array);
        self.ctx.depth += 1;
    }

    fn exit(&mut self) {
        self.ctx.depth -= 1;
        self.first.pop();
        self.in_array.pop();
    }
}

struct BoolStack {
    stack: Vec<bool>,
    current: bool,
}

impl BoolStack {
    fn new() -> Self {
        BoolStack {
            stack: Vec::with_capacity(8),
            current: false,
        }
    }

    fn push(&mut self, b: bool) {
        self.stack.push(self.current);
        self.current = b;
    }

    fn pop(&mut self) {
        self.current = self.stack.pop().unwrap_or(false);
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Quote a string using the target language's literal syntax.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(params: Params) -> String {
        let mut buf = Vec::new();
        let mut ctx = FormatCtx::new(&mut buf);
        write_params(&mut ctx, &params).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn params_from(v: Value) -> Params {
        match v {
            Value::Object(map) => Params(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn scalars_use_literal_syntax() {
        let text = render(params_from(json!({
            "str": "value",
            "num": 7,
            "flag": true,
            "none": null,
        })));

        assert!(text.contains("str => \"value\""));
        assert!(text.contains("num => 7"));
        assert!(text.contains("flag => true"));
        assert!(text.contains("none => \"\""));
    }

    #[test]
    fn array_elements_are_comma_separated() {
        let text = render(params_from(json!({
            "match": ["[ts]", "ISO8601"],
        })));

        let expected = "\
{
    match => [
        \"[ts]\",
        \"ISO8601\"
    ]
}
";
        assert_eq!(text, expected);
    }

    #[test]
    fn nested_keys_are_quoted() {
        let text = render(params_from(json!({
            "rename": { "[a]": "[b]" },
        })));

        // top-level key plain, nested and bracketed keys quoted
        assert!(text.contains("rename => {"));
        assert!(text.contains("\"[a]\" => \"[b]\""));
    }

    #[test]
    fn bracketed_top_level_key_is_quoted() {
        let text = render(params_from(json!({
            "[source]": "x",
        })));
        assert!(text.contains("\"[source]\" => \"x\""));
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote("a\\b"), "\"a\\\\b\"");
        assert_eq!(quote("a\nb"), "\"a\\nb\"");
    }

    #[test]
    fn write_error_aborts_formatting() {
        struct FailWriter;
        impl std::io::Write for FailWriter {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "sink closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut out = FailWriter;
        let mut ctx = FormatCtx::new(&mut out);
        let params = params_from(json!({"a": {"b": [1, 2, {"c": "d"}]}}));
        assert!(write_params(&mut ctx, &params).is_err());
    }
}
