use std::sync::Arc;

use indexmap::IndexMap;
use substrate_engine::{ConstantDef, FunctionDef, Module};
use substrate_error::{ErrorKind, ScriptError};
use substrate_value::UniversalValue;

use crate::collaborator::expect_str;

const FORMAT_JSON: &str = "json";
const FORMAT_YAML: &str = "yaml";
const FORMAT_XML: &str = "xml";
const FORMAT_CSV: &str = "csv";
const FORMAT_MARKDOWN: &str = "markdown";

const REPAIR_STRATEGY_STRICT: &str = "strict";
const REPAIR_STRATEGY_LENIENT: &str = "lenient";
const REPAIR_STRATEGY_BEST_EFFORT: &str = "best_effort";

fn json_to_uv(value: serde_json::Value) -> UniversalValue {
    match value {
        serde_json::Value::Null => UniversalValue::Nil,
        serde_json::Value::Bool(b) => UniversalValue::Bool(b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(UniversalValue::Int)
            .unwrap_or_else(|| UniversalValue::Float(n.as_f64().unwrap_or(0.0))),
        serde_json::Value::String(s) => UniversalValue::from(s),
        serde_json::Value::Array(items) => UniversalValue::Array(items.into_iter().map(json_to_uv).collect()),
        serde_json::Value::Object(fields) => {
            UniversalValue::Object(fields.into_iter().map(|(k, v)| (k, json_to_uv(v))).collect())
        }
    }
}

fn uv_to_json(value: &UniversalValue) -> serde_json::Value {
    match value {
        UniversalValue::Nil => serde_json::Value::Null,
        UniversalValue::Bool(b) => serde_json::Value::Bool(*b),
        UniversalValue::Int(i) => serde_json::Value::Number((*i).into()),
        UniversalValue::Float(f) => {
            serde_json::Number::from_f64(*f).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null)
        }
        UniversalValue::Str(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
        UniversalValue::Array(items) => serde_json::Value::Array(items.iter().map(uv_to_json).collect()),
        UniversalValue::Object(fields) => {
            serde_json::Value::Object(fields.iter().map(|(k, v)| (k.clone(), uv_to_json(v))).collect())
        }
        UniversalValue::Function(_) | UniversalValue::UserData(_) => serde_json::Value::Null,
    }
}

/// Parses JSON text into a [`UniversalValue`].
pub fn parse_json(text: &str) -> Result<UniversalValue, ScriptError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ScriptError::new(ErrorKind::InvalidArguments, format!("invalid JSON: {e}")))?;
    Ok(json_to_uv(value))
}

/// Parses JSON text, falling back to `fallback` instead of raising when
/// the text does not parse.
pub fn parse_json_with_fallback(text: &str, fallback: UniversalValue) -> UniversalValue {
    parse_json(text).unwrap_or(fallback)
}

/// Scans `text` for the first balanced `{...}` or `[...]` span, honoring
/// quoted strings so braces inside string literals don't break the
/// balance count.
fn find_json_span(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{' || b == b'[')?;
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extracts and parses the first JSON value embedded anywhere in `text`.
pub fn extract_json(text: &str) -> Result<UniversalValue, ScriptError> {
    let span = find_json_span(text)
        .ok_or_else(|| ScriptError::new(ErrorKind::InvalidArguments, "no JSON value found in text"))?;
    parse_json(span)
}

/// Extracts every fenced ` ```lang\n...\n``` ` code block, returning an
/// array of `{language, code}` objects in source order.
pub fn extract_code_blocks(text: &str) -> Vec<UniversalValue> {
    let mut blocks = Vec::new();
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        let Some(rest) = trimmed.strip_prefix("```") else { continue };
        let language = rest.trim().to_string();
        let mut code_lines = Vec::new();
        for body_line in lines.by_ref() {
            if body_line.trim_start().starts_with("```") {
                break;
            }
            code_lines.push(body_line);
        }
        let mut fields = IndexMap::new();
        fields.insert("language".to_string(), UniversalValue::from(language));
        fields.insert("code".to_string(), UniversalValue::from(code_lines.join("\n")));
        blocks.push(UniversalValue::Object(fields));
    }
    blocks
}

/// Splits one CSV line on commas. Deliberately does not handle quoted
/// fields containing commas or embedded newlines — full CSV parsing is
/// out of scope here, only a shallow reading is provided.
fn split_csv_line(line: &str) -> Vec<String> {
    line.split(',').map(|field| field.trim().to_string()).collect()
}

/// Parses CSV text into an array of row objects keyed by the header row.
/// Shallow: no quoting, no escaping, no type inference — every field is
/// a string.
pub fn parse_csv(text: &str) -> Result<UniversalValue, ScriptError> {
    let mut lines = text.lines();
    let header = lines
        .next()
        .ok_or_else(|| ScriptError::new(ErrorKind::InvalidArguments, "CSV text has no header row"))?;
    let headers = split_csv_line(header);

    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_csv_line(line);
        let mut row = IndexMap::new();
        for (i, field) in fields.into_iter().enumerate() {
            let key = headers.get(i).cloned().unwrap_or_else(|| format!("column_{i}"));
            row.insert(key, UniversalValue::from(field));
        }
        rows.push(UniversalValue::Object(row));
    }
    Ok(UniversalValue::Array(rows))
}

/// Parses a flat `key: value` YAML subset into an object. No nesting, no
/// lists, no anchors/aliases — anything past one indentation level is
/// read as a literal string rather than interpreted.
pub fn parse_yaml(text: &str) -> Result<UniversalValue, ScriptError> {
    let mut fields = IndexMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once(':') else {
            return Err(ScriptError::new(
                ErrorKind::InvalidArguments,
                format!("line '{trimmed}' is not a 'key: value' pair"),
            ));
        };
        fields.insert(key.trim().to_string(), UniversalValue::from(value.trim()));
    }
    Ok(UniversalValue::Object(fields))
}

/// Parses one level of `<tag>text</tag>` pairs into an object keyed by
/// tag name. No attributes, no nesting, no namespaces — a tag appearing
/// more than once keeps only its last occurrence.
pub fn parse_xml(text: &str) -> Result<UniversalValue, ScriptError> {
    let mut fields = IndexMap::new();
    let mut rest = text;
    while let Some(open_start) = rest.find('<') {
        let after_open = &rest[open_start + 1..];
        let Some(open_end) = after_open.find('>') else {
            break;
        };
        let tag = after_open[..open_end].trim();
        if tag.is_empty() || tag.starts_with('/') || tag.starts_with('?') || tag.starts_with('!') {
            rest = &after_open[open_end + 1..];
            continue;
        }
        let close_tag = format!("</{tag}>");
        let after_tag = &after_open[open_end + 1..];
        let Some(close_start) = after_tag.find(&close_tag) else {
            rest = after_tag;
            continue;
        };
        let inner = after_tag[..close_start].trim().to_string();
        fields.insert(tag.to_string(), UniversalValue::from(inner));
        rest = &after_tag[close_start + close_tag.len()..];
    }
    Ok(UniversalValue::Object(fields))
}

/// Parses Markdown into an array of shallow block objects:
/// `{type: "heading", level, text}`, `{type: "list_item", text}`, or
/// `{type: "paragraph", text}`. Blank lines separate blocks; nothing
/// past one line of lookahead is considered.
pub fn parse_markdown(text: &str) -> Vec<UniversalValue> {
    let mut blocks = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut fields = IndexMap::new();
        if let Some(rest) = trimmed.strip_prefix('#') {
            let level = 1 + rest.chars().take_while(|c| *c == '#').count();
            fields.insert("type".to_string(), UniversalValue::from("heading"));
            fields.insert("level".to_string(), UniversalValue::Int(level as i64));
            fields.insert("text".to_string(), UniversalValue::from(rest.trim_start_matches('#').trim()));
        } else if trimmed.starts_with("- ") || trimmed.starts_with("* ") {
            fields.insert("type".to_string(), UniversalValue::from("list_item"));
            fields.insert("text".to_string(), UniversalValue::from(trimmed[2..].trim()));
        } else {
            fields.insert("type".to_string(), UniversalValue::from("paragraph"));
            fields.insert("text".to_string(), UniversalValue::from(trimmed));
        }
        blocks.push(UniversalValue::Object(fields));
    }
    blocks
}

/// Parses `text` according to a named format (one of the `FORMAT_*`
/// constants).
pub fn parse_structured(text: &str, format: &str) -> Result<UniversalValue, ScriptError> {
    match format {
        FORMAT_JSON => parse_json(text),
        FORMAT_YAML => parse_yaml(text),
        FORMAT_XML => parse_xml(text),
        FORMAT_CSV => parse_csv(text),
        FORMAT_MARKDOWN => Ok(UniversalValue::Array(parse_markdown(text))),
        other => Err(ScriptError::new(ErrorKind::InvalidArguments, format!("'{other}' is not a known format"))),
    }
}

/// Extracts every Markdown pipe table (`| a | b |` rows with a
/// `| --- | --- |` separator) into an array of row objects keyed by the
/// header row.
pub fn extract_tables(text: &str) -> Vec<UniversalValue> {
    fn split_row(line: &str) -> Vec<String> {
        line.trim().trim_matches('|').split('|').map(|cell| cell.trim().to_string()).collect()
    }
    fn is_separator_row(line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.starts_with('|') && trimmed.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut rows = Vec::new();
    let mut i = 0;
    while i + 1 < lines.len() {
        if lines[i].trim_start().starts_with('|') && is_separator_row(lines[i + 1]) {
            let headers = split_row(lines[i]);
            i += 2;
            while i < lines.len() && lines[i].trim_start().starts_with('|') {
                let cells = split_row(lines[i]);
                let mut row = IndexMap::new();
                for (col, cell) in cells.into_iter().enumerate() {
                    let key = headers.get(col).cloned().unwrap_or_else(|| format!("column_{col}"));
                    row.insert(key, UniversalValue::from(cell));
                }
                rows.push(UniversalValue::Object(row));
                i += 1;
            }
        } else {
            i += 1;
        }
    }
    rows
}

/// Extracts `- item`, `* item`, and `1. item` list lines into a flat
/// array of strings, in source order.
pub fn extract_lists(text: &str) -> Vec<UniversalValue> {
    let mut items = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            items.push(UniversalValue::from(rest.trim()));
        } else if let Some(dot) = trimmed.find(". ") {
            if trimmed[..dot].chars().all(|c| c.is_ascii_digit()) && !trimmed[..dot].is_empty() {
                items.push(UniversalValue::from(trimmed[dot + 2..].trim()));
            }
        }
    }
    items
}

/// Extracts flat `key: value` / `key = value` pairs into an object,
/// tolerating either separator on a per-line basis.
pub fn extract_key_value(text: &str) -> UniversalValue {
    let mut fields = IndexMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let pair = trimmed.split_once(':').or_else(|| trimmed.split_once('='));
        if let Some((key, value)) = pair {
            fields.insert(key.trim().to_string(), UniversalValue::from(value.trim()));
        }
    }
    UniversalValue::Object(fields)
}

/// Serializes a [`UniversalValue`] to text in a named format. Shallow:
/// only flat objects/arrays of scalars round-trip cleanly through the
/// non-JSON formats.
pub fn format_value(value: &UniversalValue, format: &str) -> Result<String, ScriptError> {
    match format {
        FORMAT_JSON => serde_json::to_string(&uv_to_json(value))
            .map_err(|e| ScriptError::new(ErrorKind::InvalidArguments, format!("failed to serialize JSON: {e}"))),
        FORMAT_YAML => match value {
            UniversalValue::Object(fields) => Ok(fields
                .iter()
                .map(|(k, v)| format!("{k}: {}", display_scalar(v)))
                .collect::<Vec<_>>()
                .join("\n")),
            _ => Err(ScriptError::new(ErrorKind::InvalidArguments, "YAML formatting needs a flat object")),
        },
        FORMAT_MARKDOWN => match value {
            UniversalValue::Array(items) => {
                Ok(items.iter().map(|item| format!("- {}", display_scalar(item))).collect::<Vec<_>>().join("\n"))
            }
            _ => Err(ScriptError::new(ErrorKind::InvalidArguments, "Markdown formatting needs an array")),
        },
        FORMAT_CSV => match value {
            UniversalValue::Array(rows) => format_csv(rows),
            _ => Err(ScriptError::new(ErrorKind::InvalidArguments, "CSV formatting needs an array of row objects")),
        },
        other => Err(ScriptError::new(ErrorKind::InvalidArguments, format!("'{other}' is not a known format"))),
    }
}

fn display_scalar(value: &UniversalValue) -> String {
    match value {
        UniversalValue::Nil => "nil".to_string(),
        UniversalValue::Bool(b) => b.to_string(),
        UniversalValue::Int(i) => i.to_string(),
        UniversalValue::Float(f) => f.to_string(),
        UniversalValue::Str(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        other => format!("{other:?}"),
    }
}

fn format_csv(rows: &[UniversalValue]) -> Result<String, ScriptError> {
    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        let UniversalValue::Object(fields) = row else {
            return Err(ScriptError::new(ErrorKind::InvalidArguments, "CSV formatting needs an array of row objects"));
        };
        for key in fields.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    let mut lines = vec![headers.join(",")];
    for row in rows {
        let UniversalValue::Object(fields) = row else { unreachable!() };
        let cells: Vec<String> =
            headers.iter().map(|h| fields.get(h).map(display_scalar).unwrap_or_default()).collect();
        lines.push(cells.join(","));
    }
    Ok(lines.join("\n"))
}

/// Converts `text` from one structured format to another.
pub fn convert(text: &str, from_format: &str, to_format: &str) -> Result<String, ScriptError> {
    let value = parse_structured(text, from_format)?;
    format_value(&value, to_format)
}

/// Reports whether `text` parses cleanly as the named format.
pub fn validate_format(text: &str, format: &str) -> bool {
    parse_structured(text, format).is_ok()
}

/// Attempts a shallow repair of malformed structured text before
/// reparsing it. `strict` performs no repair (equivalent to a plain
/// parse); `lenient` strips trailing commas before closing
/// brackets/braces; `best_effort` additionally appends any closing
/// brackets/braces the text is missing.
pub fn repair(text: &str, format: &str, strategy: &str) -> Result<UniversalValue, ScriptError> {
    if format != FORMAT_JSON {
        return parse_structured(text, format);
    }
    match strategy {
        REPAIR_STRATEGY_STRICT => parse_json(text),
        REPAIR_STRATEGY_LENIENT => {
            let cleaned = strip_trailing_commas(text);
            parse_json(&cleaned)
        }
        REPAIR_STRATEGY_BEST_EFFORT => {
            let cleaned = strip_trailing_commas(text);
            let balanced = balance_brackets(&cleaned);
            parse_json(&balanced)
        }
        other => Err(ScriptError::new(ErrorKind::InvalidArguments, format!("'{other}' is not a known repair strategy"))),
    }
}

fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        result.push(chars[i]);
        i += 1;
    }
    result
}

fn balance_brackets(text: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for byte in text.bytes() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => stack.push('}'),
            b'[' => stack.push(']'),
            b'}' | b']' => {
                stack.pop();
            }
            _ => {}
        }
    }
    let mut repaired = text.to_string();
    while let Some(closer) = stack.pop() {
        repaired.push(closer);
    }
    repaired
}

/// Strips non-printable control characters (keeping `\n`/`\t`),
/// collapses runs of blank lines, and trims leading/trailing
/// whitespace.
pub fn clean(text: &str) -> String {
    let filtered: String =
        text.chars().filter(|c| !c.is_control() || *c == '\n' || *c == '\t').collect();
    let mut lines = Vec::new();
    let mut blank_run = false;
    for line in filtered.lines() {
        if line.trim().is_empty() {
            if blank_run {
                continue;
            }
            blank_run = true;
        } else {
            blank_run = false;
        }
        lines.push(line.trim_end());
    }
    lines.join("\n").trim().to_string()
}

/// Substitutes `{{key}}` tokens in `template` with values from `values`,
/// leaving any token with no matching key untouched.
pub fn template(template: &str, values: &IndexMap<String, UniversalValue>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            result.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let key = after[..end].trim();
        match values.get(key) {
            Some(value) => result.push_str(&display_scalar(value)),
            None => result.push_str(&format!("{{{{{key}}}}}")),
        }
        rest = &after[end + 2..];
    }
    result.push_str(rest);
    result
}

/// Splits `text` on a literal delimiter into an array of strings.
pub fn split(text: &str, delimiter: &str) -> Vec<UniversalValue> {
    text.split(delimiter).map(UniversalValue::from).collect()
}

/// Merges an array of values: shallow-merges objects (later entries win
/// on key conflicts) or joins strings with newlines. Mixed-type arrays
/// are rejected.
pub fn merge(values: &[UniversalValue]) -> Result<UniversalValue, ScriptError> {
    if values.iter().all(|v| matches!(v, UniversalValue::Object(_))) {
        let mut merged = IndexMap::new();
        for value in values {
            let UniversalValue::Object(fields) = value else { unreachable!() };
            for (k, v) in fields {
                merged.insert(k.clone(), v.clone());
            }
        }
        Ok(UniversalValue::Object(merged))
    } else if values.iter().all(|v| matches!(v, UniversalValue::Str(_))) {
        let joined = values.iter().map(display_scalar).collect::<Vec<_>>().join("\n");
        Ok(UniversalValue::from(joined))
    } else {
        Err(ScriptError::new(ErrorKind::InvalidArguments, "merge needs an array of all-objects or all-strings"))
    }
}

fn expect_array<'a>(args: &'a [UniversalValue], index: usize, name: &str) -> Result<&'a [UniversalValue], ScriptError> {
    match args.get(index) {
        Some(UniversalValue::Array(items)) => Ok(items),
        Some(_) => Err(ScriptError::new(ErrorKind::Type, format!("argument '{name}' must be an array"))),
        None => Err(ScriptError::new(ErrorKind::MissingField, format!("missing argument '{name}'"))),
    }
}

pub fn build_module() -> Module {
    Module::new("output", "1.0.0", "parsing, extracting, repairing, and formatting structured text")
        .with_function(FunctionDef {
            name: "parse_json".to_string(),
            description: "parse JSON text into a value".to_string(),
            arity: Some(1),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| Ok(vec![parse_json(&expect_str(args, 0, "text")?)?])),
        })
        .with_function(FunctionDef {
            name: "parse_json_with_fallback".to_string(),
            description: "parse JSON text, returning a fallback value instead of raising on failure".to_string(),
            arity: Some(2),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| {
                let text = expect_str(args, 0, "text")?;
                let fallback = args.get(1).cloned().unwrap_or(UniversalValue::Nil);
                Ok(vec![parse_json_with_fallback(&text, fallback)])
            }),
        })
        .with_function(FunctionDef {
            name: "extract_json".to_string(),
            description: "extract and parse the first JSON value embedded in text".to_string(),
            arity: Some(1),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| Ok(vec![extract_json(&expect_str(args, 0, "text")?)?])),
        })
        .with_function(FunctionDef {
            name: "extract_code_blocks".to_string(),
            description: "extract every fenced code block as {language, code} objects".to_string(),
            arity: Some(1),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| Ok(vec![UniversalValue::Array(extract_code_blocks(&expect_str(args, 0, "text")?))])),
        })
        .with_function(FunctionDef {
            name: "parse_yaml".to_string(),
            description: "parse a flat 'key: value' YAML subset into an object".to_string(),
            arity: Some(1),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| Ok(vec![parse_yaml(&expect_str(args, 0, "text")?)?])),
        })
        .with_function(FunctionDef {
            name: "parse_xml".to_string(),
            description: "parse one level of <tag>text</tag> pairs into an object".to_string(),
            arity: Some(1),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| Ok(vec![parse_xml(&expect_str(args, 0, "text")?)?])),
        })
        .with_function(FunctionDef {
            name: "parse_csv".to_string(),
            description: "parse CSV text (no quoting/escaping) into an array of row objects".to_string(),
            arity: Some(1),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| Ok(vec![parse_csv(&expect_str(args, 0, "text")?)?])),
        })
        .with_function(FunctionDef {
            name: "parse_markdown".to_string(),
            description: "parse Markdown into an array of heading/list_item/paragraph blocks".to_string(),
            arity: Some(1),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| Ok(vec![UniversalValue::Array(parse_markdown(&expect_str(args, 0, "text")?))])),
        })
        .with_function(FunctionDef {
            name: "parse_structured".to_string(),
            description: "parse text according to a named format".to_string(),
            arity: Some(2),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| {
                let text = expect_str(args, 0, "text")?;
                let format = expect_str(args, 1, "format")?;
                Ok(vec![parse_structured(&text, &format)?])
            }),
        })
        .with_function(FunctionDef {
            name: "extract_tables".to_string(),
            description: "extract every Markdown pipe table into an array of row objects".to_string(),
            arity: Some(1),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| Ok(vec![UniversalValue::Array(extract_tables(&expect_str(args, 0, "text")?))])),
        })
        .with_function(FunctionDef {
            name: "extract_lists".to_string(),
            description: "extract every bulleted/numbered list item into an array of strings".to_string(),
            arity: Some(1),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| Ok(vec![UniversalValue::Array(extract_lists(&expect_str(args, 0, "text")?))])),
        })
        .with_function(FunctionDef {
            name: "extract_key_value".to_string(),
            description: "extract flat 'key: value' / 'key = value' pairs into an object".to_string(),
            arity: Some(1),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| Ok(vec![extract_key_value(&expect_str(args, 0, "text")?)])),
        })
        .with_function(FunctionDef {
            name: "convert".to_string(),
            description: "convert text from one structured format to another".to_string(),
            arity: Some(3),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| {
                let text = expect_str(args, 0, "text")?;
                let from_format = expect_str(args, 1, "from_format")?;
                let to_format = expect_str(args, 2, "to_format")?;
                Ok(vec![UniversalValue::from(convert(&text, &from_format, &to_format)?)])
            }),
        })
        .with_function(FunctionDef {
            name: "validate".to_string(),
            description: "check whether text parses cleanly as a named format".to_string(),
            arity: Some(2),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| {
                let text = expect_str(args, 0, "text")?;
                let format = expect_str(args, 1, "format")?;
                Ok(vec![UniversalValue::Bool(validate_format(&text, &format))])
            }),
        })
        .with_function(FunctionDef {
            name: "repair".to_string(),
            description: "attempt a shallow repair of malformed structured text before parsing it".to_string(),
            arity: Some(3),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| {
                let text = expect_str(args, 0, "text")?;
                let format = expect_str(args, 1, "format")?;
                let strategy = expect_str(args, 2, "strategy")?;
                Ok(vec![repair(&text, &format, &strategy)?])
            }),
        })
        .with_function(FunctionDef {
            name: "clean".to_string(),
            description: "strip control characters and collapse blank-line runs".to_string(),
            arity: Some(1),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| Ok(vec![UniversalValue::from(clean(&expect_str(args, 0, "text")?))])),
        })
        .with_function(FunctionDef {
            name: "template".to_string(),
            description: "substitute {{key}} tokens in a template string with values from an object".to_string(),
            arity: Some(2),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| {
                let tpl = expect_str(args, 0, "template")?;
                let values = crate::collaborator::expect_object(args, 1, "values")?;
                Ok(vec![UniversalValue::from(template(&tpl, &values))])
            }),
        })
        .with_function(FunctionDef {
            name: "split".to_string(),
            description: "split text on a literal delimiter into an array of strings".to_string(),
            arity: Some(2),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| {
                let text = expect_str(args, 0, "text")?;
                let delimiter = expect_str(args, 1, "delimiter")?;
                Ok(vec![UniversalValue::Array(split(&text, &delimiter))])
            }),
        })
        .with_function(FunctionDef {
            name: "merge".to_string(),
            description: "shallow-merge an array of objects, or join an array of strings".to_string(),
            arity: Some(1),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| Ok(vec![merge(expect_array(args, 0, "values")?)?])),
        })
        .with_function(FunctionDef {
            name: "format".to_string(),
            description: "serialize a value to text in a named format".to_string(),
            arity: Some(2),
            side_effect_free: true,
            stack_hint: None,
            callback: Arc::new(|args| {
                let value = args.get(0).cloned().unwrap_or(UniversalValue::Nil);
                let format = expect_str(args, 1, "format")?;
                Ok(vec![UniversalValue::from(format_value(&value, &format)?)])
            }),
        })
        .with_constant(ConstantDef { name: "FORMAT_JSON".to_string(), value: UniversalValue::from(FORMAT_JSON) })
        .with_constant(ConstantDef { name: "FORMAT_YAML".to_string(), value: UniversalValue::from(FORMAT_YAML) })
        .with_constant(ConstantDef { name: "FORMAT_XML".to_string(), value: UniversalValue::from(FORMAT_XML) })
        .with_constant(ConstantDef { name: "FORMAT_CSV".to_string(), value: UniversalValue::from(FORMAT_CSV) })
        .with_constant(ConstantDef {
            name: "FORMAT_MARKDOWN".to_string(),
            value: UniversalValue::from(FORMAT_MARKDOWN),
        })
        .with_constant(ConstantDef {
            name: "REPAIR_STRATEGY_STRICT".to_string(),
            value: UniversalValue::from(REPAIR_STRATEGY_STRICT),
        })
        .with_constant(ConstantDef {
            name: "REPAIR_STRATEGY_LENIENT".to_string(),
            value: UniversalValue::from(REPAIR_STRATEGY_LENIENT),
        })
        .with_constant(ConstantDef {
            name: "REPAIR_STRATEGY_BEST_EFFORT".to_string(),
            value: UniversalValue::from(REPAIR_STRATEGY_BEST_EFFORT),
        })
}
