//! Annotation/decorator convention (NestJS style).
//!
//! Per class:
//! - `@Controller('base')` plus method markers `@Get(':id')`, `@Post()`, ...
//!   → one route per verb marker, handler `<Class>.<method>`
//! - `@Injectable()` / `@Controller()` constructor parameters → DI edges
//!   `parameter type → class`; `@Inject('TOKEN')` makes the token the
//!   provider; `Scope.REQUEST` / `Scope.TRANSIENT` set the scope
//! - `@UseGuards(..)` / `@UseInterceptors(..)` → route middleware
//!   (class-level ones apply to every route of the class)
//! - `@Cron('expr')`, `@Interval(ms)` → scheduled jobs; `@Process('name')`
//!   inside `@Processor('queue')` → queue-triggered job `queue:name`
//!
//! Decoding is lexical: brackets are balanced with strings and comments
//! skipped, but no syntax tree is built.

use once_cell::sync::Lazy;
use regex::Regex;

use super::route_path::join_annotated;
use super::source_scan::{list_sources, malformed, read_source, SourceFile};
use super::{DiEdge, DiScope, FrameworkFacts, FrameworkParser, Job, Route};
use crate::graph::FileFilter;
use crate::ingest::detect_language;
use crate::ingest::patterns::line_of;

const VERB_MARKERS: &[(&str, &str)] = &[
    ("Get", "GET"),
    ("Post", "POST"),
    ("Put", "PUT"),
    ("Delete", "DELETE"),
    ("Patch", "PATCH"),
    ("Options", "OPTIONS"),
    ("Head", "HEAD"),
    ("All", "ALL"),
];
const MIDDLEWARE_MARKERS: &[&str] = &["UseGuards", "UseInterceptors"];
const DEFAULT_QUEUE: &str = "default";

static PATH_KEY: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"\b(?:path|name)\s*:\s*['"`]([^'"`]*)['"`]"#).ok());
static STRING_LITERAL: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r#"['"`]([^'"`]*)['"`]"#).ok());

/// Parser for decorator-based conventions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationParser;

impl FrameworkParser for AnnotationParser {
    fn name(&self) -> &'static str {
        "annotation-convention"
    }

    fn parse(&self, filter: &FileFilter, interrupted: &dyn Fn() -> bool) -> FrameworkFacts {
        let mut facts = FrameworkFacts::default();

        for (rel_path, path) in list_sources(filter) {
            if interrupted() {
                tracing::debug!(parser = self.name(), "framework parse interrupted");
                break;
            }
            if !detect_language(&path).is_some_and(|lang| lang.is_script()) {
                continue;
            }
            let Some(file) = read_source(&rel_path, &path, &mut facts.diagnostics) else {
                continue;
            };
            if !file.text.contains('@') {
                continue;
            }
            decode_file(&file, &mut facts);
        }

        tracing::debug!(
            parser = self.name(),
            routes = facts.routes.len(),
            di_edges = facts.di_edges.len(),
            jobs = facts.jobs.len(),
            "annotations decoded"
        );
        facts
    }
}

// ---------------------------------------------------------------------------
// Lexical helpers
// ---------------------------------------------------------------------------

/// Index just past the string literal or comment starting at `i`.
fn skip_trivia(bytes: &[u8], i: usize) -> Option<usize> {
    match bytes.get(i)? {
        quote @ (b'\'' | b'"' | b'`') => {
            let mut j = i + 1;
            while j < bytes.len() {
                match bytes[j] {
                    b'\\' => j += 2,
                    c if c == *quote => return Some(j + 1),
                    _ => j += 1,
                }
            }
            Some(bytes.len())
        }
        b'/' => match bytes.get(i + 1)? {
            b'/' => Some(
                bytes[i..]
                    .iter()
                    .position(|&c| c == b'\n')
                    .map_or(bytes.len(), |p| i + p + 1),
            ),
            b'*' => Some(
                bytes[i + 2..]
                    .windows(2)
                    .position(|w| w == b"*/")
                    .map_or(bytes.len(), |p| i + 2 + p + 2),
            ),
            _ => None,
        },
        _ => None,
    }
}

/// Index of the bracket that closes the one at `open`.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        if let Some(next) = skip_trivia(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'(' | b'{' | b'[' => depth += 1,
            b')' | b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split at commas outside brackets, generics and strings.
fn split_top_level(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(next) = skip_trivia(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'(' | b'{' | b'[' | b'<' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'=' => {}
            b')' | b'}' | b']' | b'>' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    let last = text[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts.retain(|p| !p.is_empty());
    parts
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn read_ident(bytes: &[u8], i: usize) -> usize {
    let mut j = i;
    while j < bytes.len() && is_ident_byte(bytes[j]) {
        j += 1;
    }
    j
}

/// First string literal in decorator arguments, preferring `path:`/`name:`.
fn first_literal(args: &str) -> Option<String> {
    if let Some(caps) = PATH_KEY.as_ref().and_then(|re| re.captures(args)) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    STRING_LITERAL
        .as_ref()
        .and_then(|re| re.captures(args))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Leading identifier of each argument (`AuthGuard('jwt')` → `AuthGuard`).
fn argument_names(args: &str) -> Vec<String> {
    split_top_level(args)
        .into_iter()
        .filter_map(|arg| {
            let arg = arg.trim_start_matches("new ").trim();
            let bytes = arg.as_bytes();
            let end = read_ident(bytes, 0);
            (end > 0).then(|| arg[..end].to_string())
        })
        .collect()
}

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Decorators, members, classes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct Decorator<'a> {
    name: &'a str,
    args: &'a str,
    /// Byte offset of `@` in the file
    offset: usize,
}

/// Parse `@Name(args)` at `at` (which must point at `@`).
fn parse_decorator(text: &str, at: usize, base: usize) -> Option<(Decorator<'_>, usize)> {
    let bytes = text.as_bytes();
    let name_start = at + 1;
    let mut end = name_start;
    while end < bytes.len() && (is_ident_byte(bytes[end]) || bytes[end] == b'.') {
        end += 1;
    }
    if end == name_start {
        return None;
    }
    let name = &text[name_start..end];
    let after = skip_ws(bytes, end);
    if bytes.get(after) == Some(&b'(') {
        let close = matching_close(text, after)?;
        let decorator = Decorator {
            name,
            args: &text[after + 1..close],
            offset: base + at,
        };
        Some((decorator, close + 1))
    } else {
        Some((
            Decorator {
                name,
                args: "",
                offset: base + at,
            },
            end,
        ))
    }
}

/// Decorators appearing in `text` outside strings and comments.
fn decorators_in(text: &str, base: usize) -> Vec<Decorator<'_>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if let Some(next) = skip_trivia(bytes, i) {
            i = next;
            continue;
        }
        if bytes[i] == b'@' {
            if let Some((decorator, end)) = parse_decorator(text, i, base) {
                out.push(decorator);
                i = end;
                continue;
            }
        }
        i += 1;
    }
    out
}

const MEMBER_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "static", "async", "readonly", "abstract", "override",
];

/// Method name following a decorator run, if the run decorates a method.
fn method_after(text: &str, mut i: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    loop {
        i = skip_ws(bytes, i);
        let end = read_ident(bytes, i);
        if end == i {
            if bytes.get(i) == Some(&b'*') {
                i += 1;
                continue;
            }
            return None;
        }
        let word = &text[i..end];
        let next = skip_ws(bytes, end);
        if MEMBER_MODIFIERS.contains(&word) && bytes.get(next).is_some_and(|b| is_ident_byte(*b) || *b == b'*') {
            i = end;
            continue;
        }
        return match bytes.get(next) {
            Some(b'(') | Some(b'<') => Some(word),
            _ => None,
        };
    }
}

/// A decorated class member.
#[derive(Debug)]
struct Member<'a> {
    decorators: Vec<Decorator<'a>>,
    method: Option<&'a str>,
}

/// Members and constructor parameters of a class body (text between braces).
fn scan_body(body: &str, base: usize) -> (Vec<Member<'_>>, Option<&str>) {
    let bytes = body.as_bytes();
    let mut members = Vec::new();
    let mut constructor = None;
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(next) = skip_trivia(bytes, i) {
            i = next;
            continue;
        }
        let b = bytes[i];
        match b {
            b'(' | b'{' | b'[' => depth += 1,
            b')' | b'}' | b']' => depth = depth.saturating_sub(1),
            b'@' if depth == 0 => {
                let mut decorators = Vec::new();
                let mut j = i;
                while bytes.get(j) == Some(&b'@') {
                    let Some((decorator, end)) = parse_decorator(body, j, base) else {
                        break;
                    };
                    decorators.push(decorator);
                    j = skip_ws(bytes, end);
                }
                if !decorators.is_empty() {
                    members.push(Member {
                        decorators,
                        method: method_after(body, j),
                    });
                    i = j;
                    continue;
                }
            }
            _ if depth == 0 && is_ident_byte(b) && (i == 0 || !is_ident_byte(bytes[i - 1])) => {
                let end = read_ident(bytes, i);
                if &body[i..end] == "constructor" && constructor.is_none() {
                    let open = skip_ws(bytes, end);
                    if bytes.get(open) == Some(&b'(') {
                        if let Some(close) = matching_close(body, open) {
                            constructor = Some(&body[open + 1..close]);
                            i = close + 1;
                            continue;
                        }
                    }
                }
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    (members, constructor)
}

/// Provider named by one constructor parameter.
///
/// `private readonly repo: OrdersRepository` → `OrdersRepository`;
/// `@Inject('CONFIG') cfg: Config` → `CONFIG`.
fn constructor_provider(param: &str) -> Option<String> {
    let bytes = param.as_bytes();
    let mut i = skip_ws(bytes, 0);
    let mut injected = None;
    while bytes.get(i) == Some(&b'@') {
        let (decorator, end) = parse_decorator(param, i, 0)?;
        if decorator.name == "Inject" {
            injected = split_top_level(decorator.args)
                .first()
                .map(|a| a.trim_matches(|c| c == '\'' || c == '"' || c == '`').to_string())
                .filter(|a| !a.is_empty());
        }
        i = skip_ws(bytes, end);
    }
    if injected.is_some() {
        return injected;
    }

    let rest = &param[i..];
    let colon = top_level_find(rest, b':')?;
    let mut ty = &rest[colon + 1..];
    if let Some(eq) = top_level_find(ty, b'=') {
        ty = &ty[..eq];
    }
    let ty = collapse_ws(ty);
    (!ty.is_empty()).then_some(ty)
}

/// First occurrence of `needle` outside brackets and strings.
fn top_level_find(text: &str, needle: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(next) = skip_trivia(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b if b == needle && depth == 0 => return Some(i),
            b'(' | b'{' | b'[' | b'<' => depth += 1,
            b')' | b'}' | b']' | b'>' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }
    None
}

fn scope_of(args: &str) -> DiScope {
    if args.contains("Scope.REQUEST") {
        DiScope::Request
    } else if args.contains("Scope.TRANSIENT") {
        DiScope::Transient
    } else {
        DiScope::Singleton
    }
}

/// `@Interval(5000)` / `@Interval('name', 5000)` → `every 5000ms`
fn interval_schedule(args: &str) -> Option<String> {
    let last = split_top_level(args).pop()?;
    let ms = last.replace('_', "");
    ms.parse::<u64>().ok().map(|ms| format!("every {ms}ms"))
}

fn cron_schedule(args: &str) -> Option<String> {
    let first = split_top_level(args).into_iter().next()?;
    let literal = first.trim_matches(|c| c == '\'' || c == '"' || c == '`');
    (!literal.is_empty()).then(|| literal.to_string())
}

/// A named class declaration found outside strings and comments.
#[derive(Debug, PartialEq, Eq)]
struct ClassDecl<'a> {
    /// Offset of the `class` keyword
    start: usize,
    name: &'a str,
    /// Offset of the body's opening brace, if the header is closed
    open: Option<usize>,
}

/// Next `class Name` keyword at or after `from`, skipping trivia and
/// member accesses such as `el.class`.
fn next_class(text: &str, from: usize) -> Option<ClassDecl<'_>> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if let Some(next) = skip_trivia(bytes, i) {
            i = next;
            continue;
        }
        let b = bytes[i];
        let boundary = i == 0 || !(is_ident_byte(bytes[i - 1]) || bytes[i - 1] == b'.');
        if !(boundary && is_ident_byte(b)) {
            i += 1;
            continue;
        }
        let end = read_ident(bytes, i);
        if &text[i..end] == "class" {
            let name_start = skip_ws(bytes, end);
            let name_end = read_ident(bytes, name_start);
            if name_end > name_start && !bytes[name_start].is_ascii_digit() {
                return Some(ClassDecl {
                    start: i,
                    name: &text[name_start..name_end],
                    open: body_open(bytes, name_end),
                });
            }
        }
        i = end;
    }
    None
}

/// First `{` at bracket depth 0 after a class name, so that
/// `extends Base<{ id: string }>` and `implements A<B>` are stepped over.
fn body_open(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = from;
    while i < bytes.len() {
        if let Some(next) = skip_trivia(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'{' if depth == 0 => return Some(i),
            b'(' | b'{' | b'[' | b'<' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'=' => {}
            b')' | b'}' | b']' | b'>' => depth = depth.checked_sub(1)?,
            b';' if depth == 0 => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Decode every class in one file.
fn decode_file(file: &SourceFile, facts: &mut FrameworkFacts) {
    let text = file.text.as_str();
    let mut header_start = 0;

    while let Some(class) = next_class(text, header_start) {
        let Some(open) = class.open else {
            malformed(
                &mut facts.diagnostics,
                &file.rel_path,
                format!(
                    "class {} at line {} has no body",
                    class.name,
                    line_of(text, class.start)
                ),
            );
            header_start = class.start + "class".len();
            continue;
        };
        let Some(close) = matching_close(text, open) else {
            malformed(
                &mut facts.diagnostics,
                &file.rel_path,
                format!("unterminated body for class {}", class.name),
            );
            break;
        };

        let header = decorators_in(&text[header_start..class.start], header_start);
        let (members, constructor) = scan_body(&text[open + 1..close], open + 1);
        decode_class(file, class.name, &header, &members, constructor, facts);

        header_start = close + 1;
    }
}

fn decode_class(
    file: &SourceFile,
    class_name: &str,
    header: &[Decorator<'_>],
    members: &[Member<'_>],
    constructor: Option<&str>,
    facts: &mut FrameworkFacts,
) {
    let find = |name: &str| header.iter().find(|d| d.name == name);
    let controller = find("Controller");
    let injectable = find("Injectable");
    let processor = find("Processor");

    let providers: Vec<String> = constructor
        .map(|params| split_top_level(params).into_iter().filter_map(constructor_provider).collect())
        .unwrap_or_default();

    if controller.is_some() || injectable.is_some() {
        let scope = injectable
            .or(controller)
            .map(|d| scope_of(d.args))
            .unwrap_or_default();
        for provider in &providers {
            facts.di_edges.push(DiEdge {
                provider: provider.clone(),
                consumer: class_name.to_string(),
                scope,
                file_path: file.rel_path.clone(),
            });
        }
    }

    let class_middleware: Vec<String> = header
        .iter()
        .filter(|d| MIDDLEWARE_MARKERS.contains(&d.name))
        .flat_map(|d| argument_names(d.args))
        .collect();
    let base_path = controller.and_then(|d| first_literal(d.args)).unwrap_or_default();
    let queue = processor
        .map(|d| first_literal(d.args).unwrap_or_else(|| DEFAULT_QUEUE.to_string()));

    for member in members {
        let mut middleware = class_middleware.clone();
        middleware.extend(
            member
                .decorators
                .iter()
                .filter(|d| MIDDLEWARE_MARKERS.contains(&d.name))
                .flat_map(|d| argument_names(d.args)),
        );

        for decorator in &member.decorators {
            let verb = VERB_MARKERS
                .iter()
                .find(|(marker, _)| *marker == decorator.name)
                .map(|(_, verb)| *verb);
            let is_job_marker = matches!(decorator.name, "Cron" | "Interval" | "Process");
            if verb.is_none() && !is_job_marker {
                continue;
            }
            if verb.is_some() && controller.is_none() {
                continue;
            }

            let Some(method) = member.method else {
                malformed(
                    &mut facts.diagnostics,
                    &file.rel_path,
                    format!(
                        "@{} marker in {} at line {} has no method",
                        decorator.name,
                        class_name,
                        line_of(&file.text, decorator.offset)
                    ),
                );
                continue;
            };
            let handler = format!("{class_name}.{method}");

            if let Some(verb) = verb {
                let sub_path = first_literal(decorator.args).unwrap_or_default();
                facts.routes.push(Route {
                    method: verb.to_string(),
                    path: join_annotated(&base_path, &sub_path),
                    handler,
                    middleware: middleware.clone(),
                    file_path: file.rel_path.clone(),
                    line: line_of(&file.text, decorator.offset),
                });
                continue;
            }

            let job = match decorator.name {
                "Cron" => Job {
                    name: handler.clone(),
                    schedule: cron_schedule(decorator.args),
                    handler,
                    dependencies: providers.clone(),
                    file_path: file.rel_path.clone(),
                },
                "Interval" => Job {
                    name: handler.clone(),
                    schedule: interval_schedule(decorator.args),
                    handler,
                    dependencies: providers.clone(),
                    file_path: file.rel_path.clone(),
                },
                _ => {
                    let queue = queue.as_deref().unwrap_or(DEFAULT_QUEUE);
                    let job_name = first_literal(decorator.args).unwrap_or_else(|| method.to_string());
                    Job {
                        name: format!("{queue}:{job_name}"),
                        schedule: None,
                        handler,
                        dependencies: providers.clone(),
                        file_path: file.rel_path.clone(),
                    }
                }
            };
            facts.jobs.push(job);
        }
    }
}
