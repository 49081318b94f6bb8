//! File-tree routing convention (Next.js app and pages routers).
//!
//! - `app/**/page.{tsx,jsx,ts,js}` → one `GET` route, handler
//!   `page.<DefaultExport|Page>`
//! - `app/**/route.{ts,js,tsx,jsx}` → one route per exported HTTP method
//!   function, handler `route.<METHOD>`
//! - `pages/**` (outside `pages/api`) → `GET` page routes; `_app`,
//!   `_document` and `_error` are not routes
//! - `pages/api/**` → one multi-method route per file, path prefixed `/api`
//! - `middleware.{ts,js}` → matcher patterns recorded on the facts
//!
//! Each of `app/`, `pages/` and `middleware.*` may also live under `src/`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::route_path::{to_prefixed_route_path, to_route_path};
use super::source_scan::{list_sources, malformed, read_source, SourceFile};
use super::{FrameworkFacts, FrameworkParser, Route, HTTP_METHODS, MULTI_METHOD};
use crate::graph::FileFilter;
use crate::ingest::patterns::{default_export, line_of};

const PAGE_EXTS: &[&str] = &["tsx", "jsx", "ts", "js"];
const SPECIAL_PAGES: &[&str] = &["_app", "_document", "_error"];
const FALLBACK_PAGE_HANDLER: &str = "Page";

static METHOD_EXPORTS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    HTTP_METHODS
        .iter()
        .filter_map(|method| {
            let pattern = format!(
                r"\bexport\s+(?:async\s+)?function\s+{method}\b|\bexport\s+(?:const|let|var)\s+{method}\b"
            );
            Regex::new(&pattern).ok().map(|re| (*method, re))
        })
        .collect()
});

static MATCHER_LIST: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\bmatcher\s*:\s*\[([^\]]*)\]").ok());
static MATCHER_SINGLE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"\bmatcher\s*:\s*['"`]([^'"`]+)['"`]"#).ok());

/// Parser for directory-layout routing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTreeParser;

/// Role of a file under the routing convention.
#[derive(Debug, PartialEq, Eq)]
enum Entry<'a> {
    AppPage { dirs: Vec<&'a str>, stem: &'a str },
    AppRoute { dirs: Vec<&'a str>, stem: &'a str },
    Page { segments: Vec<&'a str>, stem: &'a str },
    PagesApi { segments: Vec<&'a str>, stem: &'a str },
    Middleware,
}

fn split_file_name(name: &str) -> Option<(&str, &str)> {
    name.rsplit_once('.')
}

fn classify(rel_path: &str) -> Option<Entry<'_>> {
    let mut parts: Vec<&str> = rel_path.split('/').collect();
    if parts.first() == Some(&"src") && parts.len() > 1 {
        parts.remove(0);
    }
    let file_name = *parts.last()?;
    let (stem, ext) = split_file_name(file_name)?;

    if parts.len() == 1 {
        return (stem == "middleware" && matches!(ext, "ts" | "js")).then_some(Entry::Middleware);
    }
    if !PAGE_EXTS.contains(&ext) {
        return None;
    }

    let dirs = &parts[1..parts.len() - 1];
    match parts[0] {
        "app" => match stem {
            "page" => Some(Entry::AppPage { dirs: dirs.to_vec(), stem }),
            "route" => Some(Entry::AppRoute { dirs: dirs.to_vec(), stem }),
            _ => None,
        },
        "pages" => {
            if dirs.first() == Some(&"api") {
                let mut segments = dirs[1..].to_vec();
                segments.push(stem);
                Some(Entry::PagesApi { segments, stem })
            } else if SPECIAL_PAGES.contains(&stem) {
                None
            } else {
                let mut segments = dirs.to_vec();
                segments.push(stem);
                Some(Entry::Page { segments, stem })
            }
        }
        _ => None,
    }
}

impl FrameworkParser for FileTreeParser {
    fn name(&self) -> &'static str {
        "file-tree-routing"
    }

    fn parse(&self, filter: &FileFilter, interrupted: &dyn Fn() -> bool) -> FrameworkFacts {
        let mut facts = FrameworkFacts::default();

        for (rel_path, path) in list_sources(filter) {
            if interrupted() {
                tracing::debug!(parser = self.name(), "framework parse interrupted");
                break;
            }
            let Some(entry) = classify(&rel_path) else {
                continue;
            };
            let Some(file) = read_source(&rel_path, &path, &mut facts.diagnostics) else {
                continue;
            };
            match entry {
                Entry::AppPage { dirs, stem } => {
                    facts.routes.push(page_route(&file, to_route_path(dirs), stem));
                }
                Entry::Page { segments, stem } => {
                    facts.routes.push(page_route(&file, to_route_path(segments), stem));
                }
                Entry::AppRoute { dirs, stem } => {
                    let routes = method_routes(&file, &to_route_path(dirs), stem);
                    if routes.is_empty() {
                        malformed(
                            &mut facts.diagnostics,
                            &file.rel_path,
                            "route handler file exports no HTTP method handlers",
                        );
                    }
                    facts.routes.extend(routes);
                }
                Entry::PagesApi { segments, stem } => {
                    let line = default_export(&file.text).map(|(_, line)| line).unwrap_or(1);
                    facts.routes.push(Route {
                        method: MULTI_METHOD.to_string(),
                        path: to_prefixed_route_path("/api", segments),
                        handler: format!("{stem}.handler"),
                        middleware: Vec::new(),
                        file_path: file.rel_path.clone(),
                        line,
                    });
                }
                Entry::Middleware => {
                    facts.middleware_matchers.extend(middleware_matchers(&file.text));
                }
            }
        }

        tracing::debug!(
            parser = self.name(),
            routes = facts.routes.len(),
            matchers = facts.middleware_matchers.len(),
            "file-tree routes decoded"
        );
        facts
    }
}

/// `GET` route for a page component.
fn page_route(file: &SourceFile, path: String, stem: &str) -> Route {
    let (component, line) = default_export(&file.text)
        .unwrap_or_else(|| (FALLBACK_PAGE_HANDLER.to_string(), 1));
    Route {
        method: "GET".to_string(),
        path,
        handler: format!("{stem}.{component}"),
        middleware: Vec::new(),
        file_path: file.rel_path.clone(),
        line,
    }
}

/// One route per exported HTTP method handler, in [`HTTP_METHODS`] order.
fn method_routes(file: &SourceFile, path: &str, stem: &str) -> Vec<Route> {
    METHOD_EXPORTS
        .iter()
        .filter_map(|(method, pattern)| {
            let found = pattern.find(&file.text)?;
            Some(Route {
                method: (*method).to_string(),
                path: path.to_string(),
                handler: format!("{stem}.{method}"),
                middleware: Vec::new(),
                file_path: file.rel_path.clone(),
                line: line_of(&file.text, found.start()),
            })
        })
        .collect()
}

/// Patterns from `matcher: [...]` or `matcher: '...'`.
fn middleware_matchers(text: &str) -> Vec<String> {
    if let Some(caps) = MATCHER_LIST.as_ref().and_then(|re| re.captures(text)) {
        return caps
            .get(1)
            .map(|list| {
                list.as_str()
                    .split(',')
                    .map(|p| p.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`'))
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
    }
    MATCHER_SINGLE
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| vec![m.as_str().to_string()])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("app/users/[id]/page.tsx"),
            Some(Entry::AppPage { dirs: vec!["users", "[id]"], stem: "page" })
        );
        assert_eq!(
            classify("src/app/api/health/route.ts"),
            Some(Entry::AppRoute { dirs: vec!["api", "health"], stem: "route" })
        );
        assert_eq!(
            classify("pages/api/users/[id].ts"),
            Some(Entry::PagesApi { segments: vec!["users", "[id]"], stem: "[id]" })
        );
        assert_eq!(
            classify("pages/blog/index.jsx"),
            Some(Entry::Page { segments: vec!["blog", "index"], stem: "index" })
        );
        assert_eq!(classify("pages/_app.tsx"), None);
        assert_eq!(classify("app/layout.tsx"), None);
        assert_eq!(classify("middleware.ts"), Some(Entry::Middleware));
        assert_eq!(classify("lib/util.ts"), None);
    }

    #[test]
    fn test_method_routes() {
        let file = SourceFile {
            rel_path: "app/health/route.ts".into(),
            text: "import x from 'y';\n\nexport async function GET() {}\nexport const POST = async () => {};\nfunction PUT() {}\n".into(),
        };
        let routes = method_routes(&file, "/health", "route");
        let ids: Vec<String> = routes.iter().map(Route::id).collect();
        assert_eq!(ids, vec!["GET /health", "POST /health"]);
        assert_eq!(routes[0].line, 3);
        assert_eq!(routes[1].line, 4);
        assert_eq!(routes[1].handler, "route.POST");
    }

    #[test]
    fn test_page_route_fallback_handler() {
        let file = SourceFile {
            rel_path: "app/page.tsx".into(),
            text: "export default () => <main/>;\n".into(),
        };
        let route = page_route(&file, "/".into(), "page");
        assert_eq!(route.handler, "page.Page");
        assert_eq!(route.line, 1);
    }

    #[test]
    fn test_parse_stops_when_interrupted() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("app/about")).unwrap();
        std::fs::write(temp.path().join("app/page.tsx"), "export default function Home() {}\n").unwrap();
        std::fs::write(temp.path().join("app/about/page.tsx"), "export default function About() {}\n").unwrap();
        let filter = FileFilter::new(temp.path(), &[]).unwrap();

        let facts = FileTreeParser.parse(&filter, &|| false);
        assert_eq!(facts.routes.len(), 2);

        let facts = FileTreeParser.parse(&filter, &|| true);
        assert!(facts.routes.is_empty());

        let polls = std::cell::Cell::new(0);
        let facts = FileTreeParser.parse(&filter, &|| {
            polls.set(polls.get() + 1);
            polls.get() > 1
        });
        assert_eq!(facts.routes.len(), 1);
        assert_eq!(polls.get(), 2);
    }

    #[test]
    fn test_middleware_matchers() {
        let text = "export const config = {\n  matcher: ['/dashboard/:path*', \"/api/:path*\"],\n};\n";
        assert_eq!(middleware_matchers(text), vec!["/dashboard/:path*", "/api/:path*"]);
        assert_eq!(
            middleware_matchers("export const config = { matcher: '/about/:path*' }"),
            vec!["/about/:path*"]
        );
        assert!(middleware_matchers("export function middleware() {}").is_empty());
    }
}
