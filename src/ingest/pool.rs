//! Thread-local parser pool for reusing tree-sitter Parser instances.
//!
//! Extraction runs on a rayon pool, so every worker thread lazily builds one
//! parser per grammar and reuses it for every file it handles. RefCell gives
//! single-threaded mutable access without locks.

use crate::ingest::detect::Language;
use anyhow::{Context, Result};
use std::cell::RefCell;

thread_local! {
    static PYTHON_PARSER: RefCell<Option<tree_sitter::Parser>> = RefCell::new(None);
    static JAVASCRIPT_PARSER: RefCell<Option<tree_sitter::Parser>> = RefCell::new(None);
    static TYPESCRIPT_PARSER: RefCell<Option<tree_sitter::Parser>> = RefCell::new(None);
    static TSX_PARSER: RefCell<Option<tree_sitter::Parser>> = RefCell::new(None);
}

fn grammar(language: Language) -> tree_sitter::Language {
    match language {
        Language::Python => tree_sitter_python::language(),
        Language::JavaScript => tree_sitter_javascript::language(),
        Language::TypeScript => tree_sitter_typescript::language_typescript(),
        Language::Tsx => tree_sitter_typescript::language_tsx(),
    }
}

fn with_cell<F, R>(
    cell: &RefCell<Option<tree_sitter::Parser>>,
    language: Language,
    f: F,
) -> Result<R>
where
    F: FnOnce(&mut tree_sitter::Parser) -> R,
{
    let mut parser_ref = cell.borrow_mut();
    if parser_ref.is_none() {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&grammar(language))
            .with_context(|| format!("loading {:?} grammar", language))?;
        *parser_ref = Some(parser);
    }
    match parser_ref.as_mut() {
        Some(parser) => Ok(f(parser)),
        None => anyhow::bail!("{:?} parser missing after initialization", language),
    }
}

/// Execute a function with the calling thread's parser for `language`.
///
/// # Example
///
/// ```rust,ignore
/// let tree = with_parser(Language::Python, |parser| parser.parse(source, None))?;
/// ```
pub fn with_parser<F, R>(language: Language, f: F) -> Result<R>
where
    F: FnOnce(&mut tree_sitter::Parser) -> R,
{
    match language {
        Language::Python => PYTHON_PARSER.with(|cell| with_cell(cell, language, f)),
        Language::JavaScript => JAVASCRIPT_PARSER.with(|cell| with_cell(cell, language, f)),
        Language::TypeScript => TYPESCRIPT_PARSER.with(|cell| with_cell(cell, language, f)),
        Language::Tsx => TSX_PARSER.with(|cell| with_cell(cell, language, f)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_reuse() {
        let addr1 = with_parser(Language::Python, |p| p as *const _ as usize).unwrap();
        let addr2 = with_parser(Language::Python, |p| p as *const _ as usize).unwrap();
        assert_eq!(addr1, addr2, "Parser should be reused in same thread");
    }

    #[test]
    fn test_multiple_languages_same_thread() {
        let test_cases: [(Language, &[u8]); 4] = [
            (Language::Python, b"def test(): pass"),
            (Language::JavaScript, b"function test() {}"),
            (Language::TypeScript, b"function test(): void {}"),
            (Language::Tsx, b"export default function Page() { return <div/>; }"),
        ];

        for (lang, source) in test_cases {
            let tree = with_parser(lang, |parser| parser.parse(source, None)).unwrap();
            let tree = tree.expect("tree");
            assert!(!tree.root_node().has_error(), "{:?} should parse cleanly", lang);
        }
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let handle = thread::spawn(|| {
            with_parser(Language::TypeScript, |parser| parser.parse("const a = 1;", None))
                .unwrap()
                .is_some()
        });
        let main_result = with_parser(Language::TypeScript, |parser| {
            parser.parse("const b = 2;", None)
        })
        .unwrap()
        .is_some();

        assert!(main_result);
        assert!(handle.join().unwrap());
    }
}
