//! C7 -- Scope Compiler. The role/package/regex predicate composition lives
//! in `rules::compile_scope`; this module owns the one piece that needs
//! genuinely custom semantics: the path-glob matcher used for
//! `includeGlobs`/`excludeGlobs`, built with `globset` in "literal
//! separator" mode so `*` never crosses a `/` while `**` does.

use std::sync::OnceLock;

use globset::{Glob, GlobBuilder, GlobMatcher};

/// Compile (and cache) a single glob pattern, then test `path` against it.
/// Patterns here are user config, not hot-loop data, so a tiny per-call
/// cache keyed by the pattern string is enough to avoid recompiling inside
/// a scope predicate evaluated once per class.
pub fn glob_match(pattern: &str, path: &str) -> bool {
    thread_local! {
        static CACHE: std::cell::RefCell<std::collections::HashMap<String, GlobMatcher>> =
            std::cell::RefCell::new(std::collections::HashMap::new());
    }
    CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        let matcher = cache.entry(pattern.to_string()).or_insert_with(|| compile(pattern));
        matcher.is_match(path)
    })
}

fn compile(pattern: &str) -> GlobMatcher {
    let glob = GlobBuilder::new(pattern).literal_separator(true).build().unwrap_or_else(|_| {
        // An uncompilable glob should have been rejected by C4; fall back
        // to a pattern that matches nothing rather than panic.
        static NEVER: OnceLock<Glob> = OnceLock::new();
        NEVER.get_or_init(|| Glob::new("\u{0}**never-matches**\u{0}").unwrap()).clone()
    });
    glob.compile_matcher()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_does_not_cross_separator() {
        assert!(glob_match("src/*.rs", "src/main.rs"));
        assert!(!glob_match("src/*.rs", "src/sub/main.rs"));
    }

    #[test]
    fn double_star_crosses_separator() {
        assert!(glob_match("src/**/*.rs", "src/sub/deep/main.rs"));
    }

    #[test]
    fn character_class_supported() {
        assert!(glob_match("src/[mM]ain.rs", "src/main.rs"));
    }
}
