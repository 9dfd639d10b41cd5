//! Factory utilities and metadata for language adapters.

use std::path::Path;

use tracing::warn;
use tree_sitter::Language;

use crate::core::errors::{Result, TwinscanError};
use crate::core::function::FunctionDescriptor;
use crate::lang::common::LanguageAdapter;
use crate::lang::go::GoAdapter;
use crate::lang::rust_lang::RustAdapter;

/// Metadata describing one of the built-in language adapters.
#[derive(Debug, Clone, Copy)]
pub struct LanguageInfo {
    /// Canonical short key (e.g. "go").
    pub key: &'static str,
    /// Human-friendly display name.
    pub name: &'static str,
    /// Supported file extensions (without leading dots).
    pub extensions: &'static [&'static str],
}

const REGISTERED_LANGUAGES: &[LanguageInfo] = &[
    LanguageInfo {
        key: "go",
        name: "Go",
        extensions: &["go"],
    },
    LanguageInfo {
        key: "rs",
        name: "Rust",
        extensions: &["rs"],
    },
];

/// Return the languages that are compiled into this build.
pub fn registered_languages() -> &'static [LanguageInfo] {
    REGISTERED_LANGUAGES
}

/// Identify the canonical language key for a file path.
pub fn language_key_for_path(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
    if ext.is_empty() {
        return None;
    }

    find_language_by_extension(&ext).map(|info| info.key.to_string())
}

/// Create a language adapter suitable for the provided file.
pub fn adapter_for_path(path: &Path) -> Result<Box<dyn LanguageAdapter>> {
    let key = language_key_for_path(path).ok_or_else(|| {
        TwinscanError::unsupported(format!(
            "Could not determine language for file: {}",
            path.display()
        ))
    })?;

    adapter_for_language(&key)
}

/// Create a language adapter for a specific language key (usually an extension).
pub fn adapter_for_language(language: &str) -> Result<Box<dyn LanguageAdapter>> {
    match normalize_language_key(language) {
        Some("go") => Ok(Box::new(GoAdapter::new()?)),
        Some("rs") => Ok(Box::new(RustAdapter::new()?)),
        _ => Err(TwinscanError::unsupported(format!(
            "Language adapter for '{}' is not implemented",
            language
        ))),
    }
}

/// Get tree-sitter language for a given language key
pub fn get_tree_sitter_language(language_key: &str) -> Result<Language> {
    match normalize_language_key(language_key) {
        Some("go") => Ok(tree_sitter_go::LANGUAGE.into()),
        Some("rs") => Ok(tree_sitter_rust::LANGUAGE.into()),
        _ => Err(TwinscanError::unsupported(format!(
            "No tree-sitter grammar for: {}",
            language_key
        ))),
    }
}

/// Create a new parser for the given language
pub fn create_parser_for_language(language_key: &str) -> Result<tree_sitter::Parser> {
    let mut parser = tree_sitter::Parser::new();
    let tree_sitter_language = get_tree_sitter_language(language_key)?;
    parser.set_language(&tree_sitter_language).map_err(|e| {
        TwinscanError::parse(
            language_key,
            format!("Failed to set parser language: {}", e),
        )
    })?;
    Ok(parser)
}

/// Extract functions from a batch of `(path, source)` files.
///
/// Files in unsupported languages or that fail to parse are logged and
/// skipped; they never abort the batch.
pub fn extract_from_sources<P, S>(sources: &[(P, S)]) -> Vec<FunctionDescriptor>
where
    P: AsRef<str>,
    S: AsRef<str>,
{
    let mut functions = Vec::new();

    for (path, source) in sources {
        let path = path.as_ref();
        let extracted = adapter_for_path(Path::new(path))
            .and_then(|mut adapter| adapter.extract_functions(source.as_ref(), path));

        match extracted {
            Ok(found) => functions.extend(found),
            Err(err) => warn!("Skipping {}: {}", path, err),
        }
    }

    functions
}

/// Finds the language info for a given file extension.
fn find_language_by_extension(ext: &str) -> Option<&'static LanguageInfo> {
    let target = ext.trim_start_matches('.').to_ascii_lowercase();
    registered_languages().iter().find(|info| {
        info.extensions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(&target))
    })
}

/// Normalizes a language identifier to its canonical key.
fn normalize_language_key(language: &str) -> Option<&'static str> {
    match language.to_ascii_lowercase().as_str() {
        "rs" | "rust" => Some("rs"),
        "go" | "golang" => Some("go"),
        _ => None,
    }
}
