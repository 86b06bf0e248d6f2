//! Language metadata exposed by the engine.

use std::sync::OnceLock;

use syntect::parsing::SyntaxSet;

/// Ids that always resolve to plain text, whatever the configured languages.
pub const PLAIN_TEXT_IDS: &[&str] = &["text", "plain", "plaintext", "txt"];

/// Metadata for one bundled language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageInfo {
    /// Canonical id, e.g. `javascript`.
    pub id: String,
    /// Display name as declared by the syntax definition, e.g. `JavaScript`.
    pub name: String,
    /// Alternative ids, e.g. `js`.
    pub aliases: Vec<String>,
}

impl LanguageInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Whether `lang` is this language's id or one of its aliases.
    pub fn matches(&self, lang: &str) -> bool {
        self.id.eq_ignore_ascii_case(lang) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(lang))
    }

    /// The shortest of the id and aliases; the first one wins on ties.
    pub fn shortest_alias(&self) -> &str {
        std::iter::once(&self.id)
            .chain(&self.aliases)
            .min_by_key(|name| name.len())
            .map(String::as_str)
            .unwrap_or(&self.id)
    }
}

/// Every language the engine knows about.
#[derive(Debug, Clone, Default)]
pub struct LanguageCatalog {
    entries: Vec<LanguageInfo>,
}

impl LanguageCatalog {
    pub fn new(entries: Vec<LanguageInfo>) -> Self {
        Self { entries }
    }

    /// Build the catalog from a syntax set: the id is the slugified syntax
    /// name and the aliases are its file extensions.
    pub fn from_syntaxes(syntaxes: &SyntaxSet) -> Self {
        let entries = syntaxes
            .syntaxes()
            .iter()
            .map(|syntax| {
                let id = slugify(&syntax.name);
                let mut aliases: Vec<String> = Vec::new();
                for ext in &syntax.file_extensions {
                    let ext = ext.to_ascii_lowercase();
                    if ext != id && !aliases.contains(&ext) {
                        aliases.push(ext);
                    }
                }
                LanguageInfo {
                    id,
                    name: syntax.name.clone(),
                    aliases,
                }
            })
            .collect();
        Self { entries }
    }

    /// Metadata of the syntaxes bundled with the engine, loaded on first use.
    pub fn bundled() -> &'static LanguageCatalog {
        static BUNDLED: OnceLock<LanguageCatalog> = OnceLock::new();
        BUNDLED.get_or_init(|| LanguageCatalog::from_syntaxes(&SyntaxSet::load_defaults_newlines()))
    }

    /// First entry whose id or aliases match `lang`.
    pub fn find(&self, lang: &str) -> Option<&LanguageInfo> {
        self.entries.iter().find(|info| info.matches(lang))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LanguageInfo> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '+' || c == '#' {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortest_alias_wins() {
        let info = LanguageInfo::new("javascript", "JavaScript", &["js"]);
        assert_eq!(info.shortest_alias(), "js");
    }

    #[test]
    fn first_alias_wins_ties() {
        let info = LanguageInfo::new("shellscript", "Shell", &["sh", "zs", "bash"]);
        assert_eq!(info.shortest_alias(), "sh");
    }

    #[test]
    fn id_can_be_shortest() {
        let info = LanguageInfo::new("go", "Go", &["golang"]);
        assert_eq!(info.shortest_alias(), "go");
    }

    #[test]
    fn find_matches_id_or_alias() {
        let catalog = LanguageCatalog::new(vec![
            LanguageInfo::new("javascript", "JavaScript", &["js", "mjs"]),
            LanguageInfo::new("rust", "Rust", &["rs"]),
        ]);
        assert_eq!(catalog.find("JS").map(|i| i.id.as_str()), Some("javascript"));
        assert_eq!(catalog.find("rust").map(|i| i.id.as_str()), Some("rust"));
        assert!(catalog.find("nonexistent-xyz").is_none());
    }

    #[test]
    fn bundled_catalog_knows_common_languages() {
        let catalog = LanguageCatalog::bundled();
        let js = catalog.find("js").expect("javascript is bundled");
        assert_eq!(js.id, "javascript");
        assert_eq!(js.shortest_alias(), "js");
        assert_eq!(catalog.find("rs").map(|i| i.id.as_str()), Some("rust"));
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Bourne Again Shell (bash)"), "bourne-again-shell-bash");
        assert_eq!(slugify("C++"), "c++");
        assert_eq!(slugify("Plain Text"), "plain-text");
    }
}
