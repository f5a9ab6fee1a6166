//! Document content extraction: links, tags, frontmatter, headers.
//!
//! Every function here is pure and total: arbitrary or malformed input
//! degrades to empty results for the affected category, never an error.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;

use crate::index::types::LinkType;

/// Everything extracted from one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMetadata {
    pub links: Vec<ExtractedLink>,
    pub tags: Vec<ExtractedTag>,
    pub frontmatter: BTreeMap<String, String>,
    pub headers: Vec<ExtractedHeader>,
}

/// A link extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// Target path/name (raw, as written in the link).
    pub target: String,
    /// Type of link.
    pub link_type: LinkType,
    /// Line number where link appears (1-based).
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTag {
    /// Tag name without the leading `#`.
    pub tag: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedHeader {
    /// Heading level, 1 to 6.
    pub level: u8,
    pub text: String,
    pub line: u32,
}

static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Matches [[target]] or [[target|alias]]; the alias is discarded
    Regex::new(r"\[\[([^\]|]+)(?:\|[^\]]*)?\]\]").unwrap()
});

static MARKDOWN_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Matches [alt](target) and ![alt](target)
    Regex::new(r"!?\[[^\]]*\]\(([^)]+)\)").unwrap()
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    // `#` only counts at line start or after whitespace
    Regex::new(r"(?:^|\s)#([A-Za-z0-9_-]+)").unwrap()
});

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s(.*)$").unwrap());

/// Run all four extractors over `text`.
pub fn extract_metadata(text: &str) -> ExtractedMetadata {
    ExtractedMetadata {
        links: extract_links(text),
        tags: extract_tags(text),
        frontmatter: extract_frontmatter(text),
        headers: extract_headers(text),
    }
}

/// Extract wikilinks and markdown links, in reading order.
pub fn extract_links(text: &str) -> Vec<ExtractedLink> {
    let mut links = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_number = line_number(idx);
        let mut found: Vec<(usize, ExtractedLink)> = Vec::new();

        for cap in WIKILINK_RE.captures_iter(line) {
            if let Some(target) = cap.get(1) {
                push_link(
                    &mut found,
                    target.start(),
                    target.as_str(),
                    LinkType::Wikilink,
                    line_number,
                );
            }
        }

        for cap in MARKDOWN_LINK_RE.captures_iter(line) {
            if let Some(target) = cap.get(1) {
                push_link(
                    &mut found,
                    target.start(),
                    target.as_str(),
                    LinkType::Markdown,
                    line_number,
                );
            }
        }

        found.sort_by_key(|(pos, _)| *pos);
        links.extend(found.into_iter().map(|(_, link)| link));
    }

    links
}

fn push_link(
    found: &mut Vec<(usize, ExtractedLink)>,
    pos: usize,
    raw: &str,
    link_type: LinkType,
    line: u32,
) {
    let target = raw.trim();
    if target.is_empty() {
        return;
    }
    found.push((pos, ExtractedLink { target: target.to_string(), link_type, line }));
}

/// Extract `#tag` occurrences.
pub fn extract_tags(text: &str) -> Vec<ExtractedTag> {
    text.lines()
        .enumerate()
        .flat_map(|(idx, line)| {
            TAG_RE.captures_iter(line).filter_map(move |cap| {
                cap.get(1).map(|m| ExtractedTag {
                    tag: m.as_str().to_string(),
                    line: line_number(idx),
                })
            })
        })
        .collect()
}

/// Parse the leading `---` block as a flat key/value mapping.
///
/// Returns an empty map when there is no block, the YAML does not parse,
/// the document is not a mapping, or a key is not a scalar.
pub fn extract_frontmatter(text: &str) -> BTreeMap<String, String> {
    let Some(rest) = text.strip_prefix("---") else {
        return BTreeMap::new();
    };
    let Some(end) = rest.find("\n---") else {
        return BTreeMap::new();
    };

    let value: Value = match serde_yaml::from_str(&rest[..end]) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("Ignoring malformed frontmatter: {}", e);
            return BTreeMap::new();
        }
    };

    let Value::Mapping(mapping) = value else {
        return BTreeMap::new();
    };

    let mut fields = BTreeMap::new();
    for (key, value) in &mapping {
        let Some(key) = scalar_key(key) else {
            return BTreeMap::new();
        };
        fields.insert(key, value_to_string(value));
    }
    fields
}

fn scalar_key(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => value_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => serde_json::to_string(value)
            .or_else(|_| serde_yaml::to_string(value).map(|s| s.trim_end().to_string()))
            .unwrap_or_default(),
    }
}

/// Extract ATX headings (`#` to `######` followed by whitespace).
pub fn extract_headers(text: &str) -> Vec<ExtractedHeader> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let cap = HEADER_RE.captures(line)?;
            let hashes = cap.get(1)?.as_str();
            let heading = cap.get(2).map_or("", |m| m.as_str()).trim();
            Some(ExtractedHeader {
                level: u8::try_from(hashes.len()).unwrap_or(6),
                text: heading.to_string(),
                line: line_number(idx),
            })
        })
        .collect()
}

fn line_number(idx: usize) -> u32 {
    u32::try_from(idx + 1).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_wikilink_alias_and_embed() {
        let links =
            extract_links("See [[Target Note|Alias]] and ![embed.png](assets/embed.png)");

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].target, "Target Note");
        assert_eq!(links[0].link_type, LinkType::Wikilink);
        assert_eq!(links[0].line, 1);
        assert_eq!(links[1].target, "assets/embed.png");
        assert_eq!(links[1].link_type, LinkType::Markdown);
        assert_eq!(links[1].line, 1);
    }

    #[test]
    fn test_link_line_numbers() {
        let content = "Line 1\nLine 2 with [[link1]]\nLine 3\nLine 4 with [text](other.md)\n";
        let links = extract_links(content);

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].line, 2);
        assert_eq!(links[1].line, 4);
        assert_eq!(links[1].target, "other.md");
    }

    #[test]
    fn test_links_in_column_order() {
        let links = extract_links("[a](first.md) then [[second]] then [b](third.md)");
        let targets: Vec<_> = links.iter().map(|l| l.target.as_str()).collect();
        assert_eq!(targets, ["first.md", "second", "third.md"]);
    }

    #[test]
    fn test_wikilink_with_section_kept_raw() {
        let links = extract_links("Link to [[note#section]] here.");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, "note#section");
    }

    #[rstest]
    #[case("word#nothashtag and #realtag", &["realtag"])]
    #[case("#start of line", &["start"])]
    #[case("#one #two\t#three", &["one", "two", "three"])]
    #[case("see https://example.com/page#anchor", &[])]
    #[case("# Heading is not a tag", &[])]
    #[case("## also #nested-tag_1 here", &["nested-tag_1"])]
    #[case("a#b #c#d", &["c"])]
    fn test_tag_boundaries(#[case] input: &str, #[case] expected: &[&str]) {
        let tags: Vec<_> = extract_tags(input).into_iter().map(|t| t.tag).collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn test_tag_lines() {
        let tags = extract_tags("intro\n\n#later");
        assert_eq!(tags, vec![ExtractedTag { tag: "later".to_string(), line: 3 }]);
    }

    #[test]
    fn test_frontmatter_scalars_stringified() {
        let fm = extract_frontmatter("---\ntitle: Hello\ncount: 3\n---\nBody");

        assert_eq!(fm.len(), 2);
        assert_eq!(fm["title"], "Hello");
        assert_eq!(fm["count"], "3");
        assert!(!fm.values().any(|v| v.contains("Body")));
    }

    #[test]
    fn test_frontmatter_nested_values_as_json() {
        let fm = extract_frontmatter("---\ntags: [a, b]\ndone: true\nempty:\n---\n");

        assert_eq!(fm["tags"], r#"["a","b"]"#);
        assert_eq!(fm["done"], "true");
        assert_eq!(fm["empty"], "");
    }

    #[rstest]
    #[case("---\n: : :\n---\nBody")]
    #[case("---\n- just\n- a list\n---\n")]
    #[case("---\njust a scalar\n---\n")]
    #[case("---\ntitle: [unclosed\n---\n")]
    #[case("---\ntitle: no closing delimiter")]
    #[case("no frontmatter at all\n---\nkey: value\n---")]
    #[case("---\n---\n")]
    #[case("")]
    fn test_frontmatter_degrades_to_empty(#[case] input: &str) {
        assert!(extract_frontmatter(input).is_empty());
    }

    #[test]
    fn test_headers() {
        let headers =
            extract_headers("# Title\ntext\n###   Spaced out  \n####### too deep\n#nospace");

        assert_eq!(
            headers,
            vec![
                ExtractedHeader { level: 1, text: "Title".to_string(), line: 1 },
                ExtractedHeader { level: 3, text: "Spaced out".to_string(), line: 3 },
            ]
        );
    }

    #[rstest]
    #[case("\u{0}\u{1}[[")]
    #[case("]]]](((![")]
    #[case("---")]
    #[case("---\n\t\t: - [ {")]
    #[case("######\n# \n#")]
    fn test_malformed_input_never_panics(#[case] input: &str) {
        let _ = extract_metadata(input);
    }

    #[test]
    fn test_extract_metadata_bundles_all() {
        let content = "---\ntitle: Doc\n---\n# Doc\nLinks [[other]] and #tag\n";
        let meta = extract_metadata(content);

        assert_eq!(meta.frontmatter["title"], "Doc");
        assert_eq!(meta.headers.len(), 1);
        assert_eq!(meta.links.len(), 1);
        assert_eq!(meta.tags.len(), 1);
        assert_eq!(meta.tags[0].line, 5);
    }
}
