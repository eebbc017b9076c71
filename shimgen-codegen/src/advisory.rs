//! Implementer checklist recovery
//!
//! Every artifact ends with an advisory block listing the operations a
//! concrete type must provide. [`extract`] reads that block back out of a
//! generated file of either target, and [`diff`] compares two listings so a
//! regeneration can report how an interface evolved.

use std::fmt;

/// One line of an advisory block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryEntry {
    pub name: String,
    /// Parameter count, not counting the receiver.
    pub arity: usize,
    pub optional: bool,
    /// The declaration as written, without comment markers.
    pub signature: String,
}

impl fmt::Display for AdvisoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature)?;
        if self.optional {
            write!(f, " [optional]")?;
        }
        Ok(())
    }
}

const RUST_OPEN: &str = "// IMPLEMENTATION";
const CPP_OPEN: &str = "/* IMPLEMENTATION";
const OPTIONAL_MARK: &str = "[optional]";

/// Recover the advisory listing from a generated artifact.
///
/// Returns an empty list when the text has no advisory block.
pub fn extract(text: &str) -> Vec<AdvisoryEntry> {
    let mut lines = text.lines().map(str::trim);

    while let Some(line) = lines.next() {
        if line.starts_with(RUST_OPEN) {
            return lines
                .map_while(|l| l.strip_prefix("//"))
                .filter_map(|l| parse_rust_line(l.trim()))
                .collect();
        }
        if line.starts_with(CPP_OPEN) {
            return lines
                .take_while(|l| !l.starts_with("*/"))
                .filter_map(parse_cpp_line)
                .collect();
        }
    }

    Vec::new()
}

/// `fn name(&mut self, a: T) -> R; [optional]`
fn parse_rust_line(line: &str) -> Option<AdvisoryEntry> {
    let (decl, optional) = split_marker(line, OPTIONAL_MARK);
    let rest = decl.strip_prefix("fn ")?;
    let open = rest.find('(')?;
    let name = rest[..open].trim();
    let params = balanced_args(&rest[open..])?;

    let mut args = split_top_level(params);
    if args
        .first()
        .is_some_and(|a| matches!(*a, "&self" | "&mut self" | "self"))
    {
        args.remove(0);
    }

    Some(AdvisoryEntry {
        name: name.to_string(),
        arity: args.len(),
        optional,
        signature: decl.to_string(),
    })
}

/// `R name(T a) const; // [optional]`
fn parse_cpp_line(line: &str) -> Option<AdvisoryEntry> {
    let (decl, optional) = split_marker(line, "// [optional]");
    let open = decl.find('(')?;
    let head = decl[..open].trim_end();
    let name_start = head
        .rfind(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .map_or(0, |i| i + 1);
    let name = &head[name_start..];
    if name.is_empty() {
        return None;
    }
    let params = balanced_args(&decl[open..])?;

    Some(AdvisoryEntry {
        name: name.to_string(),
        arity: split_top_level(params).len(),
        optional,
        signature: decl.to_string(),
    })
}

fn split_marker<'a>(line: &'a str, marker: &str) -> (&'a str, bool) {
    match line.strip_suffix(marker) {
        Some(decl) => (decl.trim_end(), true),
        None => (line.trim_end(), false),
    }
}

/// The text between a leading `(` and its matching `)`.
fn balanced_args(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas outside `<>`, `()` and `[]`. Empty input has no items.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                out.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = s[start..].trim();
    if !last.is_empty() {
        out.push(last);
    }
    out
}

// ── Diff ─────────────────────────────────────────────────────────────────────

/// How one listing differs from another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvisoryDiff {
    pub added: Vec<AdvisoryEntry>,
    pub removed: Vec<AdvisoryEntry>,
    /// Same name, different signature or optionality: `(old, new)`.
    pub changed: Vec<(AdvisoryEntry, AdvisoryEntry)>,
}

impl AdvisoryDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Compare two listings by operation name.
pub fn diff(old: &[AdvisoryEntry], new: &[AdvisoryEntry]) -> AdvisoryDiff {
    let find = |list: &[AdvisoryEntry], name: &str| list.iter().find(|e| e.name == name).cloned();

    let mut out = AdvisoryDiff::default();
    for entry in new {
        match find(old, &entry.name) {
            None => out.added.push(entry.clone()),
            Some(prev) if prev != *entry => out.changed.push((prev, entry.clone())),
            Some(_) => {}
        }
    }
    for entry in old {
        if find(new, &entry.name).is_none() {
            out.removed.push(entry.clone());
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const RUST_BLOCK: &str = "\
pub fn make_list() {}

// IMPLEMENTATION (ListImpl<T>)
// fn at(&mut self, idx: i32) -> &mut T;
// fn len(&self) -> i32;
// fn swap(&mut self, a: Pair<i32, i32>, b: usize); [optional]
";

    const CPP_BLOCK: &str = "\
}

/* IMPLEMENTATION
void* alloc(std::size_t nbytes);
void* realloc(void* p, std::size_t nbytes); // [optional]
void free_all();
bool has_address(const void* p) const;
*/
";

    #[test]
    fn rust_listing() {
        let entries = extract(RUST_BLOCK);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["at", "len", "swap"]);
        assert_eq!(entries[0].arity, 1);
        assert_eq!(entries[1].arity, 0);
        assert_eq!(entries[2].arity, 2, "commas inside <> are not separators");
        assert!(entries[2].optional);
        assert_eq!(entries[1].signature, "fn len(&self) -> i32;");
    }

    #[test]
    fn cpp_listing() {
        let entries = extract(CPP_BLOCK);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["alloc", "realloc", "free_all", "has_address"]);
        assert_eq!(entries[1].arity, 2);
        assert!(entries[1].optional);
        assert_eq!(entries[2].arity, 0);
        assert!(!entries[3].optional);
        assert_eq!(entries[1].to_string(), "void* realloc(void* p, std::size_t nbytes); [optional]");
    }

    #[test]
    fn no_block_means_no_entries() {
        assert!(extract("fn main() {}\n").is_empty());
    }

    #[test]
    fn diff_reports_added_removed_changed() {
        let old = extract(CPP_BLOCK);
        let new = extract(
            "/* IMPLEMENTATION\n\
             void* alloc(std::size_t nbytes, std::size_t align);\n\
             void free_all();\n\
             bool has_address(const void* p) const;\n\
             void reset();\n\
             */\n",
        );
        let d = diff(&old, &new);
        assert_eq!(d.added.len(), 1);
        assert_eq!(d.added[0].name, "reset");
        assert_eq!(d.removed.len(), 1);
        assert_eq!(d.removed[0].name, "realloc");
        assert_eq!(d.changed.len(), 1);
        assert_eq!(d.changed[0].1.arity, 2);
        assert!(!d.is_empty());
        assert!(diff(&new, &new).is_empty());
    }
}
