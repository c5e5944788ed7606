// src/io/cif_blocks.rs
//
// Two-pass CIF reader.
// Pass 1 classifies every line into a typed block.
// Pass 2 folds the block list into tag/value items and loop tables, and tables are
// matched against known schemas by tag membership, never by line position.

use std::collections::HashMap;

pub const SYMMETRY_OP_TAGS: [&str; 2] = [
    "_symmetry_equiv_pos_as_xyz",
    "_space_group_symop_operation_xyz",
];
pub const ATOM_SITE_PREFIX: &str = "_atom_site_";
const ATOM_SITE_ANISO_PREFIX: &str = "_atom_site_aniso_";

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    DataHeader(String),
    Comment(String),
    LoopHeader,
    /// Tag name (lowercased) and inline value, if any.
    Tag { name: String, value: Option<String> },
    /// Contents of a `;`-delimited multi-line field.
    TextField(String),
    DataRow(String),
}

/// Pass 1: line classification.
pub fn tokenize(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        // Text fields are delimited by a ';' in column one.
        if let Some(first) = line.strip_prefix(';') {
            let mut body = vec![first.trim_end().to_string()];
            for inner in lines.by_ref() {
                if inner.starts_with(';') {
                    break;
                }
                body.push(inner.trim_end().to_string());
            }
            let joined = body.join("\n").trim().to_string();
            blocks.push(Block::TextField(joined));
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('#') {
            blocks.push(Block::Comment(rest.trim().to_string()));
        } else if trimmed.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data_")) {
            blocks.push(Block::DataHeader(trimmed[5..].to_string()));
        } else if trimmed.eq_ignore_ascii_case("loop_") {
            blocks.push(Block::LoopHeader);
        } else if trimmed.starts_with('_') {
            let content = strip_comment(trimmed);
            let (name, value) = match content.find(char::is_whitespace) {
                Some(idx) => (&content[..idx], Some(content[idx..].trim().to_string())),
                None => (content, None),
            };
            blocks.push(Block::Tag {
                name: name.to_lowercase(),
                value: value.filter(|v| !v.is_empty()),
            });
        } else {
            blocks.push(Block::DataRow(strip_comment(trimmed).to_string()));
        }
    }

    blocks
}

/// A `loop_` table: declared column tags and raw data rows (one per line).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub tags: Vec<String>,
    pub rows: Vec<String>,
    /// Position among all tables in the document.
    pub ordinal: usize,
}

impl Table {
    pub fn column(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t == tag)
    }

    pub fn column_any(&self, tags: &[&str]) -> Option<usize> {
        tags.iter().find_map(|t| self.column(t))
    }
}

/// Table layouts the parser knows how to consume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableSchema {
    SymmetryOperations,
    AtomSites,
}

impl TableSchema {
    pub fn matches(&self, table: &Table) -> bool {
        match self {
            TableSchema::SymmetryOperations => table
                .tags
                .iter()
                .any(|t| SYMMETRY_OP_TAGS.contains(&t.as_str())),
            TableSchema::AtomSites => table
                .tags
                .first()
                .is_some_and(|t| t.starts_with(ATOM_SITE_PREFIX) && !t.starts_with(ATOM_SITE_ANISO_PREFIX)),
        }
    }
}

/// Pass 2 output.
#[derive(Clone, Debug, Default)]
pub struct Document {
    pub items: HashMap<String, String>,
    pub tables: Vec<Table>,
}

impl Document {
    pub fn parse(text: &str) -> Self {
        Self::from_blocks(&tokenize(text))
    }

    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut doc = Document::default();
        let mut current: Option<Table> = None;
        let mut pending_tag: Option<String> = None;

        for block in blocks {
            match block {
                Block::Comment(_) => {}
                Block::DataHeader(_) => {
                    doc.close_table(&mut current);
                    pending_tag = None;
                }
                Block::LoopHeader => {
                    doc.close_table(&mut current);
                    pending_tag = None;
                    current = Some(Table { ordinal: doc.tables.len(), ..Default::default() });
                }
                Block::Tag { name, value } => {
                    // Column declarations only while the loop has no rows yet.
                    if let Some(table) = current.as_mut() {
                        if table.rows.is_empty() && value.is_none() {
                            table.tags.push(name.clone());
                            continue;
                        }
                        doc.close_table(&mut current);
                    }
                    match value {
                        Some(v) => {
                            doc.items.insert(name.clone(), unquote(v));
                            pending_tag = None;
                        }
                        None => pending_tag = Some(name.clone()),
                    }
                }
                Block::TextField(text) => {
                    if let Some(tag) = pending_tag.take() {
                        doc.items.insert(tag, text.clone());
                    } else if let Some(table) = current.as_mut() {
                        table.rows.push(format!("'{}'", text.replace('\n', " ")));
                    }
                }
                Block::DataRow(row) => {
                    if let Some(tag) = pending_tag.take() {
                        doc.items.insert(tag, unquote(row));
                    } else if let Some(table) = current.as_mut() {
                        table.rows.push(row.clone());
                    }
                }
            }
        }
        doc.close_table(&mut current);
        doc
    }

    fn close_table(&mut self, current: &mut Option<Table>) {
        if let Some(table) = current.take() {
            if !table.tags.is_empty() {
                self.tables.push(table);
            }
        }
    }

    pub fn item(&self, tag: &str) -> Option<&str> {
        self.items.get(tag).map(String::as_str)
    }

    /// First value found among `tags`, in order of preference.
    pub fn item_any(&self, tags: &[&str]) -> Option<&str> {
        tags.iter().find_map(|t| self.item(t))
    }

    /// First table matching `schema` whose ordinal is below `before`.
    pub fn find_table(&self, schema: TableSchema, before: Option<usize>) -> Option<&Table> {
        self.tables
            .iter()
            .filter(|t| before.map_or(true, |limit| t.ordinal < limit))
            .find(|t| schema.matches(t))
    }

    pub fn tables_matching(&self, schema: TableSchema) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(move |t| schema.matches(t))
    }
}

/// Strip one level of matching single or double quotes.
pub fn unquote(s: &str) -> String {
    let s = s.trim();
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'\'' || first == b'"') && first == last {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

/// Drop an inline `# comment`. A `#` only opens a comment at the start of a token
/// outside quotes, so `'P #1'` and `C#2` are kept intact.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut token_start = true;
    let mut chars = line.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match quote {
            Some(q) => {
                if c == q && chars.peek().map_or(true, |(_, n)| n.is_whitespace()) {
                    quote = None;
                }
            }
            None if token_start && (c == '\'' || c == '"') => quote = Some(c),
            None if token_start && c == '#' => return line[..i].trim_end(),
            None => {}
        }
        token_start = c.is_whitespace();
    }

    line
}

/// Split a data row on whitespace, keeping quoted values together (quotes removed).
/// A quote only closes when followed by whitespace or end of line.
pub fn split_row(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        let quote = chars[i];
        if quote == '\'' || quote == '"' {
            let mut j = i + 1;
            while j < chars.len() {
                if chars[j] == quote && chars.get(j + 1).map_or(true, |c| c.is_whitespace()) {
                    break;
                }
                j += 1;
            }
            tokens.push(chars[i + 1..j.min(chars.len())].iter().collect());
            i = j + 1;
        } else if quote == '#' {
            break;
        } else {
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
data_test
# comment line
_cell_length_a 5.0
_chemical_formula_structural
'Na Cl'
_publ_section_title
;
 A multi-line
 title
;
loop_
_symmetry_equiv_pos_id
_symmetry_equiv_pos_as_xyz
1 'x, y, z'
2 '-x, -y, -z'
loop_
_atom_site_label
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
Na1 0 0 0
Cl1 0.5 0.5 0.5
";

    #[test]
    fn test_tokenize_block_kinds() {
        let blocks = tokenize(SAMPLE);
        assert_eq!(blocks[0], Block::DataHeader("test".to_string()));
        assert_eq!(blocks[1], Block::Comment("comment line".to_string()));
        assert_eq!(
            blocks[2],
            Block::Tag { name: "_cell_length_a".to_string(), value: Some("5.0".to_string()) }
        );
        assert!(blocks.contains(&Block::TextField("A multi-line\n title".to_string())));
        assert_eq!(blocks.iter().filter(|b| **b == Block::LoopHeader).count(), 2);
    }

    #[test]
    fn test_document_items_and_tables() {
        let doc = Document::parse(SAMPLE);
        assert_eq!(doc.item("_cell_length_a"), Some("5.0"));
        assert_eq!(doc.item("_chemical_formula_structural"), Some("Na Cl"));
        assert_eq!(doc.tables.len(), 2);
        assert_eq!(doc.tables[0].rows.len(), 2);
        assert_eq!(doc.tables[1].tags.len(), 4);
        assert_eq!(doc.tables[1].rows, vec!["Na1 0 0 0", "Cl1 0.5 0.5 0.5"]);
    }

    #[test]
    fn test_schema_registry() {
        let doc = Document::parse(SAMPLE);
        let sym = doc.find_table(TableSchema::SymmetryOperations, None).unwrap();
        assert_eq!(sym.column_any(&SYMMETRY_OP_TAGS), Some(1));
        let atoms = doc.find_table(TableSchema::AtomSites, None).unwrap();
        assert_eq!(atoms.ordinal, 1);
        assert_eq!(atoms.column("_atom_site_fract_z"), Some(3));
        // Bounded search: nothing before the first table.
        assert!(doc.find_table(TableSchema::SymmetryOperations, Some(0)).is_none());
    }

    #[test]
    fn test_aniso_loop_is_not_atom_sites() {
        let table = Table {
            tags: vec!["_atom_site_aniso_label".to_string(), "_atom_site_aniso_u_11".to_string()],
            rows: vec![],
            ordinal: 0,
        };
        assert!(!TableSchema::AtomSites.matches(&table));
    }

    #[test]
    fn test_split_row_quotes() {
        assert_eq!(split_row("1 'x, y, z'"), vec!["1", "x, y, z"]);
        assert_eq!(split_row("\"-x,-y,z\""), vec!["-x,-y,z"]);
        assert_eq!(split_row("O1  0.25(3) 0.5 0"), vec!["O1", "0.25(3)", "0.5", "0"]);
        assert_eq!(split_row("Li' 0 0 0"), vec!["Li'", "0", "0", "0"]);
    }

    #[test]
    fn test_inline_comments_stripped() {
        let blocks = tokenize("_cell_length_a 5.0 # angstrom\nNa1 0 0 0 # origin\n");
        assert_eq!(
            blocks[0],
            Block::Tag { name: "_cell_length_a".to_string(), value: Some("5.0".to_string()) }
        );
        assert_eq!(blocks[1], Block::DataRow("Na1 0 0 0".to_string()));

        assert_eq!(strip_comment("'P #1' # space group"), "'P #1'");
        assert_eq!(strip_comment("C#2 0.1"), "C#2 0.1");
        assert_eq!(strip_comment("_tag_only # note"), "_tag_only");
        assert_eq!(split_row("O1 0.25 0.5 0 #site"), vec!["O1", "0.25", "0.5", "0"]);
        assert_eq!(split_row("1 'x, y, z # not a comment'"), vec!["1", "x, y, z # not a comment"]);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'P 1'"), "P 1");
        assert_eq!(unquote("\"Fm-3m\""), "Fm-3m");
        assert_eq!(unquote("Fm-3m"), "Fm-3m");
    }
}
