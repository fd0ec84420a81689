//! Phylogenetic distance provider.
//!
//! Parses a Newick tree once at startup and answers Faith's PD queries for
//! guild-sized tip subsets: the sum of branch lengths over the union of
//! tip-to-root paths. The walk marks visited nodes so shared ancestry is
//! counted once.

use crate::error::{Result, ScoreError};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct PhyloTree {
    /// Parent index per node; the root has none.
    parent: Vec<Option<usize>>,
    /// Branch length from each node to its parent; 0.0 at the root.
    branch_len: Vec<f64>,
    tips: FxHashMap<String, usize>,
}

impl PhyloTree {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let tree = Self::from_newick(&text)?;
        info!(tips = tree.tip_count(), path = %path.display(), "phylogeny loaded");
        Ok(tree)
    }

    pub fn from_newick(text: &str) -> Result<Self> {
        let mut parser = NewickParser::new(text);
        parser.parse()?;
        Ok(Self {
            parent: parser.parent,
            branch_len: parser.branch_len,
            tips: parser.tips,
        })
    }

    pub fn tip_count(&self) -> usize {
        self.tips.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tips.contains_key(id)
    }

    /// Faith's phylogenetic diversity for a set of tips.
    ///
    /// Every id must be a tip of the tree; unknown identities are an error,
    /// not a zero contribution. Fewer than two distinct tips span no branches,
    /// so the PD is 0.0.
    pub fn faiths_pd(&self, tip_ids: &[String]) -> Result<f64> {
        let mut nodes = FxHashSet::default();
        for id in tip_ids {
            let node = self.tips.get(id.as_str()).ok_or_else(|| {
                ScoreError::MissingPlant {
                    id: id.clone(),
                    table: "phylogeny",
                }
            })?;
            nodes.insert(*node);
        }
        if nodes.len() < 2 {
            return Ok(0.0);
        }

        let mut visited = FxHashSet::default();
        let mut total = 0.0;
        for &tip in &nodes {
            let mut node = tip;
            while visited.insert(node) {
                total += self.branch_len[node];
                match self.parent[node] {
                    Some(up) => node = up,
                    None => break,
                }
            }
        }
        Ok(total)
    }
}

/// Minimal recursive-descent Newick reader. Handles unquoted labels, branch
/// lengths, nested clades, and a trailing semicolon; internal node labels are
/// accepted and ignored for tip lookup.
struct NewickParser<'a> {
    bytes: &'a [u8],
    pos: usize,
    parent: Vec<Option<usize>>,
    branch_len: Vec<f64>,
    tips: FxHashMap<String, usize>,
}

impl<'a> NewickParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
            parent: Vec::new(),
            branch_len: Vec::new(),
            tips: FxHashMap::default(),
        }
    }

    fn parse(&mut self) -> Result<()> {
        self.skip_ws();
        self.clade(None)?;
        self.skip_ws();
        if self.peek() == Some(b';') {
            self.pos += 1;
        }
        self.skip_ws();
        if self.pos != self.bytes.len() {
            return Err(ScoreError::Newick(format!(
                "trailing input at byte {}",
                self.pos
            )));
        }
        if self.tips.is_empty() {
            return Err(ScoreError::Newick("tree has no labeled tips".into()));
        }
        Ok(())
    }

    fn clade(&mut self, parent: Option<usize>) -> Result<usize> {
        let node = self.parent.len();
        self.parent.push(parent);
        self.branch_len.push(0.0);

        self.skip_ws();
        let is_internal = self.peek() == Some(b'(');
        if is_internal {
            self.pos += 1;
            loop {
                self.clade(Some(node))?;
                self.skip_ws();
                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(b')') => {
                        self.pos += 1;
                        break;
                    }
                    other => {
                        return Err(ScoreError::Newick(format!(
                            "expected ',' or ')' at byte {}, found {:?}",
                            self.pos,
                            other.map(char::from)
                        )))
                    }
                }
            }
        }

        let label = self.label();
        if !is_internal {
            if label.is_empty() {
                return Err(ScoreError::Newick(format!(
                    "unlabeled tip at byte {}",
                    self.pos
                )));
            }
            if self.tips.insert(label.clone(), node).is_some() {
                return Err(ScoreError::Newick(format!("duplicate tip '{label}'")));
            }
        }

        self.skip_ws();
        if self.peek() == Some(b':') {
            self.pos += 1;
            self.branch_len[node] = self.number()?;
        }
        Ok(node)
    }

    fn label(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'(' | b')' | b',' | b':' | b';') || b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }

    fn number(&mut self) -> Result<f64> {
        self.skip_ws();
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| ScoreError::Newick("non-utf8 branch length".into()))?;
        text.parse().map_err(|_| {
            ScoreError::Newick(format!("invalid branch length '{text}' at byte {start}"))
        })
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }
}
