//! Suffix trie over reversed, dot-terminated rule text.
//!
//! Each rule is indexed by its ASCII form with the labels reversed and a
//! trailing `.` appended (`co.uk` -> `uk.co.`), so a lookup walks the
//! hostname from its right-most label. Rules only terminate right after a
//! `.` edge, which keeps partial labels from matching (`cow.uk` never hits
//! `co.uk`). Nodes live in a flat arena and link to their children by index;
//! the walk only ever moves downward.

use std::iter;

use crate::rules::SuffixRule;

type NodeId = u32;

const ROOT: NodeId = 0;

#[derive(Debug, Clone, Default)]
struct Node {
    /// Outgoing edges, sorted by byte
    children: Vec<(u8, NodeId)>,
    /// Rule terminating at this node
    rule: Option<u32>,
}

#[derive(Debug, Clone)]
struct Terminal {
    /// Original rule text, markers included
    suffix: String,
    labels: usize,
    exception: bool,
}

/// Trie of suffix rules supporting longest-match lookup.
#[derive(Debug, Clone)]
pub struct SuffixTrie {
    nodes: Vec<Node>,
    terminals: Vec<Terminal>,
}

/// Reverse the labels of a domain: `www.example.co.uk` -> `uk.co.example.www`.
pub fn reverse_labels(domain: &str) -> String {
    domain.rsplit('.').collect::<Vec<_>>().join(".")
}

impl SuffixTrie {
    /// Build the trie from a rule table.
    pub fn build<'a, I>(rules: I) -> Self
    where
        I: IntoIterator<Item = &'a SuffixRule>,
    {
        let rules = rules.into_iter();
        let mut trie = Self {
            nodes: vec![Node::default()],
            terminals: Vec::with_capacity(rules.size_hint().0),
        };

        for rule in rules {
            trie.insert(rule);
        }

        trie
    }

    fn insert(&mut self, rule: &SuffixRule) {
        let mut node = ROOT;

        // The exception marker is kept on the terminal, not in the path
        let path = rule
            .reversed
            .bytes()
            .filter(|&b| b != b'!')
            .chain(iter::once(b'.'));

        for byte in path {
            node = self.child_or_insert(node, byte);
        }

        let body = rule.suffix.strip_prefix('!').unwrap_or(&rule.suffix);
        let terminal = Terminal {
            suffix: rule.suffix.clone(),
            labels: body.split('.').count(),
            exception: rule.is_exception(),
        };

        match self.nodes[node as usize].rule {
            Some(existing) => self.terminals[existing as usize] = terminal,
            None => {
                self.nodes[node as usize].rule = Some(self.terminals.len() as u32);
                self.terminals.push(terminal);
            }
        }
    }

    fn child_or_insert(&mut self, node: NodeId, byte: u8) -> NodeId {
        let children = &self.nodes[node as usize].children;
        match children.binary_search_by_key(&byte, |&(b, _)| b) {
            Ok(i) => children[i].1,
            Err(i) => {
                let id = self.nodes.len() as NodeId;
                self.nodes.push(Node::default());
                self.nodes[node as usize].children.insert(i, (byte, id));
                id
            }
        }
    }

    #[inline]
    fn child(&self, node: NodeId, byte: u8) -> Option<NodeId> {
        let children = &self.nodes[node as usize].children;
        children
            .binary_search_by_key(&byte, |&(b, _)| b)
            .ok()
            .map(|i| children[i].1)
    }

    /// Find the prevailing rule for a reversed ASCII domain (`uk.co.example`).
    ///
    /// Returns the rule text as listed (`co.uk`, `*.kawasaki.jp`,
    /// `!city.kawasaki.jp`), or `None` if no rule matches.
    ///
    /// End of input counts as a trailing `.`. A `*` edge matches exactly one
    /// whole label. When several rules match, an exception rule wins,
    /// otherwise the one with the most labels.
    pub fn search(&self, reversed_domain: &str) -> Option<&str> {
        let input: Vec<u8> = reversed_domain
            .bytes()
            .chain(iter::once(b'.'))
            .collect();

        let mut best = None;
        self.walk(ROOT, &input, 0, &mut best);

        best.map(|i| self.terminals[i as usize].suffix.as_str())
    }

    fn walk(&self, mut node: NodeId, input: &[u8], mut pos: usize, best: &mut Option<u32>) {
        loop {
            let at_label_start = pos == 0 || input[pos - 1] == b'.';
            if at_label_start && pos < input.len() {
                if let Some(star) = self.child(node, b'*') {
                    if let Some(len) = input[pos..].iter().position(|&b| b == b'.') {
                        if len > 0 {
                            self.walk(star, input, pos + len, best);
                        }
                    }
                }
            }

            if pos == input.len() {
                return;
            }

            match self.child(node, input[pos]) {
                Some(next) => {
                    node = next;
                    pos += 1;
                    if let Some(rule) = self.nodes[node as usize].rule {
                        self.consider(rule, best);
                    }
                }
                None => return,
            }
        }
    }

    fn consider(&self, candidate: u32, best: &mut Option<u32>) {
        let prevails = match *best {
            None => true,
            Some(current) => {
                let c = &self.terminals[candidate as usize];
                let b = &self.terminals[current as usize];
                (c.exception, c.labels) > (b.exception, b.labels)
            }
        };
        if prevails {
            *best = Some(candidate);
        }
    }

    /// Number of rules indexed.
    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    /// Check if the trie holds no rules
    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
