//! TeX atom lists written out as Typst math markup.
//!
//! Every atom is emitted as its own token, separated by spaces, so adjacent letters never
//! merge into a Typst identifier. ASCII punctuation is always escaped; structure goes through
//! Typst's math functions (`frac`, `attach`, `sqrt`, `root`, `op`, `lr`); an empty script base
//! is an empty string.

use std::ops::Range;

use crate::tex::MathStyle;
use crate::tex::parse::Node;

/// Font size the markup is set at; one em of output geometry is this many points.
pub const BASE_PT: f32 = 10.0;

const PREAMBLE: &str = "#set page(width: auto, height: auto, margin: 0pt, fill: none)\n\
                        #set text(size: 10pt)\n";

/// A complete Typst document plus where each fragment landed in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Markup {
    pub source: String,
    /// Byte range of fragment `i` in `source`.
    pub parts: Vec<Range<usize>>,
    /// Byte ranges of atoms that sit on the main baseline.
    pub baseline: Vec<Range<usize>>,
}

impl Markup {
    /// Fragment whose range contains byte `at`.
    pub fn part_at(&self, at: usize) -> Option<usize> {
        self.parts.iter().position(|r| r.contains(&at))
    }

    pub fn on_baseline(&self, at: usize) -> bool {
        self.baseline.iter().any(|r| r.contains(&at))
    }
}

/// One inline equation holding every fragment, in order.
pub fn math_markup(parts: &[Vec<Node>], style: MathStyle) -> Markup {
    let mut w = Writer {
        out: String::from(PREAMBLE),
        baseline: Vec::new(),
        depth: 0,
    };
    let wrapper = match style {
        MathStyle::Display => "display",
        MathStyle::Text => "inline",
        MathStyle::Script => "script",
        MathStyle::ScriptScript => "sscript",
    };
    w.out.push('$');
    w.out.push_str(wrapper);
    w.out.push('(');
    let mut ranges = Vec::with_capacity(parts.len());
    for list in parts {
        w.out.push(' ');
        let start = w.out.len();
        w.list(list);
        ranges.push(start..w.out.len());
    }
    w.out.push_str(" )$\n");
    Markup {
        source: w.out,
        parts: ranges,
        baseline: w.baseline,
    }
}

/// One line of upright text in markup mode.
pub fn text_markup(line: &str) -> String {
    let mut out = String::from(PREAMBLE);
    for c in line.chars() {
        if c.is_ascii_punctuation() {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\n');
    out
}

struct Writer {
    out: String,
    baseline: Vec<Range<usize>>,
    /// Nesting inside fractions, roots and scripts.
    depth: usize,
}

impl Writer {
    fn list(&mut self, nodes: &[Node]) {
        let mut i = 0;
        while i < nodes.len() {
            // Runs of digits and points become one number token.
            let run = nodes[i..]
                .iter()
                .take_while(|n| matches!(n, Node::Char { ch, .. } if ch.is_ascii_digit() || *ch == '.'))
                .count();
            if run > 1 {
                let start = self.out.len();
                for n in &nodes[i..i + run] {
                    if let Node::Char { ch, .. } = n {
                        self.out.push(*ch);
                    }
                }
                self.mark_baseline(start);
                self.out.push(' ');
                i += run;
                continue;
            }
            self.node(&nodes[i]);
            self.out.push(' ');
            i += 1;
        }
    }

    fn mark_baseline(&mut self, start: usize) {
        if self.depth == 0 && self.out.len() > start {
            self.baseline.push(start..self.out.len());
        }
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }

    fn node(&mut self, node: &Node) {
        let start = self.out.len();
        match node {
            Node::Char { ch, .. } => {
                self.symbol(*ch);
                self.mark_baseline(start);
            }
            Node::Group(list) => self.list(list),
            Node::Scripts { base, sup, sub, .. } => {
                self.out.push_str("attach(");
                match base.as_deref() {
                    Some(Node::Group(list)) if list.is_empty() => self.out.push_str("\"\""),
                    Some(b) => self.node(b),
                    None => self.out.push_str("\"\""),
                }
                if let Some(t) = sup {
                    self.out.push_str(", t: ");
                    self.nested(|w| w.node(t));
                }
                if let Some(b) = sub {
                    self.out.push_str(", b: ");
                    self.nested(|w| w.node(b));
                }
                self.out.push(')');
            }
            Node::Frac { num, den, style } => {
                let wrap = match style {
                    Some(MathStyle::Display) => Some("display"),
                    Some(MathStyle::Text) => Some("inline"),
                    _ => None,
                };
                if let Some(f) = wrap {
                    self.out.push_str(f);
                    self.out.push('(');
                }
                self.out.push_str("frac(");
                self.nested(|w| {
                    w.node(num);
                    w.out.push_str(", ");
                    w.node(den);
                });
                self.out.push(')');
                if wrap.is_some() {
                    self.out.push(')');
                }
            }
            Node::Sqrt { index, body } => {
                self.nested(|w| match index {
                    Some(idx) => {
                        w.out.push_str("root(");
                        w.node(idx);
                        w.out.push_str(", ");
                        w.node(body);
                        w.out.push(')');
                    }
                    None => {
                        w.out.push_str("sqrt(");
                        w.node(body);
                        w.out.push(')');
                    }
                });
            }
            Node::Text(s) => {
                self.string(s);
                self.mark_baseline(start);
            }
            Node::Op { name, limits } => {
                self.out.push_str("op(");
                self.string(name);
                if *limits {
                    self.out.push_str(", limits: #true");
                }
                self.out.push(')');
                self.mark_baseline(start);
            }
            Node::BigOp { .. } => self.out.push_str("sum"),
            Node::Space(em) => self.out.push_str(&format!("#h({em}em)")),
            Node::Delimited { left, body, right } => match (left, right) {
                (Some(l), Some(r)) => {
                    self.out.push_str("lr(");
                    self.symbol(*l);
                    self.out.push(' ');
                    self.list(body);
                    self.symbol(*r);
                    self.out.push(')');
                }
                _ => {
                    if let Some(l) = left {
                        self.symbol(*l);
                        self.out.push(' ');
                    }
                    self.list(body);
                    if let Some(r) = right {
                        self.symbol(*r);
                    }
                }
            },
        }
    }

    fn symbol(&mut self, ch: char) {
        if ch.is_ascii_punctuation() {
            self.out.push('\\');
        }
        self.out.push(ch);
    }

    fn string(&mut self, s: &str) {
        self.out.push('"');
        for c in s.chars() {
            if c == '"' || c == '\\' {
                self.out.push('\\');
            }
            self.out.push(c);
        }
        self.out.push('"');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::parse::parse;

    fn markup(parts: &[&str]) -> Markup {
        let lists: Vec<Vec<Node>> = parts.iter().map(|p| parse(p).unwrap()).collect();
        math_markup(&lists, MathStyle::Display)
    }

    fn body(m: &Markup) -> &str {
        &m.source[PREAMBLE.len()..]
    }

    #[test]
    fn test_parts_map_to_their_markup() {
        let m = markup(&["x", "=", r"\frac{1}{2}"]);
        assert_eq!(m.parts.len(), 3);
        assert_eq!(m.source[m.parts[0].clone()].trim(), "x");
        assert_eq!(m.source[m.parts[1].clone()].trim(), r"\=");
        assert_eq!(m.source[m.parts[2].clone()].trim(), "frac(1, 2)");
        assert!(body(&m).starts_with("$display("));
        assert_eq!(m.part_at(m.parts[2].start), Some(2));
        assert_eq!(m.part_at(0), None);
    }

    #[test]
    fn test_letters_stay_separate_and_numbers_merge() {
        let m = markup(&["ab = 10.49"]);
        assert!(body(&m).contains(r"a b \= 10.49"));
    }

    #[test]
    fn test_structures() {
        let m = markup(&[r"\sqrt[3]{x} + y^2_1 + {}^\circ + \text{cm} + \sin x + \lim_{x \to 0}"]);
        let s = body(&m);
        assert!(s.contains("root(3, x)"), "{s}");
        assert!(s.contains("attach(y, t: 2, b: 1)"), "{s}");
        assert!(s.contains("attach(\"\", t: \u{b0})"), "{s}");
        assert!(s.contains("\"cm\""), "{s}");
        assert!(s.contains("op(\"sin\")"), "{s}");
        assert!(s.contains("op(\"lim\", limits: #true)"), "{s}");
    }

    #[test]
    fn test_punctuation_is_escaped() {
        let m = markup(&["f(a, b) / 2"]);
        assert!(body(&m).contains(r"f \( a \, b \) \/ 2"));
        let m = markup(&[r"\left( a \right)"]);
        assert!(body(&m).contains(r"lr(\( a \))"));
        assert_eq!(text_markup("a-b #1"), format!("{PREAMBLE}a\\-b \\#1\n"));
    }

    #[test]
    fn test_baseline_excludes_nested_atoms() {
        let m = markup(&[r"x = \frac{1}{2}"]);
        let x = PREAMBLE.len() + body(&m).find("x ").unwrap();
        let one = m.source.find("frac(1").unwrap() + "frac(".len();
        assert!(m.on_baseline(x));
        assert!(!m.on_baseline(one));
    }
}
