//! Recursive-descent parser for the TeX math subset used by the lessons.

use super::{MathStyle, TexError};
use crate::font::FontVariant;

/// TeX atom classes, used for inter-atom spacing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Class {
    Ord,
    Op,
    Bin,
    Rel,
    Open,
    Close,
    Punct,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Char {
        ch: char,
        class: Class,
        variant: FontVariant,
    },
    Group(Vec<Node>),
    /// `base^sup_sub`; either script may be absent, the base may be empty (`{}^2`, `^\circ`).
    Scripts {
        base: Option<Box<Node>>,
        sup: Option<Box<Node>>,
        sub: Option<Box<Node>>,
        sup_first: bool,
    },
    Frac {
        num: Box<Node>,
        den: Box<Node>,
        /// Forced style (`\dfrac`, `\tfrac`).
        style: Option<MathStyle>,
    },
    Sqrt {
        index: Option<Box<Node>>,
        body: Box<Node>,
    },
    /// Upright text run (`\text{...}`, `\mathrm{...}`); spaces are kept.
    Text(String),
    /// Upright operator name (`\sin`); `limits` puts scripts above/below in display style.
    Op { name: String, limits: bool },
    /// Large operator glyph (`\sum`).
    BigOp { ch: char },
    /// Horizontal space in em.
    Space(f32),
    Delimited {
        left: Option<char>,
        body: Vec<Node>,
        right: Option<char>,
    },
}

impl Node {
    /// Spacing class; `None` for explicit spaces.
    pub fn class(&self) -> Option<Class> {
        match self {
            Node::Char { class, .. } => Some(*class),
            Node::Scripts { base, .. } => Some(
                base.as_deref()
                    .and_then(Node::class)
                    .unwrap_or(Class::Ord),
            ),
            Node::Op { .. } | Node::BigOp { .. } => Some(Class::Op),
            Node::Space(_) => None,
            _ => Some(Class::Ord),
        }
    }
}

const FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "arcsin", "arccos", "arctan", "log", "ln", "exp",
    "min", "max", "det", "deg",
];
const LIMIT_FUNCTIONS: &[&str] = &["lim"];

/// Symbol commands: name → (glyph, class, variant).
fn symbol(name: &str) -> Option<(char, Class, FontVariant)> {
    use Class::*;
    use FontVariant::*;
    let s = match name {
        "alpha" => ('\u{3b1}', Ord, Italic),
        "beta" => ('\u{3b2}', Ord, Italic),
        "gamma" => ('\u{3b3}', Ord, Italic),
        "delta" => ('\u{3b4}', Ord, Italic),
        "epsilon" | "varepsilon" => ('\u{3b5}', Ord, Italic),
        "theta" => ('\u{3b8}', Ord, Italic),
        "lambda" => ('\u{3bb}', Ord, Italic),
        "mu" => ('\u{3bc}', Ord, Italic),
        "pi" => ('\u{3c0}', Ord, Italic),
        "sigma" => ('\u{3c3}', Ord, Italic),
        "phi" | "varphi" => ('\u{3c6}', Ord, Italic),
        "omega" => ('\u{3c9}', Ord, Italic),
        "Delta" => ('\u{394}', Ord, Upright),
        "Theta" => ('\u{398}', Ord, Upright),
        "Sigma" => ('\u{3a3}', Ord, Upright),
        "Pi" => ('\u{3a0}', Ord, Upright),
        "Omega" => ('\u{3a9}', Ord, Upright),
        "times" => ('\u{d7}', Bin, Upright),
        "div" => ('\u{f7}', Bin, Upright),
        "cdot" => ('\u{b7}', Bin, Upright),
        "pm" => ('\u{b1}', Bin, Upright),
        "approx" => ('\u{2248}', Rel, Upright),
        "le" | "leq" => ('\u{2264}', Rel, Upright),
        "ge" | "geq" => ('\u{2265}', Rel, Upright),
        "ne" | "neq" => ('\u{2260}', Rel, Upright),
        "to" | "rightarrow" => ('\u{2192}', Rel, Upright),
        "perp" => ('\u{22a5}', Rel, Upright),
        "infty" => ('\u{221e}', Ord, Upright),
        "circ" | "degree" => ('\u{b0}', Ord, Upright),
        "angle" => ('\u{2220}', Ord, Upright),
        "prime" => ('\u{2032}', Ord, Upright),
        "%" => ('%', Ord, Upright),
        "{" | "lbrace" => ('{', Open, Upright),
        "}" | "rbrace" => ('}', Close, Upright),
        "vert" | "mid" => ('|', Ord, Upright),
        _ => return None,
    };
    Some(s)
}

fn spacing_command(name: &str) -> Option<f32> {
    Some(match name {
        "," => 0.167,
        ":" | ">" => 0.222,
        ";" => 0.278,
        "!" => -0.167,
        " " => 0.25,
        "quad" => 1.0,
        "qquad" => 2.0,
        _ => return None,
    })
}

/// Commands accepted and ignored (style switches; layout style is chosen by the caller).
const IGNORED: &[&str] = &[
    "displaystyle",
    "textstyle",
    "scriptstyle",
    "scriptscriptstyle",
    "limits",
    "nolimits",
];

fn char_atom(c: char) -> Option<Node> {
    use Class::*;
    let (ch, class, variant) = match c {
        'a'..='z' | 'A'..='Z' => (c, Ord, FontVariant::Italic),
        '0'..='9' | '.' => (c, Ord, FontVariant::Upright),
        '+' | '\u{d7}' | '\u{f7}' | '\u{b7}' | '\u{b1}' | '*' => (c, Bin, FontVariant::Upright),
        '-' | '\u{2212}' => ('\u{2212}', Bin, FontVariant::Upright),
        '=' | '<' | '>' | ':' | '\u{2248}' | '\u{2264}' | '\u{2265}' | '\u{2260}' | '\u{2192}' => {
            (c, Rel, FontVariant::Upright)
        }
        ',' | ';' => (c, Punct, FontVariant::Upright),
        '(' | '[' => (c, Open, FontVariant::Upright),
        ')' | ']' | '!' | '?' => (c, Close, FontVariant::Upright),
        '\'' => ('\u{2032}', Ord, FontVariant::Upright),
        '/' | '|' | '\u{b0}' | '\u{221e}' | '\u{2220}' | '%' | '"' => {
            (c, Ord, FontVariant::Upright)
        }
        c if ('\u{3b1}'..='\u{3c9}').contains(&c) => (c, Ord, FontVariant::Italic),
        c if ('\u{391}'..='\u{3a9}').contains(&c) => (c, Ord, FontVariant::Upright),
        _ => return None,
    };
    Some(Node::Char { ch, class, variant })
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Stop {
    Eof,
    Brace,
    Right,
}

struct Parser<'s> {
    src: &'s str,
    chars: Vec<char>,
    pos: usize,
}

/// Parse a math-mode fragment into a list of atoms.
pub fn parse(src: &str) -> Result<Vec<Node>, TexError> {
    let mut p = Parser {
        src,
        chars: src.chars().collect(),
        pos: 0,
    };
    p.parse_list(Stop::Eof)
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn unbalanced(&self) -> TexError {
        TexError::Unbalanced(self.src.to_string())
    }

    fn parse_list(&mut self, stop: Stop) -> Result<Vec<Node>, TexError> {
        let mut out: Vec<Node> = Vec::new();
        loop {
            self.skip_ws();
            let Some(c) = self.peek() else {
                return if stop == Stop::Eof {
                    Ok(out)
                } else {
                    Err(self.unbalanced())
                };
            };
            match c {
                '}' => {
                    self.pos += 1;
                    return if stop == Stop::Brace {
                        Ok(out)
                    } else {
                        Err(self.unbalanced())
                    };
                }
                '^' | '_' => {
                    self.pos += 1;
                    let arg = self.parse_arg()?;
                    let base = match out.pop() {
                        // Attach to the previous atom unless it was a space.
                        Some(Node::Space(w)) => {
                            out.push(Node::Space(w));
                            None
                        }
                        other => other,
                    };
                    out.push(attach_script(base, c == '^', arg)?);
                }
                '\u{b2}' | '\u{b3}' => {
                    self.pos += 1;
                    let digit = if c == '\u{b2}' { '2' } else { '3' };
                    let arg = Node::Char {
                        ch: digit,
                        class: Class::Ord,
                        variant: FontVariant::Upright,
                    };
                    let base = out.pop();
                    out.push(attach_script(base, true, arg)?);
                }
                '\\' if self.at_command("right") => {
                    return if stop == Stop::Right {
                        Ok(out)
                    } else {
                        Err(self.unbalanced())
                    };
                }
                _ => {
                    if let Some(node) = self.parse_atom()? {
                        out.push(node);
                    }
                }
            }
        }
    }

    fn at_command(&self, name: &str) -> bool {
        let rest: String = self.chars[self.pos..].iter().collect();
        rest.strip_prefix('\\')
            .and_then(|r| r.strip_prefix(name))
            .is_some_and(|r| !r.starts_with(|c: char| c.is_ascii_alphabetic()))
    }

    /// One argument: a braced group or a single token.
    fn parse_arg(&mut self) -> Result<Node, TexError> {
        self.skip_ws();
        match self.peek() {
            None | Some('}') => Err(TexError::MissingArgument(self.src.to_string())),
            Some('{') => {
                self.pos += 1;
                let list = self.parse_list(Stop::Brace)?;
                Ok(group(list))
            }
            Some(_) => self
                .parse_atom()?
                .ok_or_else(|| TexError::MissingArgument(self.src.to_string())),
        }
    }

    fn parse_atom(&mut self) -> Result<Option<Node>, TexError> {
        let Some(c) = self.bump() else {
            return Ok(None);
        };
        match c {
            '{' => Ok(Some(group(self.parse_list(Stop::Brace)?))),
            '\\' => self.parse_command(),
            '&' => Ok(None),
            '~' => Ok(Some(Node::Space(0.25))),
            c => char_atom(c)
                .map(Some)
                .ok_or(TexError::UnsupportedChar(c)),
        }
    }

    fn command_name(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        if self.pos == start {
            // Control symbol: a single non-letter.
            return self.bump().map(String::from).unwrap_or_default();
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_command(&mut self) -> Result<Option<Node>, TexError> {
        let name = self.command_name();
        if let Some(w) = spacing_command(&name) {
            return Ok(Some(Node::Space(w)));
        }
        if let Some((ch, class, variant)) = symbol(&name) {
            return Ok(Some(Node::Char { ch, class, variant }));
        }
        if FUNCTIONS.contains(&name.as_str()) || LIMIT_FUNCTIONS.contains(&name.as_str()) {
            let limits = LIMIT_FUNCTIONS.contains(&name.as_str());
            return Ok(Some(Node::Op { name, limits }));
        }
        if IGNORED.contains(&name.as_str()) {
            return Ok(None);
        }
        match name.as_str() {
            "frac" | "dfrac" | "tfrac" => {
                let num = self.parse_arg()?;
                let den = self.parse_arg()?;
                let style = match name.as_str() {
                    "dfrac" => Some(MathStyle::Display),
                    "tfrac" => Some(MathStyle::Text),
                    _ => None,
                };
                Ok(Some(Node::Frac {
                    num: Box::new(num),
                    den: Box::new(den),
                    style,
                }))
            }
            "sqrt" => {
                self.skip_ws();
                let index = if self.peek() == Some('[') {
                    self.pos += 1;
                    let mut inner = Vec::new();
                    loop {
                        self.skip_ws();
                        match self.peek() {
                            Some(']') => {
                                self.pos += 1;
                                break;
                            }
                            None => return Err(self.unbalanced()),
                            _ => {
                                if let Some(n) = self.parse_atom()? {
                                    inner.push(n);
                                }
                            }
                        }
                    }
                    Some(Box::new(group(inner)))
                } else {
                    None
                };
                let body = self.parse_arg()?;
                Ok(Some(Node::Sqrt {
                    index,
                    body: Box::new(body),
                }))
            }
            "text" | "mathrm" | "textrm" | "mathbf" | "textbf" | "operatorname" => {
                let text = self.raw_group()?;
                Ok(Some(if name == "operatorname" {
                    Node::Op {
                        name: text,
                        limits: false,
                    }
                } else {
                    Node::Text(text)
                }))
            }
            "mathit" => {
                // Italic letters are already the math default.
                self.parse_arg().map(Some)
            }
            "sum" => Ok(Some(Node::BigOp { ch: '\u{2211}' })),
            "left" => {
                let left = self.delimiter()?;
                let body = self.parse_list(Stop::Right)?;
                // Consume `\right`.
                self.pos += 1;
                let _ = self.command_name();
                let right = self.delimiter()?;
                Ok(Some(Node::Delimited { left, body, right }))
            }
            "right" => Err(self.unbalanced()),
            "\\" => Ok(Some(Node::Space(1.0))),
            "color" | "textcolor" => {
                // Colors are applied after rendering; drop the color argument.
                let _ = self.raw_group()?;
                Ok(None)
            }
            _ => Err(TexError::UnknownCommand(format!("\\{name}"))),
        }
    }

    /// The delimiter after `\left` / `\right`; `.` means none.
    fn delimiter(&mut self) -> Result<Option<char>, TexError> {
        self.skip_ws();
        match self.bump() {
            Some('.') => Ok(None),
            Some('\\') => {
                let name = self.command_name();
                match name.as_str() {
                    "{" | "lbrace" => Ok(Some('{')),
                    "}" | "rbrace" => Ok(Some('}')),
                    "vert" | "|" => Ok(Some('|')),
                    _ => Err(TexError::UnknownCommand(format!("\\{name}"))),
                }
            }
            Some(c @ ('(' | ')' | '[' | ']' | '|')) => Ok(Some(c)),
            Some(c) => Err(TexError::UnsupportedChar(c)),
            None => Err(TexError::MissingArgument(self.src.to_string())),
        }
    }

    /// The verbatim contents of a braced argument (nested braces kept).
    fn raw_group(&mut self) -> Result<String, TexError> {
        self.skip_ws();
        if self.bump() != Some('{') {
            return Err(TexError::MissingArgument(self.src.to_string()));
        }
        let mut depth = 1usize;
        let mut out = String::new();
        while let Some(c) = self.bump() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                }
                _ => {}
            }
            out.push(c);
        }
        Err(self.unbalanced())
    }
}

fn group(mut list: Vec<Node>) -> Node {
    if list.len() == 1 && !matches!(list[0], Node::Space(_)) {
        return list.remove(0);
    }
    Node::Group(list)
}

fn attach_script(base: Option<Node>, is_sup: bool, arg: Node) -> Result<Node, TexError> {
    match base {
        Some(Node::Scripts {
            base,
            mut sup,
            mut sub,
            sup_first,
        }) => {
            let slot = if is_sup { &mut sup } else { &mut sub };
            if slot.is_some() {
                return Err(TexError::DoubleScript(if is_sup { "^" } else { "_" }));
            }
            *slot = Some(Box::new(arg));
            Ok(Node::Scripts {
                base,
                sup,
                sub,
                sup_first,
            })
        }
        base => {
            let arg = Some(Box::new(arg));
            let (sup, sub) = if is_sup { (arg, None) } else { (None, arg) };
            Ok(Node::Scripts {
                base: base.map(Box::new),
                sup,
                sub,
                sup_first: is_sup,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(c: char) -> Option<char> {
        Some(c)
    }

    #[test]
    fn test_scripts_attach_to_previous_atom() {
        let nodes = parse("x^2_1").unwrap();
        assert_eq!(nodes.len(), 1);
        let Node::Scripts {
            base,
            sup,
            sub,
            sup_first,
        } = &nodes[0]
        else {
            panic!("expected scripts, got {:?}", nodes[0]);
        };
        assert!(matches!(base.as_deref(), Some(Node::Char { ch: 'x', .. })));
        assert!(sup.is_some() && sub.is_some());
        assert!(*sup_first);
    }

    #[test]
    fn test_empty_base_and_double_script() {
        let nodes = parse("^x").unwrap();
        assert!(matches!(&nodes[0], Node::Scripts { base: None, .. }));
        assert!(matches!(parse("x^2^3"), Err(TexError::DoubleScript("^"))));
    }

    #[test]
    fn test_minus_and_classes() {
        let nodes = parse("a - b = c").unwrap();
        let classes: Vec<_> = nodes.iter().filter_map(Node::class).collect();
        assert_eq!(
            classes,
            vec![Class::Ord, Class::Bin, Class::Ord, Class::Rel, Class::Ord]
        );
        assert!(matches!(nodes[1], Node::Char { ch: '\u{2212}', .. }));
    }

    #[test]
    fn test_frac_text_and_functions() {
        let nodes = parse(r"\tan(\alpha) = \frac{\text{opp}}{\text{adj}}").unwrap();
        assert!(matches!(&nodes[0], Node::Op { name, .. } if name == "tan"));
        let Node::Frac { num, den, style } = &nodes[nodes.len() - 1] else {
            panic!("expected a fraction");
        };
        assert_eq!(**num, Node::Text("opp".into()));
        assert_eq!(**den, Node::Text("adj".into()));
        assert_eq!(*style, None);
    }

    #[test]
    fn test_left_right() {
        let nodes = parse(r"\left( \frac{a}{b} \right)").unwrap();
        let Node::Delimited { left, body, right } = &nodes[0] else {
            panic!("expected delimited");
        };
        assert_eq!((*left, *right), (ch('('), ch(')')));
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_superscript_unicode() {
        let nodes = parse("x\u{b2}-6x+8").unwrap();
        assert!(matches!(&nodes[0], Node::Scripts { sup: Some(_), .. }));
    }

    #[test]
    fn test_errors_name_the_offender() {
        match parse(r"\foo x") {
            Err(TexError::UnknownCommand(name)) => assert_eq!(name, r"\foo"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse("{x"), Err(TexError::Unbalanced(_))));
        assert!(matches!(parse("x}"), Err(TexError::Unbalanced(_))));
        assert!(matches!(parse(r"\frac{1}"), Err(TexError::MissingArgument(_))));
    }

    #[test]
    fn test_sqrt_with_index_and_spaces() {
        let nodes = parse(r"\sqrt[3]{x}\,\quad y").unwrap();
        assert!(matches!(&nodes[0], Node::Sqrt { index: Some(_), .. }));
        assert_eq!(nodes[1], Node::Space(0.167));
        assert_eq!(nodes[2], Node::Space(1.0));
    }
}
