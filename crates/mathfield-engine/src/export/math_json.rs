//! MathJSON serialization.
//!
//! Atoms are first flattened into a stream of [`Item`]s (operands, operators,
//! function heads and fences), which a small precedence-climbing parser then
//! folds into an expression:
//!
//! | precedence | operators |
//! |---|---|
//! | 0 | `,` |
//! | 1 | `=` `<` `>` and relation commands |
//! | 2 | `+` `-` `\pm` `\mp` `\cup` `\cap` |
//! | 3 | `*` `/` `\times` `\cdot` `\div` |
//!
//! Adjacent operands multiply. `Add`, `Multiply` and `Sequence` are
//! flattened, other operators nest to the left.

use serde_json::{Number, Value, json};

use crate::models::{AtomId, AtomKind, AtomTree, Branch, ParseMode};
use crate::parsing::symbols::{SymbolClass, symbol_for_command};

const NOTHING: &str = "Nothing";

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Operand(Value),
    Op { name: &'static str, precedence: u8 },
    Function(&'static str),
    Open,
    Close,
}

/// MathJSON for a run of atoms. An empty run is `"Nothing"`, several
/// unrelated expressions become a `Sequence`.
pub fn to_math_json(tree: &AtomTree, atoms: &[AtomId]) -> Value {
    let items = Flattener { tree }.items(atoms);
    let mut parser = ItemParser { items, i: 0 };
    let mut expressions = Vec::new();
    while !parser.eof() {
        match parser.expression(0) {
            Some(expression) => expressions.push(expression),
            // A fence closing nothing
            None => parser.i += 1,
        }
    }
    match expressions.len() {
        0 => Value::from(NOTHING),
        1 => expressions.remove(0),
        _ => {
            let mut sequence = vec![Value::from("Sequence")];
            sequence.extend(expressions);
            Value::Array(sequence)
        }
    }
}

fn number(digits: &str) -> Value {
    if digits.contains('.') {
        digits
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or_else(|| Value::from(digits), Value::Number)
    } else {
        digits
            .parse::<i64>()
            .map_or_else(|_| Value::from(digits), Value::from)
    }
}

fn is_numeric(value: &str) -> bool {
    value == "." || (value.len() == 1 && value.chars().all(|c| c.is_ascii_digit()))
}

fn operator(value: &str) -> Option<(&'static str, u8)> {
    Some(match value {
        "," => ("Sequence", 0),
        "=" => ("Equal", 1),
        "<" => ("Less", 1),
        ">" => ("Greater", 1),
        "+" => ("Add", 2),
        "-" | "−" => ("Subtract", 2),
        "*" => ("Multiply", 3),
        "/" => ("Divide", 3),
        _ => return None,
    })
}

fn operator_precedence(name: &str) -> u8 {
    match name {
        "Multiply" | "Divide" => 3,
        _ => 2,
    }
}

struct Flattener<'t> {
    tree: &'t AtomTree,
}

impl Flattener<'_> {
    fn items(&self, atoms: &[AtomId]) -> Vec<Item> {
        let atoms: Vec<AtomId> = atoms
            .iter()
            .copied()
            .filter(|&id| self.tree.kind(id) != Some(AtomKind::First))
            .collect();
        let mut items = Vec::new();
        let mut i = 0;
        while i < atoms.len() {
            let id = atoms[i];
            let Some(atom) = self.tree.get(id) else {
                i += 1;
                continue;
            };
            match (atom.kind, atom.mode) {
                (AtomKind::Literal, _) if is_numeric(&atom.value) => {
                    // A run of digits ends at the first atom carrying scripts
                    let mut digits = String::new();
                    let mut last = id;
                    while let Some(&next) = atoms.get(i) {
                        let Some(a) = self.tree.get(next) else { break };
                        if a.kind != AtomKind::Literal || !is_numeric(&a.value) || (!digits.is_empty() && self.has_scripts(last)) {
                            break;
                        }
                        digits.push_str(&a.value);
                        last = next;
                        i += 1;
                    }
                    items.push(Item::Operand(self.with_scripts(last, number(&digits))));
                    continue;
                }
                (AtomKind::Text, Some(ParseMode::Text)) | (AtomKind::Latex, Some(ParseMode::Latex)) => {
                    let kind = atom.kind;
                    let mut run = String::new();
                    while let Some(a) = atoms.get(i).and_then(|&next| self.tree.get(next)) {
                        if a.kind != kind {
                            break;
                        }
                        run.push_str(&a.value);
                        i += 1;
                    }
                    items.push(Item::Operand(Value::from(format!("'{run}'"))));
                    continue;
                }
                _ => {}
            }
            if let Some(item) = self.item(id) {
                items.push(item);
            }
            i += 1;
        }
        items
    }

    fn has_scripts(&self, id: AtomId) -> bool {
        self.tree
            .get(id)
            .is_some_and(|a| a.has_branch(Branch::Superscript) || a.has_branch(Branch::Subscript))
    }

    fn item(&self, id: AtomId) -> Option<Item> {
        let atom = self.tree.get(id)?;
        let item = match atom.kind {
            AtomKind::Root | AtomKind::First | AtomKind::Space => return None,
            AtomKind::Literal => match atom.value.as_str() {
                "" => return None,
                "(" | "[" => Item::Open,
                ")" | "]" => Item::Close,
                value => match operator(value) {
                    Some((name, precedence)) => Item::Op { name, precedence },
                    None => Item::Operand(Value::from(value)),
                },
            },
            AtomKind::Command => match symbol_for_command(&atom.value) {
                Some(symbol) => match symbol.class {
                    SymbolClass::Identifier | SymbolClass::Fence => Item::Operand(Value::from(symbol.json)),
                    SymbolClass::Operator => Item::Op {
                        name: symbol.json,
                        precedence: operator_precedence(symbol.json),
                    },
                    SymbolClass::Relation => Item::Op {
                        name: symbol.json,
                        precedence: 1,
                    },
                    SymbolClass::BigOperator | SymbolClass::Function => Item::Function(symbol.json),
                },
                None => Item::Operand(Value::from(atom.value.as_str())),
            },
            AtomKind::Text | AtomKind::Latex => Item::Operand(Value::from(format!("'{}'", atom.value))),
            AtomKind::Group => Item::Operand(self.branch(id, Branch::Body)),
            AtomKind::Fraction => Item::Operand(json!([
                "Divide",
                self.branch(id, Branch::Numerator),
                self.branch(id, Branch::Denominator)
            ])),
            AtomKind::Surd => {
                let body = self.branch(id, Branch::Body);
                if self.tree.is_empty_mathlist(self.tree.children(id, Branch::Index)) {
                    Item::Operand(json!(["Sqrt", body]))
                } else {
                    Item::Operand(json!(["Root", body, self.branch(id, Branch::Index)]))
                }
            }
            AtomKind::Subsup | AtomKind::Placeholder => Item::Operand(Value::from(NOTHING)),
            AtomKind::Error => Item::Operand(json!(["Error", format!("'{}'", atom.value)])),
        };

        if !self.has_scripts(id) {
            return Some(item);
        }
        let base = match item {
            Item::Operand(value) => value,
            Item::Op { name, .. } | Item::Function(name) => Value::from(name),
            Item::Open | Item::Close => Value::from(atom.value.as_str()),
        };
        Some(Item::Operand(self.with_scripts(id, base)))
    }

    fn branch(&self, id: AtomId, branch: Branch) -> Value {
        to_math_json(self.tree, self.tree.children(id, branch))
    }

    fn with_scripts(&self, id: AtomId, base: Value) -> Value {
        let Some(atom) = self.tree.get(id) else {
            return base;
        };
        let mut value = base;
        if atom.has_branch(Branch::Subscript) {
            value = json!(["Subscript", value, self.branch(id, Branch::Subscript)]);
        }
        if atom.has_branch(Branch::Superscript) {
            value = json!(["Power", value, self.branch(id, Branch::Superscript)]);
        }
        value
    }
}

struct ItemParser {
    items: Vec<Item>,
    i: usize,
}

impl ItemParser {
    fn eof(&self) -> bool {
        self.i >= self.items.len()
    }

    fn peek(&self) -> Option<&Item> {
        self.items.get(self.i)
    }

    fn expression(&mut self, min_precedence: u8) -> Option<Value> {
        let mut lhs = self.unary()?;
        while let Some(&Item::Op { name, precedence }) = self.peek() {
            if precedence < min_precedence {
                break;
            }
            self.i += 1;
            let rhs = self.expression(precedence + 1).unwrap_or_else(|| Value::from(NOTHING));
            lhs = combine(name, lhs, rhs);
        }
        Some(lhs)
    }

    fn unary(&mut self) -> Option<Value> {
        match self.peek()? {
            Item::Op { name: "Subtract", .. } => {
                self.i += 1;
                let operand = self.term().unwrap_or_else(|| Value::from(NOTHING));
                Some(json!(["Negate", operand]))
            }
            Item::Op { name: "Add", .. } => {
                self.i += 1;
                self.term()
            }
            // Missing left operand
            Item::Op { .. } => Some(Value::from(NOTHING)),
            _ => self.term(),
        }
    }

    /// Adjacent primaries, multiplied.
    fn term(&mut self) -> Option<Value> {
        let mut factors = vec![self.primary()?];
        while matches!(self.peek(), Some(Item::Operand(_) | Item::Open | Item::Function(_))) {
            match self.primary() {
                Some(factor) => factors.push(factor),
                None => break,
            }
        }
        factors.into_iter().reduce(|lhs, rhs| combine("Multiply", lhs, rhs))
    }

    fn primary(&mut self) -> Option<Value> {
        match self.peek()?.clone() {
            Item::Operand(value) => {
                self.i += 1;
                Some(value)
            }
            Item::Open => {
                self.i += 1;
                let inner = self.expression(0).unwrap_or_else(|| Value::from(NOTHING));
                if self.peek() == Some(&Item::Close) {
                    self.i += 1;
                }
                Some(json!(["Delimiter", inner]))
            }
            Item::Function(name) => {
                self.i += 1;
                let argument = match self.peek() {
                    Some(Item::Operand(_) | Item::Open) => self.primary(),
                    _ => None,
                };
                Some(match argument {
                    Some(argument) => json!([name, undelimit(argument)]),
                    None => Value::from(name),
                })
            }
            Item::Op { .. } | Item::Close => None,
        }
    }
}

/// `["Delimiter", x]` to `x`.
fn undelimit(value: Value) -> Value {
    match value {
        Value::Array(mut parts) if parts.len() == 2 && parts[0] == "Delimiter" => parts.remove(1),
        other => other,
    }
}

fn combine(name: &str, lhs: Value, rhs: Value) -> Value {
    let flattens = matches!(name, "Add" | "Multiply" | "Sequence");
    match lhs {
        Value::Array(mut parts) if flattens && parts.first().is_some_and(|head| head == name) => {
            parts.push(rhs);
            Value::Array(parts)
        }
        lhs => json!([name, lhs, rhs]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::Model;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn convert(latex: &str) -> Value {
        let model = Model::from_latex(latex);
        let atoms = model.get_atoms(&model.whole_range(), false);
        to_math_json(model.tree(), &atoms)
    }

    #[rstest]
    #[case("", json!("Nothing"))]
    #[case("42", json!(42))]
    #[case("12.5", json!(12.5))]
    #[case("x", json!("x"))]
    #[case("\\pi", json!("Pi"))]
    #[case("\\frac{1}{2}", json!(["Divide", 1, 2]))]
    #[case("\\sqrt{x}", json!(["Sqrt", "x"]))]
    #[case("\\sqrt[3]{x}", json!(["Root", "x", 3]))]
    #[case("x^2", json!(["Power", "x", 2]))]
    #[case("x_1", json!(["Subscript", "x", 1]))]
    #[case("x_i^2", json!(["Power", ["Subscript", "x", "i"], 2]))]
    #[case("2^{10}", json!(["Power", 2, 10]))]
    #[case("2x", json!(["Multiply", 2, "x"]))]
    #[case("-x", json!(["Negate", "x"]))]
    #[case("a+b+c", json!(["Add", "a", "b", "c"]))]
    #[case("a-b", json!(["Subtract", "a", "b"]))]
    #[case("x^2+1", json!(["Add", ["Power", "x", 2], 1]))]
    #[case("a=b+c\\times d", json!(["Equal", "a", ["Add", "b", ["Multiply", "c", "d"]]]))]
    #[case("(x+1)", json!(["Delimiter", ["Add", "x", 1]]))]
    #[case("\\sin(x)", json!(["Sin", "x"]))]
    #[case("\\pi r^2", json!(["Multiply", "Pi", ["Power", "r", 2]]))]
    #[case("x\\le 1", json!(["LessEqual", "x", 1]))]
    #[case("\\text{hi}", json!("'hi'"))]
    #[case("\\placeholder{}", json!("Nothing"))]
    fn converts(#[case] latex: &str, #[case] expected: Value) {
        assert_eq!(convert(latex), expected);
    }

    #[test]
    fn unknown_command_is_an_error_expression() {
        assert_eq!(convert("\\foo"), json!(["Error", "'\\foo'"]));
    }

    #[test]
    fn missing_operand_is_nothing() {
        assert_eq!(convert("=1"), json!(["Equal", "Nothing", 1]));
        assert_eq!(convert("1+"), json!(["Add", 1, "Nothing"]));
    }

    #[test]
    fn stray_close_is_skipped() {
        assert_eq!(convert("x)y"), json!(["Sequence", "x", "y"]));
    }
}
