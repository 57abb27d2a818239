//! Table of the symbol commands understood by the parser.
//!
//! Each entry maps a command name (without the backslash) to the glyph it
//! displays as, a coarse class used by the MathML and MathJSON exporters, and
//! the MathJSON symbol or function name.

use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolClass {
    /// Letters and constants (`\alpha`, `\infty`)
    Identifier,
    /// Binary operators (`\times`, `\pm`)
    Operator,
    /// Relations (`\le`, `\in`, `\to`)
    Relation,
    /// `\sum`, `\int` and friends
    BigOperator,
    /// Named functions typeset upright (`\sin`, `\log`)
    Function,
    /// Delimiters usable after `\left` / `\right`
    Fence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub glyph: &'static str,
    pub class: SymbolClass,
    pub json: &'static str,
}

use SymbolClass::*;

#[rustfmt::skip]
const SYMBOLS: &[(&str, &str, SymbolClass, &str)] = &[
    ("alpha", "α", Identifier, "alpha"),
    ("beta", "β", Identifier, "beta"),
    ("gamma", "γ", Identifier, "gamma"),
    ("delta", "δ", Identifier, "delta"),
    ("epsilon", "ϵ", Identifier, "epsilon"),
    ("varepsilon", "ε", Identifier, "varepsilon"),
    ("zeta", "ζ", Identifier, "zeta"),
    ("eta", "η", Identifier, "eta"),
    ("theta", "θ", Identifier, "theta"),
    ("vartheta", "ϑ", Identifier, "vartheta"),
    ("iota", "ι", Identifier, "iota"),
    ("kappa", "κ", Identifier, "kappa"),
    ("lambda", "λ", Identifier, "lambda"),
    ("mu", "μ", Identifier, "mu"),
    ("nu", "ν", Identifier, "nu"),
    ("xi", "ξ", Identifier, "xi"),
    ("pi", "π", Identifier, "Pi"),
    ("rho", "ρ", Identifier, "rho"),
    ("sigma", "σ", Identifier, "sigma"),
    ("tau", "τ", Identifier, "tau"),
    ("upsilon", "υ", Identifier, "upsilon"),
    ("phi", "ϕ", Identifier, "phi"),
    ("varphi", "φ", Identifier, "varphi"),
    ("chi", "χ", Identifier, "chi"),
    ("psi", "ψ", Identifier, "psi"),
    ("omega", "ω", Identifier, "omega"),
    ("Gamma", "Γ", Identifier, "Gamma"),
    ("Delta", "Δ", Identifier, "Delta"),
    ("Theta", "Θ", Identifier, "Theta"),
    ("Lambda", "Λ", Identifier, "Lambda"),
    ("Xi", "Ξ", Identifier, "Xi"),
    ("Pi", "Π", Identifier, "CapitalPi"),
    ("Sigma", "Σ", Identifier, "Sigma"),
    ("Phi", "Φ", Identifier, "Phi"),
    ("Psi", "Ψ", Identifier, "Psi"),
    ("Omega", "Ω", Identifier, "Omega"),
    ("infty", "∞", Identifier, "PositiveInfinity"),
    ("partial", "∂", Identifier, "Partial"),
    ("nabla", "∇", Identifier, "Nabla"),
    ("ell", "ℓ", Identifier, "ell"),
    ("emptyset", "∅", Identifier, "EmptySet"),
    ("cdots", "⋯", Identifier, "ContinuationPlaceholder"),
    ("ldots", "…", Identifier, "ContinuationPlaceholder"),
    ("dots", "…", Identifier, "ContinuationPlaceholder"),
    ("times", "×", Operator, "Multiply"),
    ("cdot", "⋅", Operator, "Multiply"),
    ("ast", "∗", Operator, "Multiply"),
    ("div", "÷", Operator, "Divide"),
    ("pm", "±", Operator, "PlusMinus"),
    ("mp", "∓", Operator, "MinusPlus"),
    ("cup", "∪", Operator, "Union"),
    ("cap", "∩", Operator, "Intersection"),
    ("le", "≤", Relation, "LessEqual"),
    ("leq", "≤", Relation, "LessEqual"),
    ("ge", "≥", Relation, "GreaterEqual"),
    ("geq", "≥", Relation, "GreaterEqual"),
    ("ne", "≠", Relation, "NotEqual"),
    ("neq", "≠", Relation, "NotEqual"),
    ("approx", "≈", Relation, "Approx"),
    ("equiv", "≡", Relation, "Equivalent"),
    ("sim", "∼", Relation, "Similar"),
    ("in", "∈", Relation, "Element"),
    ("notin", "∉", Relation, "NotElement"),
    ("subset", "⊂", Relation, "Subset"),
    ("subseteq", "⊆", Relation, "SubsetEqual"),
    ("to", "→", Relation, "To"),
    ("rightarrow", "→", Relation, "To"),
    ("leftarrow", "←", Relation, "LeftArrow"),
    ("Rightarrow", "⇒", Relation, "Implies"),
    ("mapsto", "↦", Relation, "MapsTo"),
    ("sum", "∑", BigOperator, "Sum"),
    ("prod", "∏", BigOperator, "Product"),
    ("int", "∫", BigOperator, "Integrate"),
    ("oint", "∮", BigOperator, "ContourIntegral"),
    ("sin", "sin", Function, "Sin"),
    ("cos", "cos", Function, "Cos"),
    ("tan", "tan", Function, "Tan"),
    ("sec", "sec", Function, "Sec"),
    ("csc", "csc", Function, "Csc"),
    ("cot", "cot", Function, "Cot"),
    ("arcsin", "arcsin", Function, "Arcsin"),
    ("arccos", "arccos", Function, "Arccos"),
    ("arctan", "arctan", Function, "Arctan"),
    ("sinh", "sinh", Function, "Sinh"),
    ("cosh", "cosh", Function, "Cosh"),
    ("tanh", "tanh", Function, "Tanh"),
    ("log", "log", Function, "Log"),
    ("ln", "ln", Function, "Ln"),
    ("exp", "exp", Function, "Exp"),
    ("lim", "lim", Function, "Limit"),
    ("max", "max", Function, "Max"),
    ("min", "min", Function, "Min"),
    ("det", "det", Function, "Determinant"),
    ("gcd", "gcd", Function, "GCD"),
    ("langle", "⟨", Fence, "LeftAngle"),
    ("rangle", "⟩", Fence, "RightAngle"),
    ("lbrace", "{", Fence, "LeftBrace"),
    ("rbrace", "}", Fence, "RightBrace"),
    ("vert", "|", Fence, "Vert"),
    ("lvert", "|", Fence, "Vert"),
    ("rvert", "|", Fence, "Vert"),
    ("Vert", "‖", Fence, "DoubleVert"),
];

fn table() -> &'static HashMap<&'static str, Symbol> {
    static TABLE: OnceLock<HashMap<&'static str, Symbol>> = OnceLock::new();
    TABLE.get_or_init(|| {
        SYMBOLS
            .iter()
            .map(|&(name, glyph, class, json)| (name, Symbol { glyph, class, json }))
            .collect()
    })
}

/// Look up a symbol command by name, without the leading backslash.
pub fn symbol(name: &str) -> Option<Symbol> {
    table().get(name).copied()
}

/// Look up a symbol by the command spelling stored on an atom (`\alpha`).
pub fn symbol_for_command(latex: &str) -> Option<Symbol> {
    latex.strip_prefix('\\').and_then(symbol)
}

/// Commands that insert horizontal space, with their width in em.
pub fn spacing_width(name: &str) -> Option<f32> {
    match name {
        "," => Some(3.0 / 18.0),
        ":" | ">" => Some(4.0 / 18.0),
        ";" => Some(5.0 / 18.0),
        "!" => Some(-3.0 / 18.0),
        " " | "enspace" => Some(0.5),
        "quad" => Some(1.0),
        "qquad" => Some(2.0),
        _ => None,
    }
}

/// Characters that must be escaped with a backslash to be read as symbols.
pub fn is_escaped_symbol(name: &str) -> bool {
    matches!(name, "%" | "#" | "&" | "$" | "_" | "{" | "}")
}
