//! Rule expression AST.
//!
//! - `Expr`: the closed set of node kinds produced by the parser
//! - `BinaryOp` / `UnaryOp`: the fixed operator vocabulary
//! - `Property`: the scalar fields of the current bar
//!
//! Function and identifier names are kept as written so that the validator can
//! report vocabulary errors separately from syntax errors.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        function: String,
        args: Vec<Expr>,
    },
    Identifier(String),
    Literal(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Close,
    Open,
    High,
    Low,
    Volume,
    Price,
}

const NOT_PRECEDENCE: u8 = 3;
const ATOM_PRECEDENCE: u8 = 7;

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::Ne => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div => 6,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 4
    }
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "NOT",
        }
    }
}

impl Property {
    pub const ALL: [Property; 6] = [
        Property::Close,
        Property::Open,
        Property::High,
        Property::Low,
        Property::Volume,
        Property::Price,
    ];

    /// Case-sensitive lookup of a property name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Property::Close => "close",
            Property::Open => "open",
            Property::High => "high",
            Property::Low => "low",
            Property::Volume => "volume",
            Property::Price => "price",
        }
    }
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn call(function: impl Into<String>, period: f64) -> Self {
        Expr::Call {
            function: function.into(),
            args: vec![Expr::Literal(period)],
        }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Unary { .. } => NOT_PRECEDENCE,
            Expr::Call { .. } | Expr::Identifier(_) | Expr::Literal(_) => ATOM_PRECEDENCE,
        }
    }

    /// Visit this node and every descendant, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Call { args, .. } => args.iter().for_each(|a| a.walk(visit)),
            Expr::Identifier(_) | Expr::Literal(_) => {}
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, parenthesize: bool) -> fmt::Result {
    if parenthesize {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

/// Canonical rendering: minimal parentheses, re-parseable to the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Binary { op, left, right } => {
                let p = op.precedence();
                // Comparisons do not chain, so an equal-precedence left child needs parens too.
                let left_parens = left.precedence() < p || (op.is_comparison() && left.precedence() == p);
                write_operand(f, left, left_parens)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right, right.precedence() <= p)
            }
            Expr::Unary { op, operand } => {
                write!(f, "{} ", op.symbol())?;
                write_operand(f, operand, operand.precedence() < NOT_PRECEDENCE)
            }
            Expr::Call { function, args } => {
                write!(f, "{}(", function)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Identifier(name) => write!(f, "{}", name),
            Expr::Literal(v) => write!(f, "{}", v),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
