//! Pre-parsed template bodies.
//!
//! A template body arrives as a sequence of [`Chunk`]s produced by a front end
//! (for example a `<...>` or `$...$` delimiter parser). The engine never
//! re-tokenizes text; it only lowers chunks into its own node form when the
//! template is defined.
//!
//! The builder methods keep hand-written bodies readable:
//!
//! ```
//! use strata::chunk::{text, Expr, TemplateCall};
//!
//! // <<  $names:bold(); separator=", "$>>
//! let body = vec![
//!     text("  "),
//!     Expr::attr("names")
//!         .apply(TemplateCall::named("bold"))
//!         .separator(", ")
//!         .into(),
//! ];
//! assert_eq!(body.len(), 2);
//! ```

use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::template::{FormalArg, TemplateDef};

/// One element of a template body.
#[derive(Debug, Clone)]
pub enum Chunk {
    /// Literal text, possibly spanning several lines.
    Literal(String),
    /// An embedded expression and its options.
    Expr(ExprChunk),
    /// `if`/`elseif`/`else` block.
    If(Conditional),
    /// `@name()`, `@super.name()` or an embedded `@name ... @end` region.
    Region(RegionRef),
}

/// Creates a literal chunk.
pub fn text(s: impl Into<String>) -> Chunk {
    Chunk::Literal(s.into())
}

/// Creates a region reference chunk (`@name()`).
pub fn region(name: impl Into<String>) -> Chunk {
    Chunk::Region(RegionRef {
        name: name.into(),
        super_call: false,
        body: None,
    })
}

/// Creates a region chunk with a default body (`@name ... @end`).
pub fn embedded_region(name: impl Into<String>, body: Vec<Chunk>) -> Chunk {
    Chunk::Region(RegionRef {
        name: name.into(),
        super_call: false,
        body: Some(body),
    })
}

/// Creates a `@super.name()` chunk for use inside a region override.
pub fn super_region(name: impl Into<String>) -> Chunk {
    Chunk::Region(RegionRef {
        name: name.into(),
        super_call: true,
        body: None,
    })
}

/// Region reference inside a template body.
#[derive(Debug, Clone)]
pub struct RegionRef {
    pub name: String,
    pub super_call: bool,
    pub body: Option<Vec<Chunk>>,
}

/// An expression with its trailing `; option=value` list.
#[derive(Debug, Clone)]
pub struct ExprChunk {
    pub expr: Expr,
    pub options: Options,
}

/// Expression options. Option values are themselves expressions.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub separator: Option<Expr>,
    pub wrap: Option<Expr>,
    pub anchor: bool,
    pub null: Option<Expr>,
    pub format: Option<Expr>,
}

impl Options {
    pub fn is_empty(&self) -> bool {
        self.separator.is_none()
            && self.wrap.is_none()
            && !self.anchor
            && self.null.is_none()
            && self.format.is_none()
    }
}

impl ExprChunk {
    /// Sets `separator=`.
    pub fn separator(mut self, sep: impl Into<Expr>) -> Self {
        self.options.separator = Some(sep.into());
        self
    }

    /// Sets `wrap` with the default `"\n"` wrap string.
    pub fn wrap(self) -> Self {
        self.wrap_with("\n")
    }

    /// Sets `wrap=`.
    pub fn wrap_with(mut self, wrap: impl Into<Expr>) -> Self {
        self.options.wrap = Some(wrap.into());
        self
    }

    /// Sets `anchor`.
    pub fn anchor(mut self) -> Self {
        self.options.anchor = true;
        self
    }

    /// Sets `null=`.
    pub fn null(mut self, null: impl Into<Expr>) -> Self {
        self.options.null = Some(null.into());
        self
    }

    /// Sets `format=`.
    pub fn format(mut self, format: impl Into<Expr>) -> Self {
        self.options.format = Some(format.into());
        self
    }
}

impl From<Expr> for ExprChunk {
    fn from(expr: Expr) -> Self {
        ExprChunk {
            expr,
            options: Options::default(),
        }
    }
}

// Option setters on a bare expression start an `ExprChunk`.
macro_rules! forward_options {
    ($($name:ident($($arg:ident: $ty:ty),*)),* $(,)?) => {
        $(
            pub fn $name(self, $($arg: $ty),*) -> ExprChunk {
                ExprChunk::from(self).$name($($arg),*)
            }
        )*
    };
}

/// Conditional block: the first branch whose test is truthy renders.
#[derive(Debug, Clone)]
pub struct Conditional {
    pub branches: Vec<(Expr, Vec<Chunk>)>,
    pub otherwise: Option<Vec<Chunk>>,
}

impl Conditional {
    /// `<if(test)>body`
    pub fn new(test: Expr, body: Vec<Chunk>) -> Self {
        Self {
            branches: vec![(test, body)],
            otherwise: None,
        }
    }

    /// `<elseif(test)>body`
    pub fn elseif(mut self, test: Expr, body: Vec<Chunk>) -> Self {
        self.branches.push((test, body));
        self
    }

    /// `<else>body`
    pub fn otherwise(mut self, body: Vec<Chunk>) -> Self {
        self.otherwise = Some(body);
        self
    }
}

/// Built-in list operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    First,
    Rest,
    Last,
    Length,
    Strip,
    Trunc,
    Reverse,
}

/// Expressions.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Attribute reference.
    Attr(String),
    /// String literal.
    Str(String),
    /// `true` / `false`.
    Bool(bool),
    /// `expr.name`
    Property(Box<Expr>, String),
    /// `expr.(keyExpr)`
    IndirectProperty(Box<Expr>, Box<Expr>),
    /// `t(args)`, `super.t(args)`, `(nameExpr)(args)`
    Include(TemplateCall),
    /// `a:t()` (one target), `a:t(),u()` (round robin) or `a,b:{x,y|...}`
    /// (parallel). Chains nest: the target of `a:t():u()` is `a:t()`.
    Apply {
        targets: Vec<Expr>,
        templates: Vec<TemplateCall>,
    },
    /// `{args | body}` used as a value.
    Anonymous(Rc<AnonymousTemplate>),
    /// `["key":value, default:...]`
    Map(MapLiteral),
    /// `[a, b, ...]`
    Cat(Vec<Expr>),
    /// `first(x)`, `length(x)`, ...
    Op(Operator, Box<Expr>),
    /// `(expr)`: evaluate and render to a string.
    ToStr(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn attr(name: impl Into<String>) -> Self {
        Expr::Attr(name.into())
    }

    pub fn str(s: impl Into<String>) -> Self {
        Expr::Str(s.into())
    }

    /// `self.name`
    pub fn prop(self, name: impl Into<String>) -> Self {
        Expr::Property(Box::new(self), name.into())
    }

    /// `self.(key)`
    pub fn index(self, key: Expr) -> Self {
        Expr::IndirectProperty(Box::new(self), Box::new(key))
    }

    /// `t(...)` as an expression.
    pub fn include(call: TemplateCall) -> Self {
        Expr::Include(call)
    }

    /// `self:call`
    pub fn apply(self, call: TemplateCall) -> Self {
        Expr::Apply {
            targets: vec![self],
            templates: vec![call],
        }
    }

    /// `self:t1(),t2(),...` applying the templates round robin.
    pub fn apply_alternating(self, calls: Vec<TemplateCall>) -> Self {
        Expr::Apply {
            targets: vec![self],
            templates: calls,
        }
    }

    /// `a,b,c:call` walking the targets in lockstep.
    pub fn apply_parallel(targets: Vec<Expr>, call: TemplateCall) -> Self {
        Expr::Apply {
            targets,
            templates: vec![call],
        }
    }

    /// `{args | body}` as a value.
    pub fn anonymous<A: Into<FormalArg>>(
        args: impl IntoIterator<Item = A>,
        body: Vec<Chunk>,
    ) -> Self {
        Expr::Anonymous(Rc::new(AnonymousTemplate::new(args, body)))
    }

    pub fn op(op: Operator, arg: Expr) -> Self {
        Expr::Op(op, Box::new(arg))
    }

    pub fn cat(items: Vec<Expr>) -> Self {
        Expr::Cat(items)
    }

    pub fn to_str(self) -> Self {
        Expr::ToStr(Box::new(self))
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::Or(Box::new(self), Box::new(other))
    }

    forward_options! {
        separator(sep: impl Into<Expr>),
        wrap(),
        wrap_with(wrap: impl Into<Expr>),
        anchor(),
        null(null: impl Into<Expr>),
        format(format: impl Into<Expr>),
    }

    /// Calls `f` on every anonymous template reachable from this expression.
    pub(crate) fn for_each_anonymous(&self, f: &mut dyn FnMut(&AnonymousTemplate)) {
        match self {
            Expr::Attr(_) | Expr::Str(_) | Expr::Bool(_) => {}
            Expr::Property(e, _) | Expr::Op(_, e) | Expr::ToStr(e) | Expr::Not(e) => {
                e.for_each_anonymous(f)
            }
            Expr::IndirectProperty(a, b) | Expr::And(a, b) | Expr::Or(a, b) => {
                a.for_each_anonymous(f);
                b.for_each_anonymous(f);
            }
            Expr::Include(call) => call.for_each_anonymous(f),
            Expr::Apply { targets, templates } => {
                for target in targets {
                    target.for_each_anonymous(f);
                }
                for call in templates {
                    call.for_each_anonymous(f);
                }
            }
            Expr::Anonymous(anon) => f(anon),
            Expr::Map(map) => {
                for (_, value) in &map.entries {
                    value.for_each_anonymous(f);
                }
                if let Some(DefaultEntry::Value(value)) = &map.default {
                    value.for_each_anonymous(f);
                }
            }
            Expr::Cat(items) => {
                for item in items {
                    item.for_each_anonymous(f);
                }
            }
        }
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Str(s.to_string())
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Str(s)
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Bool(b)
    }
}

impl From<Expr> for Chunk {
    fn from(expr: Expr) -> Self {
        Chunk::Expr(ExprChunk::from(expr))
    }
}

impl From<ExprChunk> for Chunk {
    fn from(chunk: ExprChunk) -> Self {
        Chunk::Expr(chunk)
    }
}

impl From<Conditional> for Chunk {
    fn from(cond: Conditional) -> Self {
        Chunk::If(cond)
    }
}

/// Which template a call or application targets.
#[derive(Debug, Clone)]
pub enum TemplateRef {
    /// Looked up by name from the instantiating group.
    Named(String),
    /// Looked up from the super-group of the instantiating group.
    Super(String),
    /// The expression is rendered to a name at evaluation time.
    Indirect(Box<Expr>),
    /// Inline `{args | body}`.
    Anonymous(Rc<AnonymousTemplate>),
}

/// Arguments at a call site.
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub positional: Vec<Expr>,
    pub named: Vec<(String, Expr)>,
    /// `...`: copy caller-visible attributes matching the callee's formals.
    pub pass_through: bool,
}

impl Args {
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty() && !self.pass_through
    }
}

/// A template reference plus its arguments.
#[derive(Debug, Clone)]
pub struct TemplateCall {
    pub template: TemplateRef,
    pub args: Args,
}

impl TemplateCall {
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(TemplateRef::Named(name.into()))
    }

    pub fn super_call(name: impl Into<String>) -> Self {
        Self::new(TemplateRef::Super(name.into()))
    }

    pub fn indirect(name: Expr) -> Self {
        Self::new(TemplateRef::Indirect(Box::new(name)))
    }

    pub fn anonymous<A: Into<FormalArg>>(
        args: impl IntoIterator<Item = A>,
        body: Vec<Chunk>,
    ) -> Self {
        Self::new(TemplateRef::Anonymous(Rc::new(AnonymousTemplate::new(
            args, body,
        ))))
    }

    fn new(template: TemplateRef) -> Self {
        Self {
            template,
            args: Args::default(),
        }
    }

    /// Adds a positional argument.
    pub fn arg(mut self, value: impl Into<Expr>) -> Self {
        self.args.positional.push(value.into());
        self
    }

    /// Adds a keyword argument.
    pub fn named_arg(mut self, name: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.args.named.push((name.into(), value.into()));
        self
    }

    /// Marks the call with `...`.
    pub fn pass_through(mut self) -> Self {
        self.args.pass_through = true;
        self
    }

    fn for_each_anonymous(&self, f: &mut dyn FnMut(&AnonymousTemplate)) {
        match &self.template {
            TemplateRef::Indirect(e) => e.for_each_anonymous(f),
            TemplateRef::Anonymous(anon) => f(anon),
            TemplateRef::Named(_) | TemplateRef::Super(_) => {}
        }
        for e in &self.args.positional {
            e.for_each_anonymous(f);
        }
        for (_, e) in &self.args.named {
            e.for_each_anonymous(f);
        }
    }
}

/// An inline template literal.
///
/// The definition is compiled on first instantiation and cached, taking its
/// region owner from the template it appears in.
#[derive(Debug)]
pub struct AnonymousTemplate {
    pub args: Vec<FormalArg>,
    pub body: Vec<Chunk>,
    compiled: OnceCell<Rc<TemplateDef>>,
}

impl AnonymousTemplate {
    pub fn new<A: Into<FormalArg>>(args: impl IntoIterator<Item = A>, body: Vec<Chunk>) -> Self {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            body,
            compiled: OnceCell::new(),
        }
    }

    pub(crate) fn def(&self, region_owner: &str) -> Rc<TemplateDef> {
        self.compiled
            .get_or_init(|| {
                Rc::new(TemplateDef::anonymous(
                    self.args.clone(),
                    self.body.clone(),
                    region_owner,
                ))
            })
            .clone()
    }

    /// True for `{<(expr)>}`: a body made of one parenthesized expression.
    pub(crate) fn is_single_to_str(&self) -> bool {
        self.args.is_empty()
            && matches!(
                self.body.as_slice(),
                [Chunk::Expr(ExprChunk { expr: Expr::ToStr(_), options })] if options.is_empty()
            )
    }
}

/// `[...]` map literal.
#[derive(Debug, Clone, Default)]
pub struct MapLiteral {
    pub entries: Vec<(String, Expr)>,
    pub default: Option<DefaultEntry>,
}

impl MapLiteral {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, key: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// `default: key`
    pub fn default_key(mut self) -> Self {
        self.default = Some(DefaultEntry::Key);
        self
    }

    /// `default: value`
    pub fn default_value(mut self, value: impl Into<Expr>) -> Self {
        self.default = Some(DefaultEntry::Value(Box::new(value.into())));
        self
    }
}

/// The `default` entry of a map literal.
#[derive(Debug, Clone)]
pub enum DefaultEntry {
    /// `default: key` yields the looked-up key.
    Key,
    Value(Box<Expr>),
}

/// Shorthand for `Expr::op(Operator::First, e)` and friends.
pub mod ops {
    use super::{Expr, Operator};

    pub fn first(e: Expr) -> Expr {
        Expr::op(Operator::First, e)
    }

    pub fn rest(e: Expr) -> Expr {
        Expr::op(Operator::Rest, e)
    }

    pub fn last(e: Expr) -> Expr {
        Expr::op(Operator::Last, e)
    }

    pub fn length(e: Expr) -> Expr {
        Expr::op(Operator::Length, e)
    }

    pub fn strip(e: Expr) -> Expr {
        Expr::op(Operator::Strip, e)
    }

    pub fn trunc(e: Expr) -> Expr {
        Expr::op(Operator::Trunc, e)
    }

    pub fn reverse(e: Expr) -> Expr {
        Expr::op(Operator::Reverse, e)
    }
}
