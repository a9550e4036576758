//! Template definitions and their lowered node form.
//!
//! Chunks are lowered once, when a [`TemplateDef`] is built: literal text is
//! split at newlines and whitespace that starts a line directly before an
//! expression becomes that expression's indentation. The interpreter only
//! ever walks [`Node`]s.

use crate::chunk::{Chunk, Expr, ExprChunk};
use crate::engine::GroupId;

/// Synthesized name under which a region body is stored in a group.
pub fn region_name(template: &str, region: &str) -> String {
    format!("region__{}__{}", template, region)
}

/// A declared formal argument with an optional default expression.
#[derive(Debug, Clone)]
pub struct FormalArg {
    pub name: String,
    pub default: Option<Expr>,
}

impl FormalArg {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// An argument whose value is computed on first read when unset.
    pub fn with_default(name: impl Into<String>, default: impl Into<Expr>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

impl From<&str> for FormalArg {
    fn from(name: &str) -> Self {
        FormalArg::new(name)
    }
}

impl From<String> for FormalArg {
    fn from(name: String) -> Self {
        FormalArg::new(name)
    }
}

/// How a region body came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Placeholder for `@r()` with no body anywhere yet.
    Implicit,
    /// Default body written inline as `@r ... @end`.
    Embedded,
    /// Defined with [`Engine::define_region`](crate::Engine::define_region).
    Explicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DefKind {
    Template,
    Region(RegionKind),
    Anonymous,
}

/// Lowered template body.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Text(String),
    Newline,
    Expr {
        chunk: ExprChunk,
        indent: Option<String>,
    },
    If {
        branches: Vec<(Expr, Vec<Node>)>,
        otherwise: Vec<Node>,
        indent: Option<String>,
    },
    Region {
        name: String,
        super_call: bool,
        indent: Option<String>,
    },
}

/// A named template: formal arguments plus a body.
///
/// A definition built with [`TemplateDef::new`] declares no arguments and
/// accepts any attribute name. [`TemplateDef::with_args`] declares a fixed
/// list; setting anything else on its instances is an error.
#[derive(Debug)]
pub struct TemplateDef {
    name: String,
    formal_args: Option<Vec<FormalArg>>,
    chunks: Vec<Chunk>,
    nodes: Vec<Node>,
    regions: Vec<String>,
    region_owner: String,
    owning_group: Option<GroupId>,
    kind: DefKind,
}

impl TemplateDef {
    pub fn new(name: impl Into<String>, chunks: Vec<Chunk>) -> Self {
        let name = name.into();
        Self::build(name.clone(), None, chunks, name, DefKind::Template)
    }

    pub fn with_args<A: Into<FormalArg>>(
        name: impl Into<String>,
        args: impl IntoIterator<Item = A>,
        chunks: Vec<Chunk>,
    ) -> Self {
        let name = name.into();
        let args = args.into_iter().map(Into::into).collect();
        Self::build(name.clone(), Some(args), chunks, name, DefKind::Template)
    }

    pub(crate) fn anonymous(args: Vec<FormalArg>, chunks: Vec<Chunk>, region_owner: &str) -> Self {
        Self::build(
            "anonymous".to_string(),
            Some(args),
            chunks,
            region_owner.to_string(),
            DefKind::Anonymous,
        )
    }

    pub(crate) fn region(template: &str, region: &str, chunks: Vec<Chunk>, kind: RegionKind) -> Self {
        Self::build(
            region_name(template, region),
            Some(Vec::new()),
            chunks,
            template.to_string(),
            DefKind::Region(kind),
        )
    }

    fn build(
        name: String,
        formal_args: Option<Vec<FormalArg>>,
        chunks: Vec<Chunk>,
        region_owner: String,
        kind: DefKind,
    ) -> Self {
        let nodes = lower(&chunks, true);
        let regions = collect_regions(&chunks)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        Self {
            name,
            formal_args,
            chunks,
            nodes,
            regions,
            region_owner,
            owning_group: None,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared arguments, or `None` when the template declares none.
    pub fn formal_args(&self) -> Option<&[FormalArg]> {
        self.formal_args.as_deref()
    }

    pub fn arg_names(&self) -> Vec<String> {
        self.formal_args
            .iter()
            .flatten()
            .map(|arg| arg.name.clone())
            .collect()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Names of the regions this body declares, in order of appearance.
    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// The group the definition was added to. Anonymous templates have none.
    pub fn owning_group(&self) -> Option<GroupId> {
        self.owning_group
    }

    pub fn region_kind(&self) -> Option<RegionKind> {
        match self.kind {
            DefKind::Region(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.kind == DefKind::Anonymous
    }

    pub(crate) fn formal_arg(&self, name: &str) -> Option<&FormalArg> {
        self.formal_args
            .as_ref()
            .and_then(|args| args.iter().find(|arg| arg.name == name))
    }

    /// True when the template accepts `name` as an attribute.
    pub(crate) fn accepts(&self, name: &str) -> bool {
        match &self.formal_args {
            Some(args) => args.iter().any(|arg| arg.name == name),
            None => true,
        }
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn region_owner(&self) -> &str {
        &self.region_owner
    }

    pub(crate) fn set_owning_group(&mut self, group: GroupId) {
        self.owning_group = Some(group);
    }
}

/// Regions referenced by a body, including those inside conditionals and
/// inline templates. `@super.r()` references are not declarations.
pub(crate) fn collect_regions(chunks: &[Chunk]) -> Vec<(String, Option<Vec<Chunk>>)> {
    let mut found = Vec::new();
    walk_regions(chunks, &mut found);
    found
}

fn walk_regions(chunks: &[Chunk], found: &mut Vec<(String, Option<Vec<Chunk>>)>) {
    for chunk in chunks {
        match chunk {
            Chunk::Literal(_) => {}
            Chunk::Region(r) if !r.super_call => {
                if !found.iter().any(|(name, _)| *name == r.name) {
                    found.push((r.name.clone(), r.body.clone()));
                }
            }
            Chunk::Region(_) => {}
            Chunk::Expr(e) => e.expr.for_each_anonymous(&mut |anon| walk_regions(&anon.body, found)),
            Chunk::If(cond) => {
                for (test, body) in &cond.branches {
                    test.for_each_anonymous(&mut |anon| walk_regions(&anon.body, found));
                    walk_regions(body, found);
                }
                if let Some(body) = &cond.otherwise {
                    walk_regions(body, found);
                }
            }
        }
    }
}

struct Lowering {
    nodes: Vec<Node>,
    line_start: bool,
    pending_indent: Option<String>,
}

impl Lowering {
    fn new(line_start: bool) -> Self {
        Self {
            nodes: Vec::new(),
            line_start,
            pending_indent: None,
        }
    }

    fn chunks(&mut self, chunks: &[Chunk]) {
        let mut literal = String::new();
        for chunk in chunks {
            if let Chunk::Literal(text) = chunk {
                literal.push_str(text);
                continue;
            }
            if !literal.is_empty() {
                self.text(&literal);
                literal.clear();
            }
            match chunk {
                Chunk::Literal(_) => {}
                Chunk::Expr(e) => {
                    let indent = self.take_indent();
                    self.nodes.push(Node::Expr {
                        chunk: e.clone(),
                        indent,
                    });
                }
                Chunk::Region(r) => {
                    let indent = self.take_indent();
                    self.nodes.push(Node::Region {
                        name: r.name.clone(),
                        super_call: r.super_call,
                        indent,
                    });
                }
                Chunk::If(cond) => {
                    let body_at_line_start = self.line_start && self.pending_indent.is_none();
                    let indent = self.take_indent();
                    let branches = cond
                        .branches
                        .iter()
                        .map(|(test, body)| (test.clone(), lower(body, body_at_line_start)))
                        .collect();
                    let otherwise = cond
                        .otherwise
                        .as_deref()
                        .map(|body| lower(body, body_at_line_start))
                        .unwrap_or_default();
                    self.nodes.push(Node::If {
                        branches,
                        otherwise,
                        indent,
                    });
                }
            }
        }
        if !literal.is_empty() {
            self.text(&literal);
        }
    }

    fn text(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n");
        for (i, segment) in text.split('\n').enumerate() {
            if i > 0 {
                self.flush_indent();
                self.nodes.push(Node::Newline);
                self.line_start = true;
            }
            if segment.is_empty() {
                continue;
            }
            self.flush_indent();
            if self.line_start && segment.chars().all(|c| c == ' ' || c == '\t') {
                self.pending_indent = Some(segment.to_string());
            } else {
                self.nodes.push(Node::Text(segment.to_string()));
                self.line_start = false;
            }
        }
    }

    fn take_indent(&mut self) -> Option<String> {
        self.line_start = false;
        self.pending_indent.take()
    }

    fn flush_indent(&mut self) {
        if let Some(ws) = self.pending_indent.take() {
            self.nodes.push(Node::Text(ws));
            self.line_start = false;
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush_indent();
        self.nodes
    }
}

fn lower(chunks: &[Chunk], line_start: bool) -> Vec<Node> {
    let mut lowering = Lowering::new(line_start);
    lowering.chunks(chunks);
    lowering.finish()
}
