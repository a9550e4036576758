use strata::chunk::{embedded_region, region, super_region, text, Expr, MapLiteral, TemplateCall};
use strata::{
    DefinitionError, Engine, ErrorBuffer, GroupId, Interface, RenderError, Scalar, TemplateDef,
    TemplateSignature,
};

fn bold(name: &str, open: &str, close: &str) -> TemplateDef {
    TemplateDef::with_args(name, ["x"], vec![text(open), Expr::attr("x").into(), text(close)])
}

/// `base` with `page(x) ::= "<bold(x)>"` and `bold`, plus an empty `sub`.
fn html_groups(buffer: &ErrorBuffer) -> (Engine, GroupId, GroupId) {
    let mut engine = Engine::new().with_listener(buffer.clone());
    let base = engine.define_group("base");
    let sub = engine.define_group("sub");
    engine.set_super_group(sub, base);
    engine.define_template(
        base,
        TemplateDef::with_args(
            "page",
            ["x"],
            vec![Expr::include(TemplateCall::named("bold").arg(Expr::attr("x"))).into()],
        ),
    );
    engine.define_template(base, bold("bold", "<b>", "</b>"));
    (engine, base, sub)
}

fn render_page(engine: &mut Engine, group: GroupId) -> Result<String, RenderError> {
    let page = engine.instance_of(group, "page")?;
    engine.set(page, "x", "hi")?;
    engine.render(page)
}

#[test]
fn test_subgroup_override_is_polymorphic() {
    let buffer = ErrorBuffer::new();
    let (mut engine, base, sub) = html_groups(&buffer);
    engine.define_template(sub, bold("bold", "**", "**"));

    assert_eq!(render_page(&mut engine, sub).unwrap(), "**hi**");
    assert_eq!(render_page(&mut engine, base).unwrap(), "<b>hi</b>");
    assert!(buffer.is_empty());
}

#[test]
fn test_super_call_reaches_base_definition() {
    let buffer = ErrorBuffer::new();
    let (mut engine, _base, sub) = html_groups(&buffer);
    engine.define_template(
        sub,
        TemplateDef::with_args(
            "bold",
            ["x"],
            vec![
                text("["),
                Expr::include(TemplateCall::super_call("bold").arg(Expr::attr("x"))).into(),
                text("]"),
            ],
        ),
    );
    assert_eq!(render_page(&mut engine, sub).unwrap(), "[<b>hi</b>]");
}

#[test]
fn test_super_call_in_three_level_chain() {
    let buffer = ErrorBuffer::new();
    let (mut engine, _base, mid) = html_groups(&buffer);
    let leaf = engine.define_group("leaf");
    engine.set_super_group(leaf, mid);
    engine.define_template(
        mid,
        TemplateDef::with_args(
            "bold",
            ["x"],
            vec![
                text("["),
                Expr::include(TemplateCall::super_call("bold").arg(Expr::attr("x"))).into(),
                text("]"),
            ],
        ),
    );
    assert_eq!(render_page(&mut engine, leaf).unwrap(), "[<b>hi</b>]");
    assert!(buffer.is_empty());
}

#[test]
fn test_super_body_dispatches_to_subgroup_overrides() {
    let buffer = ErrorBuffer::new();
    let (mut engine, _base, sub) = html_groups(&buffer);
    engine.define_template(
        sub,
        TemplateDef::with_args(
            "page",
            ["x"],
            vec![
                text("{"),
                Expr::include(TemplateCall::super_call("page").arg(Expr::attr("x"))).into(),
                text("}"),
            ],
        ),
    );
    engine.define_template(sub, bold("bold", "**", "**"));
    assert_eq!(render_page(&mut engine, sub).unwrap(), "{**hi**}");
}

#[test]
fn test_super_call_without_super_group() {
    let mut engine = Engine::new();
    let g = engine.define_group("base");
    engine.define_template(
        g,
        TemplateDef::new("t", vec![Expr::include(TemplateCall::super_call("t")).into()]),
    );
    let t = engine.instance_of(g, "t").unwrap();
    assert_eq!(
        engine.render(t).unwrap_err(),
        RenderError::NoSuperGroup {
            group: "base".into(),
            name: "t".into()
        }
    );
}

#[test]
fn test_lookup_falls_back_to_super_group() {
    let buffer = ErrorBuffer::new();
    let (mut engine, _base, sub) = html_groups(&buffer);
    assert_eq!(render_page(&mut engine, sub).unwrap(), "<b>hi</b>");
    assert!(matches!(
        engine.instance_of(sub, "nope"),
        Err(RenderError::NoSuchTemplate { name }) if name == "nope"
    ));
}

fn region_groups(buffer: &ErrorBuffer) -> (Engine, GroupId, GroupId) {
    let mut engine = Engine::new().with_listener(buffer.clone());
    let base = engine.define_group("base");
    let sub = engine.define_group("sub");
    engine.set_super_group(sub, base);
    engine.define_template(base, TemplateDef::new("a", vec![text("X"), region("r"), text("Y")]));
    (engine, base, sub)
}

fn render_a(engine: &mut Engine, group: GroupId) -> String {
    let a = engine.instance_of(group, "a").unwrap();
    engine.render(a).unwrap()
}

#[test]
fn test_implicit_region_is_empty() {
    let buffer = ErrorBuffer::new();
    let (mut engine, base, _) = region_groups(&buffer);
    assert_eq!(render_a(&mut engine, base), "XY");
}

#[test]
fn test_explicit_region_definition() {
    let buffer = ErrorBuffer::new();
    let (mut engine, base, _) = region_groups(&buffer);
    engine.define_region(base, "a", "r", vec![text("foo")]);
    assert_eq!(render_a(&mut engine, base), "XfooY");

    engine.define_region(base, "a", "r", vec![text("bar")]);
    assert_eq!(render_a(&mut engine, base), "XfooY");
    assert_eq!(
        buffer.errors(),
        vec![DefinitionError::RegionRedefinition {
            group: "base".into(),
            template: "a".into(),
            region: "r".into()
        }]
    );
}

#[test]
fn test_subgroup_region_wraps_super_region() {
    let buffer = ErrorBuffer::new();
    let (mut engine, base, sub) = region_groups(&buffer);
    engine.define_region(base, "a", "r", vec![text("foo")]);
    engine.define_region(sub, "a", "r", vec![text("A"), super_region("r"), text("B")]);

    assert_eq!(render_a(&mut engine, sub), "XAfooBY");
    assert_eq!(render_a(&mut engine, base), "XfooY");
    assert!(buffer.is_empty());
}

#[test]
fn test_super_region_in_three_level_chain() {
    let buffer = ErrorBuffer::new();
    let (mut engine, base, mid) = region_groups(&buffer);
    let leaf = engine.define_group("leaf");
    engine.set_super_group(leaf, mid);
    engine.define_region(base, "a", "r", vec![text("foo")]);
    engine.define_region(mid, "a", "r", vec![text("A"), super_region("r"), text("B")]);

    assert_eq!(render_a(&mut engine, leaf), "XAfooBY");
    assert_eq!(render_a(&mut engine, mid), "XAfooBY");
    assert!(buffer.is_empty());
}

#[test]
fn test_super_region_without_super_body() {
    let buffer = ErrorBuffer::new();
    let mut engine = Engine::new().with_listener(buffer.clone());
    let base = engine.define_group("base");
    let sub = engine.define_group("sub");
    engine.set_super_group(sub, base);
    engine.define_template(base, TemplateDef::new("a", vec![text("X"), region("r")]));
    engine.define_region(base, "a", "r", vec![super_region("r")]);

    let a = engine.instance_of(base, "a").unwrap();
    assert!(matches!(
        engine.render(a),
        Err(RenderError::NoSuperGroup { group, .. }) if group == "base"
    ));

    engine.define_region(sub, "a", "r", vec![text("<"), super_region("r"), text(">")]);
    let a = engine.instance_of(sub, "a").unwrap();
    assert!(engine.render(a).is_err());
}

#[test]
fn test_embedded_region_default_and_override() {
    let buffer = ErrorBuffer::new();
    let mut engine = Engine::new().with_listener(buffer.clone());
    let base = engine.define_group("base");
    let sub = engine.define_group("sub");
    engine.set_super_group(sub, base);
    engine.define_template(
        base,
        TemplateDef::new(
            "b",
            vec![text("X"), embedded_region("r", vec![text("default")]), text("Y")],
        ),
    );
    engine.define_region(sub, "b", "r", vec![text("sub")]);

    let b = engine.instance_of(base, "b").unwrap();
    assert_eq!(engine.render(b).unwrap(), "XdefaultY");
    let b = engine.instance_of(sub, "b").unwrap();
    assert_eq!(engine.render(b).unwrap(), "XsubY");
    assert!(buffer.is_empty());

    engine.define_region(base, "b", "r", vec![text("again")]);
    assert!(matches!(
        buffer.errors().as_slice(),
        [DefinitionError::RegionRedefinition { region, .. }] if region == "r"
    ));
}

#[test]
fn test_region_for_unknown_template_or_region() {
    let buffer = ErrorBuffer::new();
    let (mut engine, base, _) = region_groups(&buffer);
    engine.define_region(base, "a", "nope", vec![text("x")]);
    engine.define_region(base, "missing", "r", vec![text("x")]);
    assert_eq!(
        buffer.errors(),
        vec![
            DefinitionError::UnknownRegion {
                template: "a".into(),
                region: "nope".into()
            },
            DefinitionError::UnknownRegion {
                template: "missing".into(),
                region: "r".into()
            },
        ]
    );
    assert_eq!(render_a(&mut engine, base), "XY");
}

#[test]
fn test_region_sees_enclosing_attributes() {
    let mut engine = Engine::new();
    let g = engine.define_group("g");
    engine.define_template(
        g,
        TemplateDef::with_args("page", ["title"], vec![text("<"), region("head"), text(">")]),
    );
    engine.define_region(g, "page", "head", vec![Expr::attr("title").into()]);
    let page = engine.instance_of(g, "page").unwrap();
    engine.set(page, "title", "T").unwrap();
    assert_eq!(engine.render(page).unwrap(), "<T>");
}

#[test]
fn test_dictionaries_are_inherited() {
    let mut engine = Engine::new();
    let base = engine.define_group("base");
    let sub = engine.define_group("sub");
    engine.set_super_group(sub, base);
    engine.define_dictionary(base, "colors", MapLiteral::new().entry("ok", "green").default_value("gray"));
    engine.define_template(
        sub,
        TemplateDef::with_args(
            "status",
            ["s"],
            vec![Expr::attr("colors").index(Expr::attr("s")).into()],
        ),
    );
    for (s, expected) in [("ok", "green"), ("fail", "gray")] {
        let t = engine.instance_of(sub, "status").unwrap();
        engine.set(t, "s", s).unwrap();
        assert_eq!(engine.render(t).unwrap(), expected);
    }
}

#[test]
fn test_super_group_renderers_apply_to_subgroups() {
    let mut engine = Engine::new();
    let base = engine.define_group("base");
    let sub = engine.define_group("sub");
    engine.set_super_group(sub, base);
    engine.register_renderer::<bool>(base, |v: &Scalar, _: Option<&str>| -> strata::Result<String> {
        Ok(if v.to_string() == "true" { "yes" } else { "no" }.to_string())
    });
    engine.define_template(sub, TemplateDef::with_args("t", ["flag"], vec![Expr::attr("flag").into()]));
    let t = engine.instance_of(sub, "t").unwrap();
    engine.set(t, "flag", true).unwrap();
    assert_eq!(engine.render(t).unwrap(), "yes");
}

#[test]
fn test_interfaces() {
    let buffer = ErrorBuffer::new();
    let mut engine = Engine::new().with_listener(buffer.clone());
    let good = engine.define_group("good");
    let bad = engine.define_group("bad");
    let interface = Interface::new("Page")
        .template(TemplateSignature::new("page", ["title", "body"]))
        .template(TemplateSignature::new("footer", Vec::<String>::new()).optional());
    for g in [good, bad] {
        engine.register_interface(g, interface.clone());
    }
    engine.define_template(good, TemplateDef::with_args("page", ["title", "body"], vec![]));
    engine.define_template(bad, TemplateDef::with_args("page", ["body"], vec![]));

    assert!(engine.check_satisfies_interfaces(good));
    assert!(buffer.is_empty());

    assert!(!engine.check_satisfies_interfaces(bad));
    assert_eq!(
        buffer.errors(),
        vec![DefinitionError::MismatchedArguments {
            group: "bad".into(),
            interface: "Page".into(),
            template: "page".into(),
            expected: vec!["title".into(), "body".into()],
            found: vec!["body".into()],
        }]
    );
}

#[test]
fn test_interface_missing_template() {
    let buffer = ErrorBuffer::new();
    let mut engine = Engine::new().with_listener(buffer.clone());
    let g = engine.define_group("g");
    engine.register_interface(g, Interface::new("I").template(TemplateSignature::new("t", ["x"])));
    assert!(!engine.check_satisfies_interfaces(g));
    assert!(matches!(
        buffer.errors().as_slice(),
        [DefinitionError::MissingTemplate { template, .. }] if template == "t"
    ));
}

#[test]
fn test_redefinition_keeps_first() {
    let buffer = ErrorBuffer::new();
    let mut engine = Engine::new().with_listener(buffer.clone());
    let g = engine.define_group("g");
    engine.define_template(g, TemplateDef::new("t", vec![text("first")]));
    engine.define_template(g, TemplateDef::new("t", vec![text("second")]));

    let t = engine.instance_of(g, "t").unwrap();
    assert_eq!(engine.render(t).unwrap(), "first");
    assert_eq!(
        buffer.errors(),
        vec![DefinitionError::TemplateRedefinition {
            group: "g".into(),
            template: "t".into()
        }]
    );
}

#[test]
fn test_super_group_cycle_is_rejected() {
    let buffer = ErrorBuffer::new();
    let mut engine = Engine::new().with_listener(buffer.clone());
    let a = engine.define_group("a");
    let b = engine.define_group("b");
    engine.set_super_group(b, a);
    engine.set_super_group(a, b);

    assert_eq!(engine.group(a).unwrap().super_group(), None);
    assert_eq!(engine.group(b).unwrap().super_group(), Some(a));
    assert!(matches!(
        buffer.errors().as_slice(),
        [DefinitionError::SuperGroupCycle { .. }]
    ));
}
