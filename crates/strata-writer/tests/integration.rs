use strata_writer::{AutoIndentWriter, NoIndentWriter, TemplateWriter, NO_WRAP};

fn render_list(out: &mut dyn TemplateWriter, items: &[&str], separator: &str, wrap: Option<&str>) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.write_separator(separator).unwrap();
        }
        out.write_token(item, wrap).unwrap();
    }
}

#[test]
fn test_indented_multi_line_substitution() {
    let mut out = AutoIndentWriter::new(String::new());
    out.push_indentation("  ");
    render_list(&mut out, &["Terence", "Jim", "Sriram"], "\n", None);
    out.pop_indentation();
    assert_eq!(out.into_inner(), "  Terence\n  Jim\n  Sriram");
}

#[test]
fn test_wrapped_list_with_separator() {
    let mut out = AutoIndentWriter::new(String::new()).with_line_width(12);
    out.write("data: ").unwrap();
    out.push_anchor_point();
    render_list(&mut out, &["1", "2", "3", "4", "5", "6", "7"], ", ", Some("\n"));
    out.pop_anchor_point();
    assert_eq!(out.into_inner(), "data: 1, 2, \n      3, 4, \n      5, 6, \n      7");
}

#[test]
fn test_line_width_can_be_reset() {
    let mut out = AutoIndentWriter::new(String::new()).with_line_width(3);
    out.set_line_width(NO_WRAP);
    render_list(&mut out, &["abc", "def"], "", Some("\n"));
    assert_eq!(out.into_inner(), "abcdef");
}

#[test]
fn test_writers_are_object_safe() {
    let mut writers: Vec<Box<dyn TemplateWriter>> = vec![
        Box::new(AutoIndentWriter::new(String::new())),
        Box::new(NoIndentWriter::new(String::new())),
    ];
    for out in writers.iter_mut() {
        out.push_indentation("  ");
        assert!(out.write("x").unwrap() >= 1);
        out.pop_indentation();
    }
}
