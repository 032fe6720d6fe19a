use std::fs;

use guide_pdf::{
    guide_assembler, load_content, Block, ConfigurationError, DocumentAssembler, FontConfig,
    FontError, FontSource, LayoutError, ParagraphStyle, RenderConfig, RenderError, TableCell,
};

fn missing_fonts() -> FontConfig {
    FontConfig::new()
        .with_family("Sans", FontSource::single("/nonexistent/guide-pdf/NoSuchFont.ttf"))
        .with_search_dir("/nonexistent/guide-pdf")
}

#[test]
fn layout_error_writes_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.pdf");

    let mut doc = DocumentAssembler::new(RenderConfig::new(missing_fonts()));
    doc.append_table(
        vec![vec![TableCell::new("a")], vec![TableCell::new("b"), TableCell::new("c")]],
        vec![100.0],
        Vec::new(),
    );

    let err = doc.render(&output).unwrap_err();
    assert!(matches!(
        err,
        RenderError::Layout(LayoutError::RowWidthMismatch { block: 0, .. })
    ));
    assert!(!output.exists());
}

#[test]
fn missing_font_leaves_existing_output_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.pdf");
    fs::write(&output, b"previous").unwrap();

    let mut doc = DocumentAssembler::new(RenderConfig::new(missing_fonts()));
    let body = doc
        .register_style("Body", ParagraphStyle::new("Sans", 11))
        .unwrap();
    doc.append_paragraph("Hola", &body);

    match doc.render(&output) {
        Err(RenderError::Font(FontError::Missing { family, file, searched })) => {
            assert_eq!(family, "Sans");
            assert_eq!(file, "NoSuchFont.ttf");
            assert!(searched.len() >= 2);
        }
        other => panic!("expected a missing font error, got {other:?}"),
    }
    assert_eq!(fs::read(&output).unwrap(), b"previous");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn duplicate_style_is_rejected() {
    let mut doc = DocumentAssembler::new(RenderConfig::new(missing_fonts()));
    doc.register_style("Body", ParagraphStyle::new("Sans", 11))
        .unwrap();
    let err = doc
        .register_style("Body", ParagraphStyle::new("Sans", 12))
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::DuplicateStyle(name) if name == "Body"));
    assert_eq!(doc.style("Body").unwrap().style().font_size, 11);
}

#[test]
fn negative_spacer_fails_at_render() {
    let mut doc = DocumentAssembler::new(RenderConfig::new(missing_fonts()));
    doc.append_spacer(-4.0);
    assert!(matches!(
        doc.render_to_vec(),
        Err(RenderError::Layout(LayoutError::InvalidSpacer { block: 0, .. }))
    ));
}

#[test]
fn embedded_guide_validates_without_fonts() {
    let doc = guide_assembler(RenderConfig::new(FontConfig::guide_defaults())).unwrap();
    doc.validate().unwrap();

    assert_eq!(doc.blocks()[0], Block::Spacer(100.0));
    match &doc.blocks()[1] {
        Block::Paragraph(title) => {
            assert_eq!(title.text(), "GUIA COMPLETA DE MONETIZACION");
            assert_eq!(title.style().name(), "TitleStyle");
        }
        other => panic!("expected the title paragraph, got {other:?}"),
    }
    assert_eq!(doc.styles().len(), 11);
}

#[test]
fn guide_needs_both_families() {
    let fonts = FontConfig::new().with_family("SimHei", FontSource::single("SimHei.ttf"));
    let doc = guide_assembler(RenderConfig::new(fonts)).unwrap();
    assert!(matches!(
        doc.validate(),
        Err(RenderError::Configuration(ConfigurationError::UnknownFontFamily { family, .. }))
            if family == "Times New Roman"
    ));
}

#[test]
fn content_with_bad_table_rule_names_the_rule() {
    let mut doc = DocumentAssembler::new(RenderConfig::new(missing_fonts()));
    let err = load_content(
        r#"{
            "blocks": [
                { "type": "spacer", "height": "1cm" },
                { "type": "table", "column_widths": [100], "rows": [["a"]],
                  "rules": [["GRID", [0, 0], [-1, -1], 0.5], ["SHADOW", [0, 0], [0, 0]]] }
            ]
        }"#,
        &mut doc,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::InvalidTableRule { block: 1, rule: 1, .. }
    ));
}
