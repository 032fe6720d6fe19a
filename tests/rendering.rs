use guide_pdf::{
    CellRegion, Color, DocumentAssembler, FontConfig, FontSource, LineSpec, Metadata, ParagraphStyle,
    RenderConfig, TableAttribute, TableCell, TableRule,
};
use lopdf::{Document, Object};
use sha2::{Digest, Sha256};

const SANS_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

/// A single-family configuration, or `None` when the font file cannot be found.
fn test_fonts() -> Option<FontConfig> {
    let fonts = FontConfig::new().with_family("Sans", FontSource::single(SANS_PATH));
    fonts.is_available().then_some(fonts)
}

fn skip(test: &str) {
    eprintln!(
        "Skipping {test}: DejaVuSans.ttf not found. Install it or set GUIDE_PDF_FONTS_DIR to a directory containing it."
    );
}

fn sample_assembler(fonts: FontConfig) -> DocumentAssembler {
    let config = RenderConfig::new(fonts).with_metadata(Metadata {
        title: "Guía de prueba".to_owned(),
        author: "Z.ai".to_owned(),
        creator: "Z.ai".to_owned(),
        subject: "Pruebas".to_owned(),
        producer: None,
    });
    let mut doc = DocumentAssembler::new(config);
    let heading = doc
        .register_style(
            "Heading",
            ParagraphStyle::new("Sans", 18)
                .with_leading(24.0)
                .with_text_color(Color::parse("#6366f1").unwrap())
                .with_outline(true),
        )
        .unwrap();
    let body = doc
        .register_style("Body", ParagraphStyle::new("Sans", 11).with_leading(18.0))
        .unwrap();

    doc.append_paragraph("Hello, <b>PDF</b>!", &heading)
        .append_spacer(12.0)
        .append_paragraph("Texto con <i>cursiva</i> y acentos: monetización.", &body)
        .append_table(
            vec![
                vec![TableCell::new("Plataforma"), TableCell::new("Pago")],
                vec![TableCell::new("AdSense"), TableCell::new("$100")],
            ],
            vec![120.0, 80.0],
            vec![
                TableRule::new(CellRegion::row(0), TableAttribute::Background(Color::parse("#6366f1").unwrap())),
                TableRule::new(
                    CellRegion::rows_from(1),
                    TableAttribute::RowBackgrounds(vec![Color::parse("#f5f5f5").unwrap(), Color::WHITE]),
                ),
                TableRule::new(CellRegion::all(), TableAttribute::Grid(LineSpec::new(0.5, Color::GREY))),
            ],
        )
        .append_page_break()
        .append_paragraph("Segunda página", &heading);
    doc
}

#[test]
fn renders_non_empty_output() {
    let Some(fonts) = test_fonts() else {
        skip("renders_non_empty_output");
        return;
    };

    let rendered = sample_assembler(fonts).render_to_vec().expect("render sample pdf");
    assert!(rendered.bytes.starts_with(b"%PDF"));
    assert_eq!(rendered.report.page_count, 2);
    assert_eq!(rendered.report.block_pages, vec![0, 0, 0, 0, 0, 1]);

    let document = Document::load_mem(&rendered.bytes).expect("output parses");
    assert_eq!(document.get_pages().len(), 2);
}

#[test]
fn rendering_is_deterministic() {
    let Some(fonts) = test_fonts() else {
        skip("rendering_is_deterministic");
        return;
    };

    let first = sample_assembler(fonts.clone()).render_to_vec().unwrap().bytes;
    let second = sample_assembler(fonts).render_to_vec().unwrap().bytes;

    assert_eq!(first.len(), second.len(), "PDF sizes should match");
    assert_eq!(Sha256::digest(&first), Sha256::digest(&second));
}

#[test]
fn metadata_and_outline_are_written() {
    let Some(fonts) = test_fonts() else {
        skip("metadata_and_outline_are_written");
        return;
    };

    let bytes = sample_assembler(fonts).render_to_vec().unwrap().bytes;
    let document = Document::load_mem(&bytes).unwrap();

    let info_id = document
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .unwrap();
    let info = document.get_dictionary(info_id).unwrap();
    assert_eq!(info.get(b"Author").unwrap().as_str().unwrap(), b"Z.ai");
    assert!(info.get(b"CreationDate").is_err());

    let catalog = document.catalog().unwrap();
    let outlines_id = catalog
        .get(b"Outlines")
        .and_then(Object::as_reference)
        .unwrap();
    let outlines = document.get_dictionary(outlines_id).unwrap();
    assert_eq!(outlines.get(b"Count").unwrap().as_i64().unwrap(), 2);
}

#[test]
fn lone_page_break_renders_one_page() {
    let Some(fonts) = test_fonts() else {
        skip("lone_page_break_renders_one_page");
        return;
    };

    let mut doc = DocumentAssembler::new(RenderConfig::new(fonts));
    doc.append_page_break();
    let rendered = doc.render_to_vec().unwrap();

    assert_eq!(rendered.report.page_count, 1);
    assert_eq!(rendered.report.block_pages, vec![0]);
    let document = Document::load_mem(&rendered.bytes).unwrap();
    assert_eq!(document.get_pages().len(), 1);
}

#[test]
fn long_content_flows_across_pages_in_order() {
    let Some(fonts) = test_fonts() else {
        skip("long_content_flows_across_pages_in_order");
        return;
    };

    let mut doc = DocumentAssembler::new(RenderConfig::new(fonts));
    let body = doc
        .register_style("Body", ParagraphStyle::new("Sans", 11).with_leading(18.0))
        .unwrap();
    for index in 0..120 {
        doc.append_paragraph(format!("Párrafo número {index}"), &body);
    }
    let report = doc.render_to_vec().unwrap().report;

    assert!(report.page_count > 1);
    assert_eq!(report.block_pages.len(), 120);
    assert!(report.block_pages.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(report.block_pages.last().copied(), Some(report.page_count - 1));
}

/// Numeric operands of each operation on the one-based page `number`.
fn page_operations(document: &Document, number: u32) -> Vec<(String, Vec<f32>)> {
    let page_id = document.get_pages()[&number];
    document
        .get_and_decode_page_content(page_id)
        .expect("page content decodes")
        .operations
        .into_iter()
        .map(|operation| {
            let operands = operation
                .operands
                .iter()
                .filter_map(|operand| operand.as_float().ok())
                .collect();
            (operation.operator, operands)
        })
        .collect()
}

fn rgb(color: Color) -> Vec<f32> {
    [color.r, color.g, color.b]
        .into_iter()
        .map(|channel| f32::from(channel) / 255.0)
        .collect()
}

fn same(left: &[f32], right: &[f32]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(a, b)| (a - b).abs() < 1e-3)
}

/// Whether a fill in `color` is followed by a rectangle that gets filled.
fn has_fill(operations: &[(String, Vec<f32>)], color: Color) -> bool {
    operations.windows(3).any(|window| {
        window[0].0 == "rg"
            && same(&window[0].1, &rgb(color))
            && window[1].0 == "re"
            && window[1].1.len() == 4
            && window[2].0 == "f"
    })
}

#[test]
fn table_backgrounds_and_grid_reach_the_page() {
    let Some(fonts) = test_fonts() else {
        skip("table_backgrounds_and_grid_reach_the_page");
        return;
    };

    let bytes = sample_assembler(fonts).render_to_vec().unwrap().bytes;
    let document = Document::load_mem(&bytes).unwrap();
    let operations = page_operations(&document, 1);

    assert!(has_fill(&operations, Color::parse("#6366f1").unwrap()), "header fill missing");
    assert!(has_fill(&operations, Color::parse("#f5f5f5").unwrap()), "stripe fill missing");
    assert!(
        operations
            .iter()
            .any(|(operator, operands)| operator == "w" && same(operands, &[0.5])),
        "grid width missing"
    );
    let strokes = operations.iter().filter(|(operator, _)| operator == "S").count();
    // 2x2 grid: three horizontal and three vertical boundaries, two segments each.
    assert!(strokes >= 12, "only {strokes} strokes");

    let second = page_operations(&document, 2);
    assert!(!second.iter().any(|(operator, _)| operator == "re"));
}

#[test]
fn font_program_is_embedded_once_per_file() {
    let Some(fonts) = test_fonts() else {
        skip("font_program_is_embedded_once_per_file");
        return;
    };

    let bytes = sample_assembler(fonts).render_to_vec().unwrap().bytes;
    let document = Document::load_mem(&bytes).unwrap();

    let mut programs: Vec<_> = document
        .objects
        .values()
        .filter_map(|object| object.as_dict().ok())
        .filter_map(|dictionary| dictionary.get(b"FontFile2").and_then(Object::as_reference).ok())
        .collect();
    assert!(!programs.is_empty());
    programs.sort();
    programs.dedup();
    assert_eq!(programs.len(), 1);
}
