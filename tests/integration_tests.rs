//! Integration tests for the report extraction pipeline

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use report_extractor::{extract_rows, parse_matrix, process_report_mem, ReportError};

/// Encode test text as Latin-1 (the encoding report fonts use)
fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars().map(|c| c as u32 as u8).collect()
}

fn text_ops(ops: &mut Vec<Operation>, text: &str, x: f32, y: f32) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::string_literal(latin1_bytes(text))],
    ));
    ops.push(Operation::new("ET", vec![]));
}

/// Build a complete synthetic report PDF: one page of label/value rows laid
/// out like the real fixed-layout document, plus one embedded image.
fn build_report_pdf() -> Vec<u8> {
    let mut ops = Vec::new();

    // each logical row 30pt below the previous; wrapped label lines 11pt
    // below their row
    let mut y = 750.0;
    fn row(cells: &[(&str, f32)], y: &mut f32, ops: &mut Vec<Operation>) {
        for (text, x) in cells {
            text_ops(ops, text, *x, *y);
        }
        *y -= 30.0;
    }

    let col = |i: usize| 150.0 + 45.0 * (i as f32 - 1.0);

    row(&[("Nº INFORME", 40.0), ("1,234", 150.0)], &mut y, &mut ops);
    row(&[("CLIENTE", 40.0), ("Arcor SAIC", 150.0)], &mut y, &mut ops);
    row(&[("Nº REMITO", 40.0), ("0001-00012345", 150.0)], &mut y, &mut ops);
    row(&[("FECHA RECEPCIÓN", 40.0), ("05/07/2024", 170.0)], &mut y, &mut ops);

    row(&[("CHAPADUR HARDBOARD", 40.0)], &mut y, &mut ops);
    row(&[("CANTIDADES", 40.0)], &mut y, &mut ops);
    row(
        &[
            ("CHAPADUR HARDBOARD", 40.0),
            ("1,200", col(1)),
            ("30", col(2)),
            ("12", col(3)),
            ("8", col(4)),
            ("50", col(5)),
            ("1,300", col(6)),
            ("1,310", col(7)),
            ("-10", col(8)),
            ("3,8%", col(9)),
        ],
        &mut y,
        &mut ops,
    );
    // wrapped second line of the hardboard label cell
    text_ops(
        &mut ops,
        "Motivo descarte: quebrado y manchado",
        42.0,
        y + 30.0 - 11.0,
    );

    row(&[("PALLETS ARLOG", 40.0)], &mut y, &mut ops);
    row(&[("CANTIDADES", 40.0)], &mut y, &mut ops);
    row(
        &[
            ("PALLETS ARLOG", 40.0),
            ("400", col(1)),
            ("35", col(2)),
            ("20", col(3)),
            ("5", col(4)),
            ("460", col(5)),
            ("460", col(6)),
            ("0", col(7)),
            ("1,1%", col(8)),
        ],
        &mut y,
        &mut ops,
    );
    text_ops(&mut ops, "Motivo descarte: taco rajado", 42.0, y + 30.0 - 11.0);

    row(&[("MARCOS DE MADERA", 40.0)], &mut y, &mut ops);
    row(&[("CANTIDADES", 40.0)], &mut y, &mut ops);
    row(
        &[
            ("MARCOS DE MADERA", 40.0),
            ("150", col(1)),
            ("4", col(2)),
            ("6", col(3)),
            ("160", col(4)),
            ("158", col(5)),
            ("2", col(6)),
            ("3,75%", col(7)),
        ],
        &mut y,
        &mut ops,
    );
    text_ops(
        &mut ops,
        "Motivo descarte: clavos salidos",
        42.0,
        y + 30.0 - 11.0,
    );

    row(&[("FECHA FIN PROCESO", 40.0)], &mut y, &mut ops);
    row(
        &[
            ("CHAPADUR HARDBOARD", 40.0),
            ("01/08/2024", 150.0),
            ("PALLET ARLOG", 250.0),
            ("02/08/2024", 340.0),
        ],
        &mut y,
        &mut ops,
    );
    row(&[("OBSERVACIONES", 40.0)], &mut y, &mut ops);
    row(
        &[("nota", 40.0), ("pallets con humedad superficial", 150.0)],
        &mut y,
        &mut ops,
    );

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2,
            "Height" => 2,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        vec![0u8, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
    ));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
        "XObject" => dictionary! { "Im0" => image_id },
    });

    let content = Content { operations: ops };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("save pdf");
    buffer
}

#[test]
fn test_process_report_end_to_end() {
    let pdf = build_report_pdf();
    let result = process_report_mem(&pdf).expect("report should parse");
    let report = &result.report;

    assert_eq!(report.num_informe, 1234);
    assert_eq!(report.cliente, "Arcor SAIC");
    assert_eq!(report.num_remito, "0001-00012345");
    assert_eq!(
        report.fecha_recepcion,
        chrono::NaiveDate::from_ymd_opt(2024, 7, 5).unwrap()
    );

    assert_eq!(report.chapadur_hardboard.total, 1300);
    assert_eq!(report.chapadur_hardboard.diferencia, -10);
    assert_eq!(report.chapadur_hardboard.no_apto_percentage, 3.8);
    assert_eq!(
        report.chapadur_hardboard.motivo_descartes,
        "quebrado y manchado"
    );

    assert_eq!(report.pallets_arlog.oi, 400);
    assert_eq!(report.pallets_arlog.no_apto_percentage, 1.1);
    assert_eq!(report.pallets_arlog.motivo_descartes, "taco rajado");

    assert_eq!(report.marcos_de_madera.apto, 150);
    assert_eq!(report.marcos_de_madera.diferencia, 2);
    assert_eq!(report.marcos_de_madera.motivo_descartes, "clavos salidos");

    assert_eq!(
        report.fecha_fin_proceso_chapadur,
        chrono::NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()
    );
    assert_eq!(
        report.fecha_fin_proceso_pallet_marco,
        chrono::NaiveDate::from_ymd_opt(2024, 8, 2).unwrap()
    );
    assert_eq!(
        report.observaciones,
        vec!["pallets con humedad superficial".to_string()]
    );
}

#[test]
fn test_images_pass_through_unchanged() {
    let pdf = build_report_pdf();
    let result = process_report_mem(&pdf).expect("report should parse");

    assert_eq!(result.images.len(), 1);
    let image = &result.images[0];
    assert_eq!(image.width, 2);
    assert_eq!(image.height, 2);
    assert_eq!(image.data, vec![0u8, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
}

#[test]
fn test_extract_rows_from_file() {
    let pdf = build_report_pdf();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("reporte.pdf");
    std::fs::write(&path, &pdf).expect("write pdf");

    let extracted = extract_rows(&path).expect("extraction should succeed");
    assert!(extracted
        .matrix
        .iter()
        .any(|row| row.first().is_some_and(|c| c == "CLIENTE")));
    assert!(extracted.matrix.iter().any(|row| row
        .iter()
        .any(|c| c.contains("Motivo descarte: taco rajado"))));
}

#[test]
fn test_report_json_round_trip() {
    let pdf = build_report_pdf();
    let report = process_report_mem(&pdf).expect("report should parse").report;

    let json = serde_json::to_string(&report).expect("serialize");
    let back: report_extractor::Report = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, report);
}

#[test]
fn test_missing_anchor_yields_no_partial_report() {
    // a matrix missing the informe number entirely
    let matrix: Vec<Vec<String>> = vec![vec!["CLIENTE".to_string(), "Arcor SAIC".to_string()]];

    match parse_matrix(&matrix) {
        Err(ReportError::MissingField(field)) => assert_eq!(field, "Nº INFORME"),
        other => panic!("expected MissingField, got {:?}", other),
    }
}
