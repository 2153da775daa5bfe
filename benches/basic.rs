//! Parse benchmarks on generated workbooks.
//!
//! ```bash
//! cargo bench --bench basic
//! ```

use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use presupuesto_import::{detect_format, parse_workbook, Workbook};

const MONTHS: [&str; 12] = [
    "Enero", "Febrero", "Marzo", "Abril", "Mayo", "Junio", "Julio", "Agosto", "Setiembre",
    "Octubre", "Noviembre", "Diciembre",
];

/// A Formato 5.B workbook with `activities` rows under the two-row month header.
fn formato5b(activities: u32) -> Workbook {
    let mut book = rust_xlsxwriter::Workbook::new();
    let sheet = book.add_worksheet();
    sheet.set_name("Formato 5.B").unwrap();
    sheet.write_string(0, 0, "FORMATO 5.B").unwrap();
    sheet.write_string(4, 4, "Año:").unwrap();
    sheet.write_string(4, 5, "2026").unwrap();
    sheet.write_string(8, 0, "Código AO").unwrap();
    sheet.write_string(8, 1, "Nombre AO").unwrap();
    for (m, name) in MONTHS.iter().enumerate() {
        let col = 2 + 3 * m as u16;
        sheet.write_string(8, col, *name).unwrap();
        sheet.write_string(9, col, "Programado").unwrap();
        sheet.write_string(9, col + 1, "Ejecutado").unwrap();
        sheet.write_string(9, col + 2, "Saldo").unwrap();
    }
    for a in 0..activities {
        let row = 10 + a;
        sheet
            .write_string(row, 0, format!("AOI{:011}", 500_000 + a))
            .unwrap();
        sheet.write_string(row, 1, "Actividad operativa").unwrap();
        for m in 0..12u16 {
            let col = 2 + 3 * m;
            sheet.write_number(row, col, 1000.0).unwrap();
            sheet.write_number(row, col + 1, 250.5).unwrap();
            sheet.write_number(row, col + 2, 749.5).unwrap();
        }
    }
    Workbook::from_bytes(book.save_to_buffer().unwrap())
}

fn bench_formato5b(c: &mut Criterion) {
    let workbook = formato5b(500);
    let mut group = c.benchmark_group("formato5b");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(10));
    group.bench_function("detect", |b| b.iter(|| detect_format(black_box(&workbook))));
    group.bench_function("parse_500_activities", |b| {
        b.iter(|| {
            let result = parse_workbook(black_box(workbook.clone()));
            assert_eq!(result.record_count(), 6000);
            result
        })
    });
    group.finish();
}

criterion_group!(benches, bench_formato5b);
criterion_main!(benches);
