use std::fmt;
use std::io::Cursor;

use serde_json::{Map, Value as JsonValue};

use crate::data::model::{CellValue, Table};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Export stage: serialize the current table (or a rendered chart) to bytes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Json,
    Png,
}

impl ExportFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Json => "application/json",
            ExportFormat::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Json => "json",
            ExportFormat::Png => "png",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// An in-memory export result; lives only for the duration of a download.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

/// Serialize the table in the requested format. Validation (empty table,
/// chart-only format) happens before any bytes are produced.
pub fn export_table(table: &Table, format: ExportFormat) -> Result<Artifact> {
    match format {
        ExportFormat::Csv => export_csv(table),
        ExportFormat::Xlsx => export_xlsx(table),
        ExportFormat::Json => export_json(table),
        ExportFormat::Png => Err(Error::InvalidOperation(
            "png export applies to charts, not tables".into(),
        )),
    }
}

fn ensure_not_empty(table: &Table) -> Result<()> {
    if table.is_empty() {
        return Err(Error::EmptyTable);
    }
    Ok(())
}

/// Comma-delimited with a header row; `Null` cells become empty fields.
pub fn export_csv(table: &Table) -> Result<Artifact> {
    ensure_not_empty(table)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&table.columns)
        .map_err(|e| Error::Export(e.to_string()))?;
    for row in &table.rows {
        let record: Vec<String> = table
            .columns
            .iter()
            .map(|col| row.get(col).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| Error::Export(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Export(e.to_string()))?;
    log::info!("exported {} rows as csv ({} bytes)", table.len(), bytes.len());
    Ok(Artifact {
        format: ExportFormat::Csv,
        bytes,
    })
}

/// Array of row-objects, keys in column order; dates as ISO-8601 strings.
/// Parsing the output with the JSON loader reconstructs an equal table.
pub fn export_json(table: &Table) -> Result<Artifact> {
    ensure_not_empty(table)?;

    let records: Vec<JsonValue> = table
        .rows
        .iter()
        .map(|row| {
            let mut obj = Map::new();
            for col in &table.columns {
                let cell = row.get(col).unwrap_or(&CellValue::Null);
                obj.insert(col.clone(), cell_to_json(cell));
            }
            JsonValue::Object(obj)
        })
        .collect();

    let bytes = serde_json::to_vec_pretty(&JsonValue::Array(records))
        .map_err(|e| Error::Export(e.to_string()))?;
    Ok(Artifact {
        format: ExportFormat::Json,
        bytes,
    })
}

fn cell_to_json(cell: &CellValue) -> JsonValue {
    match cell {
        CellValue::String(s) => JsonValue::String(s.clone()),
        CellValue::Integer(i) => JsonValue::Number((*i).into()),
        CellValue::Float(v) => serde_json::Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        CellValue::Bool(b) => JsonValue::Bool(*b),
        CellValue::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
        CellValue::Null => JsonValue::Null,
    }
}

/// Single-sheet workbook named "Data" with a header row and typed cells.
pub fn export_xlsx(table: &Table) -> Result<Artifact> {
    ensure_not_empty(table)?;

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Data")
        .map_err(|e| Error::Export(e.to_string()))?;

    let xlsx_err = |e: rust_xlsxwriter::XlsxError| Error::Export(e.to_string());

    for (c, col) in table.columns.iter().enumerate() {
        worksheet
            .write_string(0, c as u16, col)
            .map_err(xlsx_err)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, col) in table.columns.iter().enumerate() {
            let c = c as u16;
            match row.get(col).unwrap_or(&CellValue::Null) {
                CellValue::Integer(i) => worksheet.write_number(r, c, *i as f64),
                CellValue::Float(v) => worksheet.write_number(r, c, *v),
                CellValue::Bool(b) => worksheet.write_boolean(r, c, *b),
                CellValue::Null => continue,
                other => worksheet.write_string(r, c, other.to_string()),
            }
            .map_err(xlsx_err)?;
        }
    }

    let bytes = workbook.save_to_buffer().map_err(xlsx_err)?;
    Ok(Artifact {
        format: ExportFormat::Xlsx,
        bytes,
    })
}

/// Encode an already-rendered RGBA raster (row-major, 4 bytes per pixel)
/// as PNG. Chart rendering itself is the presentation layer's job.
pub fn export_chart_png(width: u32, height: u32, rgba: &[u8]) -> Result<Artifact> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(Error::MalformedInput(format!(
            "chart buffer has {} bytes, expected {expected} for {width}x{height} rgba",
            rgba.len()
        )));
    }

    let img = image::RgbaImage::from_raw(width, height, rgba.to_vec())
        .ok_or_else(|| Error::Export("could not assemble image buffer".into()))?;

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| Error::Export(e.to_string()))?;
    Ok(Artifact {
        format: ExportFormat::Png,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_json_reader;
    use crate::data::model::Row;
    use chrono::NaiveDate;

    fn table() -> Table {
        let mk = |d: u32, sales: f64, region: &str| -> Row {
            let mut row = Row::new();
            row.insert(
                "date".into(),
                CellValue::Date(NaiveDate::from_ymd_opt(2023, 1, d).unwrap()),
            );
            row.insert("sales".into(), CellValue::Float(sales));
            row.insert("region".into(), CellValue::String(region.into()));
            row
        };
        Table::from_rows(
            vec!["date".into(), "sales".into(), "region".into()],
            vec![mk(1, 10.5, "North"), mk(2, 20.0, "South")],
        )
    }

    #[test]
    fn csv_has_header_and_empty_nulls() {
        let mut t = table();
        t.rows[1].insert("region".into(), CellValue::Null);
        let t = Table::from_rows(t.columns.clone(), t.rows);
        let artifact = export_csv(&t).unwrap();
        let text = String::from_utf8(artifact.bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("date,sales,region"));
        assert_eq!(lines.next(), Some("2023-01-01,10.5,North"));
        assert_eq!(lines.next(), Some("2023-01-02,20,"));
    }

    #[test]
    fn json_round_trips_through_the_loader() {
        let t = table();
        let artifact = export_json(&t).unwrap();
        let back = load_json_reader(artifact.bytes.as_slice()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn xlsx_produces_a_zip_container() {
        let artifact = export_xlsx(&table()).unwrap();
        // xlsx is a zip archive: PK magic
        assert_eq!(&artifact.bytes[..2], b"PK");
    }

    #[test]
    fn empty_table_is_rejected_before_serialization() {
        let empty = Table::from_rows(vec!["a".into()], Vec::new());
        for format in [ExportFormat::Csv, ExportFormat::Xlsx, ExportFormat::Json] {
            assert!(matches!(
                export_table(&empty, format),
                Err(Error::EmptyTable)
            ));
        }
    }

    #[test]
    fn png_is_chart_only() {
        assert!(matches!(
            export_table(&table(), ExportFormat::Png),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn chart_png_encodes_and_validates_buffer_size() {
        let pixels = vec![255u8; 4 * 4 * 4];
        let artifact = export_chart_png(4, 4, &pixels).unwrap();
        assert_eq!(&artifact.bytes[1..4], b"PNG");
        assert!(export_chart_png(4, 4, &pixels[..8]).is_err());
    }
}
