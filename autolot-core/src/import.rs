//! Bulk CSV import of vehicle listings.
//!
//! Columns are located by header name, so column order is free. Rows are
//! parsed leniently into [`VehicleDraft`]s; validation happens per row when a
//! draft is turned into a [`NewVehicle`].

use crate::inventory::{Condition, NewVehicle, Status};
use crate::{InventoryError, Result};
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Separator of the image URLs packed into the `images` column.
pub const IMAGE_SEPARATOR: char = ';';

const MAX_ROWS: usize = 10_000;

/// One parsed CSV row, not yet validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleDraft {
    /// 1-based line number in the source file.
    pub line: usize,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub price: Option<f64>,
    pub condition: Option<Condition>,
    pub status: Option<Status>,
    pub description: String,
    pub images: Vec<String>,
}

impl VehicleDraft {
    /// Turn the draft into create input. Missing condition/status fall back
    /// to their defaults; a missing year or price rejects the row.
    pub fn into_new_vehicle(self) -> Result<NewVehicle> {
        let line = self.line;
        let year = self.year.ok_or_else(|| {
            InventoryError::InvalidInput(format!("Line {}: missing or invalid year", line))
        })?;
        let price = self.price.ok_or_else(|| {
            InventoryError::InvalidInput(format!("Line {}: missing or invalid price", line))
        })?;

        let fields = NewVehicle {
            make: self.make,
            model: self.model,
            year,
            price,
            condition: self.condition.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            description: self.description,
            specifications: Default::default(),
            images: self.images,
        };
        fields.validate().map_err(|e| match e {
            InventoryError::InvalidInput(msg) => {
                InventoryError::InvalidInput(format!("Line {}: {}", line, msg))
            }
            other => other,
        })?;
        Ok(fields)
    }
}

/// Outcome of importing a batch of drafts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<ImportSkip>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSkip {
    pub line: usize,
    pub reason: String,
}

/// Column positions resolved from the header row.
#[derive(Debug, Default)]
struct Columns {
    make: Option<usize>,
    model: Option<usize>,
    year: Option<usize>,
    price: Option<usize>,
    condition: Option<usize>,
    status: Option<usize>,
    description: Option<usize>,
    images: Option<usize>,
}

impl Columns {
    fn from_header(header: &[String]) -> Result<Self> {
        let mut columns = Columns::default();
        for (i, name) in header.iter().enumerate() {
            let slot = match name.trim().to_ascii_lowercase().as_str() {
                "make" => &mut columns.make,
                "model" => &mut columns.model,
                "year" => &mut columns.year,
                "price" => &mut columns.price,
                "condition" => &mut columns.condition,
                "status" => &mut columns.status,
                "description" => &mut columns.description,
                "images" => &mut columns.images,
                _ => continue,
            };
            slot.get_or_insert(i);
        }

        if columns.make.is_none() || columns.model.is_none() {
            return Err(InventoryError::Parse(
                "CSV header must name at least make and model".to_string(),
            ));
        }
        Ok(columns)
    }
}

fn cell<'a>(record: &'a [String], column: Option<usize>) -> &'a str {
    column
        .and_then(|i| record.get(i))
        .map(|s| s.trim())
        .unwrap_or("")
}

/// Parse CSV text into drafts.
///
/// A file with more than 10 000 data rows is rejected as a whole.
pub fn parse_csv<R: Read>(input: R) -> Result<Vec<VehicleDraft>> {
    let mut text = String::new();
    BufReader::new(input)
        .read_to_string(&mut text)
        .map_err(|e| InventoryError::Parse(format!("Failed to read CSV: {}", e)))?;

    let mut records = parse_records(text.trim_start_matches('\u{feff}')).into_iter();
    let header = records
        .next()
        .ok_or_else(|| InventoryError::Parse("Empty CSV file".to_string()))?;
    let columns = Columns::from_header(&header.fields)?;

    let rows: Vec<CsvRecord> = records.collect();
    if rows.len() > MAX_ROWS {
        return Err(InventoryError::Parse(format!(
            "CSV has {} rows, at most {} can be imported at once",
            rows.len(),
            MAX_ROWS
        )));
    }

    let drafts: Vec<VehicleDraft> = rows
        .iter()
        .map(|row| draft_from_record(row, &columns))
        .collect();

    debug!("Parsed {} CSV rows", drafts.len());
    Ok(drafts)
}

/// Parse a CSV file into drafts.
pub fn parse_csv_file(path: &Path) -> Result<Vec<VehicleDraft>> {
    let file = std::fs::File::open(path)?;
    parse_csv(file)
}

fn draft_from_record(row: &CsvRecord, columns: &Columns) -> VehicleDraft {
    let record = &row.fields;
    let images = cell(record, columns.images)
        .split(IMAGE_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    VehicleDraft {
        line: row.line,
        make: cell(record, columns.make).to_string(),
        model: cell(record, columns.model).to_string(),
        year: cell(record, columns.year).parse().ok(),
        price: cell(record, columns.price)
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite()),
        condition: Condition::parse(cell(record, columns.condition)),
        status: Status::parse(cell(record, columns.status)),
        description: cell(record, columns.description).to_string(),
        images,
    }
}

/// One CSV record and the 1-based line it starts on.
#[derive(Debug, PartialEq)]
struct CsvRecord {
    line: usize,
    fields: Vec<String>,
}

/// Split CSV text into records, honouring quoted fields, `""` escapes and
/// line breaks inside quotes. Blank lines yield no record.
fn parse_records(text: &str) -> Vec<CsvRecord> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut start_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if in_quotes => {
                current.push('\n');
                line += 1;
            }
            '\n' => {
                push_record(&mut records, &mut fields, &mut current, start_line);
                line += 1;
                start_line = line;
            }
            _ => current.push(c),
        }
    }

    if !fields.is_empty() || !current.is_empty() {
        push_record(&mut records, &mut fields, &mut current, start_line);
    }
    records
}

fn push_record(
    records: &mut Vec<CsvRecord>,
    fields: &mut Vec<String>,
    current: &mut String,
    line: usize,
) {
    fields.push(std::mem::take(current));
    let fields = std::mem::take(fields);
    if fields.len() == 1 && fields[0].trim().is_empty() {
        return;
    }
    records.push(CsvRecord { line, fields });
}
