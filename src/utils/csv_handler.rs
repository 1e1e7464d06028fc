//! Spreadsheet row mapping and CSV import/export for the bean catalog
//!
//! Both the Google Sheets import and local CSV files go through
//! [`map_rows`], so a header/row grid always turns into beans the same way.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use strum::{AsRefStr, EnumIter, IntoEnumIterator};
use tracing::{debug, warn};

use crate::errors::{CoasterError, Result};
use crate::storage::{CoffeeBean, SaleInfo};
use crate::utils::slug::sanitize_slug;

/// Columns understood by the importer, in export order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum BeanColumn {
    Name,
    Origin,
    Varieties,
    Process,
    Region,
    Altitude,
    FlavorNotes,
    Description,
    Story,
    Price,
    Stock,
    Active,
}

impl BeanColumn {
    /// camelCase field name (lowercased) also accepted as a header
    fn field_alias(self) -> Option<&'static str> {
        match self {
            BeanColumn::FlavorNotes => Some("flavornotes"),
            BeanColumn::Active => Some("isactive"),
            _ => None,
        }
    }
}

/// Lowercase, trim, whitespace runs → `_`
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Beans parsed from a grid plus the per-row failures
#[derive(Debug, Clone, Default)]
pub struct RowMapping {
    pub beans: Vec<CoffeeBean>,
    pub errors: Vec<String>,
}

struct HeaderIndex(HashMap<BeanColumn, usize>);

impl HeaderIndex {
    fn new(headers: &[String]) -> Self {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let mut index = HashMap::new();
        for column in BeanColumn::iter() {
            if let Some(pos) = normalized
                .iter()
                .position(|h| h == column.as_ref() || Some(h.as_str()) == column.field_alias())
            {
                index.insert(column, pos);
            }
        }
        Self(index)
    }

    fn value<'a>(&self, row: &'a [String], column: BeanColumn) -> &'a str {
        self.0
            .get(&column)
            .and_then(|&i| row.get(i))
            .map(|v| v.trim())
            .unwrap_or("")
    }
}

/// Map data rows to beans using the header row
///
/// `first_row_number` is the 1-based sheet row of `rows[0]`, used in error
/// messages. A row without a name is reported and skipped; the rest of the
/// batch continues.
pub fn map_rows(
    headers: &[String],
    rows: &[Vec<String>],
    first_row_number: usize,
    now: DateTime<Utc>,
) -> RowMapping {
    let index = HeaderIndex::new(headers);
    let mut mapping = RowMapping::default();

    for (offset, row) in rows.iter().enumerate() {
        let row_number = first_row_number + offset;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        match map_row(&index, row, row_number, now) {
            Ok(bean) => mapping.beans.push(bean),
            Err(e) => {
                warn!("Row {}: {}", row_number, e.message());
                mapping
                    .errors
                    .push(format!("Row {}: {}", row_number, e.message()));
            }
        }
    }

    debug!(
        "map_rows: {} beans, {} errors",
        mapping.beans.len(),
        mapping.errors.len()
    );
    mapping
}

fn map_row(
    index: &HeaderIndex,
    row: &[String],
    row_number: usize,
    now: DateTime<Utc>,
) -> Result<CoffeeBean> {
    let name = index.value(row, BeanColumn::Name);
    if name.is_empty() {
        return Err(CoasterError::validation("Bean name is required"));
    }

    let flavor_notes = index
        .value(row, BeanColumn::FlavorNotes)
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .collect();

    let price = parse_leading_f64(index.value(row, BeanColumn::Price));
    let stock = parse_leading_i64(index.value(row, BeanColumn::Stock));
    let active = index.value(row, BeanColumn::Active);
    let is_active = active.eq_ignore_ascii_case("true") || active == "1";

    let millis = now.timestamp_millis();
    let mut bean = CoffeeBean::new(format!("sheet-{}-{}", millis, row_number), name, now);
    bean.origin = index.value(row, BeanColumn::Origin).to_string();
    bean.varieties = index.value(row, BeanColumn::Varieties).to_string();
    bean.process = index.value(row, BeanColumn::Process).to_string();
    bean.region = index.value(row, BeanColumn::Region).to_string();
    bean.altitude = index.value(row, BeanColumn::Altitude).to_string();
    bean.flavor_notes = flavor_notes;
    bean.description = index.value(row, BeanColumn::Description).to_string();
    bean.story = index.value(row, BeanColumn::Story).to_string();
    bean.nfc_chip_id = format!("NFC-{}-{}", millis, row_number);
    bean.custom_url = sanitize_slug(name);
    bean.is_active = is_active;
    bean.sale_info = Some(SaleInfo {
        price,
        is_for_sale: price > 0.0,
        stock,
    });
    Ok(bean)
}

/// Longest numeric prefix as f64, 0 when there is none
///
/// Accepts a sign, a decimal point and an exponent (`1e3`, `2.5E-1`).
fn parse_leading_f64(s: &str) -> f64 {
    let mut end = 0;
    let mut prev = None;
    for (i, c) in s.char_indices() {
        let sign_ok = i == 0 || matches!(prev, Some('e' | 'E'));
        let accepted = c.is_ascii_digit()
            || c == '.'
            || matches!(c, 'e' | 'E')
            || (sign_ok && matches!(c, '-' | '+'));
        if !accepted {
            break;
        }
        end = i + c.len_utf8();
        prev = Some(c);
    }
    let mut candidate = &s[..end];
    while !candidate.is_empty() {
        if let Ok(v) = candidate.parse::<f64>()
            && v.is_finite()
        {
            return v;
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    0.0
}

/// Longest integer prefix, 0 when there is none
fn parse_leading_i64(s: &str) -> i64 {
    let end = s
        .char_indices()
        .take_while(|&(i, c)| c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    s[..end].parse().unwrap_or(0)
}

// ============ CSV ============

/// Render the catalog in the spreadsheet export layout (every cell quoted)
pub fn beans_to_csv(beans: &[CoffeeBean]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(BeanColumn::iter().map(|c| c.as_ref().to_string()))?;
    for bean in beans {
        writer.write_record([
            bean.name.clone(),
            bean.origin.clone(),
            bean.varieties.clone(),
            bean.process.clone(),
            bean.region.clone(),
            bean.altitude.clone(),
            bean.flavor_notes.join(", "),
            bean.description.clone(),
            bean.story.clone(),
            bean.price().to_string(),
            bean.stock().to_string(),
            if bean.is_active { "TRUE" } else { "FALSE" }.to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CoasterError::serialization(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| CoasterError::serialization(format!("CSV is not valid UTF-8: {}", e)))
}

/// Split CSV text into its header row and data rows
pub fn parse_csv(text: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let headers = match records.next() {
        Some(record) => record?.iter().map(String::from).collect(),
        None => return Ok((Vec::new(), Vec::new())),
    };

    let mut rows = Vec::new();
    for record in records {
        rows.push(record?.iter().map(String::from).collect());
    }
    Ok((headers, rows))
}

/// Parse CSV text straight into beans
pub fn csv_to_beans(text: &str, now: DateTime<Utc>) -> Result<RowMapping> {
    let (headers, rows) = parse_csv(text)?;
    if headers.is_empty() {
        return Err(CoasterError::validation("CSV has no header row"));
    }
    Ok(map_rows(&headers, &rows, 2, now))
}

/// 生成默认导出文件名（带时间戳）
pub fn generate_export_filename(now: DateTime<Utc>) -> String {
    format!("coffee-beans-export_{}.csv", now.format("%Y%m%d_%H%M%S"))
}
