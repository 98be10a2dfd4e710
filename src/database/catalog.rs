use serde::Serialize;

use crate::error::FoodgramError;

/*
Catalog files

ingredients.csv     name,measurement_unit
                    абрикосовое варенье,г
tags.csv            name,color,slug
                    Breakfast,#E26C2D,breakfast
*/

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientRecord {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagRecord {
    pub name: String,
    pub color: String,
    pub slug: String,
}

pub trait CatalogRecord: Sized {
    const HEADER: &'static str;

    fn from_fields(fields: Vec<String>) -> Option<Self>;
}

impl CatalogRecord for IngredientRecord {
    const HEADER: &'static str = "name";

    fn from_fields(fields: Vec<String>) -> Option<Self> {
        match <[String; 2]>::try_from(fields) {
            Ok([name, measurement_unit]) => Some(Self {
                name,
                measurement_unit,
            }),
            Err(_) => None,
        }
    }
}

impl CatalogRecord for TagRecord {
    const HEADER: &'static str = "name";

    fn from_fields(fields: Vec<String>) -> Option<Self> {
        match <[String; 3]>::try_from(fields) {
            Ok([name, color, slug]) => Some(Self { name, color, slug }),
            Err(_) => None,
        }
    }
}

/// Parses a whole catalog file. A leading byte order mark and blank lines are
/// skipped, and so is a first non-blank line whose leading field is the
/// column name.
pub fn parse_catalog<T: CatalogRecord>(content: &str) -> Result<Vec<T>, FoodgramError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut records = vec![];
    let mut first = true;

    for (index, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields = split_line(line).ok_or_else(|| {
            FoodgramError::validation("csv", format!("Unterminated quote on line {}", index + 1))
        })?;

        let header = first && fields.first().map(String::as_str) == Some(T::HEADER);
        first = false;
        if header {
            continue;
        }

        let record = T::from_fields(fields).ok_or_else(|| {
            FoodgramError::validation("csv", format!("Invalid column count on line {}", index + 1))
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Splits one line on commas, honouring double quotes and `""` escapes.
fn split_line(line: &str) -> Option<Vec<String>> {
    let mut fields = vec![];
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', _) => quoted = !quoted,
            (',', false) => fields.push(std::mem::take(&mut current).trim().to_string()),
            (c, _) => current.push(c),
        }
    }

    if quoted {
        return None;
    }

    fields.push(current.trim().to_string());
    Some(fields)
}
