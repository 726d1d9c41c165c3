//! CSV input and output around the core.
//!
//! Two input layouts are understood:
//!
//! - **wide**: a header `user,<item>,<item>,...` and one row per user; blank
//!   cells mean "not rated".
//! - **long**: a header followed by `user,item,rating` rows, as in the
//!   Book-Crossing dumps (usually `;`-delimited).

use crate::models::*;
use crate::utils::validation::{parse_rating, sanitize_id};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CsvFormat {
    #[default]
    Wide,
    Long,
}

pub fn load_ratings<P: AsRef<Path>>(path: P, format: CsvFormat, delimiter: u8) -> Result<RatingMatrix> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let ratings = read_ratings(file, format, delimiter)
        .with_context(|| format!("Failed to load ratings from {}", path.display()))?;

    info!(
        path = %path.display(),
        users = ratings.num_users(),
        items = ratings.num_items(),
        ratings = ratings.num_ratings(),
        "Ratings loaded"
    );

    Ok(ratings)
}

pub fn read_ratings<R: Read>(reader: R, format: CsvFormat, delimiter: u8) -> Result<RatingMatrix> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    match format {
        CsvFormat::Wide => read_wide(&mut reader),
        CsvFormat::Long => read_long(&mut reader),
    }
}

fn read_wide<R: Read>(reader: &mut csv::Reader<R>) -> Result<RatingMatrix> {
    let headers = reader.headers().context("Failed to read header row")?.clone();
    if headers.len() < 2 {
        return Err(anyhow!("Header needs a user column and at least one item column"));
    }

    let items: Vec<String> = headers.iter().skip(1).map(sanitize_id).collect();
    let mut ratings = RatingMatrix::new();

    for (row, result) in reader.records().enumerate() {
        let line = row + 2;
        let record = result.with_context(|| format!("Failed to read line {}", line))?;

        let user = record.get(0).map(sanitize_id).unwrap_or_default();
        if user.is_empty() {
            return Err(anyhow!("Missing user id on line {}", line));
        }
        if record.len() > headers.len() {
            return Err(anyhow!(
                "Line {} has {} cells but the header has {}",
                line,
                record.len(),
                headers.len()
            ));
        }

        for (item, cell) in items.iter().zip(record.iter().skip(1)) {
            let value = parse_rating(cell).with_context(|| format!("Line {}, column {:?}", line, item))?;
            if let Some(value) = value {
                ratings
                    .insert(user.as_str(), item.as_str(), value)
                    .with_context(|| format!("Line {}, column {:?}", line, item))?;
            }
        }
    }

    Ok(ratings)
}

fn read_long<R: Read>(reader: &mut csv::Reader<R>) -> Result<RatingMatrix> {
    let mut ratings = RatingMatrix::new();

    for (row, result) in reader.records().enumerate() {
        let line = row + 2;
        let record = result.with_context(|| format!("Failed to read line {}", line))?;

        if record.len() < 3 {
            return Err(anyhow!("Line {} needs user, item and rating columns", line));
        }

        let user = sanitize_id(&record[0]);
        let item = sanitize_id(&record[1]);
        let value = parse_rating(&record[2])
            .with_context(|| format!("Line {}", line))?
            .ok_or_else(|| anyhow!("Missing rating on line {}", line))?;

        ratings
            .insert(user, item, value)
            .with_context(|| format!("Line {}", line))?;
    }

    Ok(ratings)
}

/// Writes the dense similarity table with a leading `user` column.
pub fn write_similarity_csv<W: Write>(similarities: &SimilarityMatrix, writer: W, delimiter: u8) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(writer);
    let (users, dense) = similarities.to_dense();

    let mut header = vec!["user".to_string()];
    header.extend(users.iter().cloned());
    writer.write_record(&header)?;

    for (i, user) in users.iter().enumerate() {
        let mut row = vec![user.clone()];
        row.extend(dense.row(i).iter().map(|s| format!("{:.6}", s)));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}
