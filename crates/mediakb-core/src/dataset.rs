//! Turns the raw book and movie datasets into bulk-load documents.
//!
//! A [`DatasetSpec`] describes one delimited file: where the document id
//! comes from and which columns become which document fields. Processing a
//! spec yields one [`BulkDocument`] per usable row; rows without an id or
//! with a value that does not convert are skipped and counted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::resolve_with_base;
use crate::error::{Error, Result};

/// Conversion applied to a cell before it lands in the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    #[default]
    Text,
    /// First run of four digits, e.g. `1925-04-10` or `TV Movie 2019`.
    Year,
    Integer,
    Float,
    /// A JSON object of `freebase id -> label`, rendered as `a, b, c`.
    FreebaseLabels,
}

impl Transform {
    /// `Ok(None)` for empty cells.
    pub fn apply(self, raw: &str) -> std::result::Result<Option<Value>, String> {
        let cell = raw.trim();
        if cell.is_empty() {
            return Ok(None);
        }
        match self {
            Transform::Text => Ok(Some(Value::String(cell.to_string()))),
            Transform::Year => extract_year(cell)
                .map(|y| Some(Value::from(y)))
                .ok_or_else(|| format!("no year in '{}'", cell)),
            Transform::Integer => {
                let digits: String = cell.chars().filter(|c| *c != ',' && *c != '_').collect();
                digits
                    .parse::<i64>()
                    .map(|n| Some(Value::from(n)))
                    .map_err(|e| format!("'{}' is not an integer: {}", cell, e))
            }
            Transform::Float => {
                let digits: String = cell.chars().filter(|c| *c != ',').collect();
                let n = digits
                    .parse::<f64>()
                    .map_err(|e| format!("'{}' is not a number: {}", cell, e))?;
                Number::from_f64(n)
                    .map(|n| Some(Value::Number(n)))
                    .ok_or_else(|| format!("'{}' is not a finite number", cell))
            }
            Transform::FreebaseLabels => {
                let parsed: Map<String, Value> = serde_json::from_str(cell)
                    .map_err(|e| format!("genre map '{}' is not a JSON object: {}", cell, e))?;
                let labels: Vec<&str> = parsed.values().filter_map(Value::as_str).collect();
                if labels.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Value::String(labels.join(", "))))
                }
            }
        }
    }
}

fn extract_year(cell: &str) -> Option<i64> {
    let bytes = cell.as_bytes();
    let mut run = 0;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            run += 1;
            let next_is_digit = bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
            if run == 4 && !next_is_digit {
                return cell[i + 1 - 4..=i].parse().ok();
            }
        } else {
            run = 0;
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub field: String,
    pub column: String,
    #[serde(default)]
    pub transform: Transform,
}

impl FieldMapping {
    pub fn new(field: &str, column: &str, transform: Transform) -> Self {
        Self { field: field.to_string(), column: column.to_string(), transform }
    }
}

fn default_delimiter() -> char { ',' }
fn default_true() -> bool { true }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub name: String,
    pub path: String,
    pub index: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_true")]
    pub has_headers: bool,
    #[serde(default = "default_true")]
    pub quoting: bool,
    /// Column names for files without a header row.
    #[serde(default)]
    pub columns: Vec<String>,
    pub id_column: String,
    pub fields: Vec<FieldMapping>,
}

impl DatasetSpec {
    /// CMU book summaries plus the IMDb movies and ratings extracts.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                name: "books".into(),
                path: "data/raw/booksummaries.txt".into(),
                index: "book".into(),
                delimiter: '\t',
                has_headers: false,
                quoting: false,
                columns: ["wikipedia_id", "freebase_id", "title", "author", "publication_date", "genres", "summary"]
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
                id_column: "wikipedia_id".into(),
                fields: vec![
                    FieldMapping::new("title", "title", Transform::Text),
                    FieldMapping::new("author", "author", Transform::Text),
                    FieldMapping::new("publication_year", "publication_date", Transform::Year),
                    FieldMapping::new("genres", "genres", Transform::FreebaseLabels),
                    FieldMapping::new("summary", "summary", Transform::Text),
                ],
            },
            Self {
                name: "movies".into(),
                path: "data/raw/IMDb movies.csv".into(),
                index: "movie".into(),
                delimiter: ',',
                has_headers: true,
                quoting: true,
                columns: Vec::new(),
                id_column: "imdb_title_id".into(),
                fields: vec![
                    FieldMapping::new("title", "title", Transform::Text),
                    FieldMapping::new("publication_year", "year", Transform::Year),
                    FieldMapping::new("genres", "genre", Transform::Text),
                    FieldMapping::new("summary", "description", Transform::Text),
                    FieldMapping::new("actors", "actors", Transform::Text),
                    FieldMapping::new("director", "director", Transform::Text),
                ],
            },
            Self {
                name: "ratings".into(),
                path: "data/raw/IMDb ratings.csv".into(),
                index: "rating".into(),
                delimiter: ',',
                has_headers: true,
                quoting: true,
                columns: Vec::new(),
                id_column: "imdb_title_id".into(),
                fields: vec![
                    FieldMapping::new("mean_rating", "mean_vote", Transform::Float),
                    FieldMapping::new("total_votes", "total_votes", Transform::Integer),
                ],
            },
        ]
    }
}

/// One document ready for the `_bulk` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkDocument {
    pub id: String,
    pub source: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    pub rows_read: usize,
    pub documents: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct ProcessedDataset {
    pub index: String,
    pub documents: Vec<BulkDocument>,
    pub report: ProcessReport,
}

pub struct DatasetProcessor {
    base_dir: PathBuf,
}

impl DatasetProcessor {
    /// Relative dataset paths resolve against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn source_path(&self, spec: &DatasetSpec) -> PathBuf {
        resolve_with_base(&self.base_dir, &spec.path)
    }

    pub fn process(&self, spec: &DatasetSpec) -> Result<ProcessedDataset> {
        let path = self.source_path(spec);
        info!(dataset = %spec.name, path = %path.display(), "reading dataset");
        let file = fs::File::open(&path)
            .map_err(|e| Error::NotFound(format!("{}: {}", path.display(), e)))?;
        self.process_reader(spec, file)
    }

    pub fn process_reader<R: std::io::Read>(&self, spec: &DatasetSpec, reader: R) -> Result<ProcessedDataset> {
        let delimiter = u8::try_from(spec.delimiter).map_err(|_| {
            Error::InvalidConfig(format!("dataset '{}': delimiter must be ASCII", spec.name))
        })?;
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(spec.has_headers)
            .quoting(spec.quoting)
            .flexible(true)
            .from_reader(reader);

        let header: Vec<String> = if spec.has_headers {
            rdr.headers()?.iter().map(|h| h.trim().to_string()).collect()
        } else {
            spec.columns.clone()
        };
        let position = |column: &str| -> Result<usize> {
            header.iter().position(|h| h == column).ok_or_else(|| {
                Error::InvalidConfig(format!("dataset '{}': unknown column '{}'", spec.name, column))
            })
        };
        let id_pos = position(&spec.id_column)?;
        let field_pos = spec
            .fields
            .iter()
            .map(|f| position(&f.column).map(|p| (f, p)))
            .collect::<Result<Vec<_>>>()?;

        let mut report = ProcessReport::default();
        let mut documents = Vec::new();
        let first_row: u64 = if spec.has_headers { 2 } else { 1 };
        for (row_index, record) in rdr.records().enumerate() {
            let row = first_row + row_index as u64;
            report.rows_read += 1;
            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    warn!(dataset = %spec.name, row, "skipping unreadable row: {}", e);
                    report.skipped += 1;
                    continue;
                }
            };
            match Self::row_to_document(&record, id_pos, &field_pos) {
                Ok(doc) => documents.push(doc),
                Err(message) => {
                    warn!(dataset = %spec.name, row, "skipping row: {}", message);
                    report.skipped += 1;
                }
            }
        }
        report.documents = documents.len();
        info!(
            dataset = %spec.name,
            rows = report.rows_read,
            documents = report.documents,
            skipped = report.skipped,
            "processed dataset"
        );
        Ok(ProcessedDataset { index: spec.index.clone(), documents, report })
    }

    fn row_to_document(
        record: &csv::StringRecord,
        id_pos: usize,
        field_pos: &[(&FieldMapping, usize)],
    ) -> std::result::Result<BulkDocument, String> {
        let id = record.get(id_pos).map(str::trim).unwrap_or_default();
        if id.is_empty() {
            return Err("empty id".to_string());
        }
        let mut source = Map::new();
        for (mapping, pos) in field_pos {
            let raw = record.get(*pos).unwrap_or_default();
            if let Some(value) = mapping.transform.apply(raw).map_err(|e| format!("{}: {}", mapping.field, e))? {
                source.insert(mapping.field.clone(), value);
            }
        }
        Ok(BulkDocument { id: id.to_string(), source })
    }
}

/// Renders documents as an `_bulk` request body: an `index` action line
/// followed by the document source, one JSON value per line.
pub fn to_ndjson(documents: &[BulkDocument]) -> Result<String> {
    let mut body = String::new();
    for doc in documents {
        let action = serde_json::json!({ "index": { "_id": doc.id } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&doc.source)?);
        body.push('\n');
    }
    Ok(body)
}

/// Parses a body produced by [`to_ndjson`].
pub fn parse_ndjson(body: &str) -> Result<Vec<BulkDocument>> {
    let mut lines = body.lines().filter(|l| !l.trim().is_empty()).enumerate();
    let mut documents = Vec::new();
    while let Some((n, action_line)) = lines.next() {
        let action: Value = serde_json::from_str(action_line)?;
        let id = action
            .get("index")
            .and_then(|a| a.get("_id"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Dataset { row: n as u64 + 1, message: "action line without index._id".into() })?
            .to_string();
        let (_, source_line) = lines
            .next()
            .ok_or_else(|| Error::Dataset { row: n as u64 + 2, message: "missing document line".into() })?;
        let source: Map<String, Value> = serde_json::from_str(source_line)?;
        documents.push(BulkDocument { id, source });
    }
    Ok(documents)
}

pub fn write_ndjson(path: &Path, documents: &[BulkDocument]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_ndjson(documents)?)?;
    Ok(())
}

pub fn read_ndjson(path: &Path) -> Result<Vec<BulkDocument>> {
    parse_ndjson(&fs::read_to_string(path)?)
}

/// Every `*.ndjson` file under `dir`, sorted, keyed by file stem.
pub fn list_ndjson_files(dir: &Path) -> Vec<(String, PathBuf)> {
    let mut files: Vec<(String, PathBuf)> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("ndjson"))
        .filter_map(|e| {
            let stem = e.path().file_stem()?.to_str()?.to_string();
            Some((stem, e.path().to_path_buf()))
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn year_takes_first_four_digit_run() {
        assert_eq!(Transform::Year.apply("1925-04-10").unwrap(), Some(json!(1925)));
        assert_eq!(Transform::Year.apply("TV Movie 2019").unwrap(), Some(json!(2019)));
        assert!(Transform::Year.apply("12345").is_err());
        assert_eq!(Transform::Year.apply("  ").unwrap(), None);
    }

    #[test]
    fn numbers_ignore_thousand_separators() {
        assert_eq!(Transform::Integer.apply("1,234").unwrap(), Some(json!(1234)));
        assert_eq!(Transform::Float.apply("7.5").unwrap(), Some(json!(7.5)));
        assert!(Transform::Integer.apply("many").is_err());
    }

    #[test]
    fn freebase_labels_become_a_list() {
        let cell = r#"{"/m/01hmnh": "Fantasy", "/m/0dwly": "Children's literature"}"#;
        assert_eq!(
            Transform::FreebaseLabels.apply(cell).unwrap(),
            Some(json!("Fantasy, Children's literature"))
        );
        assert_eq!(Transform::FreebaseLabels.apply("{}").unwrap(), None);

        let unsorted = r#"{"/m/0z": "Science Fiction", "/m/01": "Novel"}"#;
        assert_eq!(Transform::FreebaseLabels.apply(unsorted).unwrap(), Some(json!("Science Fiction, Novel")));
    }

    #[test]
    fn ndjson_pairs_action_and_source_lines() {
        let mut source = Map::new();
        source.insert("title".into(), json!("Heat"));
        let docs = vec![BulkDocument { id: "tt0113277".into(), source }];
        let body = to_ndjson(&docs).unwrap();
        assert_eq!(body, "{\"index\":{\"_id\":\"tt0113277\"}}\n{\"title\":\"Heat\"}\n");
        assert_eq!(parse_ndjson(&body).unwrap(), docs);
    }

    #[test]
    fn undecodable_row_is_skipped_between_good_rows() {
        let ratings = DatasetSpec::defaults().into_iter().find(|s| s.name == "ratings").unwrap();
        let mut raw = b"imdb_title_id,mean_vote,total_votes\ntt1,8.1,100\ntt2,7.0,".to_vec();
        raw.extend_from_slice(&[0xff, 0xfe]);
        raw.extend_from_slice(b"\ntt3,6.0,50\n");

        let out = DatasetProcessor::new(".").process_reader(&ratings, raw.as_slice()).unwrap();
        let ids: Vec<&str> = out.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["tt1", "tt3"]);
        assert_eq!(out.report, ProcessReport { rows_read: 3, documents: 2, skipped: 1 });
    }

    #[test]
    fn parse_ndjson_rejects_dangling_action() {
        let err = parse_ndjson("{\"index\":{\"_id\":\"1\"}}\n").unwrap_err();
        assert!(matches!(err, Error::Dataset { .. }));
    }
}
