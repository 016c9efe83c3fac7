use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array};
use arrow::compute::{can_cast_types, cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::DataLoadError;
use super::model::{EmissionsRecord, EmissionsTable, Source};

pub type Result<T> = std::result::Result<T, DataLoadError>;

const COUNTRY: &str = "Country";
const YEAR: &str = "Year";

// ---------------------------------------------------------------------------
// Cleaning policy
// ---------------------------------------------------------------------------

/// How raw rows are turned into the canonical table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoaderConfig {
    /// Earliest year kept.
    pub cutoff_year: i32,
    /// Aggregate entities that are not countries.
    pub excluded: BTreeSet<String>,
    /// Alias → canonical country name.
    pub aliases: BTreeMap<String, String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            cutoff_year: 2002,
            excluded: ["Global", "International Transport", "Kuwaiti Oil Fires", "Antarctica"]
                .into_iter()
                .map(String::from)
                .collect(),
            aliases: [("USA".to_string(), "United States".to_string())]
                .into_iter()
                .collect(),
        }
    }
}

impl LoaderConfig {
    pub fn with_cutoff_year(mut self, year: i32) -> Self {
        self.cutoff_year = year;
        self
    }

    /// Apply the cleaning steps in order: drop non-countries, merge aliases,
    /// drop rows before the cutoff.
    pub fn prepare(&self, raw: Vec<EmissionsRecord>) -> EmissionsTable {
        let raw_len = raw.len();
        let records: Vec<EmissionsRecord> = raw
            .into_iter()
            .filter(|r| !self.excluded.contains(&r.country))
            .map(|mut r| {
                if let Some(canonical) = self.aliases.get(&r.country) {
                    r.country = canonical.clone();
                }
                r
            })
            .filter(|r| r.year >= self.cutoff_year)
            .collect();

        log::debug!("Kept {} of {raw_len} raw rows", records.len());
        EmissionsTable::from_records(records)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load and clean an emissions table.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with at least `Country`, `Year` and the seven
///                source columns; extra columns are ignored
/// * `.json`    – `[{ "Country": "...", "Year": 2002, "Total": 1.0, ... }, ...]`
/// * `.parquet` – one column per field, nulls for blank cells
pub fn load_file(path: &Path, config: &LoaderConfig) -> Result<EmissionsTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let raw = match ext.as_str() {
        "csv" => read_csv(path)?,
        "json" => read_json(path)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => return Err(DataLoadError::UnsupportedFormat(other.to_string())),
    };

    let table = config.prepare(raw);
    log::info!(
        "Loaded {} records for {} countries ({:?}..={:?}) from {}",
        table.len(),
        table.countries().len(),
        table.min_year(),
        table.max_year(),
        path.display()
    );
    Ok(table)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| DataLoadError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn required_columns() -> impl Iterator<Item = &'static str> {
    [COUNTRY, YEAR]
        .into_iter()
        .chain(Source::ALL.into_iter().map(Source::column))
}

// ---------------------------------------------------------------------------
// Cell conversion shared by all formats
// ---------------------------------------------------------------------------

/// A single input cell before it is typed.
enum Cell<'a> {
    Null,
    Text(&'a str),
    Number(f64),
}

fn invalid(row: usize, column: &str, value: impl ToString) -> DataLoadError {
    DataLoadError::InvalidValue {
        row,
        column: column.to_string(),
        value: value.to_string(),
    }
}

fn to_country(cell: Cell<'_>, row: usize) -> Result<String> {
    match cell {
        Cell::Text(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Cell::Number(n) => Err(invalid(row, COUNTRY, n)),
        _ => Err(invalid(row, COUNTRY, "")),
    }
}

fn to_year(cell: Cell<'_>, row: usize) -> Result<i32> {
    let n = match cell {
        Cell::Number(n) => n,
        Cell::Text(s) => s.trim().parse::<f64>().map_err(|_| invalid(row, YEAR, s))?,
        Cell::Null => return Err(invalid(row, YEAR, "")),
    };
    // Accept "2002" as well as "2002.0", reject fractional years.
    if n.fract() != 0.0 || n < i32::MIN as f64 || n > i32::MAX as f64 {
        return Err(invalid(row, YEAR, n));
    }
    Ok(n as i32)
}

fn to_amount(cell: Cell<'_>, row: usize, column: &str) -> Result<Option<f64>> {
    let n = match cell {
        Cell::Null => return Ok(None),
        Cell::Number(n) => n,
        Cell::Text(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("nan") {
                return Ok(None);
            }
            s.parse::<f64>().map_err(|_| invalid(row, column, s))?
        }
    };
    if n.is_nan() {
        return Ok(None);
    }
    if !n.is_finite() {
        return Err(invalid(row, column, n));
    }
    Ok(Some(n))
}

/// Assemble one record; `cell` yields the raw cell for a column name.
fn build_record<'a>(row: usize, mut cell: impl FnMut(&str) -> Cell<'a>) -> Result<EmissionsRecord> {
    let country = to_country(cell(COUNTRY), row)?;
    let year = to_year(cell(YEAR), row)?;
    let mut record = EmissionsRecord::empty(country, year);
    for source in Source::ALL {
        *record.slot_mut(source) = to_amount(cell(source.column()), row, source.column())?;
    }
    Ok(record)
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<Vec<EmissionsRecord>> {
    let mut reader = csv::Reader::from_reader(open(path)?);
    let headers = reader.headers()?.clone();

    let mut positions = BTreeMap::new();
    for column in required_columns() {
        let idx = headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| DataLoadError::MissingColumn {
                column: column.to_string(),
            })?;
        positions.insert(column, idx);
    }

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let row = result?;
        let record = build_record(i + 1, |column| {
            positions
                .get(column)
                .and_then(|&idx| row.get(idx))
                .map_or(Cell::Null, Cell::Text)
        })?;
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

fn read_json(path: &Path) -> Result<Vec<EmissionsRecord>> {
    let rows: Vec<serde_json::Map<String, JsonValue>> =
        serde_json::from_reader(std::io::BufReader::new(open(path)?))?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, obj) in rows.iter().enumerate() {
        if let Some(column) = required_columns().find(|c| !obj.contains_key(*c)) {
            return Err(DataLoadError::MissingColumn {
                column: column.to_string(),
            });
        }
        let record = build_record(i + 1, |column| match obj.get(column) {
            Some(JsonValue::String(s)) => Cell::Text(s.as_str()),
            Some(JsonValue::Number(n)) => n.as_f64().map_or(Cell::Null, Cell::Number),
            _ => Cell::Null,
        })?;
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

fn read_parquet(path: &Path) -> Result<Vec<EmissionsRecord>> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;
    let reader = builder.build()?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;

        let country_column = column_as(&batch, COUNTRY, &DataType::Utf8)?;
        let countries = country_column
            .as_string_opt::<i32>()
            .ok_or_else(|| unsupported(COUNTRY, country_column.data_type(), &DataType::Utf8))?;

        let numeric_columns = [YEAR]
            .into_iter()
            .chain(Source::ALL.into_iter().map(Source::column))
            .map(|column| Ok((column, column_as(&batch, column, &DataType::Float64)?)))
            .collect::<Result<Vec<(&str, ArrayRef)>>>()?;
        let mut numeric: BTreeMap<&str, &Float64Array> = BTreeMap::new();
        for (column, array) in &numeric_columns {
            let values = array
                .as_primitive_opt::<Float64Type>()
                .ok_or_else(|| unsupported(column, array.data_type(), &DataType::Float64))?;
            numeric.insert(*column, values);
        }

        for row in 0..batch.num_rows() {
            let row_no = records.len() + 1;
            let record = build_record(row_no, |column| {
                if column == COUNTRY {
                    return if countries.is_null(row) {
                        Cell::Null
                    } else {
                        Cell::Text(countries.value(row))
                    };
                }
                match numeric.get(column) {
                    Some(values) if !values.is_null(row) => Cell::Number(values.value(row)),
                    _ => Cell::Null,
                }
            })?;
            records.push(record);
        }
    }
    Ok(records)
}

fn unsupported(column: &str, found: &DataType, expected: &DataType) -> DataLoadError {
    DataLoadError::UnsupportedColumnType {
        column: column.to_string(),
        found: found.to_string(),
        expected: expected.to_string(),
    }
}

/// Fetch `column` from the batch as type `to`, casting the whole column once.
///
/// The cast is strict: a value that does not convert fails the load instead
/// of turning into a null.
fn column_as(batch: &RecordBatch, column: &str, to: &DataType) -> Result<ArrayRef> {
    let idx = batch
        .schema()
        .index_of(column)
        .map_err(|_| DataLoadError::MissingColumn {
            column: column.to_string(),
        })?;
    let array = batch.column(idx);
    if array.data_type() == to {
        return Ok(array.clone());
    }
    if !can_cast_types(array.data_type(), to) {
        return Err(unsupported(column, array.data_type(), to));
    }
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    cast_with_options(array, to, &options)
        .map_err(|e| DataLoadError::Parquet(format!("column '{column}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{DictionaryArray, Int64Array, ListArray, StringArray, UInt16Array, UInt32Array};
    use arrow::datatypes::Int32Type;
    use arrow::datatypes::{Field, Schema};
    use parquet::arrow::ArrowWriter;
    use tempfile::tempdir;

    const HEADER: &str = "Country,ISO 3166-1 alpha-3,Year,Total,Coal,Oil,Gas,Cement,Flaring,Other,Per Capita";

    fn write_csv(dir: &Path, name: &str, rows: &[&str]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        path
    }

    #[test]
    fn csv_is_cleaned_in_order() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "data.csv",
            &[
                "Global,WLD,2010,100,1,1,1,1,1,1,",
                "USA,USA,2010,50,10,20,15,1,2,2,16.1",
                "USA,USA,2001,48,10,20,15,1,1,1,16.0",
                "Antarctica,ATA,2010,0,0,0,0,0,0,0,",
                "Kuwaiti Oil Fires,,2010,0,0,0,0,0,0,0,",
                "Germany,DEU,2002,850,300,300,200,20,10,20,10.3",
                "Germany,DEU,2003,,300,300,200,20,10,20,10.3",
            ],
        );

        let table = load_file(&path, &LoaderConfig::default()).unwrap();

        assert_eq!(table.countries(), ["Germany", "United States"]);
        assert_eq!(table.len(), 3);
        assert!(table.records().iter().all(|r| r.year >= 2002));
        assert_eq!(table.value("United States", 2010, Source::Oil), Some(20.0));
        assert_eq!(table.value("Germany", 2003, Source::Total), None);
        assert_eq!(table.value("Germany", 2003, Source::Coal), Some(300.0));
    }

    #[test]
    fn loading_twice_yields_equal_tables() {
        let dir = tempdir().unwrap();
        let path = write_csv(dir.path(), "data.csv", &["Chile,CHL,2005,80,10,40,20,5,1,4,"]);
        let config = LoaderConfig::default();

        assert_eq!(load_file(&path, &config).unwrap(), load_file(&path, &config).unwrap());
    }

    #[test]
    fn cutoff_is_configurable() {
        let dir = tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "data.csv",
            &["Chile,CHL,1995,80,10,40,20,5,1,4,", "Chile,CHL,2005,90,10,40,20,5,1,4,"],
        );

        let table = load_file(&path, &LoaderConfig::default().with_cutoff_year(1990)).unwrap();
        assert_eq!(table.years(), [1995, 2005]);
    }

    #[test]
    fn missing_column_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "Country,Year,Total\nChile,2005,1\n").unwrap();

        let err = load_file(&path, &LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingColumn { ref column } if column == "Coal"));
    }

    #[test]
    fn invalid_number_is_reported_with_row() {
        let dir = tempdir().unwrap();
        let path = write_csv(dir.path(), "data.csv", &["Chile,CHL,2005,lots,10,40,20,5,1,4,"]);

        let err = load_file(&path, &LoaderConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::InvalidValue { row: 1, ref column, .. } if column == "Total"
        ));
    }

    #[test]
    fn missing_file_and_unknown_extension_fail() {
        let dir = tempdir().unwrap();
        let config = LoaderConfig::default();

        let err = load_file(&dir.path().join("nope.csv"), &config).unwrap_err();
        assert!(matches!(err, DataLoadError::Open { .. }));

        let err = load_file(&dir.path().join("data.xlsx"), &config).unwrap_err();
        assert!(matches!(err, DataLoadError::UnsupportedFormat(ref ext) if ext == "xlsx"));
    }

    #[test]
    fn json_records_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"[
                {"Country": "USA", "Year": 2020, "Total": 4700.5, "Coal": 900.0, "Oil": 2000.0,
                 "Gas": 1600.0, "Cement": 40.0, "Flaring": 60.0, "Other": null},
                {"Country": "Global", "Year": 2020, "Total": 1.0, "Coal": 1.0, "Oil": 1.0,
                 "Gas": 1.0, "Cement": 1.0, "Flaring": 1.0, "Other": 1.0}
            ]"#,
        )
        .unwrap();

        let table = load_file(&path, &LoaderConfig::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.value("United States", 2020, Source::Total), Some(4700.5));
        assert_eq!(table.value("United States", 2020, Source::Other), None);
    }

    fn write_parquet(path: &Path, fields: Vec<Field>, arrays: Vec<ArrayRef>) {
        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), arrays).unwrap();
        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn parquet_columns_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.parquet");

        let mut fields = vec![
            Field::new(COUNTRY, DataType::Utf8, false),
            Field::new(YEAR, DataType::Int64, false),
        ];
        let mut arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec!["India", "India", "International Transport"])),
            Arc::new(Int64Array::from(vec![2001, 2002, 2002])),
        ];
        for source in Source::ALL {
            fields.push(Field::new(source.column(), DataType::Float64, true));
            arrays.push(Arc::new(Float64Array::from(vec![Some(1.0), None, Some(3.0)])));
        }
        write_parquet(&path, fields, arrays);

        let table = load_file(&path, &LoaderConfig::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.countries(), ["India"]);
        assert_eq!(table.value("India", 2002, Source::Gas), None);
        assert!(table.get("India", 2002).is_some());
    }

    #[test]
    fn parquet_unsigned_and_dictionary_columns_are_cast() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.parquet");

        let countries: DictionaryArray<Int32Type> = vec!["Chile", "Peru"].into_iter().collect();
        let mut fields = vec![
            Field::new(COUNTRY, countries.data_type().clone(), false),
            Field::new(YEAR, DataType::UInt16, false),
        ];
        let mut arrays: Vec<ArrayRef> = vec![
            Arc::new(countries),
            Arc::new(UInt16Array::from(vec![2010, 2011])),
        ];
        for source in Source::ALL {
            fields.push(Field::new(source.column(), DataType::UInt32, true));
            arrays.push(Arc::new(UInt32Array::from(vec![Some(42), None])));
        }
        write_parquet(&path, fields, arrays);

        let table = load_file(&path, &LoaderConfig::default()).unwrap();
        assert_eq!(table.countries(), ["Chile", "Peru"]);
        assert_eq!(table.value("Chile", 2010, Source::Coal), Some(42.0));
        assert_eq!(table.value("Peru", 2011, Source::Coal), None);
    }

    #[test]
    fn uncastable_columns_fail_the_load() {
        let list = ListArray::from_iter_primitive::<Int32Type, _, _>(vec![Some(vec![Some(1)])]);
        let words = StringArray::from(vec!["lots"]);
        let schema = Arc::new(Schema::new(vec![
            Field::new("Total", list.data_type().clone(), true),
            Field::new("Coal", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(schema, vec![Arc::new(list), Arc::new(words)]).unwrap();

        let err = column_as(&batch, "Total", &DataType::Float64).unwrap_err();
        assert!(matches!(err, DataLoadError::UnsupportedColumnType { ref column, .. } if column == "Total"));

        let err = column_as(&batch, "Coal", &DataType::Float64).unwrap_err();
        assert!(matches!(err, DataLoadError::Parquet(ref msg) if msg.contains("Coal")));

        let err = column_as(&batch, "Gas", &DataType::Float64).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingColumn { .. }));
    }

    #[test]
    fn serialized_records_load_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("written.csv");
        let rows = vec![
            EmissionsRecord::empty("Chile", 2005).with(Source::Total, 80.0).with(Source::Coal, 10.0),
            EmissionsRecord::empty("Peru", 2006).with(Source::Oil, 12.5),
        ];
        let mut writer = csv::Writer::from_path(&path).unwrap();
        for row in &rows {
            writer.serialize(row).unwrap();
        }
        writer.flush().unwrap();

        let table = load_file(&path, &LoaderConfig::default()).unwrap();
        assert_eq!(table.records(), rows.as_slice());
    }
}
