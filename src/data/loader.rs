use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use serde::Deserialize;

use super::error::{AtlasError, Result};
use super::model::{
    EmissionRecord, EmissionTable, COLUMNS, COMMUNE, COMMUNE_ID, POLLUTANT, REGION, SOURCE_TYPE,
    TONNAGE, YEAR,
};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the emissions table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – the seven data columns are projected, everything else is skipped
/// * `.csv`     – header row with the same column names
///
/// Label columns are dictionary-encoded, `ano` is narrowed to `i16`,
/// `id_comuna` to `i32` and `cantidad_toneladas` to `f32`. Values are not
/// range-checked beyond what the narrowing requires. Integer columns may
/// arrive as whole-number floats, and label columns as numeric codes.
pub fn load_table(path: &Path) -> Result<EmissionTable> {
    if !path.is_file() {
        log::error!("Data file {} does not exist", path.display());
        return Err(AtlasError::DataUnavailable {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let loaded = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "csv" => load_csv(path),
        other => Err(anyhow!("Unsupported file extension: .{other}")),
    };

    match loaded {
        Ok(table) => {
            if table.is_empty() {
                log::warn!("{} holds no emission records", path.display());
            }
            log::info!(
                "Loaded {} emission records from {} ({} regions, {} communes)",
                table.len(),
                path.display(),
                table.region.cardinality(),
                table.commune.cardinality()
            );
            Ok(table)
        }
        Err(e) => {
            log::error!("Failed to load {}: {e:#}", path.display());
            Err(AtlasError::DataCorrupt {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`, including
/// `category` columns, which arrive as dictionary arrays) and **Polars**.
fn load_parquet(path: &Path) -> anyhow::Result<EmissionTable> {
    let file = File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;

    let roots = COLUMNS
        .iter()
        .map(|name| {
            builder
                .schema()
                .index_of(name)
                .map_err(|_| anyhow!("Parquet file missing '{name}' column"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mask = ProjectionMask::roots(builder.parquet_schema(), roots);

    let reader = builder
        .with_projection(mask)
        .build()
        .context("building parquet reader")?;

    let mut table = EmissionTable::default();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        append_batch(&mut table, &batch)?;
    }
    Ok(table)
}

fn append_batch(table: &mut EmissionTable, batch: &RecordBatch) -> anyhow::Result<()> {
    let years = integer_column(column(batch, YEAR)?, YEAR)?;
    let ids = integer_column(column(batch, COMMUNE_ID)?, COMMUNE_ID)?;
    let tonnage = float_column(column(batch, TONNAGE)?, TONNAGE)?;
    let regions = label_column(column(batch, REGION)?, REGION)?;
    let communes = label_column(column(batch, COMMUNE)?, COMMUNE)?;
    let sources = label_column(column(batch, SOURCE_TYPE)?, SOURCE_TYPE)?;
    let pollutants = label_column(column(batch, POLLUTANT)?, POLLUTANT)?;

    let years = years.as_primitive::<Int64Type>();
    let ids = ids.as_primitive::<Int64Type>();
    let tonnage = tonnage.as_primitive::<Float32Type>();
    let regions = regions.as_string::<i32>();
    let communes = communes.as_string::<i32>();
    let sources = sources.as_string::<i32>();
    let pollutants = pollutants.as_string::<i32>();

    for row in 0..batch.num_rows() {
        let record = EmissionRecord {
            year: narrow(years.value(row), YEAR, row)?,
            region: regions.value(row).to_owned(),
            commune: communes.value(row).to_owned(),
            commune_id: narrow(ids.value(row), COMMUNE_ID, row)?,
            source_type: sources.value(row).to_owned(),
            pollutant: pollutants.value(row).to_owned(),
            tonnage: if tonnage.is_null(row) {
                f32::NAN
            } else {
                tonnage.value(row)
            },
        };
        table.push(&record);
    }
    Ok(())
}

// -- Arrow coercion helpers --

fn column<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .with_context(|| format!("record batch missing '{name}' column"))
}

/// Any integer column, or a float column holding whole numbers, widened to
/// Int64 so it can be narrowed per row.
fn integer_column(col: &ArrayRef, name: &str) -> anyhow::Result<ArrayRef> {
    let data_type = col.data_type();
    if !(data_type.is_integer() || data_type.is_floating()) {
        bail!("Column '{name}' has type {data_type:?}, expected an integer type");
    }
    reject_nulls(col, name)?;
    if data_type.is_floating() {
        whole_numbers(col, name)?;
    }
    let widened = cast(col.as_ref(), &DataType::Int64)
        .with_context(|| format!("coercing '{name}' to Int64"))?;
    // Safe casting turns u64 and float overflow into nulls.
    if widened.null_count() > 0 {
        bail!("Column '{name}' holds values outside the Int64 range");
    }
    Ok(widened)
}

/// Pandas stores integer columns as float64 once they have held a NaN.
fn whole_numbers(col: &ArrayRef, name: &str) -> anyhow::Result<()> {
    let floats = cast(col.as_ref(), &DataType::Float64)
        .with_context(|| format!("coercing '{name}' to Float64"))?;
    let floats = floats.as_primitive::<Float64Type>();
    match floats
        .values()
        .iter()
        .position(|v| !v.is_finite() || v.fract() != 0.0)
    {
        Some(row) => bail!(
            "Row {row}: '{name}' value {} is not a whole number",
            floats.value(row)
        ),
        None => Ok(()),
    }
}

/// Any numeric column, narrowed to Float32. Nulls are kept and read as NaN.
fn float_column(col: &ArrayRef, name: &str) -> anyhow::Result<ArrayRef> {
    if !col.data_type().is_numeric() {
        bail!(
            "Column '{name}' has type {:?}, expected a numeric type",
            col.data_type()
        );
    }
    cast(col.as_ref(), &DataType::Float32).with_context(|| format!("coercing '{name}' to Float32"))
}

/// Strings, or scalar codes (integers, floats, booleans) rendered as text.
/// Dictionaries of either are decoded to Utf8.
fn label_column(col: &ArrayRef, name: &str) -> anyhow::Result<ArrayRef> {
    let is_label = |dt: &DataType| {
        matches!(
            dt,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View | DataType::Boolean
        ) || dt.is_integer()
            || dt.is_floating()
    };
    let accepted = match col.data_type() {
        DataType::Dictionary(_, values) => is_label(values),
        other => is_label(other),
    };
    if !accepted {
        bail!(
            "Column '{name}' has type {:?}, expected a string or categorical type",
            col.data_type()
        );
    }
    reject_nulls(col, name)?;
    cast(col.as_ref(), &DataType::Utf8).with_context(|| format!("decoding '{name}' labels"))
}

fn reject_nulls(col: &ArrayRef, name: &str) -> anyhow::Result<()> {
    match col.null_count() {
        0 => Ok(()),
        n => bail!("Column '{name}' contains {n} null values"),
    }
}

fn narrow<T: TryFrom<i64>>(value: i64, name: &str, row: usize) -> anyhow::Result<T> {
    T::try_from(value).map_err(|_| {
        anyhow!(
            "Row {row}: '{name}' value {value} does not fit in {}",
            std::any::type_name::<T>()
        )
    })
}

/// CSV cells are parsed as floats so `2020.0` reads like `2020`.
fn narrow_whole<T: TryFrom<i64>>(value: f64, name: &str, row: usize) -> anyhow::Result<T> {
    if !value.is_finite() || value.fract() != 0.0 {
        bail!("Row {row}: '{name}' value {value} is not a whole number");
    }
    if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        bail!("Row {row}: '{name}' value {value} is outside the Int64 range");
    }
    narrow(value as i64, name, row)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// One CSV row, keyed by header name. Extra columns are ignored; an empty
/// tonnage cell is read as NaN.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "ano")]
    year: f64,
    region: String,
    #[serde(rename = "comuna")]
    commune: String,
    #[serde(rename = "id_comuna")]
    commune_id: f64,
    #[serde(rename = "tipo_fuente")]
    source_type: String,
    #[serde(rename = "contaminantes")]
    pollutant: String,
    #[serde(rename = "cantidad_toneladas")]
    tonnage: Option<f64>,
}

fn load_csv(path: &Path) -> anyhow::Result<EmissionTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();
    if let Some(missing) = COLUMNS
        .iter()
        .copied()
        .find(|name| !headers.iter().any(|h| h == *name))
    {
        bail!("CSV missing '{missing}' column");
    }

    let mut table = EmissionTable::default();
    for (row_no, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let record = EmissionRecord {
            year: narrow_whole(row.year, YEAR, row_no)?,
            region: row.region,
            commune: row.commune,
            commune_id: narrow_whole(row.commune_id, COMMUNE_ID, row_no)?,
            source_type: row.source_type,
            pollutant: row.pollutant,
            tonnage: row.tonnage.map_or(f32::NAN, |t| t as f32),
        };
        table.push(&record);
    }
    Ok(table)
}
