use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, DictionaryArray, Float32Array, Int16Array, Int32Array};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::{json, Value};

const REGIONS: [&str; 4] = ["Maule", "Ñuble", "Biobío", "La Araucanía"];
const COMMUNES_PER_REGION: i32 = 5;
const SOURCES: [(&str, f32); 3] = [
    ("Combustión residencial de leña", 120.0),
    ("Incendios forestales", 40.0),
    ("Quemas agrícolas", 15.0),
];
const POLLUTANTS: [(&str, f32); 4] = [("MP2,5", 1.0), ("MP10", 1.1), ("CO", 6.5), ("NOx", 0.4)];
const YEARS: std::ops::RangeInclusive<i16> = 2019..=2023;

/// Small deterministic generator (64-bit LCG, high bits only).
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 40) as f32 / (1u64 << 24) as f32
    }
}

#[derive(Default)]
struct Columns {
    year: Vec<i16>,
    region: Vec<String>,
    commune: Vec<String>,
    commune_id: Vec<i32>,
    source: Vec<String>,
    pollutant: Vec<String>,
    tonnage: Vec<f32>,
}

fn commune_name(id: i32) -> String {
    format!("Comuna {id:02}")
}

fn build_rows(rng: &mut Lcg) -> Columns {
    let mut cols = Columns::default();
    // 21 and 22 have emissions but no polygon.
    let ids = (1..=REGIONS.len() as i32 * COMMUNES_PER_REGION).chain([21, 22]);

    for id in ids {
        let region = REGIONS[((id - 1) / COMMUNES_PER_REGION) as usize % REGIONS.len()];
        let size = 0.3 + rng.next_f32() * 2.0;
        for year in YEARS {
            for &(source, base) in &SOURCES {
                // The 2023 fire season dwarfs every other year.
                let spike = if year == 2023 && source.starts_with("Incendios") {
                    12.0
                } else {
                    1.0
                };
                for &(pollutant, factor) in &POLLUTANTS {
                    // Not every commune reports every source every year.
                    if rng.next_f32() < 0.15 {
                        continue;
                    }
                    let noise = 0.8 + rng.next_f32() * 0.4;
                    cols.year.push(year);
                    cols.region.push(region.to_string());
                    cols.commune.push(commune_name(id));
                    cols.commune_id.push(id);
                    cols.source.push(source.to_string());
                    cols.pollutant.push(pollutant.to_string());
                    cols.tonnage.push(base * factor * size * spike * noise);
                }
            }
        }
    }
    cols
}

fn categorical(values: &[String]) -> ArrayRef {
    Arc::new(
        values
            .iter()
            .map(String::as_str)
            .collect::<DictionaryArray<Int32Type>>(),
    )
}

fn write_parquet(path: &Path, cols: &Columns) -> Result<usize> {
    let dict = DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8));
    let schema = Arc::new(Schema::new(vec![
        Field::new("ano", DataType::Int16, false),
        Field::new("region", dict.clone(), false),
        Field::new("comuna", dict.clone(), false),
        Field::new("id_comuna", DataType::Int32, false),
        Field::new("tipo_fuente", dict.clone(), false),
        Field::new("contaminantes", dict, false),
        Field::new("cantidad_toneladas", DataType::Float32, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int16Array::from(cols.year.clone())),
            categorical(&cols.region),
            categorical(&cols.commune),
            Arc::new(Int32Array::from(cols.commune_id.clone())),
            categorical(&cols.source),
            categorical(&cols.pollutant),
            Arc::new(Float32Array::from(cols.tonnage.clone())),
        ],
    )
    .context("assembling record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(batch.num_rows())
}

/// Square communes on a 4 × 6 grid; cells 23 and 24 have no emissions.
fn boundaries() -> Value {
    let features: Vec<Value> = (1..=24)
        .map(|id: i32| {
            let col = f64::from((id - 1) % 4);
            let row = f64::from((id - 1) / 4);
            let (x0, y0) = (-73.0 + col * 0.5, -35.0 - row * 0.5);
            let ring = json!([
                [x0, y0],
                [x0 + 0.5, y0],
                [x0 + 0.5, y0 - 0.5],
                [x0, y0 - 0.5],
                [x0, y0]
            ]);
            json!({
                "type": "Feature",
                "properties": { "cod_comuna": id, "Comuna": commune_name(id) },
                "geometry": { "type": "Polygon", "coordinates": [ring] }
            })
        })
        .filter(|f| !matches!(f["properties"]["cod_comuna"].as_i64(), Some(21 | 22)))
        .collect();

    json!({ "type": "FeatureCollection", "features": features })
}

fn main() -> Result<()> {
    let dir = Path::new("data");
    std::fs::create_dir_all(dir).context("creating data directory")?;

    let mut rng = Lcg(42);
    let cols = build_rows(&mut rng);

    let data_path = dir.join("emisiones_consolidadas_limpias.parquet");
    let rows = write_parquet(&data_path, &cols)?;

    let boundary_path = dir.join("comunas.geojson");
    let text = serde_json::to_string_pretty(&boundaries()).context("serializing GeoJSON")?;
    std::fs::write(&boundary_path, text).context("writing GeoJSON")?;

    println!(
        "Wrote {rows} emission rows to {} and 22 commune polygons to {}",
        data_path.display(),
        boundary_path.display()
    );
    Ok(())
}
