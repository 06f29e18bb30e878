use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Column names as stored in the data file
// ---------------------------------------------------------------------------

pub const YEAR: &str = "ano";
pub const REGION: &str = "region";
pub const COMMUNE: &str = "comuna";
pub const COMMUNE_ID: &str = "id_comuna";
pub const SOURCE_TYPE: &str = "tipo_fuente";
pub const POLLUTANT: &str = "contaminantes";
pub const TONNAGE: &str = "cantidad_toneladas";

/// The only columns read from the data file; anything else is ignored.
pub const COLUMNS: [&str; 7] = [
    YEAR,
    REGION,
    COMMUNE,
    COMMUNE_ID,
    SOURCE_TYPE,
    POLLUTANT,
    TONNAGE,
];

// ---------------------------------------------------------------------------
// Categorical – a dictionary-encoded label column
// ---------------------------------------------------------------------------

/// Label column stored as one `u32` code per row plus a dictionary of the
/// distinct labels in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Categorical {
    labels: Vec<String>,
    lookup: HashMap<String, u32>,
    codes: Vec<u32>,
}

impl Categorical {
    /// Append a row, interning the label if it is new.
    pub fn push(&mut self, label: &str) {
        let code = match self.lookup.get(label) {
            Some(&code) => code,
            None => {
                let code = self.labels.len() as u32;
                self.labels.push(label.to_owned());
                self.lookup.insert(label.to_owned(), code);
                code
            }
        };
        self.codes.push(code);
    }

    /// Number of distinct labels.
    pub fn cardinality(&self) -> usize {
        self.labels.len()
    }

    /// Dictionary code of the given row.
    pub fn code(&self, row: usize) -> u32 {
        self.codes[row]
    }

    /// Label behind a dictionary code.
    pub fn label(&self, code: u32) -> &str {
        &self.labels[code as usize]
    }

    /// Label of the given row.
    pub fn value(&self, row: usize) -> &str {
        self.label(self.code(row))
    }

    /// Dictionary code for a label, if the label occurs in the column.
    pub fn code_of(&self, label: &str) -> Option<u32> {
        self.lookup.get(label).copied()
    }

    /// Distinct labels in ascending order.
    pub fn sorted_labels(&self) -> Vec<String> {
        let mut labels = self.labels.clone();
        labels.sort();
        labels
    }
}

// ---------------------------------------------------------------------------
// EmissionRecord – one row of the table, owned
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct EmissionRecord {
    pub year: i16,
    pub region: String,
    pub commune: String,
    pub commune_id: i32,
    pub source_type: String,
    pub pollutant: String,
    /// Metric tons.
    pub tonnage: f32,
}

// ---------------------------------------------------------------------------
// EmissionTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Columnar emissions table. Every column has one entry per row; rows are
/// only ever appended through [`EmissionTable::push`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmissionTable {
    pub year: Vec<i16>,
    pub region: Categorical,
    pub commune: Categorical,
    pub commune_id: Vec<i32>,
    pub source_type: Categorical,
    pub pollutant: Categorical,
    pub tonnage: Vec<f32>,
}

impl EmissionTable {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a EmissionRecord>) -> Self {
        let mut table = Self::default();
        for record in records {
            table.push(record);
        }
        table
    }

    /// Append one row to every column.
    pub fn push(&mut self, record: &EmissionRecord) {
        self.year.push(record.year);
        self.region.push(&record.region);
        self.commune.push(&record.commune);
        self.commune_id.push(record.commune_id);
        self.source_type.push(&record.source_type);
        self.pollutant.push(&record.pollutant);
        self.tonnage.push(record.tonnage);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.year.len()
    }

    pub fn is_empty(&self) -> bool {
        self.year.is_empty()
    }

    /// Materialise a single row.
    pub fn record(&self, row: usize) -> EmissionRecord {
        EmissionRecord {
            year: self.year[row],
            region: self.region.value(row).to_owned(),
            commune: self.commune.value(row).to_owned(),
            commune_id: self.commune_id[row],
            source_type: self.source_type.value(row).to_owned(),
            pollutant: self.pollutant.value(row).to_owned(),
            tonnage: self.tonnage[row],
        }
    }

    /// Smallest and largest year present, `None` for an empty table.
    pub fn year_bounds(&self) -> Option<(i16, i16)> {
        let min = self.year.iter().copied().min()?;
        let max = self.year.iter().copied().max()?;
        Some((min, max))
    }
}
