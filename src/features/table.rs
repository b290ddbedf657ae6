//! Feature table assembly and CSV input/output.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

use super::TagStats;
use crate::models::{Address, FeatureType, GeoPoint, Region};

/// Leading columns carried over from the address table
pub const BASE_COLUMNS: &[&str] = &["ID", "Address", "Lat_Lon", "Shipping", "Region"];

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to open {path}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("column '{0}' not found")]
    MissingColumn(&'static str),
    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
}

/// One output record per address
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub address: Address,
    pub region: Region,
    /// One count per requested tag, in tag order
    pub counts: Vec<u64>,
    /// One summed area per requested tag when area was requested
    pub areas: Option<Vec<f64>>,
}

impl FeatureRow {
    pub fn new(address: Address, region: Region, stats: Vec<TagStats>) -> Self {
        let areas = stats
            .iter()
            .map(|s| s.area)
            .collect::<Option<Vec<f64>>>()
            .filter(|a| !a.is_empty());
        let counts = stats.into_iter().map(|s| s.count).collect();
        Self {
            address,
            region,
            counts,
            areas,
        }
    }
}

/// Feature rows with a fixed column schema
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub feature_type: FeatureType,
    pub tags: Vec<String>,
    pub with_area: bool,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new(feature_type: FeatureType, tags: Vec<String>, with_area: bool) -> Self {
        Self {
            feature_type,
            tags,
            with_area,
            rows: Vec::new(),
        }
    }

    /// Build the table once from rows already grouped by region
    pub fn from_rows(
        feature_type: FeatureType,
        tags: Vec<String>,
        with_area: bool,
        rows: Vec<FeatureRow>,
    ) -> Self {
        Self {
            feature_type,
            tags,
            with_area,
            rows,
        }
    }

    /// Per tag, its count column followed by its area column when requested
    pub fn tag_columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(self.tags.len() * 2);
        for tag in &self.tags {
            columns.push(self.feature_type.count_column(tag));
            if self.with_area {
                columns.push(self.feature_type.area_column(tag));
            }
        }
        columns
    }

    pub fn columns(&self) -> Vec<String> {
        BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.tag_columns())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: &str) -> Option<&FeatureRow> {
        self.rows.iter().find(|r| r.address.id == id)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut csv_writer = WriterBuilder::new().from_writer(writer);
        csv_writer.write_record(self.columns())?;

        for row in &self.rows {
            let mut record = vec![
                row.address.id.clone(),
                row.address.address.clone(),
                row.address.location.to_string(),
                row.address.label.clone().unwrap_or_default(),
                row.region.to_string(),
            ];
            for (i, count) in row.counts.iter().enumerate() {
                record.push(count.to_string());
                if self.with_area {
                    let area = row
                        .areas
                        .as_ref()
                        .and_then(|areas| areas.get(i))
                        .copied()
                        .unwrap_or(0.0);
                    record.push(area.to_string());
                }
            }
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn write_csv_path(&self, path: &Path) -> Result<(), TableError> {
        let file = File::create(path).map_err(|source| TableError::Open {
            path: path.display().to_string(),
            source,
        })?;
        self.write_csv(file)
    }
}

/// Column positions of the address table
struct AddressColumns {
    id: usize,
    address: usize,
    coords: CoordColumns,
    label: Option<usize>,
}

enum CoordColumns {
    Pair(usize),
    Split { lat: usize, lon: usize },
}

impl AddressColumns {
    fn from_headers(headers: &StringRecord) -> Result<Self, TableError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        let id = find(&["id"]).ok_or(TableError::MissingColumn("ID"))?;
        let address = find(&["address"]).ok_or(TableError::MissingColumn("Address"))?;
        let coords = match find(&["lat_lon", "latlon", "coords"]) {
            Some(idx) => CoordColumns::Pair(idx),
            None => CoordColumns::Split {
                lat: find(&["lat", "latitude"]).ok_or(TableError::MissingColumn("Lat_Lon"))?,
                lon: find(&["lon", "lng", "longitude"])
                    .ok_or(TableError::MissingColumn("Lat_Lon"))?,
            },
        };
        let label = find(&["shipping", "label"]);

        Ok(Self {
            id,
            address,
            coords,
            label,
        })
    }

    fn parse(&self, record: &StringRecord, row: usize) -> Result<Address, TableError> {
        let field = |idx: usize| record.get(idx).unwrap_or_default().trim();
        let invalid = |reason: String| TableError::InvalidRow { row, reason };

        let location = match self.coords {
            CoordColumns::Pair(idx) => GeoPoint::parse(field(idx))
                .ok_or_else(|| invalid(format!("unreadable coordinates '{}'", field(idx))))?,
            CoordColumns::Split { lat, lon } => {
                let parse = |idx: usize| {
                    field(idx)
                        .parse::<f64>()
                        .map_err(|_| invalid(format!("unreadable coordinate '{}'", field(idx))))
                };
                GeoPoint::new(parse(lat)?, parse(lon)?)
            }
        };

        let id = field(self.id);
        if id.is_empty() {
            return Err(invalid("empty ID".to_string()));
        }

        let mut address = Address::new(id, field(self.address), location);
        if let Some(label) = self.label.map(field).filter(|l| !l.is_empty()) {
            address = address.with_label(label);
        }
        Ok(address)
    }
}

/// Read addresses from CSV.
///
/// Requires `ID`, `Address` and either `Lat_Lon` or `Lat`/`Lon` columns;
/// `Shipping` is read as the label when present. Header names are matched
/// case-insensitively. Row numbers in errors count the header as row 1.
pub fn read_addresses<R: Read>(reader: R) -> Result<Vec<Address>, TableError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns = AddressColumns::from_headers(csv_reader.headers()?)?;

    let mut addresses = Vec::new();
    for (i, result) in csv_reader.records().enumerate() {
        let record = result?;
        addresses.push(columns.parse(&record, i + 2)?);
    }
    Ok(addresses)
}

pub fn read_addresses_path(path: &Path) -> Result<Vec<Address>, TableError> {
    let file = File::open(path).map_err(|source| TableError::Open {
        path: path.display().to_string(),
        source,
    })?;
    read_addresses(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_lat_lon_pairs() {
        let input = "ID,Address,Lat_Lon,Shipping\n\
                     1,\"1 Oak Dr, Columbus, OH\",\"(39.96, -83.0)\",1\n\
                     2,\"5 Pine Rd, Austin, TX\",\"(30.27, -97.74)\",\n";
        let addresses = read_addresses(input.as_bytes()).unwrap();

        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].id, "1");
        assert_eq!(addresses[0].address, "1 Oak Dr, Columbus, OH");
        assert_eq!(addresses[0].location, GeoPoint::new(39.96, -83.0));
        assert_eq!(addresses[0].label.as_deref(), Some("1"));
        assert_eq!(addresses[1].label, None);
    }

    #[test]
    fn test_read_split_columns() {
        let input = "id,address,lat,lon\nA7,\"1 Market St, San Francisco, CA\",37.79,-122.39\n";
        let addresses = read_addresses(input.as_bytes()).unwrap();
        assert_eq!(addresses[0].location, GeoPoint::new(37.79, -122.39));
        assert_eq!(addresses[0].label, None);
    }

    #[test]
    fn test_missing_column() {
        let input = "ID,Lat_Lon\n1,\"(1, 2)\"\n";
        assert!(matches!(
            read_addresses(input.as_bytes()),
            Err(TableError::MissingColumn("Address"))
        ));
    }

    #[test]
    fn test_bad_coordinates_name_the_row() {
        let input = "ID,Address,Lat_Lon\n1,\"a, OH\",\"(1, 2)\"\n2,\"b, OH\",somewhere\n";
        match read_addresses(input.as_bytes()) {
            Err(TableError::InvalidRow { row, .. }) => assert_eq!(row, 3),
            other => panic!("expected invalid row, got {:?}", other),
        }
    }

    #[test]
    fn test_columns_and_csv_output() {
        let address = Address::new("1", "1 Oak Dr, Columbus, OH", GeoPoint::new(39.96, -83.0))
            .with_label("0");
        let stats = vec![
            TagStats {
                tag: "residential".into(),
                count: 3,
                area: Some(0.5),
            },
            TagStats {
                tag: "retail".into(),
                count: 0,
                area: Some(0.0),
            },
        ];
        let row = FeatureRow::new(address, Region::Midwest, stats);
        let table = FeatureTable::from_rows(
            FeatureType::Landuse,
            vec!["residential".into(), "retail".into()],
            true,
            vec![row],
        );

        assert_eq!(
            table.tag_columns(),
            vec![
                "residential_L",
                "residential_L_area",
                "retail_L",
                "retail_L_area"
            ]
        );

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("ID,Address,Lat_Lon,Shipping,Region,residential_L,residential_L_area,retail_L,retail_L_area")
        );
        assert_eq!(
            lines.next(),
            Some("1,\"1 Oak Dr, Columbus, OH\",\"(39.96, -83)\",0,midwest,3,0.5,0,0")
        );
    }

    #[test]
    fn test_row_without_area() {
        let address = Address::new("9", "x, IL", GeoPoint::new(41.0, -87.0));
        let row = FeatureRow::new(
            address,
            Region::Midwest,
            vec![TagStats {
                tag: "motorway".into(),
                count: 2,
                area: None,
            }],
        );
        assert_eq!(row.counts, vec![2]);
        assert_eq!(row.areas, None);
    }
}
