use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{LoadOptions, HORIZON_END};
use crate::error::ForecastError;
use crate::schema::observation;

/// Lifecycle status of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BatchStatus {
    Closed,
    Open,
}

/// Identity of a batch within the fleet.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchKey {
    pub farm_id: String,
    pub batch_id: String,
}

impl BatchKey {
    pub fn new(farm_id: impl Into<String>, batch_id: impl Into<String>) -> Self {
        Self {
            farm_id: farm_id.into(),
            batch_id: batch_id.into(),
        }
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.farm_id, self.batch_id)
    }
}

/// One week of one batch, as recorded in the source table.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub week: u32,
    pub percentage: f64,
    pub population: Option<f64>,
    pub cumulative_output: Option<f64>,
    pub standard_percentage: Option<f64>,
}

/// All observations of one batch under one status, sorted by week.
#[derive(Debug, Clone)]
pub struct BatchHistory {
    pub key: BatchKey,
    pub status: BatchStatus,
    pub observations: Vec<Observation>,
}

impl BatchHistory {
    pub fn new(key: BatchKey, status: BatchStatus, mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.week);
        Self {
            key,
            status,
            observations,
        }
    }

    /// Number of distinct weeks with an observation.
    pub fn observed_weeks(&self) -> usize {
        let mut weeks: Vec<u32> = self.observations.iter().map(|o| o.week).collect();
        weeks.dedup();
        weeks.len()
    }

    pub fn last_week(&self) -> Option<u32> {
        self.observations.last().map(|o| o.week)
    }

    /// (week, percentage) pairs in week order.
    pub fn percentage_points(&self) -> Vec<(f64, f64)> {
        self.observations
            .iter()
            .map(|o| (o.week as f64, o.percentage))
            .collect()
    }

    /// (week, population) pairs with a defined population, in week order.
    pub fn population_points(&self) -> Vec<(f64, f64)> {
        self.observations
            .iter()
            .filter_map(|o| o.population.map(|p| (o.week as f64, p)))
            .collect()
    }

    /// Largest recorded cumulative output, if any week recorded one.
    pub fn last_known_cumulative(&self) -> Option<f64> {
        self.observations
            .iter()
            .filter_map(|o| o.cumulative_output)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }
}

// ── Observation table ───────────────────────────────────────────────────────

/// Cleaned observation table: the polars frame plus typed batch histories.
#[derive(Debug, Clone)]
pub struct ObservationTable {
    frame: DataFrame,
    batches: Vec<BatchHistory>,
}

impl ObservationTable {
    /// Read a CSV file and clean it into an observation table.
    pub fn from_csv(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, ForecastError> {
        let raw = read_csv_as_strings(path.as_ref())?;
        Self::from_frame(raw, options)
    }

    /// Validate, rename and clean an arbitrary source frame.
    ///
    /// A missing column rejects the whole frame. Rows lacking any of
    /// farm, batch, status, week or percentage are dropped, as are rows
    /// whose week falls outside 1..=45 or whose status is unrecognised.
    pub fn from_frame(raw: DataFrame, options: &LoadOptions) -> Result<Self, ForecastError> {
        let raw = apply_rename(raw, options)?;
        require_columns(&raw, &observation::ALL)?;

        let source_rows = raw.height();
        let frame = clean(raw)?;
        let (frame, batches) = group_batches(frame, options)?;

        info!(
            source_rows,
            kept_rows = frame.height(),
            batches = batches.len(),
            "loaded observations"
        );
        Ok(Self { frame, batches })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn batches(&self) -> &[BatchHistory] {
        &self.batches
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn open_batches(&self) -> impl Iterator<Item = &BatchHistory> {
        self.batches
            .iter()
            .filter(|b| b.status == BatchStatus::Open)
    }

    /// (week, percentage) training pairs from every closed batch.
    pub fn closed_points(&self) -> Vec<(f64, f64)> {
        self.batches
            .iter()
            .filter(|b| b.status == BatchStatus::Closed)
            .flat_map(|b| b.percentage_points())
            .collect()
    }

    pub fn open_batch(&self, key: &BatchKey) -> Option<&BatchHistory> {
        self.open_batches().find(|b| &b.key == key)
    }

    /// Sorted, de-duplicated farm ids that have open batches.
    pub fn open_farms(&self) -> Vec<String> {
        let mut farms: Vec<String> = self.open_batches().map(|b| b.key.farm_id.clone()).collect();
        farms.dedup();
        farms
    }
}

// ── Private helpers ─────────────────────────────────────────────────────────

/// Read a CSV file with all columns as String dtype, trimming column names.
fn read_csv_as_strings(path: &Path) -> Result<DataFrame, ForecastError> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;
    debug!(path = %path.display(), rows = df.height(), "read csv");
    Ok(df)
}

fn apply_rename(df: DataFrame, options: &LoadOptions) -> Result<DataFrame, ForecastError> {
    if options.rename.is_empty() {
        return Ok(df);
    }
    let old: Vec<&str> = options.rename.keys().map(|s| s.as_str()).collect();
    let new: Vec<&str> = options.rename.values().map(|s| s.as_str()).collect();
    Ok(df.lazy().rename(old, new, false).collect()?)
}

pub(crate) fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), ForecastError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(ForecastError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

fn trimmed_text(name: &str) -> Expr {
    col(name)
        .cast(DataType::String)
        .str()
        .strip_chars(lit(" \t\r\n"))
}

fn trimmed_float(name: &str) -> Expr {
    trimmed_text(name).cast(DataType::Float64)
}

/// Cast every schema column to its working dtype and drop unusable rows.
fn clean(raw: DataFrame) -> Result<DataFrame, ForecastError> {
    let required = observation::REQUIRED_VALUES
        .iter()
        .map(|c| col(*c).is_not_null())
        .reduce(|acc, e| acc.and(e))
        .unwrap_or(lit(true));

    let df = raw
        .lazy()
        .select([
            trimmed_text(observation::FARM_ID),
            trimmed_text(observation::BATCH_ID),
            trimmed_text(observation::STATUS),
            trimmed_float(observation::WEEK).cast(DataType::Int64),
            trimmed_float(observation::PERCENTAGE),
            trimmed_float(observation::STANDARD_PERCENTAGE),
            trimmed_float(observation::POPULATION),
            trimmed_float(observation::CUMULATIVE_OUTPUT),
        ])
        .filter(required)
        .filter(
            col(observation::FARM_ID)
                .neq(lit(""))
                .and(col(observation::BATCH_ID).neq(lit("")))
                .and(col(observation::WEEK).gt_eq(lit(1i64)))
                .and(col(observation::WEEK).lt_eq(lit(HORIZON_END as i64))),
        )
        .collect()?;
    Ok(df)
}

fn parse_status(raw: &str, options: &LoadOptions) -> Option<BatchStatus> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case(options.closed_label.trim()) {
        Some(BatchStatus::Closed)
    } else if value.eq_ignore_ascii_case(options.open_label.trim()) {
        Some(BatchStatus::Open)
    } else {
        None
    }
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

/// Split the cleaned frame into typed batch histories.
///
/// Returns the frame restricted to the rows that made it into a history.
fn group_batches(
    df: DataFrame,
    options: &LoadOptions,
) -> Result<(DataFrame, Vec<BatchHistory>), ForecastError> {
    let farms = df.column(observation::FARM_ID)?.str()?;
    let batches = df.column(observation::BATCH_ID)?.str()?;
    let statuses = df.column(observation::STATUS)?.str()?;
    let weeks = df.column(observation::WEEK)?.i64()?;
    let percentages = df.column(observation::PERCENTAGE)?.f64()?;
    let standards = df.column(observation::STANDARD_PERCENTAGE)?.f64()?;
    let populations = df.column(observation::POPULATION)?.f64()?;
    let cumulatives = df.column(observation::CUMULATIVE_OUTPUT)?.f64()?;

    let mut groups: BTreeMap<(BatchKey, BatchStatus), Vec<Observation>> = BTreeMap::new();
    let mut keep = Vec::with_capacity(df.height());
    let mut unknown_status = 0usize;

    for i in 0..df.height() {
        let (Some(farm), Some(batch), Some(status), Some(week), Some(percentage)) = (
            farms.get(i),
            batches.get(i),
            statuses.get(i),
            weeks.get(i),
            finite(percentages.get(i)),
        ) else {
            keep.push(false);
            continue;
        };
        let Some(status) = parse_status(status, options) else {
            unknown_status += 1;
            keep.push(false);
            continue;
        };

        groups
            .entry((BatchKey::new(farm, batch), status))
            .or_default()
            .push(Observation {
                week: week as u32,
                percentage,
                population: finite(populations.get(i)),
                cumulative_output: finite(cumulatives.get(i)),
                standard_percentage: finite(standards.get(i)),
            });
        keep.push(true);
    }

    if unknown_status > 0 {
        warn!(rows = unknown_status, "dropped rows with unrecognised batch status");
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let frame = df.filter(&mask)?;
    let histories = groups
        .into_iter()
        .map(|((key, status), obs)| BatchHistory::new(key, status, obs))
        .collect();
    Ok((frame, histories))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_frame() -> DataFrame {
        df!(
            observation::FARM_ID => ["F1", "F1", "F1", "F2", "F2", "F2"],
            observation::BATCH_ID => ["L1", "L1", "L1", "L9", "L9", "L9"],
            observation::STATUS => [" Closed", "closed", "CLOSED", "Open ", "open", "pending"],
            observation::WEEK => ["1", "2", "46", "3", "1", "2"],
            observation::PERCENTAGE => ["10.5", "20", "30", "40", "", "50"],
            observation::STANDARD_PERCENTAGE => ["11", "", "31", "41", "51", "61"],
            observation::POPULATION => ["1000", "990", "980", "", "700", "690"],
            observation::CUMULATIVE_OUTPUT => ["70", "140", "210", "300", "100", "200"],
        )
        .unwrap()
    }

    #[test]
    fn cleaning_drops_invalid_rows_and_groups_batches() {
        let table = ObservationTable::from_frame(source_frame(), &LoadOptions::default()).unwrap();

        // week 46, empty percentage and unknown status are dropped
        assert_eq!(table.frame().height(), 3);
        assert_eq!(table.batches().len(), 2);

        let closed = &table.batches()[0];
        assert_eq!(closed.status, BatchStatus::Closed);
        assert_eq!(closed.observations.len(), 2);
        assert_eq!(closed.observations[1].standard_percentage, None);

        let open = table.open_batch(&BatchKey::new("F2", "L9")).unwrap();
        assert_eq!(open.observations.len(), 1);
        assert_eq!(open.observations[0].population, None);
        assert_eq!(table.closed_points(), vec![(1.0, 10.5), (2.0, 20.0)]);
    }

    #[test]
    fn missing_column_rejects_the_load() {
        let raw = source_frame().drop(observation::POPULATION).unwrap();
        let err = ObservationTable::from_frame(raw, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ForecastError::MissingColumn(c) if c == observation::POPULATION));
    }

    #[test]
    fn rename_maps_source_columns() {
        let raw = source_frame()
            .lazy()
            .rename([observation::FARM_ID], ["site"], true)
            .collect()
            .unwrap();
        let mut options = LoadOptions::default();
        options
            .rename
            .insert("site".to_string(), observation::FARM_ID.to_string());

        let table = ObservationTable::from_frame(raw, &options).unwrap();
        assert_eq!(table.open_farms(), vec!["F2".to_string()]);
    }

    #[test]
    fn history_helpers() {
        let history = BatchHistory::new(
            BatchKey::new("F", "B"),
            BatchStatus::Open,
            vec![
                Observation {
                    week: 2,
                    percentage: 50.0,
                    population: None,
                    cumulative_output: Some(400.0),
                    standard_percentage: None,
                },
                Observation {
                    week: 1,
                    percentage: 40.0,
                    population: Some(100.0),
                    cumulative_output: Some(300.0),
                    standard_percentage: None,
                },
            ],
        );
        assert_eq!(history.last_week(), Some(2));
        assert_eq!(history.observed_weeks(), 2);
        assert_eq!(history.population_points(), vec![(1.0, 100.0)]);
        assert_eq!(history.last_known_cumulative(), Some(400.0));
    }
}
