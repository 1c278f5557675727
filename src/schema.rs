/// Column-name constants for lay-forecast tables.
/// Single source of truth - exported to Python via PyO3.

// ── Observation columns (input) ─────────────────────────────────────────────
pub mod observation {
    pub const FARM_ID: &str = "farm_id";
    pub const BATCH_ID: &str = "batch_id";
    pub const STATUS: &str = "status";
    pub const WEEK: &str = "week";
    pub const PERCENTAGE: &str = "percentage";
    pub const STANDARD_PERCENTAGE: &str = "standard_percentage";
    pub const POPULATION: &str = "population";
    pub const CUMULATIVE_OUTPUT: &str = "cumulative_output";

    pub const ALL: [&str; 8] = [
        FARM_ID,
        BATCH_ID,
        STATUS,
        WEEK,
        PERCENTAGE,
        STANDARD_PERCENTAGE,
        POPULATION,
        CUMULATIVE_OUTPUT,
    ];

    /// Rows missing any of these are dropped during cleaning.
    pub const REQUIRED_VALUES: [&str; 5] = [FARM_ID, BATCH_ID, STATUS, WEEK, PERCENTAGE];
}

// ── Status values ───────────────────────────────────────────────────────────
pub mod status {
    pub const CLOSED: &str = "closed";
    pub const OPEN: &str = "open";
}

// ── Forecast columns (output) ───────────────────────────────────────────────
pub mod forecast {
    pub const FORECAST: &str = "forecast";
    pub const LOWER: &str = "lower";
    pub const UPPER: &str = "upper";
    pub const R2: &str = "r2";
    pub const RMSE: &str = "rmse";
    pub const PROJECTED_POPULATION: &str = "projected_population";
    pub const INCREMENT: &str = "increment";
    pub const CUMULATIVE_PROJECTION: &str = "cumulative_projection";
}

// ── Exclusion columns ───────────────────────────────────────────────────────
pub mod exclusion {
    /// Which computation was skipped (see [`super::scope`]).
    pub const SCOPE: &str = "scope";
    pub const REASON: &str = "reason";
    pub const DETAIL: &str = "detail";
}

// ── Exclusion scopes ────────────────────────────────────────────────────────
pub mod scope {
    /// The whole batch forecast.
    pub const BATCH: &str = "batch";
    /// Population trend and cumulative output of a forecast batch.
    pub const VOLUME: &str = "volume";
    /// Population trend of a farm rollup.
    pub const FARM_POPULATION: &str = "farm_population";
}

// ── Population trend columns ────────────────────────────────────────────────
pub mod population {
    pub const OBSERVED_POPULATION: &str = "observed_population";
}

// ── Standard curve columns ──────────────────────────────────────────────────
pub mod standard {
    pub const STANDARD_MEAN: &str = "standard_mean";
}

// ── Farm rollup columns ─────────────────────────────────────────────────────
pub mod rollup {
    pub const OBSERVED_MEAN_PERCENTAGE: &str = "observed_mean_percentage";
    pub const OBSERVED_TOTAL_POPULATION: &str = "observed_total_population";
    pub const OBSERVED_TOTAL_CUMULATIVE: &str = "observed_total_cumulative";
    pub const BATCH_COUNT: &str = "batch_count";
}
