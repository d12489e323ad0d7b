use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use loadsim_core::{DatabaseAdapter, ParamGenSpec, ParamValue};

/// Fallback constant when table metadata or bounds are missing.
const RANGE_FALLBACK: i64 = 1;

/// Cached in place of an empty sample fetch so the key is never re-queried.
const EMPTY_SAMPLE_FALLBACK: &str = "default_if_empty";

/// Timestamp format for date-range bounds.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type SampleKey = (String, String, usize);

/// Result of resolving one parameter generator.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// Single value; contributes one parameter.
    One(ParamValue),
    /// Ordered pair; contributes two parameters in order.
    Pair(ParamValue, ParamValue),
}

/// Turns declarative parameter specs into concrete query arguments, using
/// cached lookups against table metadata and column samples.
///
/// The sample cache is run-scoped: populated lazily, never invalidated
/// mid-run, and cleared between runs. Concurrent misses on one key may both
/// fetch; population is last-writer-wins, which is benign because both
/// results are equally valid.
pub struct ParamGenerator {
    adapter: Arc<dyn DatabaseAdapter>,
    sample_cache: Mutex<HashMap<SampleKey, Vec<ParamValue>>>,
}

impl ParamGenerator {
    /// New generator with an empty sample cache.
    pub fn new(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        Self {
            adapter,
            sample_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Drops all cached samples. Called at the start of every run.
    pub fn clear_cache(&self) {
        self.sample_cache.lock().clear();
    }

    /// Resolves one generator spec.
    ///
    /// Never fails: missing metadata, empty samples, and adapter errors all
    /// degrade to documented fallbacks with a warning, so the runner always
    /// has a parameter list to execute with.
    pub async fn resolve(&self, spec: &ParamGenSpec) -> Resolved {
        match spec {
            ParamGenSpec::RangeFromTable { table, column } => {
                Resolved::One(self.resolve_range(table, column).await)
            }
            ParamGenSpec::SampleFromTable {
                table,
                column,
                sample_size,
            } => Resolved::One(self.resolve_sample(table, column, *sample_size).await),
            ParamGenSpec::DateRange {
                start_days_ago,
                end_days_ago,
            } => {
                let now = Utc::now();
                let start = now - ChronoDuration::days(*start_days_ago);
                let end = now - ChronoDuration::days(*end_days_ago);
                Resolved::Pair(
                    ParamValue::Text(start.format(DATE_FORMAT).to_string()),
                    ParamValue::Text(end.format(DATE_FORMAT).to_string()),
                )
            }
        }
    }

    /// Resolves every spec in declaration order and flattens the results:
    /// pairs contribute two values, everything else one.
    pub async fn resolve_all(&self, specs: &[ParamGenSpec]) -> Vec<ParamValue> {
        let mut params = Vec::with_capacity(specs.len());
        for spec in specs {
            match self.resolve(spec).await {
                Resolved::One(value) => params.push(value),
                Resolved::Pair(start, end) => {
                    params.push(start);
                    params.push(end);
                }
            }
        }
        params
    }

    async fn resolve_range(&self, table: &str, column: &str) -> ParamValue {
        match self.adapter.table_metadata(table).await {
            Ok(Some(meta)) => match meta.bounds() {
                Some((min, max)) if min == max => ParamValue::Int(min),
                Some((min, max)) if min < max => {
                    ParamValue::Int(rand::thread_rng().gen_range(min..=max))
                }
                _ => {
                    warn!(table, column, "id bounds missing or inverted, using fallback");
                    ParamValue::Int(RANGE_FALLBACK)
                }
            },
            Ok(None) => {
                warn!(table, column, "table metadata missing, using fallback");
                ParamValue::Int(RANGE_FALLBACK)
            }
            Err(err) => {
                warn!(table, column, error = %err, "metadata lookup failed, using fallback");
                ParamValue::Int(RANGE_FALLBACK)
            }
        }
    }

    async fn resolve_sample(&self, table: &str, column: &str, sample_size: usize) -> ParamValue {
        let key = (table.to_string(), column.to_string(), sample_size);

        let cached = self.sample_cache.lock().get(&key).cloned();
        let values = match cached {
            Some(values) => values,
            None => {
                // Lock is not held across the fetch; two tasks missing at
                // once may both fetch and the last insert wins.
                let fetched = match self.adapter.column_sample(table, column, sample_size).await {
                    Ok(values) => values,
                    Err(err) => {
                        warn!(table, column, error = %err, "column sample fetch failed");
                        Vec::new()
                    }
                };
                let values = if fetched.is_empty() {
                    warn!(table, column, "empty sample set, caching fallback value");
                    vec![ParamValue::Text(EMPTY_SAMPLE_FALLBACK.to_string())]
                } else {
                    fetched
                };
                self.sample_cache.lock().insert(key, values.clone());
                values
            }
        };

        values
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or(ParamValue::Null)
    }
}
