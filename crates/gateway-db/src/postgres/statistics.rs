use async_trait::async_trait;
use gateway_error::GatewayError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::model::{
    AflExact, AflStatistics, LibFuzzerExact, LibFuzzerStatistics, Paginator, StatisticsGroupBy,
};
use crate::traits::{Result, StatisticsAfl, StatisticsCrashes, StatisticsLibFuzzer};

pub struct PgStatisticsCrashes {
    pool: PgPool,
}

impl PgStatisticsCrashes {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatisticsCrashes for PgStatisticsCrashes {
    async fn inc_crashes(
        &self,
        date: chrono::DateTime<chrono::Utc>,
        fuzzer_id: Uuid,
        revision_id: Uuid,
        new_total: i64,
        new_unique: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO statistics_crashes (fuzzer_id, revision_id, date, total, unique_count) \
             VALUES ($1, $2, date_trunc('day', $3), $4, $5) \
             ON CONFLICT (fuzzer_id, revision_id, date) DO UPDATE SET \
             total = statistics_crashes.total + EXCLUDED.total, \
             unique_count = statistics_crashes.unique_count + EXCLUDED.unique_count",
        )
        .bind(fuzzer_id)
        .bind(revision_id)
        .bind(date)
        .bind(new_total)
        .bind(new_unique)
        .execute(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(())
    }
}

/// Row shape shared by the `group_by` bucketed history tables. Stores a
/// precomputed `period` column (`day`/`week`/`month` truncation of `date`)
/// so listing a range never recomputes bucket boundaries in SQL.
fn period_sql(group_by: StatisticsGroupBy) -> &'static str {
    match group_by {
        StatisticsGroupBy::Day => "day",
        StatisticsGroupBy::Week => "week",
        StatisticsGroupBy::Month => "month",
    }
}

pub struct PgStatisticsLibFuzzer {
    pool: PgPool,
}

impl PgStatisticsLibFuzzer {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatisticsLibFuzzer for PgStatisticsLibFuzzer {
    async fn create(&self, stats: &LibFuzzerStatistics) -> Result<LibFuzzerStatistics> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO statistics_libfuzzer (id, fuzzer_id, revision_id, date, work_time, \
             execs_per_sec, edge_cov, feature_cov, peak_rss, execs_done, corpus_entries, \
             corpus_size) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(stats.fuzzer_id)
        .bind(stats.revision_id)
        .bind(stats.date)
        .bind(stats.work_time)
        .bind(stats.exact.execs_per_sec)
        .bind(stats.exact.edge_cov)
        .bind(stats.exact.feature_cov)
        .bind(stats.exact.peak_rss)
        .bind(stats.exact.execs_done)
        .bind(stats.exact.corpus_entries)
        .bind(stats.exact.corpus_size)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        Ok(LibFuzzerStatistics {
            id: Some(id),
            ..stats.clone()
        })
    }

    async fn list(
        &self,
        page: Paginator,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
        group_by: StatisticsGroupBy,
        date_begin: chrono::DateTime<chrono::Utc>,
        date_end: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<LibFuzzerStatistics>> {
        let bucket = period_sql(group_by);
        let rows = sqlx::query_as::<_, (
            Uuid,
            Uuid,
            Uuid,
            chrono::DateTime<chrono::Utc>,
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
        )>(&format!(
            "SELECT id, fuzzer_id, revision_id, date_trunc('{bucket}', date) as date, \
             sum(work_time), sum(execs_per_sec), sum(edge_cov), sum(feature_cov), \
             max(peak_rss), sum(execs_done), max(corpus_entries), max(corpus_size) \
             FROM statistics_libfuzzer \
             WHERE ($3::uuid IS NULL OR fuzzer_id = $3) \
             AND ($4::uuid IS NULL OR revision_id = $4) \
             AND date >= $5 AND ($6::timestamptz IS NULL OR date <= $6) \
             GROUP BY id, fuzzer_id, revision_id, date_trunc('{bucket}', date) \
             ORDER BY date OFFSET $1 LIMIT $2"
        ))
        .bind(page.offset)
        .bind(page.limit)
        .bind(fuzzer_id)
        .bind(revision_id)
        .bind(date_begin)
        .bind(date_end)
        .fetch_all(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        Ok(rows
            .into_iter()
            .map(|r| LibFuzzerStatistics {
                id: Some(r.0),
                fuzzer_id: r.1,
                revision_id: r.2,
                date: r.3,
                work_time: r.4,
                exact: LibFuzzerExact {
                    execs_per_sec: r.5,
                    edge_cov: r.6,
                    feature_cov: r.7,
                    peak_rss: r.8,
                    execs_done: r.9,
                    corpus_entries: r.10,
                    corpus_size: r.11,
                },
            })
            .collect())
    }
}

pub struct PgStatisticsAfl {
    pool: PgPool,
}

impl PgStatisticsAfl {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatisticsAfl for PgStatisticsAfl {
    async fn create(&self, stats: &AflStatistics) -> Result<AflStatistics> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO statistics_afl (id, fuzzer_id, revision_id, date, work_time, \
             cycles_done, cycles_wo_finds, execs_done, execs_per_sec, corpus_count, \
             corpus_favored, corpus_found, corpus_variable, stability, bitmap_cvg, \
             slowest_exec_ms, peak_rss_mb) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(stats.fuzzer_id)
        .bind(stats.revision_id)
        .bind(stats.date)
        .bind(stats.work_time)
        .bind(stats.exact.cycles_done)
        .bind(stats.exact.cycles_wo_finds)
        .bind(stats.exact.execs_done)
        .bind(stats.exact.execs_per_sec)
        .bind(stats.exact.corpus_count)
        .bind(stats.exact.corpus_favored)
        .bind(stats.exact.corpus_found)
        .bind(stats.exact.corpus_variable)
        .bind(stats.exact.stability)
        .bind(stats.exact.bitmap_cvg)
        .bind(stats.exact.slowest_exec_ms)
        .bind(stats.exact.peak_rss_mb)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        Ok(AflStatistics {
            id: Some(id),
            ..stats.clone()
        })
    }

    async fn list(
        &self,
        page: Paginator,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
        group_by: StatisticsGroupBy,
        date_begin: chrono::DateTime<chrono::Utc>,
        date_end: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<AflStatistics>> {
        let bucket = period_sql(group_by);
        let rows = sqlx::query_as::<_, AflStatisticsRow>(&format!(
            "SELECT id, fuzzer_id, revision_id, date_trunc('{bucket}', date) AS date, \
             sum(work_time) AS work_time, \
             max(cycles_done) AS cycles_done, max(cycles_wo_finds) AS cycles_wo_finds, \
             sum(execs_done) AS execs_done, avg(execs_per_sec) AS execs_per_sec, \
             max(corpus_count) AS corpus_count, max(corpus_favored) AS corpus_favored, \
             max(corpus_found) AS corpus_found, max(corpus_variable) AS corpus_variable, \
             avg(stability) AS stability, avg(bitmap_cvg) AS bitmap_cvg, \
             max(slowest_exec_ms) AS slowest_exec_ms, max(peak_rss_mb) AS peak_rss_mb \
             FROM statistics_afl \
             WHERE ($3::uuid IS NULL OR fuzzer_id = $3) \
             AND ($4::uuid IS NULL OR revision_id = $4) \
             AND date >= $5 AND ($6::timestamptz IS NULL OR date <= $6) \
             GROUP BY id, fuzzer_id, revision_id, date_trunc('{bucket}', date) \
             ORDER BY date OFFSET $1 LIMIT $2"
        ))
        .bind(page.offset)
        .bind(page.limit)
        .bind(fuzzer_id)
        .bind(revision_id)
        .bind(date_begin)
        .bind(date_end)
        .fetch_all(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        Ok(rows
            .into_iter()
            .map(|r| AflStatistics {
                id: Some(r.id),
                fuzzer_id: r.fuzzer_id,
                revision_id: r.revision_id,
                date: r.date,
                work_time: r.work_time,
                exact: AflExact {
                    cycles_done: r.cycles_done,
                    cycles_wo_finds: r.cycles_wo_finds,
                    execs_done: r.execs_done,
                    execs_per_sec: r.execs_per_sec,
                    corpus_count: r.corpus_count,
                    corpus_favored: r.corpus_favored,
                    corpus_found: r.corpus_found,
                    corpus_variable: r.corpus_variable,
                    stability: r.stability,
                    bitmap_cvg: r.bitmap_cvg,
                    slowest_exec_ms: r.slowest_exec_ms,
                    peak_rss_mb: r.peak_rss_mb,
                },
            })
            .collect())
    }
}

#[derive(sqlx::FromRow)]
struct AflStatisticsRow {
    id: Uuid,
    fuzzer_id: Uuid,
    revision_id: Uuid,
    date: chrono::DateTime<chrono::Utc>,
    work_time: i64,
    cycles_done: i64,
    cycles_wo_finds: i64,
    execs_done: i64,
    execs_per_sec: f64,
    corpus_count: i64,
    corpus_favored: i64,
    corpus_found: i64,
    corpus_variable: i64,
    stability: f64,
    bitmap_cvg: f64,
    slowest_exec_ms: i64,
    peak_rss_mb: i64,
}

