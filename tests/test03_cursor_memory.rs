#![cfg(feature = "memory")]

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spanner_middleware::backend::memory::MemoryClient;
use spanner_middleware::ids::{EVENT_LOG_ID, EVENT_LOG_ROWID, RUN_ID};
use spanner_middleware::{RowValues, SpannerConnection, SpannerDbError, SpannerOptions};
use tokio::runtime::Runtime;

const INSERT_EVENT_LOG: &str = "INSERT INTO EventLogs \
    (rowid, customer_number, run_id, event_log_id, path, offset) VALUES (?, ?, ?, ?, ?, ?)";

async fn connect() -> Result<SpannerConnection, SpannerDbError> {
    let opts = SpannerOptions::new("proj".into(), "inst".into(), "tb".into());
    let conn = SpannerConnection::new(Arc::new(MemoryClient::new("proj")), opts)?;
    conn.create_database().await?;
    Ok(conn)
}

fn event_log(run_id: i64, event_log_id: i64, path: &str) -> Result<Vec<RowValues>, SpannerDbError> {
    Ok(vec![
        RowValues::Int(EVENT_LOG_ROWID.create(run_id, event_log_id)?),
        RowValues::Int(0),
        RowValues::Int(run_id),
        RowValues::Int(event_log_id),
        RowValues::Text(path.to_string()),
        RowValues::Int(0),
    ])
}

#[test]
fn insert_then_select_then_fetch() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async move {
        let conn = connect().await?;
        let mut cursor = conn.cursor().await?;

        let run_id = RUN_ID.generate();
        cursor
            .execute(INSERT_EVENT_LOG, &event_log(run_id, 1, "/logs/a")?)
            .await?;
        cursor
            .execute(INSERT_EVENT_LOG, &event_log(run_id, 2, "/logs/b")?)
            .await?;

        let select = "SELECT event_log_id, path, offset FROM EventLogs WHERE run_id = ?";
        cursor.execute(select, &[RowValues::Int(run_id)]).await?;
        assert_eq!(cursor.rowcount(), 2);
        let names: Vec<&str> = cursor.description().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["event_log_id", "path", "offset"]);

        let first = cursor.fetch_one()?.cloned().ok_or("expected a first row")?;
        assert_eq!(
            first,
            vec![RowValues::Int(1), RowValues::Text("/logs/a".into()), RowValues::Int(0)]
        );
        let second = cursor.fetch_one()?.cloned().ok_or("expected a second row")?;
        assert_eq!(second.get("path").and_then(RowValues::as_text), Some("/logs/b"));
        assert!(cursor.fetch_one()?.is_none());

        // fresh SELECT: fetch_all returns everything and leaves the cursor at the end
        cursor.execute(select, &[RowValues::Int(run_id)]).await?;
        assert_eq!(cursor.fetch_all()?.len(), 2);
        assert!(cursor.fetch_one()?.is_none());
        assert!(cursor.fetch_all()?.is_empty());

        cursor.close().await?;
        cursor.close().await?;
        Ok(())
    })
}

#[test]
fn rowid_keys_round_trip_through_the_backend() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async move {
        let conn = connect().await?;
        let mut cursor = conn.cursor().await?;
        let run_id = 7;
        for event_log_id in [3, 1, 2] {
            cursor
                .execute(
                    INSERT_EVENT_LOG,
                    &event_log(run_id, event_log_id, &format!("/logs/{event_log_id}"))?,
                )
                .await?;
        }

        cursor
            .execute(
                "SELECT rowid, event_log_id FROM EventLogs WHERE run_id = ?",
                &[RowValues::Int(run_id)],
            )
            .await?;
        let (low, high) = EVENT_LOG_ROWID.range(run_id)?;
        let mut seen = Vec::new();
        for row in cursor.rows()? {
            let rowid = *row.get("rowid").and_then(RowValues::as_int).ok_or("rowid")?;
            assert!((low..=high).contains(&rowid));
            let (parsed_run, parsed_log) = EVENT_LOG_ROWID.parse(rowid)?;
            assert_eq!(parsed_run, run_id);
            assert_eq!(EVENT_LOG_ID.check(parsed_log)?, parsed_log);
            seen.push(parsed_log);
        }
        // rows come back in primary-key order
        assert_eq!(seen, vec![1, 2, 3]);
        Ok(())
    })
}

#[test]
fn duplicate_key_is_reported_by_the_backend() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async move {
        let conn = connect().await?;
        let mut cursor = conn.cursor().await?;
        cursor.execute(INSERT_EVENT_LOG, &event_log(1, 1, "/a")?).await?;
        let err = cursor
            .execute(INSERT_EVENT_LOG, &event_log(1, 1, "/b")?)
            .await
            .unwrap_err();
        assert!(matches!(err, SpannerDbError::BackendError(_)));
        Ok(())
    })
}

#[test]
fn cursors_share_one_database() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async move {
        let conn = connect().await?;
        let mut writer = conn.cursor().await?;
        let mut reader = conn.cursor().await?;

        writer
            .execute(
                "INSERT INTO Plugins (plugin_id, name) VALUES (?, ?)",
                &[RowValues::Int(1), RowValues::Text("scalars".into())],
            )
            .await?;
        reader
            .execute("SELECT name FROM Plugins WHERE plugin_id = 1", &[])
            .await?;
        assert_eq!(
            reader.fetch_all()?,
            [vec![RowValues::Text("scalars".into())]]
        );
        Ok(())
    })
}

#[test]
fn bulk_seeding_with_random_runs_keeps_paths_unique() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async move {
        let conn = connect().await?;
        let mut cursor = conn.cursor().await?;

        // Many rows land in the same run, so the path must vary per row, not per draw.
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let rows: Vec<Vec<RowValues>> = (1..=1_000_i64)
            .map(|i| {
                let run_id = rng.random_range(1..8);
                vec![
                    RowValues::Int(i),
                    RowValues::Int(0),
                    RowValues::Int(run_id),
                    RowValues::Int(i),
                    RowValues::Text(format!("/logs/run-{run_id}/events.{i}")),
                    RowValues::Int(rng.random_range(0..1_000_000)),
                ]
            })
            .collect();
        cursor.execute_many(INSERT_EVENT_LOG, &rows).await?;

        let mut total = 0;
        for run_id in 1..8 {
            cursor
                .execute(
                    "SELECT rowid FROM EventLogs WHERE run_id = ?",
                    &[RowValues::Int(run_id)],
                )
                .await?;
            total += cursor.rowcount();
        }
        assert_eq!(total, 1_000);

        // a repeated path within one run is rejected
        let mut clash = rows[0].clone();
        clash[0] = RowValues::Int(1_001);
        clash[3] = RowValues::Int(1_001);
        let err = cursor.execute(INSERT_EVENT_LOG, &clash).await.unwrap_err();
        assert!(matches!(err, SpannerDbError::BackendError(msg) if msg.contains("EventLogsPathIndex")));
        Ok(())
    })
}
