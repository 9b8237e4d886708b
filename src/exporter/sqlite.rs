//! SQLite 汇总导出器
//!
//! 建一张 `flow` 表：每个投影字段一列，外加 `bytes` 列；每个字段列
//! 一个索引。插入按批次进行，每批一个事务提交。目标文件已存在时拒绝
//! 运行，避免静默追加到旧数据上。

use rusqlite::Connection;
use std::path::{Path, PathBuf};

use super::SummaryExporter;
use crate::error::{FlowlogError, Result};
use crate::pipeline::reducer::GlobalSummary;

/// 每个事务的插入批次大小
const BATCH_SIZE: usize = 128;

/// SQLite 汇总导出器
#[derive(Debug)]
pub struct SqliteExporter {
    connection: Connection,
    db_path: PathBuf,
}

impl SqliteExporter {
    /// 创建导出器并打开数据库
    ///
    /// 目标文件已存在时返回 `OutputExists`，任何数据都不会被写入。
    pub fn create(db_path: &Path) -> Result<Self> {
        if db_path.exists() {
            return Err(FlowlogError::OutputExists(db_path.to_path_buf()));
        }

        tracing::info!("创建SQLite导出器: {}", db_path.display());
        let connection = Connection::open(db_path)?;
        connection.pragma_update(None, "journal_mode", "WAL")?;
        connection.pragma_update(None, "synchronous", "OFF")?;

        Ok(Self { connection, db_path: db_path.to_path_buf() })
    }
}

impl SummaryExporter for SqliteExporter {
    fn name(&self) -> &str {
        "SQLite"
    }

    fn export(&mut self, summary: &GlobalSummary) -> Result<()> {
        let field_names = summary.field_names();
        let columns = field_names.join(", ");

        self.connection.execute(
            &format!("CREATE TABLE flow ({columns}, bytes)"),
            [],
        )?;
        for field in &field_names {
            self.connection.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS {field}_index ON flow ({field})"
                ),
                [],
            )?;
        }

        let placeholders =
            vec!["?"; field_names.len() + 1].join(", ");
        let insert_sql =
            format!("INSERT INTO flow ({columns}, bytes) VALUES ({placeholders})");

        let entries: Vec<(&Vec<String>, u64)> =
            summary.keys.iter().map(|(k, v)| (k, *v)).collect();

        let mut inserted = 0usize;
        for batch in entries.chunks(BATCH_SIZE) {
            let tx = self.connection.transaction()?;
            {
                let mut stmt = tx.prepare_cached(&insert_sql)?;
                for (key, bytes) in batch {
                    let bytes = *bytes as i64;
                    let mut params: Vec<&dyn rusqlite::ToSql> = key
                        .iter()
                        .map(|field| field as &dyn rusqlite::ToSql)
                        .collect();
                    params.push(&bytes);
                    stmt.execute(params.as_slice())?;
                }
            }
            tx.commit()?;
            inserted += batch.len();
        }

        tracing::info!(
            "SQLite导出完成: {} ({} 行)",
            self.db_path.display(),
            inserted
        );
        Ok(())
    }
}
