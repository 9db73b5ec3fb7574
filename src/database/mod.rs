use crate::config::Config;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info};

const RECREATE_SQL: &str = include_str!("../../sql/00-recreate-db.sql");
const SCHEMA_SQL: &str = include_str!("../../sql/01-create-schema.sql");

/// 커넥션 풀과 스키마 관리
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// 데이터베이스 매니저 생성
    pub async fn new(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.database_url)
            .await?;
        info!(
            "{:<12} --> 커넥션 풀 생성 (max={})",
            "Database", config.db_max_connections
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 트랜잭션 실행, 클로저가 Err 를 돌려주면 롤백
    pub async fn transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: for<'c> FnOnce(
            &'c mut sqlx::Transaction<'_, sqlx::Postgres>,
        ) -> Pin<Box<dyn Future<Output = Result<R, E>> + Send + 'c>>,
        E: From<sqlx::Error>,
    {
        let mut tx = self.pool.begin().await?;
        match f(&mut tx).await {
            Ok(r) => {
                tx.commit().await?;
                Ok(r)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// 스키마 생성, recreate 면 기존 테이블을 먼저 지운다
    pub async fn initialize_database(&self, recreate: bool) -> Result<(), sqlx::Error> {
        if recreate {
            info!("{:<12} --> 테이블 재생성", "Database");
            self.execute_script(RECREATE_SQL).await?;
        }
        self.execute_script(SCHEMA_SQL).await
    }

    /// 연결 확인
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn execute_script(&self, sql: &str) -> Result<(), sqlx::Error> {
        for statement in split_statements(sql) {
            debug!("{:<12} --> {}", "Database", statement);
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

/// `;` 단위로 나누고 `--` 주석 줄과 빈 문장은 버린다
fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}
