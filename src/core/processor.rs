use crate::core::client::{Delivery, ShowAdsClient};
use crate::core::source::CsvSource;
use crate::core::validator::validate;
use crate::domain::model::{AgeLimit, BannerIdRange, BannerRequest, CustomerRecord};
use crate::domain::ports::{Clock, Transport};
use crate::utils::error::Result;
use serde::Serialize;
use std::io::Read;
use std::path::Path;

/// 被拒絕的資料列與原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    pub row: usize,
    pub reason: String,
}

/// 處理結果。`valid`/`invalid` 只反映驗證結果；
/// 投遞成功與否另計於 `delivered`/`undelivered`，不會扣減 `valid`。
/// `rejected` 只保留前 `rejected_limit` 筆明細，`invalid` 仍計入全部。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingSummary {
    pub valid: usize,
    pub invalid: usize,
    pub delivered: usize,
    pub undelivered: usize,
    pub rejected: Vec<RejectedRecord>,
}

/// 讀取來源 → 驗證 → 批次送出（bulk 失敗時逐筆送出）
pub struct CustomerProcessor<'a, T: Transport, C: Clock> {
    client: &'a ShowAdsClient<T, C>,
    age_limit: AgeLimit,
    banner_range: BannerIdRange,
    batch_size: usize,
    rejected_limit: usize,
}

/// 預設保留的拒絕明細筆數上限
pub const DEFAULT_REJECTED_LIMIT: usize = 1000;

impl<'a, T: Transport, C: Clock> CustomerProcessor<'a, T, C> {
    pub fn new(client: &'a ShowAdsClient<T, C>, age_limit: AgeLimit) -> Self {
        let settings = client.settings();
        Self {
            client,
            age_limit,
            banner_range: settings.banner_range(),
            batch_size: settings.bulk_batch_size.max(1),
            rejected_limit: DEFAULT_REJECTED_LIMIT,
        }
    }

    /// 設定 `rejected` 明細上限；0 表示不收集明細
    pub fn with_rejected_limit(mut self, limit: usize) -> Self {
        self.rejected_limit = limit;
        self
    }

    pub async fn process_file<P: AsRef<Path>>(&self, path: P) -> Result<ProcessingSummary> {
        let source = CsvSource::open(path)?;
        self.process_source(source).await
    }

    pub async fn process_source<R: Read>(&self, source: CsvSource<R>) -> Result<ProcessingSummary> {
        self.process_records(source).await
    }

    pub async fn process_records<I>(&self, records: I) -> Result<ProcessingSummary>
    where
        I: IntoIterator<Item = Result<CustomerRecord>>,
    {
        let mut summary = ProcessingSummary::default();
        let mut batch: Vec<BannerRequest> = Vec::with_capacity(self.batch_size);

        for (index, item) in records.into_iter().enumerate() {
            let row = index + 1;
            let record = match item {
                Ok(record) => record,
                Err(err) if !err.is_fatal() => {
                    tracing::warn!("⚠️ Skipping row {}: {}", row, err);
                    self.reject(&mut summary, row, err.to_string());
                    continue;
                }
                Err(err) => return Err(err),
            };

            if let Err(failure) = validate(&record, &self.age_limit, &self.banner_range) {
                tracing::warn!("⚠️ Invalid customer at row {}: {}", row, failure);
                self.reject(&mut summary, row, failure.to_string());
                continue;
            }

            summary.valid += 1;
            batch.push(BannerRequest::from(record));
            if batch.len() >= self.batch_size {
                self.flush(&mut batch, &mut summary).await?;
            }
        }

        self.flush(&mut batch, &mut summary).await?;

        tracing::info!(
            "📊 Processed customers: {} valid, {} invalid ({} delivered, {} undelivered)",
            summary.valid,
            summary.invalid,
            summary.delivered,
            summary.undelivered
        );
        Ok(summary)
    }

    fn reject(&self, summary: &mut ProcessingSummary, row: usize, reason: String) {
        summary.invalid += 1;
        if summary.rejected.len() < self.rejected_limit {
            summary.rejected.push(RejectedRecord { row, reason });
        }
    }

    async fn flush(
        &self,
        batch: &mut Vec<BannerRequest>,
        summary: &mut ProcessingSummary,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let banners = std::mem::take(batch);

        match self.client.show_banners_bulk(&banners).await? {
            Delivery::Delivered => {
                tracing::debug!("📤 Bulk delivered {} banners", banners.len());
                summary.delivered += banners.len();
            }
            Delivery::Failed { reason } => {
                tracing::warn!(
                    "⚠️ Bulk submission of {} banners failed ({}), falling back to single submissions",
                    banners.len(),
                    reason
                );
                for banner in &banners {
                    match self.client.show_banner(banner).await? {
                        Delivery::Delivered => summary.delivered += 1,
                        Delivery::Failed { reason } => {
                            tracing::error!(
                                "❌ Failed to show banner {} for cookie {}: {}",
                                banner.banner_id,
                                banner.visitor_cookie,
                                reason
                            );
                            summary.undelivered += 1;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::tests::{
        test_settings, ManualClock, Reply, ScriptedTransport, TOKEN_OK,
    };
    use crate::utils::error::ShowAdsError;
    use std::io::Cursor;
    use std::sync::Arc;

    type TestClient = ShowAdsClient<Arc<ScriptedTransport>, Arc<ManualClock>>;

    fn client_with(transport: &Arc<ScriptedTransport>, batch_size: usize) -> TestClient {
        let mut settings = test_settings();
        settings.bulk_batch_size = batch_size;
        ShowAdsClient::with_clock(settings, transport.clone(), ManualClock::new())
    }

    fn csv(rows: &str) -> CsvSource<Cursor<Vec<u8>>> {
        let content = format!("Name,Age,Cookie,Banner_id\n{}", rows);
        CsvSource::from_reader(Cursor::new(content.into_bytes())).unwrap()
    }

    #[tokio::test]
    async fn test_valid_and_invalid_counts() {
        let transport = ScriptedTransport::new();
        transport.script("/auth", vec![TOKEN_OK]);
        transport.script("/banners/show/bulk", vec![Reply::Status(200, "")]);
        let client = client_with(&transport, 1000);

        let summary = CustomerProcessor::new(&client, AgeLimit::default())
            .process_source(csv("John Doe,30,c1,5\nJ0hn,30,c2,5\n"))
            .await
            .unwrap();

        assert_eq!(summary.valid, 1);
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.rejected.len(), 1);
        assert_eq!(summary.rejected[0].row, 2);
        assert!(summary.rejected[0].reason.contains("invalid name"));

        let bulk = transport.calls_to("/banners/show/bulk");
        assert_eq!(bulk.len(), 1);
        assert_eq!(
            bulk[0].body,
            serde_json::json!({"Data": [{"VisitorCookie": "c1", "BannerId": 5}]})
        );
    }

    #[tokio::test]
    async fn test_bulk_failure_falls_back_to_single_submissions() {
        let transport = ScriptedTransport::new();
        transport.script("/auth", vec![TOKEN_OK]);
        transport.script("/banners/show/bulk", vec![Reply::Status(500, "")]);
        transport.script("/banners/show", vec![Reply::Status(200, "")]);
        let client = client_with(&transport, 1000);

        let summary = CustomerProcessor::new(&client, AgeLimit::default())
            .process_source(csv("Ann,30,c1,1\nBob,31,c2,2\nCid,32,c3,3\n"))
            .await
            .unwrap();

        assert_eq!(transport.calls_to("/banners/show/bulk").len(), 5);
        let singles = transport.calls_to("/banners/show");
        assert_eq!(singles.len(), 3);
        let cookies: Vec<_> = singles
            .iter()
            .map(|c| c.body["VisitorCookie"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies, vec!["c1", "c2", "c3"]);

        assert_eq!(summary.valid, 3);
        assert_eq!(summary.delivered, 3);
        assert_eq!(summary.undelivered, 0);
    }

    #[tokio::test]
    async fn test_delivery_failures_do_not_change_valid_count() {
        let transport = ScriptedTransport::new();
        transport.script("/auth", vec![TOKEN_OK]);
        transport.script("/banners/show/bulk", vec![Reply::Status(400, "bad")]);
        transport.script("/banners/show", vec![Reply::Status(400, "bad")]);
        let client = client_with(&transport, 1000);

        let summary = CustomerProcessor::new(&client, AgeLimit::default())
            .process_source(csv("Ann,30,c1,1\nBob,31,c2,2\n"))
            .await
            .unwrap();

        assert_eq!(summary.valid, 2);
        assert_eq!(summary.delivered, 0);
        assert_eq!(summary.undelivered, 2);
        assert_eq!(transport.calls_to("/banners/show/bulk").len(), 1);
        assert_eq!(transport.calls_to("/banners/show").len(), 2);
    }

    #[tokio::test]
    async fn test_batches_flush_at_configured_size() {
        let transport = ScriptedTransport::new();
        transport.script("/auth", vec![TOKEN_OK]);
        transport.script("/banners/show/bulk", vec![Reply::Status(200, "")]);
        let client = client_with(&transport, 2);

        let summary = CustomerProcessor::new(&client, AgeLimit::default())
            .process_source(csv("A,20,c1,1\nB,20,c2,1\nC,20,c3,1\nD,20,c4,1\nE,20,c5,1\n"))
            .await
            .unwrap();

        let sizes: Vec<_> = transport
            .calls_to("/banners/show/bulk")
            .iter()
            .map(|c| c.body["Data"].as_array().unwrap().len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(summary.delivered, 5);
    }

    #[tokio::test]
    async fn test_malformed_row_counts_as_invalid() {
        let transport = ScriptedTransport::new();
        transport.script("/auth", vec![TOKEN_OK]);
        transport.script("/banners/show/bulk", vec![Reply::Status(200, "")]);
        let client = client_with(&transport, 1000);

        let summary = CustomerProcessor::new(&client, AgeLimit::default())
            .process_source(csv("Ann,thirty,c1,1\nBob,31,c2,2\n"))
            .await
            .unwrap();

        assert_eq!(summary.valid, 1);
        assert_eq!(summary.invalid, 1);
        assert!(summary.rejected[0].reason.contains("Ann,thirty,c1,1"));
    }

    #[tokio::test]
    async fn test_custom_age_limit_applies() {
        let transport = ScriptedTransport::new();
        transport.script("/auth", vec![TOKEN_OK]);
        transport.script("/banners/show/bulk", vec![Reply::Status(200, "")]);
        let client = client_with(&transport, 1000);

        let summary = CustomerProcessor::new(&client, AgeLimit::new(21, 65))
            .process_source(csv("Ann,20,c1,1\nBob,65,c2,2\nCid,66,c3,3\n"))
            .await
            .unwrap();

        assert_eq!(summary.valid, 1);
        assert_eq!(summary.invalid, 2);
        assert!(summary.rejected[0].reason.contains("between 21 and 65"));
    }

    #[tokio::test]
    async fn test_all_invalid_makes_no_requests() {
        let transport = ScriptedTransport::new();
        let client = client_with(&transport, 1000);

        let summary = CustomerProcessor::new(&client, AgeLimit::default())
            .process_source(csv("J0hn,30,c1,5\nJane,10,c2,5\nJim,30,c3,500\n"))
            .await
            .unwrap();

        assert_eq!(summary.valid, 0);
        assert_eq!(summary.invalid, 3);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_authentication_failure_aborts_run() {
        let transport = ScriptedTransport::new();
        transport.script("/auth", vec![Reply::Status(401, "bad key")]);
        let client = client_with(&transport, 1000);

        let result = CustomerProcessor::new(&client, AgeLimit::default())
            .process_source(csv("Ann,30,c1,1\n"))
            .await;

        assert!(matches!(
            result,
            Err(ShowAdsError::AuthenticationError { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_process_records_from_iterator() {
        let transport = ScriptedTransport::new();
        transport.script("/auth", vec![TOKEN_OK]);
        transport.script("/banners/show/bulk", vec![Reply::Status(200, "")]);
        let client = client_with(&transport, 1000);

        let records = vec![Ok(CustomerRecord {
            name: "Ann".to_string(),
            age: 30,
            cookie: "c1".to_string(),
            banner_id: 1,
        })];

        let summary = CustomerProcessor::new(&client, AgeLimit::default())
            .process_records(records)
            .await
            .unwrap();
        assert_eq!(summary.delivered, 1);
    }

    #[tokio::test]
    async fn test_rejected_details_are_capped_but_counted() {
        let transport = ScriptedTransport::new();
        let client = client_with(&transport, 1000);

        let summary = CustomerProcessor::new(&client, AgeLimit::default())
            .with_rejected_limit(2)
            .process_source(csv("J0hn,30,c1,5\nAnn,5,c2,5\nBob,30,c3,500\n"))
            .await
            .unwrap();

        assert_eq!(summary.invalid, 3);
        assert_eq!(summary.rejected.len(), 2);
        assert_eq!(summary.rejected[1].row, 2);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_zero_rejected_limit_keeps_no_details() {
        let transport = ScriptedTransport::new();
        let client = client_with(&transport, 1000);

        let summary = CustomerProcessor::new(&client, AgeLimit::default())
            .with_rejected_limit(0)
            .process_source(csv("J0hn,30,c1,5\n"))
            .await
            .unwrap();

        assert_eq!(summary.invalid, 1);
        assert!(summary.rejected.is_empty());
    }
}
