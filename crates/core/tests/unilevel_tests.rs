use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tic_core::commission::entity::{
    CommissionEarning, CommissionFilter, CommissionSummary, NetworkMember, UnilevelReport,
};
use tic_core::commission::port::CommissionStore;
use tic_core::commission::service::run_unilevel_distribution;
use tic_core::common::Page;
use tic_core::distribution::entity::CreditOutcome;
use tic_core::store::error::StoreError;

/// In-memory network: `edges` are `(referrer, referred)` pairs.
#[derive(Default)]
struct FakeCommissionStore {
    edges: Vec<(String, String)>,
    vip: HashMap<String, u32>,
    credited: Mutex<Vec<CommissionEarning>>,
    failing_earner: Option<String>,
}

impl FakeCommissionStore {
    fn new(edges: &[(&str, &str)], vip: &[(&str, u32)]) -> Self {
        Self {
            edges: edges.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect(),
            vip: vip.iter().map(|(e, n)| (e.to_string(), *n)).collect(),
            ..Default::default()
        }
    }

    fn paid_to(&self, earner: &str) -> Decimal {
        self.credited
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.earner_email == earner)
            .map(|c| c.amount)
            .sum()
    }
}

#[async_trait]
impl CommissionStore for FakeCommissionStore {
    async fn downline(&self, email: &str, depth: u32) -> Result<Vec<NetworkMember>, StoreError> {
        let mut seen = HashSet::from([email.to_string()]);
        let mut frontier = vec![email.to_string()];
        let mut members = Vec::new();
        for level in 1..=depth {
            let mut next = Vec::new();
            for parent in &frontier {
                for (referrer, referred) in &self.edges {
                    if referrer == parent && seen.insert(referred.clone()) {
                        members.push(NetworkMember {
                            email: referred.clone(),
                            level,
                            referrer_email: parent.clone(),
                            referral_code: String::new(),
                            joined_at: Utc::now(),
                        });
                        next.push(referred.clone());
                    }
                }
            }
            frontier = next;
        }
        Ok(members)
    }

    async fn referrers(&self) -> Result<Vec<String>, StoreError> {
        let mut out: Vec<String> = Vec::new();
        for (referrer, _) in &self.edges {
            if !out.contains(referrer) {
                out.push(referrer.clone());
            }
        }
        Ok(out)
    }

    async fn active_vip_counts(&self, _now: DateTime<Utc>) -> Result<HashMap<String, u32>, StoreError> {
        Ok(self.vip.clone())
    }

    async fn credit(&self, earning: &CommissionEarning, _now: DateTime<Utc>) -> Result<CreditOutcome, StoreError> {
        if self.failing_earner.as_deref() == Some(earning.earner_email.as_str()) {
            return Err(StoreError::Database("disk full".into()));
        }
        let mut credited = self.credited.lock().unwrap();
        let exists = credited.iter().any(|c| {
            c.earner_email == earning.earner_email
                && c.referred_email == earning.referred_email
                && c.kind == earning.kind
                && c.source_id == earning.source_id
        });
        if exists {
            return Ok(CreditOutcome::AlreadyDistributed);
        }
        credited.push(earning.clone());
        Ok(CreditOutcome::Credited)
    }

    async fn list_commissions(
        &self,
        _earner_email: &str,
        _filter: &CommissionFilter,
        _page: Page,
    ) -> Result<(Vec<CommissionEarning>, bool), StoreError> {
        Ok((Vec::new(), false))
    }

    async fn summary(&self, _earner_email: &str) -> Result<CommissionSummary, StoreError> {
        Ok(CommissionSummary::default())
    }

    async fn earnings_by_member(&self, _earner_email: &str) -> Result<HashMap<String, Decimal>, StoreError> {
        Ok(HashMap::new())
    }

    async fn day_report(&self, date: NaiveDate) -> Result<UnilevelReport, StoreError> {
        Ok(UnilevelReport::empty(date))
    }
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn test_depth_depends_on_earner_holding_vip() {
    // root -> a -> b -> c ; plain -> x -> y
    let store = FakeCommissionStore::new(
        &[("root", "a"), ("a", "b"), ("b", "c"), ("plain", "x"), ("x", "y")],
        &[("root", 1), ("a", 1), ("b", 2), ("c", 1), ("x", 1), ("y", 3)],
    );

    let report = run_unilevel_distribution(&store, noon()).await.unwrap();

    // root holds VIP: a (L1, 1 plan) + b (L2, 2 plans) + c (L3, 1 plan)
    assert_eq!(store.paid_to("root"), dec!(0.044) + dec!(0.044) + dec!(0.022));
    // plain holds nothing: level 1 only, y is out of reach
    assert_eq!(store.paid_to("plain"), dec!(0.044));
    assert_eq!(report.errors, 0);
    assert_eq!(report.earners_processed, 5);
    assert_eq!(report.by_level[0].level, 1);
    assert_eq!(report.total_amount, store.credited.lock().unwrap().iter().map(|c| c.amount).sum());
}

#[tokio::test]
async fn test_second_run_on_same_day_pays_nothing() {
    let store = FakeCommissionStore::new(&[("root", "a")], &[("a", 2)]);

    let first = run_unilevel_distribution(&store, noon()).await.unwrap();
    assert_eq!(first.credited, 1);
    assert_eq!(first.total_amount, dec!(0.088));

    let second = run_unilevel_distribution(&store, noon()).await.unwrap();
    assert_eq!(second.credited, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(store.paid_to("root"), dec!(0.088));

    let next_day = noon() + chrono::Duration::days(1);
    let third = run_unilevel_distribution(&store, next_day).await.unwrap();
    assert_eq!(third.credited, 1);
}

#[tokio::test]
async fn test_failed_credit_does_not_stop_the_run() {
    let mut store = FakeCommissionStore::new(&[("bad", "a"), ("good", "b")], &[("a", 1), ("b", 1)]);
    store.failing_earner = Some("bad".into());

    let report = run_unilevel_distribution(&store, noon()).await.unwrap();
    assert_eq!(report.errors, 1);
    assert_eq!(report.credited, 1);
    assert_eq!(store.paid_to("good"), dec!(0.044));
}
