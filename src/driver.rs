//! The fixed account → campaign → ad set → ad → insights drill-down.
//!
//! Each [`Step`] declares the listing step whose identifier it needs. When a
//! listing yields [`Extracted::NoData`] (empty list, error body, undecodable
//! body or transport failure) every step depending on it is recorded as
//! skipped and no request is sent for it.

use crate::error::ProbeError;
use crate::http::{HttpMethod, Params};
use crate::session::Session;
use crate::types::{Extracted, Metrics, RateLimitState};
use log::{info, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;

const ACCOUNT_FIELDS: &str = "id,name,account_status";
const CAMPAIGN_LIST_FIELDS: &str = "id,name,status,objective";
const CAMPAIGN_DETAIL_FIELDS: &str =
    "id,name,status,objective,daily_budget,lifetime_budget,bid_strategy";
const ADSET_FIELDS: &str =
    "id,name,targeting,daily_budget,lifetime_budget,status,bid_strategy,billing_event";
const AD_FIELDS: &str = "id,name,creative{id,title,body,image_url,video_id,thumbnail_url},status,effective_status,preview_shareable_link";
const AD_INSIGHT_FIELDS: &str = "impressions,inline_link_clicks,inline_link_click_ctr,actions,video_p25_watched_actions,video_p50_watched_actions,video_p75_watched_actions,video_p95_watched_actions,video_p100_watched_actions";
const PAGE_LIMIT: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Accounts,
    Campaigns,
    CampaignDetail,
    AdSets,
    AdSetDetail,
    Ads,
    AdInsights,
    CampaignInsights,
    DailyTrend,
    DemographicTrend,
    CampaignTrend,
}

pub const CORE_STEPS: [Step; 8] = [
    Step::Accounts,
    Step::Campaigns,
    Step::CampaignDetail,
    Step::AdSets,
    Step::AdSetDetail,
    Step::Ads,
    Step::AdInsights,
    Step::CampaignInsights,
];

pub const TREND_STEPS: [Step; 3] = [Step::DailyTrend, Step::DemographicTrend, Step::CampaignTrend];

/// A fully parameterized probe call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    pub path: String,
    pub method: HttpMethod,
    pub params: Params,
}

impl Step {
    pub fn number(self) -> usize {
        match self {
            Step::Accounts => 1,
            Step::Campaigns => 2,
            Step::CampaignDetail => 3,
            Step::AdSets => 4,
            Step::AdSetDetail => 5,
            Step::Ads => 6,
            Step::AdInsights => 7,
            Step::CampaignInsights => 8,
            Step::DailyTrend => 9,
            Step::DemographicTrend => 10,
            Step::CampaignTrend => 11,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Accounts => "List ad accounts",
            Step::Campaigns => "List campaigns",
            Step::CampaignDetail => "Campaign detail",
            Step::AdSets => "List ad sets",
            Step::AdSetDetail => "Ad set detail",
            Step::Ads => "List ads",
            Step::AdInsights => "Ad insights",
            Step::CampaignInsights => "Campaign insights",
            Step::DailyTrend => "Daily account trend",
            Step::DemographicTrend => "Demographic trend",
            Step::CampaignTrend => "Campaign trend",
        }
    }

    /// The listing step whose identifier this step consumes.
    pub fn requires(self) -> Option<Step> {
        match self {
            Step::Accounts => None,
            Step::Campaigns => Some(Step::Accounts),
            Step::CampaignDetail => Some(Step::Campaigns),
            Step::AdSets => Some(Step::Campaigns),
            Step::AdSetDetail => Some(Step::AdSets),
            Step::Ads => Some(Step::Campaigns),
            Step::AdInsights => Some(Step::Ads),
            Step::CampaignInsights => Some(Step::Campaigns),
            Step::DailyTrend | Step::DemographicTrend | Step::CampaignTrend => Some(Step::Accounts),
        }
    }

    pub fn is_listing(self) -> bool {
        matches!(self, Step::Accounts | Step::Campaigns | Step::AdSets | Step::Ads)
    }

    /// Build the request from identifiers extracted so far. `Err` names the
    /// listing step whose identifier is missing.
    pub fn request(self, ids: &Ids) -> Result<ProbeRequest, Step> {
        let (path, params) = match self {
            Step::Accounts => ("/me/adaccounts".to_string(), json!({ "fields": ACCOUNT_FIELDS })),
            Step::Campaigns => (
                format!("/act_{}/campaigns", ids.need(Step::Accounts)?),
                json!({ "fields": CAMPAIGN_LIST_FIELDS, "limit": PAGE_LIMIT }),
            ),
            Step::CampaignDetail => (
                format!("/{}", ids.need(Step::Campaigns)?),
                json!({ "fields": CAMPAIGN_DETAIL_FIELDS }),
            ),
            Step::AdSets => {
                ids.need(Step::Campaigns)?;
                (
                    format!("/act_{}/adsets", ids.need(Step::Accounts)?),
                    json!({
                        "fields": ADSET_FIELDS,
                        "breakdowns": "age,gender,region",
                        "limit": PAGE_LIMIT,
                    }),
                )
            }
            Step::AdSetDetail => (
                format!("/{}", ids.need(Step::AdSets)?),
                json!({ "fields": ADSET_FIELDS }),
            ),
            Step::Ads => {
                let campaign = ids.need(Step::Campaigns)?;
                (
                    format!("/act_{}/ads", ids.need(Step::Accounts)?),
                    json!({ "campaign_id": campaign, "fields": AD_FIELDS, "limit": PAGE_LIMIT }),
                )
            }
            Step::AdInsights => {
                let ad = ids.need(Step::Ads)?;
                (
                    format!("/act_{}/insights", ids.need(Step::Accounts)?),
                    json!({
                        "level": "ad",
                        "fields": AD_INSIGHT_FIELDS,
                        "date_preset": "last_30d",
                        "filtering": equal_filter("ad.id", ad),
                    }),
                )
            }
            Step::CampaignInsights => {
                let campaign = ids.need(Step::Campaigns)?;
                (
                    format!("/act_{}/insights", ids.need(Step::Accounts)?),
                    json!({
                        "level": "campaign",
                        "fields": "impressions,reach,spend",
                        "date_preset": "last_7d",
                        "filtering": equal_filter("campaign.id", campaign),
                    }),
                )
            }
            Step::DailyTrend => (
                format!("/act_{}/insights", ids.need(Step::Accounts)?),
                json!({
                    "level": "account",
                    "fields": "impressions,reach,spend,clicks",
                    "date_preset": "last_30d",
                    "time_increment": 1,
                }),
            ),
            Step::DemographicTrend => (
                format!("/act_{}/insights", ids.need(Step::Accounts)?),
                json!({
                    "level": "account",
                    "fields": "impressions,reach,spend",
                    "date_preset": "last_30d",
                    "breakdowns": "age,gender",
                }),
            ),
            Step::CampaignTrend => (
                format!("/act_{}/insights", ids.need(Step::Accounts)?),
                json!({
                    "level": "campaign",
                    "fields": "campaign_id,campaign_name,impressions,spend,ctr",
                    "date_preset": "last_30d",
                }),
            ),
        };
        Ok(ProbeRequest {
            path,
            method: HttpMethod::Get,
            params: into_params(params),
        })
    }
}

// The API expects `filtering` as a JSON string, not a nested parameter.
fn equal_filter(field: &str, value: &str) -> String {
    json!([{ "field": field, "operator": "EQUAL", "value": value }]).to_string()
}

fn into_params(v: Value) -> Params {
    match v {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

/// Identifiers extracted from listing steps. Account ids are stored without
/// their `act_` prefix.
#[derive(Debug, Clone, Default)]
pub struct Ids(HashMap<Step, String>);

impl Ids {
    pub fn insert(&mut self, step: Step, id: String) {
        self.0.insert(step, id);
    }

    pub fn get(&self, step: Step) -> Option<&str> {
        self.0.get(&step).map(String::as_str)
    }

    fn need(&self, step: Step) -> Result<&str, Step> {
        self.get(step).ok_or(step)
    }
}

/// Take `data[0].id` from a listing body. Numeric ids are accepted and
/// rendered as text.
pub fn extract_first_id(step: Step, body: Option<&Value>) -> Extracted {
    let id = body
        .and_then(|b| b.get("data"))
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|first| first.get("id"))
        .and_then(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
    let id = match (step, id) {
        (Step::Accounts, Some(id)) => {
            Some(id.strip_prefix("act_").map_or_else(|| id.clone(), str::to_string))
        }
        (_, id) => id,
    };
    match id {
        Some(id) if !id.is_empty() => Extracted::HasData(id),
        _ => Extracted::NoData,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Completed {
        metrics: Metrics,
        extracted: Option<Extracted>,
    },
    TransportFailed {
        message: String,
    },
    Skipped {
        requires: Step,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub step: Step,
    pub path: Option<String>,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrillDownReport {
    pub steps: Vec<StepRecord>,
    pub final_state: RateLimitState,
}

impl DrillDownReport {
    pub fn record(&self, step: Step) -> Option<&StepRecord> {
        self.steps.iter().find(|r| r.step == step)
    }

    pub fn skipped(&self) -> impl Iterator<Item = Step> + '_ {
        self.steps
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::Skipped { .. }))
            .map(|r| r.step)
    }

    pub fn requested_paths(&self) -> Vec<&str> {
        self.steps.iter().filter_map(|r| r.path.as_deref()).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrillDownOptions {
    pub include_trends: bool,
}

fn planned_steps(options: DrillDownOptions) -> Vec<Step> {
    let mut steps = CORE_STEPS.to_vec();
    if options.include_trends {
        steps.extend_from_slice(&TREND_STEPS);
    }
    steps
}

/// Run the drill-down in order. Only report write failures abort; transport
/// failures and API errors are recorded per step.
pub async fn run_drill_down<W: Write>(
    session: &mut Session<W>,
    options: DrillDownOptions,
) -> Result<DrillDownReport, ProbeError> {
    let mut ids = Ids::default();
    let mut steps = Vec::new();

    for step in planned_steps(options) {
        let planned = match step.requires() {
            Some(dep) if ids.get(dep).is_none() => Err(dep),
            _ => step.request(&ids),
        };
        let req = match planned {
            Ok(req) => req,
            Err(requires) => {
                info!("skipping step {} ({}): no data from {}", step.number(), step.title(), requires.title());
                session
                    .reporter_mut()
                    .skipped(step.number(), step.title(), requires.title())?;
                steps.push(StepRecord {
                    step,
                    path: None,
                    outcome: StepOutcome::Skipped { requires },
                });
                continue;
            }
        };

        session.reporter_mut().section(step.number(), step.title())?;
        let outcome = match session.call(&req.path, req.method, Some(&req.params)).await {
            Ok(normalized) => {
                let extracted = step
                    .is_listing()
                    .then(|| extract_first_id(step, normalized.body.as_ref()));
                if let Some(id) = extracted.as_ref().and_then(Extracted::id) {
                    ids.insert(step, id.to_string());
                }
                StepOutcome::Completed {
                    metrics: normalized.metrics,
                    extracted,
                }
            }
            Err(e) if e.is_transport() => {
                warn!("step {} ({}) failed: {}", step.number(), step.title(), e);
                StepOutcome::TransportFailed {
                    message: e.to_string(),
                }
            }
            Err(e) => return Err(e),
        };
        steps.push(StepRecord {
            step,
            path: Some(req.path),
            outcome,
        });
    }

    Ok(DrillDownReport {
        steps,
        final_state: session.state(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_steps() -> Vec<Step> {
        planned_steps(DrillDownOptions {
            include_trends: true,
        })
    }

    #[test]
    fn step_numbers_follow_run_order() {
        let numbers: Vec<usize> = all_steps().into_iter().map(Step::number).collect();
        assert_eq!(numbers, (1..=11).collect::<Vec<_>>());
        assert_eq!(planned_steps(DrillDownOptions::default()).len(), 8);
    }

    #[test]
    fn dependencies_point_backwards_at_listings() {
        for step in all_steps() {
            if let Some(dep) = step.requires() {
                assert!(dep.is_listing(), "{:?} depends on non-listing {:?}", step, dep);
                assert!(dep.number() < step.number());
            }
        }
    }

    #[test]
    fn declared_dependency_is_what_the_request_needs() {
        let mut full = Ids::default();
        full.insert(Step::Accounts, "1".into());
        full.insert(Step::Campaigns, "2".into());
        full.insert(Step::AdSets, "3".into());
        full.insert(Step::Ads, "4".into());
        for step in all_steps() {
            assert!(step.request(&full).is_ok(), "{:?}", step);
            if let Some(dep) = step.requires() {
                let mut partial = full.clone();
                partial.0.remove(&dep);
                assert_eq!(step.request(&partial), Err(dep), "{:?}", step);
            }
        }
    }

    #[test]
    fn account_prefix_is_stripped() {
        let body = json!({"data": [{"id": "act_123", "name": "A"}, {"id": "act_456"}]});
        assert_eq!(
            extract_first_id(Step::Accounts, Some(&body)),
            Extracted::HasData("123".into())
        );
        let body = json!({"data": [{"id": "act_999"}]});
        assert_eq!(
            extract_first_id(Step::Campaigns, Some(&body)),
            Extracted::HasData("act_999".into())
        );
    }

    #[test]
    fn extraction_falls_back_to_no_data() {
        for body in [
            json!({"data": []}),
            json!({"data": [{"name": "no id"}]}),
            json!({"error": {"message": "bad"}}),
            json!({"data": "nope"}),
            json!([1, 2]),
        ] {
            assert_eq!(extract_first_id(Step::Campaigns, Some(&body)), Extracted::NoData);
        }
        assert_eq!(extract_first_id(Step::Ads, None), Extracted::NoData);
        assert_eq!(
            extract_first_id(Step::Ads, Some(&json!({"data": [{"id": 77}]}))),
            Extracted::HasData("77".into())
        );
    }

    #[test]
    fn insight_filters_are_json_strings() {
        let mut ids = Ids::default();
        ids.insert(Step::Accounts, "123".into());
        ids.insert(Step::Ads, "55".into());
        let req = Step::AdInsights.request(&ids).unwrap();
        assert_eq!(req.path, "/act_123/insights");
        let filtering = req.params["filtering"].as_str().unwrap();
        let parsed: Value = serde_json::from_str(filtering).unwrap();
        assert_eq!(parsed, json!([{"field": "ad.id", "operator": "EQUAL", "value": "55"}]));
        assert_eq!(req.params["level"], "ad");
        assert_eq!(req.params["date_preset"], "last_30d");
    }
}
