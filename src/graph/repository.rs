//! Poet-level operations on top of a [`GraphStore`].
//!
//! Each method runs one or more canonical queries and reshapes the rows into
//! the JSON the front-end consumes.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;

use super::queries::{self, PeriodCondition};
use super::{GraphStore, Row};

/// Periods around the An Lushan rebellion, as half-open year ranges.
pub const ANSHI_PERIODS: [(&str, i64, i64); 3] = [
    ("pre_anshi", 750, 755),
    ("mid_anshi", 755, 757),
    ("post_anshi", 757, 763),
];

/// Years each poet held office. Poets not listed count as never in office.
const OFFICIAL_YEARS: &[(&str, &[i64])] = &[
    ("李白", &[742, 743, 744]),
    ("杜甫", &[755, 756, 757, 758, 759]),
    ("王维", &[721, 722, 723, 724, 756]),
    ("白居易", &[806, 807, 808, 809, 810]),
];

/// Period labels shown by the front-end chart.
pub const IN_OFFICE_LABEL: &str = "在任";
pub const OUT_OF_OFFICE_LABEL: &str = "在野";

/// Years `name` held office.
pub fn official_years(name: &str) -> &'static [i64] {
    OFFICIAL_YEARS
        .iter()
        .find(|(poet, _)| *poet == name)
        .map(|(_, years)| *years)
        .unwrap_or(&[])
}

/// Social network in node/link form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Network {
    pub nodes: Vec<NetworkNode>,
    pub links: Vec<NetworkLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Output counts in and out of office.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfficePeriod {
    pub period: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub count: i64,
}

/// Graph-backed poet repository. Cheap to clone.
#[derive(Clone)]
pub struct PoetRepository {
    store: Arc<dyn GraphStore>,
}

fn str_field(row: &Row, key: &str) -> Option<String> {
    row.get(key).and_then(Value::as_str).map(str::to_string)
}

/// `sum()` of an empty match is null; treat it as zero.
fn total(rows: &[Row]) -> i64 {
    rows.first()
        .and_then(|r| r.get("total"))
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

impl PoetRepository {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub async fn list_poets(&self) -> Result<Vec<Row>> {
        self.store.run(&queries::list_poets()).await
    }

    /// Basic poet record, or `None` if the poet is unknown.
    pub async fn poet_info(&self, name: &str) -> Result<Option<Row>> {
        Ok(self
            .store
            .run(&queries::poet_info(name))
            .await?
            .into_iter()
            .next())
    }

    pub async fn locations(&self, name: &str) -> Result<Vec<Row>> {
        self.store.run(&queries::poet_locations(name)).await
    }

    /// Names of the poet's friends.
    pub async fn friends(&self, name: &str) -> Result<Vec<String>> {
        let rows = self.store.run(&queries::poet_friends(name)).await?;
        Ok(rows.iter().filter_map(|r| str_field(r, "name")).collect())
    }

    pub async fn poems(&self, name: &str, limit: u32) -> Result<Vec<Row>> {
        self.store.run(&queries::poet_poems(name, limit)).await
    }

    /// Full text of every poem by the poet.
    pub async fn poem_contents(&self, name: &str) -> Result<Vec<String>> {
        let rows = self.store.run(&queries::poet_poem_contents(name)).await?;
        Ok(rows.iter().filter_map(|r| str_field(r, "content")).collect())
    }

    /// Friend network; nodes are deduplicated in first-seen order.
    pub async fn network(&self, name: &str) -> Result<Network> {
        let rows = self.store.run(&queries::poet_network(name)).await?;
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        let mut links = Vec::new();
        for row in &rows {
            let (Some(source), Some(target)) = (str_field(row, "source"), str_field(row, "target"))
            else {
                continue;
            };
            for node in [&source, &target] {
                if seen.insert(node.clone()) {
                    nodes.push(NetworkNode {
                        id: node.clone(),
                        label: node.clone(),
                    });
                }
            }
            links.push(NetworkLink {
                source,
                target,
                kind: str_field(row, "relationship").unwrap_or_else(|| "FRIEND_OF".into()),
            });
        }
        Ok(Network { nodes, links })
    }

    pub async fn search_poems(&self, author: &str, title_keyword: &str) -> Result<Vec<Row>> {
        self.store
            .run(&queries::search_poems(author, title_keyword))
            .await
    }

    pub async fn search_poem_titles(&self, author: &str, title_keyword: &str) -> Result<Vec<String>> {
        let rows = self
            .store
            .run(&queries::search_poem_titles(author, title_keyword))
            .await?;
        Ok(rows.iter().filter_map(|r| str_field(r, "title")).collect())
    }

    pub async fn heatmap(&self, name: &str) -> Result<Vec<Row>> {
        self.store.run(&queries::heatmap(name)).await
    }

    pub async fn annual_counts(&self, name: &str) -> Result<Vec<Row>> {
        self.store.run(&queries::annual_counts(name)).await
    }

    /// Works per rebellion period, keyed `pre_anshi`, `mid_anshi`, `post_anshi`.
    pub async fn anshi_periods(&self, name: &str) -> Result<Value> {
        let mut out = serde_json::Map::new();
        for (key, start, end) in ANSHI_PERIODS {
            let rows = self
                .store
                .run(&queries::period_total(name, start, end))
                .await?;
            out.insert(key.to_string(), json!(total(&rows)));
        }
        Ok(Value::Object(out))
    }

    /// Works written in office versus out of office.
    pub async fn office_periods(&self, name: &str) -> Result<Vec<OfficePeriod>> {
        let in_office = total(
            &self
                .store
                .run(&queries::years_total(name, official_years(name)))
                .await?,
        );
        let all = total(&self.store.run(&queries::works_total(name)).await?);
        Ok(vec![
            OfficePeriod {
                period: String::new(),
                kind: IN_OFFICE_LABEL.to_string(),
                count: in_office,
            },
            OfficePeriod {
                period: String::new(),
                kind: OUT_OF_OFFICE_LABEL.to_string(),
                count: all - in_office,
            },
        ])
    }

    pub async fn poem_imagery(&self, name: &str) -> Result<Vec<Row>> {
        self.store.run(&queries::poem_imagery(name)).await
    }

    /// `{name, value}` pairs for one poet or, with `None`, the whole graph.
    pub async fn imagery_cloud(&self, name: Option<&str>) -> Result<Vec<Value>> {
        let rows = self.store.run(&queries::imagery_cloud(name)).await?;
        Ok(rows
            .iter()
            .map(|r| {
                json!({
                    "name": r.get("name").cloned().unwrap_or(Value::Null),
                    "value": r.get("value").cloned().unwrap_or(Value::Null),
                })
            })
            .collect())
    }

    /// Imagery for a period. Rows with a non-string name or non-integer count
    /// are dropped; counts are doubled for display weight.
    pub async fn period_imagery(&self, name: &str, cond: PeriodCondition) -> Result<Vec<Value>> {
        let rows = self
            .store
            .run(&queries::period_imagery(name, cond))
            .await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                let name = r.get("name")?.as_str()?.trim();
                let value = r.get("value")?.as_i64()?;
                Some(json!({ "name": name, "value": value * 2 }))
            })
            .collect())
    }
}
