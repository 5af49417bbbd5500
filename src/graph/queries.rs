//! Canonical read-only Cypher statements.
//!
//! Statement text is fixed at compile time. Anything that varies per request
//! is a `$parameter`; the one place where the query shape itself varies
//! (the period filter for imagery) selects between whole statements.

use serde_json::Value;

use super::Query;

/// Projection shared by every poem-returning statement.
macro_rules! poem_fields {
    () => {
        "poem.title AS title, poem.content AS content, \
         poem.trans_content AS trans_content, poem.appear AS appear, \
         poem.background AS background, poem.tags AS tags, \
         poem.formal AS formal, poem.data AS data, poem.zhu AS zhu"
    };
}

pub const LIST_POETS: &str = "MATCH (p:Poet) \
     RETURN p.name AS name, p.num_poems AS count \
     ORDER BY p.name LIMIT 100";

pub const POET_INFO: &str = "MATCH (p:Poet {name: $name}) \
     RETURN p.name AS name, p.birth AS birth, p.death AS death, \
     p.bio AS bio, p.num_poems AS poem_count \
     LIMIT 1";

pub const POET_LOCATIONS: &str = "MATCH (p:Poet {name: $name})-[r:VISITED]->(pl:Place) \
     RETURN pl.name AS name, pl.lat AS lat, pl.lon AS lon, \
     r.year AS year, r.event AS event \
     ORDER BY r.year";

pub const POET_FRIENDS: &str = "MATCH (p:Poet {name: $name})-[:FRIEND_OF]-(friend:Poet) \
     RETURN DISTINCT friend.name AS name \
     ORDER BY friend.name";

pub const POET_POEMS: &str = concat!(
    "MATCH (p:Poet {name: $name})-[:WROTE]->(poem:Poem) RETURN ",
    poem_fields!(),
    " LIMIT $limit"
);

pub const POET_POEM_CONTENTS: &str = "MATCH (p:Poet {name: $name})-[:WROTE]->(poem) \
     RETURN poem.content AS content";

pub const POET_NETWORK: &str = "MATCH (p:Poet {name: $name})-[r:FRIEND_OF]-(other) \
     WHERE other.name IS NOT NULL AND other.name <> $name \
     RETURN p.name AS source, other.name AS target, type(r) AS relationship";

pub const SEARCH_POEMS: &str = concat!(
    "MATCH (poet:Poet {name: $author})-[:WROTE]->(poem:Poem) \
     WHERE toLower(poem.title) CONTAINS toLower($title_keyword) RETURN ",
    poem_fields!()
);

pub const SEARCH_POEM_TITLES: &str = "MATCH (poet:Poet {name: $author})-[:WROTE]->(poem:Poem) \
     WHERE toLower(poem.title) CONTAINS toLower($title_keyword) \
     RETURN poem.title AS title";

pub const HEATMAP: &str = "MATCH (p:Poet {name: $name})-[:WROTE]->(poem) \
     MATCH (p)-[:VISITED]->(place) \
     RETURN place.lat AS lat, place.lon AS lon, count(poem) AS intensity";

pub const ANNUAL_COUNTS: &str = "MATCH (p:Poet {name: $name})-[:YEARLY_OUTPUT]->(ac:AnnualCount) \
     RETURN ac.year AS year, ac.count AS count \
     ORDER BY ac.year";

pub const PERIOD_TOTAL: &str = "MATCH (p:Poet {name: $name})-[:YEARLY_OUTPUT]->(ac:AnnualCount) \
     WHERE ac.year >= $start AND ac.year < $end \
     RETURN sum(ac.count) AS total";

pub const YEARS_TOTAL: &str = "MATCH (p:Poet {name: $name})-[:YEARLY_OUTPUT]->(ac) \
     WHERE ac.year IN $years \
     RETURN sum(ac.count) AS total";

pub const WORKS_TOTAL: &str = "MATCH (p:Poet {name: $name})-[:YEARLY_OUTPUT]->(ac) \
     RETURN sum(ac.count) AS total";

pub const POEM_IMAGERY: &str =
    "MATCH (p:Poet {name: $name})-[:WROTE]->(poem)-[:CONTAINS_IMAGE]->(img) \
     RETURN img.name AS image, count(*) AS freq \
     ORDER BY freq DESC LIMIT 50";

pub const IMAGERY_CLOUD_POET: &str =
    "MATCH (:Poet {name: $name})-[:WROTE]->()-[:CONTAINS_IMAGE]->(i) \
     RETURN i.name AS name, count(*) AS value \
     ORDER BY value DESC LIMIT 50";

pub const IMAGERY_CLOUD_ALL: &str = "MATCH (i:Image) \
     RETURN i.name AS name, count(*) AS value \
     ORDER BY value DESC LIMIT 100";

pub const PERIOD_IMAGERY_BEFORE: &str = "MATCH (p:Poet {name: $name})-[:WROTE]->(poem) \
     WHERE poem.year < $pivot \
     MATCH (poem)-[:CONTAINS_IMAGE]->(img) \
     RETURN img.name AS name, count(*) AS value \
     ORDER BY value DESC LIMIT 40";

pub const PERIOD_IMAGERY_FROM: &str = "MATCH (p:Poet {name: $name})-[:WROTE]->(poem) \
     WHERE poem.year >= $pivot \
     MATCH (poem)-[:CONTAINS_IMAGE]->(img) \
     RETURN img.name AS name, count(*) AS value \
     ORDER BY value DESC LIMIT 40";

pub const PERIOD_IMAGERY_ANY: &str = "MATCH (p:Poet {name: $name})-[:WROTE]->(poem) \
     MATCH (poem)-[:CONTAINS_IMAGE]->(img) \
     RETURN img.name AS name, count(*) AS value \
     ORDER BY value DESC LIMIT 40";

/// Year the An Lushan rebellion broke out; the pivot for period imagery.
pub const ANSHI_PIVOT_YEAR: i64 = 755;

/// Whitelisted period filters for imagery queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodCondition {
    /// `year < 755`
    BeforeAnshi,
    /// `year >= 755`
    FromAnshi,
    /// No filter.
    Any,
}

impl PeriodCondition {
    /// Map a client-supplied condition onto the whitelist. Unknown input means
    /// no filter.
    pub fn parse(raw: &str) -> Self {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        match compact.as_str() {
            "year<755" => Self::BeforeAnshi,
            "year>=755" => Self::FromAnshi,
            _ => Self::Any,
        }
    }
}

pub fn list_poets() -> Query {
    Query::new(LIST_POETS)
}

pub fn poet_info(name: &str) -> Query {
    Query::new(POET_INFO).param("name", name)
}

pub fn poet_locations(name: &str) -> Query {
    Query::new(POET_LOCATIONS).param("name", name)
}

pub fn poet_friends(name: &str) -> Query {
    Query::new(POET_FRIENDS).param("name", name)
}

pub fn poet_poems(name: &str, limit: u32) -> Query {
    Query::new(POET_POEMS)
        .param("name", name)
        .param("limit", limit)
}

pub fn poet_poem_contents(name: &str) -> Query {
    Query::new(POET_POEM_CONTENTS).param("name", name)
}

pub fn poet_network(name: &str) -> Query {
    Query::new(POET_NETWORK).param("name", name)
}

pub fn search_poems(author: &str, title_keyword: &str) -> Query {
    Query::new(SEARCH_POEMS)
        .param("author", author)
        .param("title_keyword", title_keyword)
}

pub fn search_poem_titles(author: &str, title_keyword: &str) -> Query {
    Query::new(SEARCH_POEM_TITLES)
        .param("author", author)
        .param("title_keyword", title_keyword)
}

pub fn heatmap(name: &str) -> Query {
    Query::new(HEATMAP).param("name", name)
}

pub fn annual_counts(name: &str) -> Query {
    Query::new(ANNUAL_COUNTS).param("name", name)
}

/// Works written in `start <= year < end`.
pub fn period_total(name: &str, start: i64, end: i64) -> Query {
    Query::new(PERIOD_TOTAL)
        .param("name", name)
        .param("start", start)
        .param("end", end)
}

pub fn years_total(name: &str, years: &[i64]) -> Query {
    Query::new(YEARS_TOTAL)
        .param("name", name)
        .param("years", Value::from(years.to_vec()))
}

pub fn works_total(name: &str) -> Query {
    Query::new(WORKS_TOTAL).param("name", name)
}

pub fn poem_imagery(name: &str) -> Query {
    Query::new(POEM_IMAGERY).param("name", name)
}

/// Imagery for one poet, or across the whole graph when `name` is `None`.
pub fn imagery_cloud(name: Option<&str>) -> Query {
    match name {
        Some(n) => Query::new(IMAGERY_CLOUD_POET).param("name", n),
        None => Query::new(IMAGERY_CLOUD_ALL),
    }
}

pub fn period_imagery(name: &str, cond: PeriodCondition) -> Query {
    let statement = match cond {
        PeriodCondition::BeforeAnshi => PERIOD_IMAGERY_BEFORE,
        PeriodCondition::FromAnshi => PERIOD_IMAGERY_FROM,
        PeriodCondition::Any => PERIOD_IMAGERY_ANY,
    };
    let query = Query::new(statement).param("name", name);
    match cond {
        PeriodCondition::Any => query,
        _ => query.param("pivot", ANSHI_PIVOT_YEAR),
    }
}
