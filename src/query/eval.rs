//! Query evaluation.
//!
//! Directives are folded into a `Query`, which checks each record stage by
//! stage (year, type, orbit, text) and stops at the first failing stage.
//! Skip and limit are applied to the filtered sequence in catalog order.

use std::fmt;

use super::parse::{parse, Directive, OrbitKeyword, Term, TypeKeyword};
use crate::tle::ElementRecord;

const ROCKET_BODY_MARKERS: &[&str] = &[
    "R/B", "ROCKET", "CZ-", "SL-", "CENTAUR", "AGENA", "ARIANE", "DELTA ", "ATLAS ", "TITAN ", "THOR ",
    "H-2A", "H-IIA", "PSLV", "GSLV", "BREEZE-M", "FREGAT", "FALCON 9", "KOSMOS 3M", "STAGE",
];

pub fn is_debris(name_upper: &str) -> bool {
    name_upper.contains("-DEB")
        || name_upper
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| word == "DEB" || word == "DEBRIS")
}

pub fn is_rocket_body(name_upper: &str) -> bool {
    ROCKET_BODY_MARKERS.iter().any(|marker| name_upper.contains(marker))
}

impl TypeKeyword {
    pub fn matches(&self, name_upper: &str) -> bool {
        match self {
            Self::Debris => is_debris(name_upper),
            Self::Rocket => is_rocket_body(name_upper),
        }
    }
}

impl Term {
    pub fn matches(&self, name_upper: &str, id_text: &str) -> bool {
        name_upper.contains(&self.text)
            || id_text.contains(&self.text)
            || self
                .alias
                .is_some_and(|fragments| fragments.iter().any(|fragment| name_upper.contains(fragment)))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub limit: Option<usize>,
    pub skip: usize,
    pub year: Option<i32>,
    pub orbits: Vec<OrbitKeyword>,
    pub types: Vec<TypeKeyword>,
    pub groups: Vec<Vec<Term>>,
}

impl Query {
    pub fn parse(input: &str) -> Self {
        Self::from_directives(parse(input))
    }

    pub fn from_directives(directives: impl IntoIterator<Item = Directive>) -> Self {
        let mut query = Self::default();
        for directive in directives {
            match directive {
                Directive::Limit(n) => query.limit = Some(n),
                Directive::Skip(n) => query.skip = n,
                Directive::Year(y) => query.year = Some(y),
                Directive::OrbitKeyword(k) => query.orbits.push(k),
                Directive::TypeKeyword(k) => query.types.push(k),
                Directive::TextGroup(terms) => query.groups.push(terms),
            }
        }
        query
    }

    /// True when the query would return the catalog untouched.
    pub fn is_unfiltered(&self) -> bool {
        self.limit.is_none() && self.skip == 0 && !self.has_filters()
    }

    pub fn has_filters(&self) -> bool {
        self.year.is_some() || !self.orbits.is_empty() || !self.types.is_empty() || !self.groups.is_empty()
    }

    pub fn matches(&self, record: &ElementRecord) -> bool {
        if let Some(year) = self.year {
            if record.epoch_year() != Some(year) {
                return false;
            }
        }

        let name_upper = record.name.to_uppercase();
        if !self.types.is_empty() && !self.types.iter().any(|t| t.matches(&name_upper)) {
            return false;
        }

        if !self.orbits.is_empty() {
            let Some(mean_motion) = record.mean_motion() else {
                return false;
            };
            if !self.orbits.iter().any(|k| k.matches(mean_motion)) {
                return false;
            }
        }

        if self.groups.is_empty() {
            return true;
        }
        let id_text = record.id.to_string();
        self.groups
            .iter()
            .any(|group| group.iter().all(|term| term.matches(&name_upper, &id_text)))
    }

    /// Positions of matching records after skip and limit, in input order.
    pub fn select(&self, records: &[ElementRecord]) -> Vec<usize> {
        let filters = self.has_filters();
        let positions = records
            .iter()
            .enumerate()
            .filter(|(_, record)| !filters || self.matches(record))
            .map(|(pos, _)| pos)
            .skip(self.skip);
        match self.limit {
            Some(limit) => positions.take(limit).collect(),
            None => positions.collect(),
        }
    }

    pub fn filter<'a>(&self, records: &'a [ElementRecord]) -> Vec<&'a ElementRecord> {
        self.select(records).into_iter().map(|pos| &records[pos]).collect()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(year) = self.year {
            parts.push(Directive::Year(year).to_string());
        }
        parts.extend(self.types.iter().map(|k| Directive::TypeKeyword(*k).to_string()));
        parts.extend(self.orbits.iter().map(|k| Directive::OrbitKeyword(*k).to_string()));
        if !self.groups.is_empty() {
            let groups: Vec<String> = self.groups.iter().map(|g| Directive::TextGroup(g.clone()).to_string()).collect();
            parts.push(groups.join(" OR "));
        }
        if self.skip > 0 {
            parts.push(Directive::Skip(self.skip).to_string());
        }
        if let Some(limit) = self.limit {
            parts.push(Directive::Limit(limit).to_string());
        }
        if parts.is_empty() {
            write!(f, "<all>")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{orbit_record, record};

    fn ids(query: &str, records: &[ElementRecord]) -> Vec<u32> {
        Query::parse(query).filter(records).iter().map(|r| r.id).collect()
    }

    fn catalog() -> Vec<ElementRecord> {
        vec![
            orbit_record(25544, "ISS (ZARYA)", 98, 15.5),
            orbit_record(44713, "STARLINK-1007", 19, 15.06),
            orbit_record(44714, "STARLINK-1008", 19, 15.06),
            orbit_record(24876, "GPS BIIR-2  (PRN 13)", 97, 2.0056),
            orbit_record(41866, "GOES 16", 16, 1.0027),
            orbit_record(37820, "TIANGONG 1", 11, 15.8),
            orbit_record(29228, "FENGYUN 1C DEB", 99, 14.2),
            orbit_record(28480, "CZ-4B R/B", 4, 14.0),
            orbit_record(36585, "BEIDOU-2 G3", 10, 1.0),
            orbit_record(12345, "COSMOS 2251 DEB", 93, 14.3),
        ]
    }

    #[test]
    fn empty_query_returns_everything() {
        let records = catalog();
        assert_eq!(ids("", &records).len(), records.len());
        assert!(Query::parse("  ").is_unfiltered());
    }

    #[test]
    fn free_text_matches_name_or_id() {
        let records = catalog();
        assert_eq!(ids("starlink", &records), [44713, 44714]);
        assert_eq!(ids("2554", &records), [25544]);
        assert_eq!(ids("zarya", &records), [25544]);
    }

    #[test]
    fn and_within_group_or_across_groups() {
        let records = catalog();
        assert_eq!(ids("starlink 1008", &records), [44714]);
        assert_eq!(ids("starlink AND 1008", &records), [44714]);
        assert_eq!(ids("goes OR iss", &records), [25544, 41866]);
    }

    #[test]
    fn orbit_keywords() {
        let records = catalog();
        assert_eq!(ids("GEO", &records), [41866, 36585]);
        assert_eq!(ids("MEO", &records), [24876]);
        assert_eq!(ids("meo geo", &records), [24876, 41866, 36585]);
        assert_eq!(ids("LEO starlink", &records), [44713, 44714]);
    }

    #[test]
    fn type_keywords() {
        let records = catalog();
        assert_eq!(ids("DEBRIS", &records), [29228, 12345]);
        assert_eq!(ids("rockets", &records), [28480]);
        assert_eq!(ids("debris rocket", &records), [29228, 28480, 12345]);
    }

    #[test]
    fn debris_and_rocket_heuristics() {
        assert!(is_debris("FENGYUN 1C DEB"));
        assert!(is_debris("COSMOS 1408-DEB"));
        assert!(is_debris("IRIDIUM 33 DEBRIS"));
        assert!(!is_debris("DEBUT (ORIZURU)"));
        assert!(is_rocket_body("SL-16 R/B"));
        assert!(is_rocket_body("FALCON 9 DEB"));
        assert!(!is_rocket_body("STARLINK-1007"));
    }

    #[test]
    fn year_filter_uses_epoch_pivot() {
        let records = catalog();
        assert_eq!(ids("year:1998", &records), [25544]);
        assert_eq!(ids("launch:19", &records), [44713, 44714]);
        assert_eq!(ids("year:2004", &records), [28480]);
    }

    #[test]
    fn aliases_expand_to_program_names() {
        let records = catalog();
        assert_eq!(ids("china", &records), [37820, 29228, 28480, 36585]);
        assert_eq!(ids("china GEO", &records), [36585]);
    }

    #[test]
    fn skip_then_limit_in_catalog_order() {
        let records = catalog();
        assert_eq!(ids("limit:3", &records), [25544, 44713, 44714]);
        assert_eq!(ids("SKIP 1 limit:2", &records), [44713, 44714]);
        assert_eq!(ids("debris FIRST 5", &records), [29228, 12345]);
        assert_eq!(ids("SKIP 20", &records), Vec::<u32>::new());
    }

    #[test]
    fn structured_only_query_matches_all_that_pass() {
        let records = catalog();
        assert_eq!(ids("LEO year:2019", &records), [44713, 44714]);
    }

    #[test]
    fn malformed_fields_fail_the_filter() {
        let mut broken = record(1, "BROKEN");
        broken.line2 = "2 00001".to_string();
        broken.line1 = "1 00001U".to_string();
        let records = vec![broken];
        assert!(ids("LEO", &records).is_empty());
        assert!(ids("year:2024", &records).is_empty());
        assert_eq!(ids("broken", &records), [1]);
    }

    #[test]
    fn display_summarises_query() {
        assert_eq!(Query::parse("").to_string(), "<all>");
        assert_eq!(Query::parse("gps OR iss limit:2").to_string(), "(GPS) OR (ISS) limit:2");
    }
}
