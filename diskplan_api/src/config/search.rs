use serde::{Deserialize, Serialize};
use strum_macros::{EnumString, IntoStaticStr};

use crate::{devicegraph::Sid, primitives::bytes::ByteCount};

/// Declarative rule selecting zero or more existing devices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Search {
    /// No condition matches every candidate.
    pub condition: Option<SearchCondition>,

    /// Sort criteria, first entry is the primary key.
    pub sort: Vec<SortCriterion>,

    pub if_not_found: IfNotFound,

    pub max: SearchMax,

    /// Device bound by the last resolution pass. Never serialized.
    pub device: Option<Sid>,

    /// Whether a resolution pass processed this search.
    pub solved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCondition {
    Name(String),
    Number(u32),
    Size(SizeCondition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeCondition {
    pub operator: SizeOperator,
    pub value: ByteCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum SizeOperator {
    #[default]
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl SizeOperator {
    pub fn matches(self, actual: ByteCount, value: ByteCount) -> bool {
        match self {
            Self::Equal => actual == value,
            Self::Greater => actual > value,
            Self::GreaterOrEqual => actual >= value,
            Self::Less => actual < value,
            Self::LessOrEqual => actual <= value,
        }
    }
}

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SortKey {
    Name,
    Size,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortCriterion {
    pub key: SortKey,
    pub ascending: bool,
}

impl SortCriterion {
    pub fn ascending(key: SortKey) -> Self {
        Self {
            key,
            ascending: true,
        }
    }

    pub fn descending(key: SortKey) -> Self {
        Self {
            key,
            ascending: false,
        }
    }
}

/// What to do when a search matches nothing.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum IfNotFound {
    /// Drop the owning entity silently.
    Skip,
    /// Drop the owning entity and report an issue.
    #[default]
    Error,
    /// Treat the owning entity as a new device.
    Create,
}

/// Cap on the number of matched devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMax {
    /// Not given, at most one device is taken.
    #[default]
    Implicit,
    Limit(u32),
    Unbounded,
}

impl SearchMax {
    pub fn cap(self) -> Option<usize> {
        match self {
            Self::Implicit => Some(1),
            Self::Limit(n) => Some(n as usize),
            Self::Unbounded => None,
        }
    }
}

impl Search {
    /// Matches every candidate, skipping silently when there are none.
    pub fn match_all() -> Self {
        Self {
            if_not_found: IfNotFound::Skip,
            max: SearchMax::Unbounded,
            ..Default::default()
        }
    }

    /// Matches the device with the given name, failing when it is absent.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            condition: Some(SearchCondition::Name(name.into())),
            ..Default::default()
        }
    }

    pub fn by_number(number: u32) -> Self {
        Self {
            condition: Some(SearchCondition::Number(number)),
            ..Default::default()
        }
    }

    pub fn by_size(operator: SizeOperator, value: ByteCount) -> Self {
        Self {
            condition: Some(SearchCondition::Size(SizeCondition { operator, value })),
            ..Default::default()
        }
    }

    pub fn with_if_not_found(self, if_not_found: IfNotFound) -> Self {
        Self {
            if_not_found,
            ..self
        }
    }

    pub fn with_max(self, max: SearchMax) -> Self {
        Self { max, ..self }
    }

    pub fn with_sort(self, sort: Vec<SortCriterion>) -> Self {
        Self { sort, ..self }
    }

    /// No condition and no cap on the number of matches.
    pub fn is_match_all(&self) -> bool {
        self.condition.is_none() && self.max == SearchMax::Unbounded
    }

    /// Whether the declared part equals the default search.
    pub fn is_default_search(&self) -> bool {
        self.without_binding() == Search::default()
    }

    /// Copy of the declared part, dropping the resolution state.
    pub fn without_binding(&self) -> Search {
        Search {
            device: None,
            solved: false,
            ..self.clone()
        }
    }

    pub fn bind(&mut self, sid: Sid) {
        self.device = Some(sid);
        self.solved = true;
    }

    pub fn mark_not_found(&mut self) {
        self.device = None;
        self.solved = true;
    }

    pub fn found_device(&self) -> Option<Sid> {
        self.device
    }

    /// Resolved without a match and told to create the device instead.
    pub fn create_device(&self) -> bool {
        self.solved && self.device.is_none() && self.if_not_found == IfNotFound::Create
    }

    /// Resolved without a match, the owning entity is dropped.
    pub fn skip_device(&self) -> bool {
        self.solved && self.device.is_none() && self.if_not_found != IfNotFound::Create
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_size_operator() {
        let ten = ByteCount::gib(10);
        let twenty = ByteCount::gib(20);

        assert!(SizeOperator::Equal.matches(ten, ten));
        assert!(!SizeOperator::Equal.matches(twenty, ten));
        assert!(SizeOperator::Greater.matches(twenty, ten));
        assert!(!SizeOperator::Greater.matches(ten, ten));
        assert!(SizeOperator::GreaterOrEqual.matches(ten, ten));
        assert!(SizeOperator::Less.matches(ten, twenty));
        assert!(SizeOperator::LessOrEqual.matches(twenty, twenty));
        assert!(!SizeOperator::LessOrEqual.matches(twenty, ten));

        assert_eq!(
            SizeOperator::from_str("greaterOrEqual").unwrap(),
            SizeOperator::GreaterOrEqual
        );
        assert_eq!(<&str>::from(SizeOperator::LessOrEqual), "lessOrEqual");
    }

    #[test]
    fn test_shapes() {
        let all = Search::match_all();
        assert!(all.is_match_all());
        assert_eq!(all.max.cap(), None);
        assert_eq!(all.if_not_found, IfNotFound::Skip);

        let default = Search::default();
        assert!(!default.is_match_all());
        assert_eq!(default.max.cap(), Some(1));
        assert_eq!(default.if_not_found, IfNotFound::Error);
        assert!(default.is_default_search());

        let named = Search::by_name("/dev/sda");
        assert!(!named.is_match_all());
        assert!(!named.is_default_search());
        assert!(!Search::match_all()
            .with_max(SearchMax::Limit(2))
            .is_match_all());
    }

    #[test]
    fn test_binding() {
        let mut search = Search::default();
        assert!(!search.skip_device());
        assert!(!search.create_device());

        search.bind(Sid(4));
        assert_eq!(search.found_device(), Some(Sid(4)));
        assert!(search.is_default_search());
        assert!(!search.skip_device());

        search.mark_not_found();
        assert!(search.skip_device());

        let mut create = Search::by_number(3).with_if_not_found(IfNotFound::Create);
        create.mark_not_found();
        assert!(create.create_device());
        assert!(!create.skip_device());
    }
}
