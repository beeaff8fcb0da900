use serde::{Deserialize, Serialize};

use crate::{
    config::{
        IfNotFound, Search, SearchCondition, SearchMax, SizeCondition, SizeOperator,
        SortCriterion, SortKey,
    },
    constants::SEARCH_MATCH_ALL,
    primitives::bytes::ByteCount,
};

/// A search is either a shorthand string or a full object.
///
/// `"*"` matches every device and skips when there is none; any other string
/// is a device name that must exist.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SearchJson {
    Shorthand(String),
    Object(SearchObjectJson),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchObjectJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_not_found: Option<IfNotFound>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<MaxJson>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConditionJson {
    Name(String),
    Number(u32),
    Size(SizeConditionJson),
}

/// A bare value compares for equality.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SizeConditionJson {
    Value(ByteCount),
    Compare(SizeCompareJson),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SizeCompareJson {
    Equal(ByteCount),
    Greater(ByteCount),
    GreaterOrEqual(ByteCount),
    Less(ByteCount),
    LessOrEqual(ByteCount),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SortJson {
    One(SortCriterionJson),
    Many(Vec<SortCriterionJson>),
}

/// A bare key sorts ascending.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(untagged)]
pub enum SortCriterionJson {
    Key(SortKey),
    Directed(SortDirectedJson),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortDirectedJson {
    Name(SortOrder),
    Size(SortOrder),
    Number(SortOrder),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Search cap: a count, or `"*"` for no cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxJson(pub SearchMax);

impl<'de> Deserialize<'de> for MaxJson {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) if s == SEARCH_MATCH_ALL => {
                Ok(MaxJson(SearchMax::Unbounded))
            }
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(|n| MaxJson(SearchMax::Limit(n)))
                .ok_or_else(|| serde::de::Error::custom("invalid max, expected unsigned integer")),
            _ => Err(serde::de::Error::custom(format!(
                "invalid max, expected unsigned integer or '{SEARCH_MATCH_ALL}'"
            ))),
        }
    }
}

impl Serialize for MaxJson {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.0 {
            SearchMax::Limit(n) => serializer.serialize_u32(n),
            SearchMax::Unbounded | SearchMax::Implicit => {
                serializer.serialize_str(SEARCH_MATCH_ALL)
            }
        }
    }
}

impl From<SearchJson> for Search {
    fn from(json: SearchJson) -> Self {
        match json {
            SearchJson::Shorthand(s) if s == SEARCH_MATCH_ALL => Search::match_all(),
            SearchJson::Shorthand(name) => Search::by_name(name),
            SearchJson::Object(object) => Search {
                condition: object.condition.map(SearchCondition::from),
                sort: match object.sort {
                    None => Vec::new(),
                    Some(SortJson::One(criterion)) => vec![criterion.into()],
                    Some(SortJson::Many(criteria)) => {
                        criteria.into_iter().map(SortCriterion::from).collect()
                    }
                },
                if_not_found: object.if_not_found.unwrap_or_default(),
                max: object.max.map(|m| m.0).unwrap_or_default(),
                ..Default::default()
            },
        }
    }
}

impl From<ConditionJson> for SearchCondition {
    fn from(json: ConditionJson) -> Self {
        match json {
            ConditionJson::Name(name) => SearchCondition::Name(name),
            ConditionJson::Number(number) => SearchCondition::Number(number),
            ConditionJson::Size(SizeConditionJson::Value(value)) => {
                SearchCondition::Size(SizeCondition {
                    operator: SizeOperator::Equal,
                    value,
                })
            }
            ConditionJson::Size(SizeConditionJson::Compare(compare)) => {
                let (operator, value) = match compare {
                    SizeCompareJson::Equal(v) => (SizeOperator::Equal, v),
                    SizeCompareJson::Greater(v) => (SizeOperator::Greater, v),
                    SizeCompareJson::GreaterOrEqual(v) => (SizeOperator::GreaterOrEqual, v),
                    SizeCompareJson::Less(v) => (SizeOperator::Less, v),
                    SizeCompareJson::LessOrEqual(v) => (SizeOperator::LessOrEqual, v),
                };
                SearchCondition::Size(SizeCondition { operator, value })
            }
        }
    }
}

impl From<SortCriterionJson> for SortCriterion {
    fn from(json: SortCriterionJson) -> Self {
        let (key, order) = match json {
            SortCriterionJson::Key(key) => (key, SortOrder::Asc),
            SortCriterionJson::Directed(SortDirectedJson::Name(order)) => (SortKey::Name, order),
            SortCriterionJson::Directed(SortDirectedJson::Size(order)) => (SortKey::Size, order),
            SortCriterionJson::Directed(SortDirectedJson::Number(order)) => {
                (SortKey::Number, order)
            }
        };
        SortCriterion {
            key,
            ascending: order == SortOrder::Asc,
        }
    }
}

impl From<&SearchCondition> for ConditionJson {
    fn from(condition: &SearchCondition) -> Self {
        match condition {
            SearchCondition::Name(name) => ConditionJson::Name(name.clone()),
            SearchCondition::Number(number) => ConditionJson::Number(*number),
            SearchCondition::Size(SizeCondition { operator, value }) => {
                let value = *value;
                ConditionJson::Size(match operator {
                    SizeOperator::Equal => SizeConditionJson::Value(value),
                    SizeOperator::Greater => {
                        SizeConditionJson::Compare(SizeCompareJson::Greater(value))
                    }
                    SizeOperator::GreaterOrEqual => {
                        SizeConditionJson::Compare(SizeCompareJson::GreaterOrEqual(value))
                    }
                    SizeOperator::Less => SizeConditionJson::Compare(SizeCompareJson::Less(value)),
                    SizeOperator::LessOrEqual => {
                        SizeConditionJson::Compare(SizeCompareJson::LessOrEqual(value))
                    }
                })
            }
        }
    }
}

impl From<&SortCriterion> for SortCriterionJson {
    fn from(criterion: &SortCriterion) -> Self {
        if criterion.ascending {
            return SortCriterionJson::Key(criterion.key);
        }
        SortCriterionJson::Directed(match criterion.key {
            SortKey::Name => SortDirectedJson::Name(SortOrder::Desc),
            SortKey::Size => SortDirectedJson::Size(SortOrder::Desc),
            SortKey::Number => SortDirectedJson::Number(SortOrder::Desc),
        })
    }
}

impl SearchJson {
    /// Exports a search. With `keep_default` set, a search equal to the
    /// default is still emitted as `{"ifNotFound": "error"}`.
    pub fn export(search: &Search, keep_default: bool) -> Option<Self> {
        if search.is_match_all()
            && search.sort.is_empty()
            && search.if_not_found == IfNotFound::Skip
        {
            return Some(SearchJson::Shorthand(SEARCH_MATCH_ALL.to_owned()));
        }

        let mut object = SearchObjectJson {
            condition: search.condition.as_ref().map(ConditionJson::from),
            sort: match search.sort.as_slice() {
                [] => None,
                [criterion] => Some(SortJson::One(criterion.into())),
                criteria => Some(SortJson::Many(
                    criteria.iter().map(SortCriterionJson::from).collect(),
                )),
            },
            if_not_found: Some(search.if_not_found).filter(|i| *i != IfNotFound::default()),
            max: match search.max {
                SearchMax::Implicit => None,
                max => Some(MaxJson(max)),
            },
        };

        if object == SearchObjectJson::default() {
            if !keep_default {
                return None;
            }
            object.if_not_found = Some(search.if_not_found);
        }

        Some(SearchJson::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn import(value: serde_json::Value) -> Search {
        serde_json::from_value::<SearchJson>(value).unwrap().into()
    }

    fn export(search: &Search) -> serde_json::Value {
        serde_json::to_value(SearchJson::export(search, true)).unwrap()
    }

    #[test]
    fn test_shorthands() {
        assert_eq!(import(json!("*")), Search::match_all());
        assert_eq!(import(json!("/dev/vda")), Search::by_name("/dev/vda"));
        assert_eq!(export(&Search::match_all()), json!("*"));
    }

    #[test]
    fn test_import_object() {
        let search = import(json!({
            "condition": { "size": { "greaterOrEqual": "10 GiB" } },
            "sort": ["name", { "size": "desc" }],
            "ifNotFound": "create",
            "max": 2
        }));

        assert_eq!(
            search,
            Search::by_size(SizeOperator::GreaterOrEqual, ByteCount::gib(10))
                .with_sort(vec![
                    SortCriterion::ascending(SortKey::Name),
                    SortCriterion::descending(SortKey::Size)
                ])
                .with_if_not_found(IfNotFound::Create)
                .with_max(SearchMax::Limit(2))
        );

        let search = import(json!({ "condition": { "size": 1024 }, "sort": { "number": "asc" } }));
        assert_eq!(
            search,
            Search::by_size(SizeOperator::Equal, ByteCount(1024))
                .with_sort(vec![SortCriterion::ascending(SortKey::Number)])
        );

        let search = import(json!({ "condition": { "number": 3 }, "max": "*" }));
        assert_eq!(search, Search::by_number(3).with_max(SearchMax::Unbounded));

        assert_eq!(import(json!({})), Search::default());
    }

    #[test]
    fn test_invalid_objects() {
        for value in [
            json!({ "max": "all" }),
            json!({ "max": -1 }),
            json!({ "ifNotFound": "ignore" }),
            json!({ "condition": { "size": { "around": "1 GiB" } } }),
            json!(42),
        ] {
            assert!(
                serde_json::from_value::<SearchJson>(value.clone()).is_err(),
                "'{value}' should be rejected"
            );
        }
    }

    #[test]
    fn test_export() {
        assert_eq!(
            export(
                &Search::by_name("/dev/sda")
                    .with_sort(vec![SortCriterion::descending(SortKey::Size)])
                    .with_if_not_found(IfNotFound::Skip)
            ),
            json!({
                "condition": { "name": "/dev/sda" },
                "sort": { "size": "desc" },
                "ifNotFound": "skip"
            })
        );

        assert_eq!(
            export(
                &Search::by_size(SizeOperator::Less, ByteCount(100)).with_max(SearchMax::Unbounded)
            ),
            json!({ "condition": { "size": { "less": 100 } }, "max": "*" })
        );

        // Match-all that fails when nothing is found keeps the object form.
        assert_eq!(
            export(&Search::match_all().with_if_not_found(IfNotFound::Error)),
            json!({ "max": "*" })
        );

        assert_eq!(export(&Search::default()), json!({ "ifNotFound": "error" }));
        assert_eq!(SearchJson::export(&Search::default(), false), None);
    }

    #[test]
    fn test_binding_is_not_exported() {
        let mut search = Search::by_number(1);
        search.bind(crate::devicegraph::Sid(9));
        assert_eq!(export(&search), json!({ "condition": { "number": 1 } }));
    }
}
