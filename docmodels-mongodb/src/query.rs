//! Filter translation from docmodels filters to MongoDB query syntax.

use bson::{Bson, Document, doc};

use docmodels_core::{
    error::ModelError,
    filter::{FieldOp, Filter, FilterVisitor},
};

/// Translates [`Filter`] expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter; `None` becomes the match-everything query `{}`.
    pub fn translate(filter: Option<&Filter>) -> Result<Document, ModelError> {
        match filter {
            Some(filter) => MongoQueryTranslator.visit_filter(filter),
            None => Ok(doc! {}),
        }
    }
}

impl FilterVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = ModelError;

    fn visit_and(&mut self, filters: &[Filter]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": filters
                .iter()
                .map(|filter| self.visit_filter(filter))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, filters: &[Filter]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": filters
                .iter()
                .map(|filter| self.visit_filter(filter))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    // `$not` only applies to operator expressions; a negated query is a one-clause `$nor`.
    fn visit_not(&mut self, filter: &Filter) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_filter(filter)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::In | FieldOp::Nin => {
                    if !matches!(value, Bson::Array(_)) {
                        return Err(ModelError::InvalidFilter(format!(
                            "$in and $nin take an array, found {value}"
                        )));
                    }

                    match op {
                        FieldOp::In => doc! { "$in": value },
                        _ => doc! { "$nin": value },
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(filter: Filter) -> Document {
        MongoQueryTranslator::translate(Some(&filter)).unwrap()
    }

    #[test]
    fn no_filter_matches_everything() {
        assert_eq!(MongoQueryTranslator::translate(None).unwrap(), doc! {});
    }

    #[test]
    fn field_operators_translate() {
        assert_eq!(translate(Filter::eq("a", 1)), doc! { "a": { "$eq": 1 } });
        assert_eq!(translate(Filter::lte("a", 2)), doc! { "a": { "$lte": 2 } });
        assert_eq!(translate(Filter::in_("_id", ["x", "y"])), doc! { "_id": { "$in": ["x", "y"] } });
        assert_eq!(translate(Filter::nin("a", [1])), doc! { "a": { "$nin": [1] } });
    }

    #[test]
    fn logical_operators_nest() {
        assert_eq!(
            translate(Filter::eq("a", 1).and(Filter::exists("b"))),
            doc! { "$and": [{ "a": { "$eq": 1 } }, { "b": { "$exists": true } }] },
        );
        assert_eq!(
            translate(Filter::eq("a", 1).not()),
            doc! { "$nor": [{ "a": { "$eq": 1 } }] },
        );
    }

    #[test]
    fn in_without_array_is_rejected() {
        let filter = Filter::field("a", FieldOp::In, 1);

        assert!(matches!(
            MongoQueryTranslator::translate(Some(&filter)),
            Err(ModelError::InvalidFilter(_)),
        ));
    }
}
