//! Difference analysis
//!
//! Pure comparison functions over two structural views. Nothing here
//! touches a database; given the same inputs the output is byte-identical,
//! including the order of every name-keyed result.

use crate::models::{
    natural_cmp, ColumnDrift, ColumnsPayload, ColumnSnapshot, ForeignKeyDrift,
    ForeignKeySnapshot, ForeignKeysPayload, MetadataDrift, OrderedMap, TableMetadata, ValueDiff,
};

/// A foreign key reduced to what decides equality: the ordered
/// (column, referenced table, referenced column) tuples plus both rules.
/// Column order is part of the identity; two composite keys over the same
/// columns in a different order are different constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedForeignKey {
    pub columns: Vec<(String, String, String)>,
    pub update_rule: String,
    pub delete_rule: String,
}

/// Compare one column present on both sides attribute by attribute.
/// Absent values stay distinct from empty strings throughout.
pub fn compare_column_definitions(source: &ColumnSnapshot, target: &ColumnSnapshot) -> ColumnDrift {
    let mut drift = ColumnDrift::default();

    if source.column_type != target.column_type {
        drift.column_type = Some(ValueDiff {
            source: Some(source.column_type.clone()),
            target: Some(target.column_type.clone()),
        });
    }

    if source.collation != target.collation {
        drift.collation = Some(ValueDiff {
            source: source.collation.clone(),
            target: target.collation.clone(),
        });
    }

    if source.nullable != target.nullable {
        drift.nullable = Some(ValueDiff {
            source: Some(yes_no(source.nullable).to_string()),
            target: Some(yes_no(target.nullable).to_string()),
        });
    }

    if source.key_role != target.key_role {
        drift.key_role = Some(ValueDiff {
            source: Some(source.key_role.clone()),
            target: Some(target.key_role.clone()),
        });
    }

    if source.default != target.default {
        drift.default = Some(ValueDiff {
            source: source.default.clone(),
            target: target.default.clone(),
        });
    }

    if source.extra != target.extra {
        drift.extra = Some(ValueDiff {
            source: Some(source.extra.clone()),
            target: Some(target.extra.clone()),
        });
    }

    if source.comment != target.comment {
        drift.comment = Some(ValueDiff {
            source: source.comment.clone(),
            target: target.comment.clone(),
        });
    }

    drift
}

/// Compare both sides' column sets: names present on one side only, plus
/// per-attribute drift for shared names. All results in natural
/// case-insensitive order.
pub fn compare_columns(
    source: &OrderedMap<ColumnSnapshot>,
    target: &OrderedMap<ColumnSnapshot>,
) -> ColumnsPayload {
    let mut only_in_source: Vec<String> = source
        .keys()
        .filter(|name| !target.contains_key(name))
        .map(|name| name.to_string())
        .collect();
    only_in_source.sort_by(|a, b| natural_cmp(a, b));

    let mut only_in_target: Vec<String> = target
        .keys()
        .filter(|name| !source.contains_key(name))
        .map(|name| name.to_string())
        .collect();
    only_in_target.sort_by(|a, b| natural_cmp(a, b));

    let mut modified: OrderedMap<ColumnDrift> = OrderedMap::new();
    for (name, source_column) in source.iter() {
        if let Some(target_column) = target.get(name) {
            let drift = compare_column_definitions(source_column, target_column);
            if !drift.is_empty() {
                modified.insert(name.to_string(), drift);
            }
        }
    }
    modified.sort_by_natural_key();

    ColumnsPayload {
        only_in_source,
        only_in_target,
        modified,
    }
}

/// Compare table-level metadata with the same strict-equality policy
pub fn compare_table_metadata(
    source: Option<&TableMetadata>,
    target: Option<&TableMetadata>,
) -> MetadataDrift {
    let mut drift = MetadataDrift::default();

    let source_engine = source.and_then(|m| m.engine.clone());
    let target_engine = target.and_then(|m| m.engine.clone());
    if source_engine != target_engine {
        drift.engine = Some(ValueDiff {
            source: source_engine,
            target: target_engine,
        });
    }

    let source_collation = source.and_then(|m| m.collation.clone());
    let target_collation = target.and_then(|m| m.collation.clone());
    if source_collation != target_collation {
        drift.collation = Some(ValueDiff {
            source: source_collation,
            target: target_collation,
        });
    }

    drift
}

/// Reduce a foreign key to its normalized comparison form
pub fn normalize_foreign_key(foreign_key: &ForeignKeySnapshot) -> NormalizedForeignKey {
    NormalizedForeignKey {
        columns: foreign_key
            .columns
            .iter()
            .map(|column| {
                (
                    column.column.clone(),
                    column.referenced_table.clone(),
                    column.referenced_column.clone(),
                )
            })
            .collect(),
        update_rule: foreign_key.update_rule.clone(),
        delete_rule: foreign_key.delete_rule.clone(),
    }
}

/// Compare both sides' foreign keys. A constraint is "only in X" when its
/// name is absent on the other side; a name-level match whose normalized
/// forms disagree is "modified" and carries both full definitions.
pub fn compare_foreign_keys(
    source: &OrderedMap<ForeignKeySnapshot>,
    target: &OrderedMap<ForeignKeySnapshot>,
) -> ForeignKeysPayload {
    let mut only_in_source: OrderedMap<ForeignKeySnapshot> = source
        .iter()
        .filter(|(name, _)| !target.contains_key(name))
        .map(|(name, fk)| (name.to_string(), fk.clone()))
        .collect();
    only_in_source.sort_by_natural_key();

    let mut only_in_target: OrderedMap<ForeignKeySnapshot> = target
        .iter()
        .filter(|(name, _)| !source.contains_key(name))
        .map(|(name, fk)| (name.to_string(), fk.clone()))
        .collect();
    only_in_target.sort_by_natural_key();

    let mut modified: OrderedMap<ForeignKeyDrift> = OrderedMap::new();
    for (name, source_fk) in source.iter() {
        if let Some(target_fk) = target.get(name) {
            if normalize_foreign_key(source_fk) != normalize_foreign_key(target_fk) {
                modified.insert(
                    name.to_string(),
                    ForeignKeyDrift {
                        source: source_fk.clone(),
                        target: target_fk.clone(),
                    },
                );
            }
        }
    }
    modified.sort_by_natural_key();

    ForeignKeysPayload {
        only_in_source,
        only_in_target,
        modified,
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "YES"
    } else {
        "NO"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ForeignKeyColumn;
    use pretty_assertions::assert_eq;

    fn column(name: &str) -> ColumnSnapshot {
        ColumnSnapshot {
            name: name.to_string(),
            ordinal_position: 1,
            column_type: "integer".to_string(),
            data_type: "integer".to_string(),
            nullable: false,
            key_role: String::new(),
            default: None,
            extra: String::new(),
            collation: None,
            comment: None,
        }
    }

    fn column_map(columns: Vec<ColumnSnapshot>) -> OrderedMap<ColumnSnapshot> {
        columns
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect()
    }

    fn foreign_key(name: &str, delete_rule: &str, columns: &[(&str, &str, &str)]) -> ForeignKeySnapshot {
        ForeignKeySnapshot {
            name: name.to_string(),
            update_rule: "NO ACTION".to_string(),
            delete_rule: delete_rule.to_string(),
            columns: columns
                .iter()
                .enumerate()
                .map(|(index, (column, referenced_table, referenced_column))| ForeignKeyColumn {
                    position: index as i32 + 1,
                    column: column.to_string(),
                    referenced_table: referenced_table.to_string(),
                    referenced_column: referenced_column.to_string(),
                })
                .collect(),
        }
    }

    fn fk_map(fks: Vec<ForeignKeySnapshot>) -> OrderedMap<ForeignKeySnapshot> {
        fks.into_iter().map(|fk| (fk.name.clone(), fk)).collect()
    }

    #[test]
    fn test_identical_columns_produce_no_drift() {
        let drift = compare_column_definitions(&column("id"), &column("id"));
        assert!(drift.is_empty());
    }

    #[test]
    fn test_nullability_only_drift_has_exactly_one_attribute() {
        let source = column("email");
        let mut target = column("email");
        target.nullable = true;

        let drift = compare_column_definitions(&source, &target);
        assert_eq!(drift.attribute_count(), 1);
        assert_eq!(
            drift.nullable,
            Some(ValueDiff {
                source: Some("NO".to_string()),
                target: Some("YES".to_string()),
            })
        );
        assert_eq!(drift.column_type, None);
        assert_eq!(drift.default, None);
    }

    #[test]
    fn test_absent_default_differs_from_empty_default() {
        let source = column("note");
        let mut target = column("note");
        target.default = Some(String::new());

        let drift = compare_column_definitions(&source, &target);
        assert_eq!(drift.attribute_count(), 1);
        assert_eq!(
            drift.default,
            Some(ValueDiff {
                source: None,
                target: Some(String::new()),
            })
        );
    }

    #[test]
    fn test_compare_columns_splits_only_in_lists() {
        let source = column_map(vec![column("id"), column("name")]);
        let target = column_map(vec![column("id"), column("email")]);

        let payload = compare_columns(&source, &target);
        assert_eq!(payload.only_in_source, vec!["name".to_string()]);
        assert_eq!(payload.only_in_target, vec!["email".to_string()]);
        assert!(payload.modified.is_empty());
    }

    #[test]
    fn test_compare_columns_sorts_modified_naturally() {
        let mut source_col10 = column("col10");
        source_col10.comment = Some("left".to_string());
        let mut source_col2 = column("col2");
        source_col2.comment = Some("left".to_string());

        let source = column_map(vec![source_col10, source_col2]);
        let target = column_map(vec![column("col10"), column("col2")]);

        let payload = compare_columns(&source, &target);
        let keys: Vec<&str> = payload.modified.keys().collect();
        assert_eq!(keys, vec!["col2", "col10"]);
    }

    #[test]
    fn test_metadata_identical_is_empty() {
        let meta = TableMetadata {
            engine: Some("heap".to_string()),
            collation: Some("C".to_string()),
        };
        assert!(compare_table_metadata(Some(&meta), Some(&meta)).is_empty());
    }

    #[test]
    fn test_metadata_engine_drift() {
        let source = TableMetadata {
            engine: Some("heap".to_string()),
            collation: None,
        };
        let target = TableMetadata {
            engine: None,
            collation: None,
        };

        let drift = compare_table_metadata(Some(&source), Some(&target));
        assert_eq!(
            drift.engine,
            Some(ValueDiff {
                source: Some("heap".to_string()),
                target: None,
            })
        );
        assert_eq!(drift.collation, None);
    }

    #[test]
    fn test_foreign_key_only_in_one_side() {
        let source = fk_map(vec![foreign_key(
            "fk_orders_user",
            "CASCADE",
            &[("user_id", "users", "id")],
        )]);
        let target = fk_map(vec![]);

        let payload = compare_foreign_keys(&source, &target);
        assert_eq!(payload.only_in_source.len(), 1);
        assert!(payload.only_in_source.contains_key("fk_orders_user"));
        assert!(payload.only_in_target.is_empty());
        assert!(payload.modified.is_empty());
    }

    #[test]
    fn test_foreign_key_delete_rule_change_is_modified() {
        let source = fk_map(vec![foreign_key(
            "fk_orders_user",
            "CASCADE",
            &[("user_id", "users", "id")],
        )]);
        let target = fk_map(vec![foreign_key(
            "fk_orders_user",
            "RESTRICT",
            &[("user_id", "users", "id")],
        )]);

        let payload = compare_foreign_keys(&source, &target);
        assert!(payload.only_in_source.is_empty());
        assert!(payload.only_in_target.is_empty());
        assert_eq!(payload.modified.len(), 1);

        let drift = payload.modified.get("fk_orders_user").unwrap();
        assert_eq!(drift.source.delete_rule, "CASCADE");
        assert_eq!(drift.target.delete_rule, "RESTRICT");
    }

    #[test]
    fn test_composite_key_column_order_is_identity() {
        let source = fk_map(vec![foreign_key(
            "fk_shipments",
            "CASCADE",
            &[("order_id", "orders", "id"), ("region", "orders", "region")],
        )]);
        let target = fk_map(vec![foreign_key(
            "fk_shipments",
            "CASCADE",
            &[("region", "orders", "region"), ("order_id", "orders", "id")],
        )]);

        let payload = compare_foreign_keys(&source, &target);
        assert_eq!(payload.modified.len(), 1);
    }

    #[test]
    fn test_modified_map_sorted_naturally() {
        let source = fk_map(vec![
            foreign_key("fk_10", "CASCADE", &[("a", "t", "id")]),
            foreign_key("FK_2", "CASCADE", &[("b", "t", "id")]),
        ]);
        let target = fk_map(vec![
            foreign_key("fk_10", "RESTRICT", &[("a", "t", "id")]),
            foreign_key("FK_2", "RESTRICT", &[("b", "t", "id")]),
        ]);

        let payload = compare_foreign_keys(&source, &target);
        let keys: Vec<&str> = payload.modified.keys().collect();
        assert_eq!(keys, vec!["FK_2", "fk_10"]);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let source = column_map(vec![column("b10"), column("B2"), column("a")]);
        let mut target_b10 = column("b10");
        target_b10.nullable = true;
        let mut target_b2 = column("B2");
        target_b2.nullable = true;
        let target = column_map(vec![target_b10, target_b2, column("a")]);

        let first = serde_json::to_string(&compare_columns(&source, &target)).unwrap();
        let second = serde_json::to_string(&compare_columns(&source, &target)).unwrap();
        assert_eq!(first, second);

        // Sorted map keys, not insertion order
        assert!(first.find("\"B2\"").unwrap() < first.find("\"b10\"").unwrap());
    }
}
