//! Drafting prompt construction
//!
//! Pure string building: turns the bilateral table detail and the run
//! overview into the prompt handed to the drafting model. Three scenarios
//! are framed: create the table, drop it, or alter it to match.

use crate::compare::detail::{SideStructure, TableDetail};
use crate::models::{ColumnSnapshot, ComparisonRun};

/// The per-table drafting prompt
pub fn table_prompt(
    table_name: &str,
    detail: &TableDetail,
    source_label: &str,
    target_label: &str,
    full_context: &str,
) -> String {
    let mut prompt = format!(
        "Generate the exact SQL statements needed to make the table `{table_name}` in \
         {target_label} match the structure of the same table in {source_label}.\n\n"
    );
    prompt.push_str("# Full Database Context\n\n");
    prompt.push_str(full_context);
    prompt.push_str("\n\n");
    prompt.push_str(&format!("# Specific Table: `{table_name}`\n\n"));

    if detail.in_source && !detail.in_target {
        prompt.push_str(&format!(
            "**Scenario:** Table exists in {source_label} but NOT in {target_label}. \
             You need to CREATE the table.\n\n"
        ));
        prompt.push_str(&format!("## {source_label} Structure:\n"));
        prompt.push_str(&format_table_structure(&detail.source));
    } else if detail.in_target && !detail.in_source {
        prompt.push_str(&format!(
            "**Scenario:** Table exists in {target_label} but NOT in {source_label}. \
             You need to DROP the table.\n\n"
        ));
        prompt.push_str(&format!("## {target_label} Structure:\n"));
        prompt.push_str(&format_table_structure(&detail.target));
    } else {
        prompt.push_str(&format!(
            "**Scenario:** Table exists in both databases but may have differences. \
             Generate ALTER statements to sync {target_label} to match {source_label}.\n\n"
        ));
        prompt.push_str(&format!("## {source_label} Structure:\n"));
        prompt.push_str(&format_table_structure(&detail.source));
        prompt.push_str(&format!("\n## {target_label} Structure:\n"));
        prompt.push_str(&format_table_structure(&detail.target));

        if let Some(differences) = &detail.differences {
            if !differences.columns.only_in_source.is_empty() {
                prompt.push_str(&format!(
                    "\n**Columns only in {source_label}:** {}\n",
                    differences.columns.only_in_source.join(", ")
                ));
            }

            if !differences.columns.only_in_target.is_empty() {
                prompt.push_str(&format!(
                    "\n**Columns only in {target_label}:** {}\n",
                    differences.columns.only_in_target.join(", ")
                ));
            }

            if !differences.columns.modified.is_empty() {
                prompt.push_str("\n**Column differences:**\n");
                for (name, drift) in differences.columns.modified.iter() {
                    prompt.push_str(&format!("- `{}`: {}\n", name, pretty(drift)));
                }
            }

            if !differences.metadata.is_empty() {
                prompt.push_str(&format!(
                    "\n**Table metadata differences:** {}\n",
                    pretty(&differences.metadata)
                ));
            }

            if !differences.foreign_keys.only_in_source.is_empty() {
                prompt.push_str(&format!(
                    "\n**Foreign keys only in {source_label}:** {}\n",
                    pretty(&differences.foreign_keys.only_in_source)
                ));
            }

            if !differences.foreign_keys.only_in_target.is_empty() {
                prompt.push_str(&format!(
                    "\n**Foreign keys only in {target_label}:** {}\n",
                    pretty(&differences.foreign_keys.only_in_target)
                ));
            }

            if !differences.foreign_keys.modified.is_empty() {
                prompt.push_str(&format!(
                    "\n**Modified foreign keys:** {}\n",
                    pretty(&differences.foreign_keys.modified)
                ));
            }
        }
    }

    prompt.push_str("\n# Instructions\n\n");
    prompt.push_str(&format!(
        "1. Generate ONLY the SQL statements needed to transform the {target_label} table to match {source_label}\n"
    ));
    prompt.push_str("2. Handle column additions, deletions, and modifications\n");
    prompt.push_str("3. Handle table metadata (engine, collation, etc)\n");
    prompt.push_str("4. Handle foreign key constraints (drop and recreate if needed)\n");
    prompt.push_str("5. Handle indexes and primary keys\n");
    prompt.push_str("6. Be careful with the order: drop foreign keys before altering columns, recreate them after\n");
    prompt.push_str("7. Use proper PostgreSQL syntax\n");
    prompt.push_str("8. If no changes are needed, return: -- No changes needed\n");
    prompt.push_str("9. Return ONLY executable SQL statements, no explanatory text outside of SQL comments\n");
    prompt.push_str("10. Each statement should end with a semicolon\n\n");
    prompt.push_str("Return the SQL statements now:");

    prompt
}

/// Shared context describing the whole run, prepended to every prompt
pub fn full_context(
    run: &ComparisonRun,
    source_tables: &[String],
    target_tables: &[String],
    only_in_source: &[String],
    only_in_target: &[String],
    table_sections: &[String],
) -> String {
    let mut context = String::from("# Database Comparison Overview\n\n");
    context.push_str(&format!(
        "**{} Tables:** {}\n",
        run.source_label,
        source_tables.len()
    ));
    context.push_str(&format!(
        "**{} Tables:** {}\n",
        run.target_label,
        target_tables.len()
    ));
    context.push_str(&format!(
        "**Tables only in {}:** {}\n",
        run.source_label,
        only_in_source.join(", ")
    ));
    context.push_str(&format!(
        "**Tables only in {}:** {}\n\n",
        run.target_label,
        only_in_target.join(", ")
    ));

    context.push_str("# All Tables Structure\n\n");
    for section in table_sections {
        context.push_str(section);
    }

    context
}

/// One table's section of the shared context
pub fn context_section(detail: &TableDetail, source_label: &str, target_label: &str) -> String {
    let mut section = format!("## Table: `{}`\n\n", detail.table_name);

    section.push_str(&format!("### In {}:\n", source_label));
    if detail.in_source {
        section.push_str(&format_structure_summary(&detail.source));
    } else {
        section.push_str("*Table not present*\n");
    }

    section.push_str(&format!("\n### In {}:\n", target_label));
    if detail.in_target {
        section.push_str(&format_structure_summary(&detail.target));
    } else {
        section.push_str("*Table not present*\n");
    }

    section.push_str("\n---\n\n");
    section
}

/// Full structure listing used in the per-table prompt
fn format_table_structure(structure: &SideStructure) -> String {
    let mut output = String::new();

    if !structure.columns.is_empty() {
        output.push_str("### Columns:\n");
        for (name, column) in structure.columns.iter() {
            output.push_str(&format!("- `{}`: {}\n", name, pretty(&attributes(column))));
        }
    }

    if let Some(metadata) = &structure.metadata {
        output.push_str("\n### Table Metadata:\n");
        output.push_str(&pretty(metadata));
        output.push('\n');
    }

    if !structure.foreign_keys.is_empty() {
        output.push_str("\n### Foreign Keys:\n");
        output.push_str(&pretty(&structure.foreign_keys));
        output.push('\n');
    }

    output
}

/// Compact structure listing used in the shared context
fn format_structure_summary(structure: &SideStructure) -> String {
    let mut output = String::new();

    if let Some(metadata) = &structure.metadata {
        output.push_str(&format!(
            "**Engine:** {}\n",
            metadata.engine.as_deref().unwrap_or("N/A")
        ));
        output.push_str(&format!(
            "**Collation:** {}\n",
            metadata.collation.as_deref().unwrap_or("N/A")
        ));
    }

    if !structure.columns.is_empty() {
        output.push_str("**Columns:**\n");
        for (name, column) in structure.columns.iter() {
            output.push_str(&format!(
                "- `{}`: Type={}, Null={}, Key={}, Default={}, Extra={}\n",
                name,
                column.column_type,
                if column.nullable { "YES" } else { "NO" },
                column.key_role,
                column.default.as_deref().unwrap_or("NULL"),
                column.extra
            ));
        }
    }

    if !structure.foreign_keys.is_empty() {
        output.push_str(&format!(
            "**Foreign Keys:** {} constraints\n",
            structure.foreign_keys.len()
        ));
    }

    output
}

/// The attribute view of a column, under the names the comparison uses
fn attributes(column: &ColumnSnapshot) -> serde_json::Value {
    serde_json::json!({
        "Type": column.column_type,
        "Collation": column.collation,
        "Null": if column.nullable { "YES" } else { "NO" },
        "Key": column.key_role,
        "Default": column.default,
        "Extra": column.extra,
        "Comment": column.comment,
    })
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::detail::assemble_detail;
    use crate::models::{OrderedMap, TableMetadata};

    fn column(name: &str, position: i32, nullable: bool) -> ColumnSnapshot {
        ColumnSnapshot {
            name: name.to_string(),
            ordinal_position: position,
            column_type: "integer".to_string(),
            data_type: "integer".to_string(),
            nullable,
            key_role: String::new(),
            default: None,
            extra: String::new(),
            collation: None,
            comment: None,
        }
    }

    fn structure(columns: Vec<ColumnSnapshot>) -> SideStructure {
        SideStructure {
            columns: columns.into_iter().map(|c| (c.name.clone(), c)).collect(),
            metadata: Some(TableMetadata {
                engine: Some("heap".to_string()),
                collation: Some("C".to_string()),
            }),
            foreign_keys: OrderedMap::new(),
        }
    }

    #[test]
    fn test_create_scenario_prompt() {
        let detail = assemble_detail(
            "orders",
            Some(structure(vec![column("id", 1, false)])),
            None,
            true,
        );

        let prompt = table_prompt("orders", &detail, "Production", "Staging", "ctx");
        assert!(prompt.contains("You need to CREATE the table."));
        assert!(prompt.contains("## Production Structure:"));
        assert!(!prompt.contains("You need to DROP the table."));
    }

    #[test]
    fn test_drop_scenario_prompt() {
        let detail = assemble_detail(
            "logs",
            None,
            Some(structure(vec![column("id", 1, false)])),
            true,
        );

        let prompt = table_prompt("logs", &detail, "Production", "Staging", "ctx");
        assert!(prompt.contains("You need to DROP the table."));
        assert!(prompt.contains("## Staging Structure:"));
    }

    #[test]
    fn test_alter_scenario_lists_differences() {
        let detail = assemble_detail(
            "users",
            Some(structure(vec![column("id", 1, false), column("name", 2, false)])),
            Some(structure(vec![
                column("id", 1, false),
                column("name", 2, true),
                column("email", 3, false),
            ])),
            true,
        );

        let prompt = table_prompt("users", &detail, "Production", "Staging", "ctx");
        assert!(prompt.contains("Generate ALTER statements"));
        assert!(prompt.contains("**Columns only in Staging:** email"));
        assert!(prompt.contains("**Column differences:**"));
        assert!(prompt.contains("`name`"));
        assert!(prompt.contains("Use proper PostgreSQL syntax"));
    }

    #[test]
    fn test_context_section_marks_absent_side() {
        let detail = assemble_detail(
            "logs",
            None,
            Some(structure(vec![column("id", 1, false)])),
            false,
        );

        let section = context_section(&detail, "Production", "Staging");
        assert!(section.contains("### In Production:\n*Table not present*"));
        assert!(section.contains("**Engine:** heap"));
    }
}
