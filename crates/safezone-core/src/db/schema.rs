// Schema definition types: describes the SafeZone tables so storage
// backends can generate DDL without knowing the record structs.

use serde::{Deserialize, Serialize};

/// Physical table names.
pub mod tables {
    pub const USERS: &str = "users";
    pub const TASKS: &str = "tasks";
    pub const POINTS_HISTORY: &str = "points_history";
    pub const HELP_REQUESTS: &str = "help_requests";
    pub const GLOBAL_ALERTS: &str = "global_alerts";
    pub const COMMUNITY_TASKS: &str = "community_tasks";
}

/// Column types supported by the schema system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Auto-assigned integer primary key.
    Id,
    Text,
    Integer,
    /// Stored as 0/1.
    Boolean,
    /// Stored as RFC 3339 text.
    Timestamp,
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
}

impl SchemaField {
    pub fn id() -> Self {
        Self {
            field_type: FieldType::Id,
            required: true,
            unique: true,
            default_value: None,
        }
    }

    pub fn required_text() -> Self {
        Self {
            field_type: FieldType::Text,
            required: true,
            unique: false,
            default_value: None,
        }
    }

    pub fn optional_text() -> Self {
        Self {
            required: false,
            ..Self::required_text()
        }
    }

    pub fn required_integer() -> Self {
        Self {
            field_type: FieldType::Integer,
            ..Self::required_text()
        }
    }

    pub fn optional_integer() -> Self {
        Self {
            field_type: FieldType::Integer,
            ..Self::optional_text()
        }
    }

    /// Required integer column with a default.
    pub fn integer(default: i64) -> Self {
        Self {
            default_value: Some(default.into()),
            ..Self::required_integer()
        }
    }

    pub fn boolean(default: bool) -> Self {
        Self {
            field_type: FieldType::Boolean,
            required: true,
            unique: false,
            default_value: Some(default.into()),
        }
    }

    pub fn text_default(default: &str) -> Self {
        Self {
            default_value: Some(default.into()),
            ..Self::required_text()
        }
    }

    pub fn created_at() -> Self {
        Self {
            field_type: FieldType::Timestamp,
            ..Self::required_text()
        }
    }

    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A table definition. Columns keep declaration order so generated DDL is
/// stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub fields: Vec<(String, SchemaField)>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str, field: SchemaField) -> Self {
        self.fields.push((name.to_string(), field));
        self
    }

    pub fn get(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }
}

/// The complete database schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// The six SafeZone tables.
    pub fn safezone() -> Self {
        let users = Table::new(tables::USERS)
            .field("id", SchemaField::id())
            .field("email", SchemaField::required_text().with_unique())
            .field("first_name", SchemaField::required_text())
            .field("last_name", SchemaField::required_text())
            .field("phone", SchemaField::optional_text())
            .field("barangay", SchemaField::optional_text())
            .field("city", SchemaField::optional_text())
            .field("location", SchemaField::optional_text())
            .field("bio", SchemaField::optional_text())
            .field("hashed_password", SchemaField::required_text())
            .field("points", SchemaField::integer(100))
            .field("rank", SchemaField::text_default("Newcomer"))
            .field("is_verified", SchemaField::boolean(false))
            .field("is_active", SchemaField::boolean(true))
            .field("created_at", SchemaField::created_at());

        let tasks = Table::new(tables::TASKS)
            .field("id", SchemaField::id())
            .field("title", SchemaField::required_text())
            .field("description", SchemaField::required_text())
            .field("category", SchemaField::required_text())
            .field("priority", SchemaField::required_text())
            .field("status", SchemaField::text_default("pending"))
            .field("points", SchemaField::required_integer())
            .field("due_date", SchemaField::optional_text())
            .field("assigned_to", SchemaField::optional_text())
            .field("location", SchemaField::optional_text())
            .field("created_by", SchemaField::optional_integer())
            .field("created_at", SchemaField::created_at());

        let points_history = Table::new(tables::POINTS_HISTORY)
            .field("id", SchemaField::id())
            .field("user_id", SchemaField::required_integer())
            .field("type", SchemaField::required_text())
            .field("description", SchemaField::required_text())
            .field("points", SchemaField::required_integer())
            .field("created_at", SchemaField::created_at());

        let help_requests = Table::new(tables::HELP_REQUESTS)
            .field("id", SchemaField::id())
            .field("user_id", SchemaField::required_integer())
            .field("user_name", SchemaField::required_text())
            .field("type", SchemaField::required_text())
            .field("title", SchemaField::required_text())
            .field("description", SchemaField::required_text())
            .field("location", SchemaField::required_text())
            .field("urgency", SchemaField::required_text())
            .field("status", SchemaField::text_default("open"))
            .field("responders_needed", SchemaField::integer(1))
            .field("responders_count", SchemaField::integer(0))
            .field("created_at", SchemaField::created_at());

        let global_alerts = Table::new(tables::GLOBAL_ALERTS)
            .field("id", SchemaField::id())
            .field("user_id", SchemaField::required_integer())
            .field("created_by", SchemaField::required_text())
            .field("type", SchemaField::required_text())
            .field("priority", SchemaField::required_text())
            .field("title", SchemaField::required_text())
            .field("message", SchemaField::required_text())
            .field("affected_areas", SchemaField::required_text())
            .field("is_active", SchemaField::boolean(true))
            .field("acknowledged_count", SchemaField::integer(0))
            .field("expires_at", SchemaField::optional_text())
            .field("created_at", SchemaField::created_at());

        let community_tasks = Table::new(tables::COMMUNITY_TASKS)
            .field("id", SchemaField::id())
            .field("title", SchemaField::required_text())
            .field("description", SchemaField::required_text())
            .field("location", SchemaField::required_text())
            .field("urgency", SchemaField::required_text())
            .field("points", SchemaField::integer(50))
            .field("status", SchemaField::text_default("open"))
            .field("volunteer_id", SchemaField::optional_integer())
            .field("volunteer_name", SchemaField::optional_text())
            .field("created_by", SchemaField::optional_integer())
            .field("created_at", SchemaField::created_at());

        Self::new()
            .table(users)
            .table(tasks)
            .table(points_history)
            .table(help_requests)
            .table(global_alerts)
            .table(community_tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safezone_schema_has_all_tables() {
        let schema = Schema::safezone();
        for name in [
            tables::USERS,
            tables::TASKS,
            tables::POINTS_HISTORY,
            tables::HELP_REQUESTS,
            tables::GLOBAL_ALERTS,
            tables::COMMUNITY_TASKS,
        ] {
            let table = schema.get(name).unwrap_or_else(|| panic!("missing {name}"));
            assert_eq!(table.fields[0].0, "id");
            assert!(table.get("created_at").is_some());
        }
    }

    #[test]
    fn test_user_email_is_unique() {
        let schema = Schema::safezone();
        let email = schema.get(tables::USERS).unwrap().get("email").unwrap();
        assert!(email.unique);
        assert!(email.required);
    }
}
