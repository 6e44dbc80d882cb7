//! Schema Builder - typed column and table descriptors for migrations
//!
//! Descriptors are rendered to PostgreSQL DDL by the backends and are also
//! compared against live columns when a guard finds its target already present.

use std::fmt;

/// Quote an identifier for PostgreSQL (`users` -> `"users"`)
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal for PostgreSQL (`it's` -> `'it''s'`)
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Storage type of a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Varchar(u32),
    Text,
    Integer,
    BigInt,
    Serial,
    Boolean,
    Numeric(u8, u8),
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Uuid,
    Jsonb,
    /// Named PostgreSQL enum type with its exact, ordered label set
    Enum {
        type_name: String,
        values: Vec<String>,
    },
}

impl ColumnType {
    /// SQL type used in DDL
    pub fn to_sql(&self) -> String {
        match self {
            ColumnType::Varchar(len) => format!("VARCHAR({})", len),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Serial => "SERIAL".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Numeric(precision, scale) => format!("NUMERIC({}, {})", precision, scale),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::Time => "TIME".to_string(),
            ColumnType::Timestamp => "TIMESTAMP".to_string(),
            ColumnType::TimestampTz => "TIMESTAMPTZ".to_string(),
            ColumnType::Uuid => "UUID".to_string(),
            ColumnType::Jsonb => "JSONB".to_string(),
            ColumnType::Enum { type_name, .. } => quote_ident(type_name),
        }
    }

    /// `information_schema.columns.data_type` reported for this type
    pub fn data_type(&self) -> &'static str {
        match self {
            ColumnType::Varchar(_) => "character varying",
            ColumnType::Text => "text",
            ColumnType::Integer | ColumnType::Serial => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::Boolean => "boolean",
            ColumnType::Numeric(_, _) => "numeric",
            ColumnType::Date => "date",
            ColumnType::Time => "time without time zone",
            ColumnType::Timestamp => "timestamp without time zone",
            ColumnType::TimestampTz => "timestamp with time zone",
            ColumnType::Uuid => "uuid",
            ColumnType::Jsonb => "jsonb",
            ColumnType::Enum { .. } => "USER-DEFINED",
        }
    }

    /// Name of the enum type backing this column, if any
    pub fn enum_type(&self) -> Option<(&str, &[String])> {
        match self {
            ColumnType::Enum { type_name, values } => Some((type_name.as_str(), values.as_slice())),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Enum { type_name, values } => {
                write!(f, "{}({})", type_name, values.join(", "))
            }
            other => write!(f, "{}", other.to_sql().to_lowercase()),
        }
    }
}

/// Foreign key reference attached to a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub on_delete: Option<String>,
}

/// Column definition: name, storage type, nullability, default and uniqueness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    /// Raw SQL default expression (already quoted when it is a literal)
    pub default: Option<String>,
    pub unique: bool,
    pub primary_key: bool,
    pub references: Option<ForeignKey>,
}

impl ColumnDescriptor {
    /// Create a nullable column with no default
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            unique: false,
            primary_key: false,
            references: None,
        }
    }

    pub fn varchar(name: impl Into<String>, length: u32) -> Self {
        Self::new(name, ColumnType::Varchar(length))
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Timestamp)
    }

    /// Enum column backed by a named type
    pub fn enumeration(name: impl Into<String>, type_name: impl Into<String>, values: &[&str]) -> Self {
        Self::new(
            name,
            ColumnType::Enum {
                type_name: type_name.into(),
                values: values.iter().map(|v| v.to_string()).collect(),
            },
        )
    }

    /// Auto-increment primary key
    pub fn id(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Serial).primary_key()
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Set a raw default expression, e.g. `CURRENT_TIMESTAMP` or `true`
    pub fn default(mut self, expression: impl Into<String>) -> Self {
        self.default = Some(expression.into());
        self
    }

    /// Set a string literal default
    pub fn default_str(mut self, value: &str) -> Self {
        self.default = Some(quote_literal(value));
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn references(mut self, table: &str, column: &str) -> Self {
        self.references = Some(ForeignKey {
            table: table.to_string(),
            column: column.to_string(),
            on_delete: None,
        });
        self
    }

    pub fn on_delete(mut self, action: &str) -> Self {
        if let Some(ref mut fk) = self.references {
            fk.on_delete = Some(action.to_string());
        }
        self
    }

    /// Column definition as used in `CREATE TABLE` and `ADD COLUMN`
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.column_type.to_sql());

        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(ref default) = self.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        if self.unique && !self.primary_key {
            sql.push_str(" UNIQUE");
        }
        if let Some(ref fk) = self.references {
            sql.push_str(&format!(
                " REFERENCES {} ({})",
                quote_ident(&fk.table),
                quote_ident(&fk.column)
            ));
            if let Some(ref action) = fk.on_delete {
                sql.push_str(&format!(" ON DELETE {}", action));
            }
        }

        sql
    }

    /// Short human description used in drift reports
    pub fn describe(&self) -> String {
        format!(
            "{} {}",
            self.column_type,
            if self.nullable { "NULL" } else { "NOT NULL" }
        )
    }
}

/// Table definition for `CREATE TABLE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub unique_constraints: Vec<Vec<String>>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            unique_constraints: Vec::new(),
        }
    }

    /// Add a column
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Add an ID column (auto-increment primary key)
    pub fn id(self) -> Self {
        self.column(ColumnDescriptor::id("id"))
    }

    /// Add a string column
    pub fn string(self, name: &str, length: Option<u32>) -> Self {
        let column_type = match length {
            Some(len) => ColumnType::Varchar(len),
            None => ColumnType::Text,
        };
        self.column(ColumnDescriptor::new(name, column_type))
    }

    /// Add timestamp columns
    pub fn timestamps(self) -> Self {
        self.column(
            ColumnDescriptor::timestamp("created_at")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        )
        .column(
            ColumnDescriptor::timestamp("updated_at")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        )
    }

    /// Add a unique constraint over several columns
    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.unique_constraints
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Enum types used by this table's columns
    pub fn enum_types(&self) -> Vec<(&str, &[String])> {
        self.columns
            .iter()
            .filter_map(|c| c.column_type.enum_type())
            .collect()
    }

    /// Build the CREATE TABLE SQL
    pub fn to_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(|c| c.to_sql()).collect();
        for columns in &self.unique_constraints {
            let quoted: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
            parts.push(format!("UNIQUE ({})", quoted.join(", ")));
        }

        format!(
            "CREATE TABLE {} (\n    {}\n)",
            quote_ident(&self.name),
            parts.join(",\n    ")
        )
    }
}

/// SQL to create a named enum type
pub fn create_enum_type_sql(type_name: &str, values: &[String]) -> String {
    let labels: Vec<String> = values.iter().map(|v| quote_literal(v)).collect();
    format!(
        "CREATE TYPE {} AS ENUM ({})",
        quote_ident(type_name),
        labels.join(", ")
    )
}

/// SQL to drop a named enum type
pub fn drop_enum_type_sql(type_name: &str) -> String {
    format!("DROP TYPE IF EXISTS {}", quote_ident(type_name))
}

/// SQL to add a column to an existing table
pub fn add_column_sql(table: &str, column: &ColumnDescriptor) -> String {
    format!("ALTER TABLE {} ADD COLUMN {}", quote_ident(table), column.to_sql())
}

/// SQL to drop a column from an existing table
pub fn drop_column_sql(table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {}",
        quote_ident(table),
        quote_ident(column)
    )
}

/// SQL to drop a table
pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

/// Replacement of the label set of an enum type that backs one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumReplacement {
    pub table: String,
    pub column: String,
    pub type_name: String,
    pub values: Vec<String>,
    /// Default expression to restore after the column type swap
    pub default: Option<String>,
}

impl EnumReplacement {
    /// Statements that swap the type in place: rename the old type, create
    /// the new one, convert the column through text and drop the old type.
    pub fn to_sql(&self) -> Vec<String> {
        let table = quote_ident(&self.table);
        let column = quote_ident(&self.column);
        let old_type = format!("{}_old", self.type_name);

        let mut statements = vec![
            format!(
                "ALTER TYPE {} RENAME TO {}",
                quote_ident(&self.type_name),
                quote_ident(&old_type)
            ),
            create_enum_type_sql(&self.type_name, &self.values),
            format!("ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT", table, column),
            format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::text::{}",
                table,
                column,
                quote_ident(&self.type_name),
                column,
                quote_ident(&self.type_name)
            ),
        ];
        if let Some(ref default) = self.default {
            statements.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                table, column, default
            ));
        }
        statements.push(drop_enum_type_sql(&old_type));
        statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varchar_column_sql() {
        let column = ColumnDescriptor::varchar("name", 255);
        assert_eq!(column.to_sql(), "\"name\" VARCHAR(255)");
        assert_eq!(
            add_column_sql("users", &column),
            "ALTER TABLE \"users\" ADD COLUMN \"name\" VARCHAR(255)"
        );
    }

    #[test]
    fn test_boolean_not_null_default() {
        let column = ColumnDescriptor::boolean("is_active").not_null().default("true");
        assert_eq!(column.to_sql(), "\"is_active\" BOOLEAN NOT NULL DEFAULT true");
    }

    #[test]
    fn test_enum_column_sql() {
        let column = ColumnDescriptor::enumeration(
            "type",
            "reservations_type_enum",
            &["in-clinic", "online"],
        )
        .default_str("in-clinic");

        assert_eq!(
            column.to_sql(),
            "\"type\" \"reservations_type_enum\" DEFAULT 'in-clinic'"
        );
        assert_eq!(
            create_enum_type_sql("reservations_type_enum", &["in-clinic".to_string(), "online".to_string()]),
            "CREATE TYPE \"reservations_type_enum\" AS ENUM ('in-clinic', 'online')"
        );
    }

    #[test]
    fn test_table_definition() {
        let table = TableDefinition::new("doctors")
            .id()
            .string("name", Some(255))
            .column(
                ColumnDescriptor::integer("clinic_id")
                    .not_null()
                    .references("clinics", "id")
                    .on_delete("CASCADE"),
            )
            .timestamps()
            .unique(&["clinic_id", "name"]);

        let sql = table.to_sql();
        assert!(sql.contains("CREATE TABLE \"doctors\""));
        assert!(sql.contains("\"id\" SERIAL PRIMARY KEY"));
        assert!(sql.contains("\"name\" VARCHAR(255)"));
        assert!(sql.contains("REFERENCES \"clinics\" (\"id\") ON DELETE CASCADE"));
        assert!(sql.contains("\"created_at\" TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"));
        assert!(sql.contains("UNIQUE (\"clinic_id\", \"name\")"));
    }

    #[test]
    fn test_quoting_escapes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_enum_replacement_statements() {
        let change = EnumReplacement {
            table: "reservations".to_string(),
            column: "type".to_string(),
            type_name: "reservations_type_enum".to_string(),
            values: vec!["in-clinic".into(), "online".into(), "home".into()],
            default: Some("'in-clinic'".to_string()),
        };

        let statements = change.to_sql();
        assert_eq!(statements.len(), 6);
        assert!(statements[0].contains("RENAME TO \"reservations_type_enum_old\""));
        assert!(statements[1].contains("'home'"));
        assert!(statements[3].contains("USING \"type\"::text::\"reservations_type_enum\""));
        assert!(statements[4].contains("SET DEFAULT 'in-clinic'"));
        assert_eq!(statements[5], "DROP TYPE IF EXISTS \"reservations_type_enum_old\"");
    }
}
