//! Clinic platform migration catalog
//!
//! Every schema change the platform has shipped, oldest first. Versions are
//! epoch milliseconds at authoring time and never change once released.

use crate::error::MigrationResult;
use crate::migrations::{
    ColumnDescriptor, ColumnType, Guard, MigrationCatalog, MigrationStep, Operation,
    TableDefinition,
};

pub const RESERVATION_TYPE_ENUM: &str = "reservations_type_enum";
pub const RESERVATION_STATUS_ENUM: &str = "reservations_status_enum";
pub const CLINIC_USER_ROLE_ENUM: &str = "clinic_users_role_enum";

pub const SLOT_TYPES: [&str; 2] = ["slots", "walk-in-windows"];

const ADD_SLOT_TYPE_SQL: &str = "ALTER TABLE \"clinics\" ADD COLUMN \"slot_type\" VARCHAR(20) \
     DEFAULT 'slots' CHECK (\"slot_type\" IN ('slots', 'walk-in-windows'))";
const DROP_SLOT_TYPE_SQL: &str = "ALTER TABLE \"clinics\" DROP COLUMN \"slot_type\"";

/// The platform catalog, validated and ordered
pub fn clinic_catalog() -> MigrationResult<MigrationCatalog> {
    MigrationCatalog::new(clinic_steps())
}

/// Raw step list; [`clinic_catalog`] validates it
pub fn clinic_steps() -> Vec<MigrationStep> {
    vec![
        MigrationStep::new(1716800000000, "CreateUsersTable").operation(Operation::CreateTable(
            TableDefinition::new("users")
                .id()
                .column(ColumnDescriptor::varchar("email", 255).not_null().unique())
                .column(ColumnDescriptor::varchar("password", 255).not_null())
                .column(ColumnDescriptor::integer("age"))
                .timestamps(),
        )),
        MigrationStep::new(1716800100000, "CreateClinicsTable").operation(Operation::CreateTable(
            TableDefinition::new("clinics")
                .id()
                .column(ColumnDescriptor::varchar("name", 255).not_null())
                .column(ColumnDescriptor::varchar("email", 255))
                .timestamps(),
        )),
        MigrationStep::new(1716800200000, "CreateClinicUsersTable").operation(
            Operation::CreateTable(
                TableDefinition::new("clinic_users")
                    .id()
                    .column(
                        ColumnDescriptor::integer("clinic_id")
                            .not_null()
                            .references("clinics", "id")
                            .on_delete("CASCADE"),
                    )
                    .column(ColumnDescriptor::varchar("name", 255).not_null())
                    .column(ColumnDescriptor::varchar("email", 255).not_null().unique())
                    .column(ColumnDescriptor::varchar("password", 255).not_null())
                    .column(
                        ColumnDescriptor::enumeration(
                            "role",
                            CLINIC_USER_ROLE_ENUM,
                            &["owner", "doctor", "receptionist"],
                        )
                        .not_null()
                        .default_str("doctor"),
                    )
                    .timestamps(),
            ),
        ),
        MigrationStep::new(1716800300000, "CreatePatientsTable").operation(Operation::CreateTable(
            TableDefinition::new("patients")
                .id()
                .column(
                    ColumnDescriptor::integer("clinic_id")
                        .not_null()
                        .references("clinics", "id")
                        .on_delete("CASCADE"),
                )
                .column(ColumnDescriptor::varchar("name", 255).not_null())
                .column(ColumnDescriptor::varchar("phone", 32).not_null())
                .column(ColumnDescriptor::varchar("email", 255))
                .column(ColumnDescriptor::new("date_of_birth", ColumnType::Date))
                .unique(&["clinic_id", "phone"])
                .timestamps(),
        )),
        MigrationStep::new(1716800400000, "CreateReservationsTable").operation(
            Operation::CreateTable(
                TableDefinition::new("reservations")
                    .id()
                    .column(
                        ColumnDescriptor::integer("clinic_id")
                            .not_null()
                            .references("clinics", "id")
                            .on_delete("CASCADE"),
                    )
                    .column(
                        ColumnDescriptor::integer("patient_id")
                            .not_null()
                            .references("patients", "id")
                            .on_delete("CASCADE"),
                    )
                    .column(
                        ColumnDescriptor::integer("doctor_id")
                            .references("clinic_users", "id")
                            .on_delete("SET NULL"),
                    )
                    .column(ColumnDescriptor::new("date", ColumnType::Date).not_null())
                    .column(ColumnDescriptor::new("start_time", ColumnType::Time).not_null())
                    .column(ColumnDescriptor::new("end_time", ColumnType::Time))
                    .timestamps(),
            ),
        ),
        MigrationStep::new(1716800500000, "CreateSettingsTable").operation(Operation::CreateTable(
            TableDefinition::new("settings")
                .id()
                .column(
                    ColumnDescriptor::integer("clinic_id")
                        .not_null()
                        .unique()
                        .references("clinics", "id")
                        .on_delete("CASCADE"),
                )
                .column(ColumnDescriptor::new("working_days", ColumnType::Jsonb))
                .timestamps(),
        )),
        MigrationStep::new(1716800600000, "CreateDoctorWorkingHoursTable").operation(
            Operation::CreateTable(
                TableDefinition::new("doctor_working_hours")
                    .id()
                    .column(
                        ColumnDescriptor::integer("doctor_id")
                            .not_null()
                            .references("clinic_users", "id")
                            .on_delete("CASCADE"),
                    )
                    .column(ColumnDescriptor::integer("day_of_week").not_null())
                    .column(ColumnDescriptor::new("start_time", ColumnType::Time).not_null())
                    .column(ColumnDescriptor::new("end_time", ColumnType::Time).not_null())
                    .unique(&["doctor_id", "day_of_week"]),
            ),
        ),
        MigrationStep::new(1716800700000, "CreatePasswordResetsTable").operation(
            Operation::CreateTable(
                TableDefinition::new("password_resets")
                    .id()
                    .column(ColumnDescriptor::varchar("email", 255).not_null())
                    .column(ColumnDescriptor::varchar("token", 255).not_null().unique())
                    .column(ColumnDescriptor::new("expires_at", ColumnType::TimestampTz).not_null())
                    .column(
                        ColumnDescriptor::timestamp("created_at")
                            .not_null()
                            .default("CURRENT_TIMESTAMP"),
                    ),
            ),
        ),
        MigrationStep::new(1716900000000, "Addnametousers").operation(Operation::add_column(
            "users",
            ColumnDescriptor::varchar("name", 255),
        )),
        MigrationStep::new(1716990000000, "AddPhoneToUsers").operation(Operation::add_column(
            "users",
            ColumnDescriptor::varchar("phone", 32),
        )),
        MigrationStep::new(1717000000000, "AddIsActiveToClinics").operation(Operation::add_column(
            "clinics",
            ColumnDescriptor::boolean("is_active").not_null().default("true"),
        )),
        MigrationStep::new(1717100000000, "AddSlotTypeToClinics").operation(Operation::raw(
            Guard::column("clinics", "slot_type"),
            ADD_SLOT_TYPE_SQL,
            DROP_SLOT_TYPE_SQL,
        )),
        MigrationStep::new(1717200000000, "AddTypeToReservations").operation(Operation::add_column(
            "reservations",
            ColumnDescriptor::enumeration("type", RESERVATION_TYPE_ENUM, &["in-clinic", "online"])
                .not_null()
                .default_str("in-clinic"),
        )),
        MigrationStep::new(1717300000000, "AddResetTokenToClinicUsers")
            .operation(Operation::add_column(
                "clinic_users",
                ColumnDescriptor::varchar("reset_token", 255),
            ))
            .operation(Operation::add_column(
                "clinic_users",
                ColumnDescriptor::new("reset_token_expires_at", ColumnType::TimestampTz),
            )),
        MigrationStep::new(1717400000000, "AddSlotDurationToClinics").operation(
            Operation::add_column(
                "clinics",
                ColumnDescriptor::integer("slot_duration").not_null().default("30"),
            ),
        ),
        MigrationStep::new(1717500000000, "AddAddressAndSlugToClinics")
            .operation(Operation::add_column("clinics", ColumnDescriptor::text("address")))
            .operation(Operation::add_column(
                "clinics",
                ColumnDescriptor::varchar("slug", 255).unique(),
            )),
        MigrationStep::new(1717600000000, "AddCurrencyAndTimezoneToSettings")
            .operation(Operation::add_column(
                "settings",
                ColumnDescriptor::varchar("currency", 3).not_null().default_str("USD"),
            ))
            .operation(Operation::add_column(
                "settings",
                ColumnDescriptor::varchar("timezone", 64).not_null().default_str("UTC"),
            )),
        MigrationStep::new(1717700000000, "AddStatusAndNotesToReservations")
            .operation(Operation::add_column(
                "reservations",
                ColumnDescriptor::enumeration(
                    "status",
                    RESERVATION_STATUS_ENUM,
                    &["pending", "confirmed", "cancelled", "completed"],
                )
                .not_null()
                .default_str("pending"),
            ))
            .operation(Operation::add_column("reservations", ColumnDescriptor::text("notes"))),
        MigrationStep::new(1717800000000, "AddAvailabilityToDoctorWorkingHours")
            .operation(Operation::add_column(
                "doctor_working_hours",
                ColumnDescriptor::boolean("is_available").not_null().default("true"),
            ))
            .operation(Operation::add_column(
                "doctor_working_hours",
                ColumnDescriptor::integer("max_patients"),
            )),
        MigrationStep::new(1717900000000, "AddSpecialtyToClinicUsers").operation(
            Operation::add_column("clinic_users", ColumnDescriptor::varchar("specialty", 255)),
        ),
        MigrationStep::new(1718000000000, "AddHomeToReservationType").operation(
            Operation::AlterEnum {
                table: "reservations".to_string(),
                column: "type".to_string(),
                type_name: RESERVATION_TYPE_ENUM.to_string(),
                values: labels(&["in-clinic", "online", "home"]),
                previous: labels(&["in-clinic", "online"]),
                default: Some("'in-clinic'".to_string()),
            },
        ),
        MigrationStep::new(1718100000000, "DropAgeFromUsers").operation(Operation::drop_column(
            "users",
            ColumnDescriptor::integer("age"),
        )),
    ]
}

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::split_sql_statements;

    #[test]
    fn test_catalog_is_valid() {
        let catalog = clinic_catalog().unwrap();
        assert_eq!(catalog.len(), clinic_steps().len());
        assert_eq!(catalog.steps()[0].id(), "1716800000000_CreateUsersTable");
        assert!(catalog.find("1716900000000_Addnametousers").is_some());
    }

    #[test]
    fn test_slot_type_statements_are_single() {
        assert_eq!(split_sql_statements(ADD_SLOT_TYPE_SQL).len(), 1);
        assert_eq!(split_sql_statements(DROP_SLOT_TYPE_SQL).len(), 1);
        for slot_type in SLOT_TYPES {
            assert!(ADD_SLOT_TYPE_SQL.contains(&format!("'{}'", slot_type)));
        }
    }

    #[test]
    fn test_reservation_type_enum_extension_keeps_previous_labels() {
        let step = clinic_catalog()
            .unwrap()
            .find("1718000000000_AddHomeToReservationType")
            .cloned()
            .unwrap();
        match &step.operations[0] {
            Operation::AlterEnum { values, previous, .. } => {
                assert!(previous.iter().all(|p| values.contains(p)));
                assert_eq!(values.last().map(String::as_str), Some("home"));
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }
}
