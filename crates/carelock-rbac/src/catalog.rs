//! Default healthcare role catalog.

use serde_json::json;

use carelock_types::Action;

use crate::{Condition, ConditionOperator, Permission, Restriction, RestrictionKind, Role};

const CRUS: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Search];
const RS: [Action; 2] = [Action::Read, Action::Search];

/// The default roles a clinical deployment starts from.
///
/// Integrators can replace or extend these; ids are stable so user records
/// can reference them from configuration.
pub fn default_roles() -> Vec<Role> {
    vec![
        Role::new(
            "admin",
            "System Administrator",
            "Full system access with administrative privileges",
        )
        .with_permission(Permission::unrestricted()),
        Role::new(
            "physician",
            "Physician",
            "Healthcare provider with patient care access",
        )
        .with_permission(Permission::new("Patient", CRUS.to_vec()))
        .with_permission(Permission::new("Observation", CRUS.to_vec()))
        .with_permission(Permission::new("DiagnosticReport", CRUS.to_vec()))
        .with_permission(Permission::new("Medication", CRUS.to_vec()))
        .with_permission(Permission::new("Procedure", CRUS.to_vec()))
        .with_restriction(Restriction::new(
            RestrictionKind::OwnPatientsOnly,
            "Can only access patients under their care",
        )),
        Role::new("nurse", "Nurse", "Nursing staff with patient care access")
            .with_permission(Permission::new(
                "Patient",
                vec![Action::Read, Action::Update, Action::Search],
            ))
            .with_permission(Permission::new("Observation", CRUS.to_vec()))
            .with_permission(Permission::new("Medication", RS.to_vec()))
            .with_restriction(Restriction::new(
                RestrictionKind::AssignedPatientsOnly,
                "Can only access patients assigned to their care",
            )),
        Role::new(
            "pharmacist",
            "Pharmacist",
            "Pharmacy staff with medication access",
        )
        .with_permission(
            Permission::new("Patient", RS.to_vec()).with_condition(Condition::new(
                "accessReason",
                ConditionOperator::Equals,
                json!("medication_dispensing"),
            )),
        )
        .with_permission(Permission::new("Medication", CRUS.to_vec()))
        .with_permission(Permission::new("MedicationDispense", CRUS.to_vec())),
        Role::new(
            "receptionist",
            "Receptionist",
            "Front desk staff with limited patient access",
        )
        .with_permission(
            Permission::new("Patient", CRUS.to_vec()).with_condition(Condition::new(
                "dataType",
                ConditionOperator::In,
                json!(["demographics", "contact", "insurance"]),
            )),
        )
        .with_permission(Permission::new(
            "Appointment",
            vec![
                Action::Create,
                Action::Read,
                Action::Update,
                Action::Delete,
                Action::Search,
            ],
        ))
        .with_restriction(Restriction::new(
            RestrictionKind::NoClinicalData,
            "Cannot access clinical information",
        )),
        Role::new(
            "lab_tech",
            "Laboratory Technician",
            "Laboratory staff with diagnostic access",
        )
        .with_permission(
            Permission::new("Patient", RS.to_vec()).with_condition(Condition::new(
                "accessReason",
                ConditionOperator::Equals,
                json!("lab_testing"),
            )),
        )
        .with_permission(Permission::new("DiagnosticReport", CRUS.to_vec()))
        .with_permission(Permission::new("Specimen", CRUS.to_vec())),
        Role::new("auditor", "Compliance Auditor", "Audit staff with read-only access")
            .with_permission(Permission::new("*", RS.to_vec()))
            .with_restriction(Restriction::new(
                RestrictionKind::ReadOnly,
                "Read-only access for audit purposes",
            )),
        Role::new("patient", "Patient", "Patient with access to own health records")
            .with_permission(
                Permission::new("Patient", vec![Action::Read])
                    .with_condition(Condition::self_patient()),
            )
            .with_permission(
                Permission::new("Observation", vec![Action::Read]).with_condition(
                    Condition::new("subject.reference", ConditionOperator::Equals, json!("self")),
                ),
            )
            .with_permission(
                Permission::new("DiagnosticReport", vec![Action::Read]).with_condition(
                    Condition::new("subject.reference", ConditionOperator::Equals, json!("self")),
                ),
            )
            .with_restriction(Restriction::new(
                RestrictionKind::OwnDataOnly,
                "Can only access own health information",
            )),
    ]
}
