//! Doctor listing model.
//!
//! Doctors are soft-deleted (`is_deleted`), always returned with their user
//! account, and may carry specialties, schedules, reviews and appointments
//! on request.

use anyhow::Result;
use std::sync::LazyLock;

use crate::query::{
    EntitySchema, FieldType, FilterValue, IncludeTree, PagedResult, Predicate, QueryBuilder,
    QueryConfig, QueryParams, QueryStore, RelationSpec, SortDirection,
};

/// Doctor table name.
pub const DOCTOR_TABLE: &str = "doctors";

/// Columns of the doctor table a client may project onto.
pub const DOCTOR_COLUMNS: &[&str] = &[
    "id",
    "user_id",
    "name",
    "email",
    "profile_photo",
    "contact_number",
    "address",
    "registration_number",
    "experience",
    "gender",
    "appointment_fee",
    "qualification",
    "current_workplace",
    "designation",
    "average_rating",
    "created_at",
    "updated_at",
];

fn user_relation() -> RelationSpec {
    RelationSpec::one("users", "user_id", "id").with_fields(&[
        "id", "name", "email", "role", "status", "image",
    ])
}

fn specialties_relation() -> RelationSpec {
    RelationSpec::many("doctor_specialties", "id", "doctor_id").with_include(
        "specialty",
        RelationSpec::one("specialties", "specialty_id", "id"),
    )
}

fn schedules_relation() -> RelationSpec {
    RelationSpec::many("doctor_schedules", "id", "doctor_id").with_include(
        "schedule",
        RelationSpec::one("schedules", "schedule_id", "id"),
    )
}

fn reviews_relation() -> RelationSpec {
    RelationSpec::many("reviews", "id", "doctor_id")
}

fn appointments_relation() -> RelationSpec {
    RelationSpec::many("appointments", "id", "doctor_id")
}

/// Table and relations used to resolve dotted field paths.
pub fn doctor_schema() -> EntitySchema {
    EntitySchema::new(DOCTOR_TABLE)
        .with_relation("user", user_relation())
        .with_relation("specialties", specialties_relation())
        .with_relation("schedules", schedules_relation())
        .with_relation("reviews", reviews_relation())
        .with_relation("appointments", appointments_relation())
}

/// Labels of the `Gender` enum.
pub const GENDERS: &[&str] = &["MALE", "FEMALE", "OTHER"];

/// Labels of the `UserStatus` enum.
pub const USER_STATUSES: &[&str] = &["ACTIVE", "BLOCKED", "DELETED"];

/// Allow-lists and defaults for `GET /api/v1/doctors`.
pub static DOCTOR_QUERY_CONFIG: LazyLock<QueryConfig> = LazyLock::new(|| {
    QueryConfig::new()
        .searchable(&[
            "name",
            "email",
            "contact_number",
            "registration_number",
            "qualification",
            "current_workplace",
            "designation",
            "specialties.specialty.title",
        ])
        .filterable(&[
            "gender",
            "experience",
            "appointment_fee",
            "average_rating",
            "designation",
            "current_workplace",
            "qualification",
            "specialties.specialty.title",
            "user.status",
        ])
        .sortable(&[
            "name",
            "experience",
            "appointment_fee",
            "average_rating",
            "created_at",
        ])
        .selectable(DOCTOR_COLUMNS)
        .field_type("gender", FieldType::one_of(GENDERS))
        .field_type("experience", FieldType::Integer)
        .field_type("appointment_fee", FieldType::Float)
        .field_type("average_rating", FieldType::Float)
        .field_type("designation", FieldType::Text)
        .field_type("current_workplace", FieldType::Text)
        .field_type("qualification", FieldType::Text)
        .field_type("specialties.specialty.title", FieldType::Text)
        .field_type("user.status", FieldType::one_of(USER_STATUSES))
        .default_sort("created_at", SortDirection::Desc)
        .allow_include("specialties", specialties_relation())
        .allow_include("schedules", schedules_relation())
        .allow_include("reviews", reviews_relation())
        .allow_include("appointments", appointments_relation())
});

/// Soft-deleted doctors are never listed.
pub fn doctor_baseline() -> Predicate {
    Predicate::equals("is_deleted", FilterValue::Boolean(false))
}

/// Relations every doctor listing carries.
pub fn doctor_mandatory_includes() -> IncludeTree {
    let mut include = IncludeTree::new();
    include.insert("user".to_string(), user_relation());
    include
}

/// List doctors for a raw query string.
pub async fn list_doctors<S: QueryStore + ?Sized>(
    store: &S,
    params: &QueryParams,
) -> Result<PagedResult<S::Record>> {
    QueryBuilder::new(store, params, &DOCTOR_QUERY_CONFIG)
        .search()
        .filter()
        .and_where(doctor_baseline())
        .include(&doctor_mandatory_includes())
        .dynamic_include()
        .paginate()
        .sort()
        .fields()
        .execute()
        .await
}
