//! Shared test infrastructure.
//!
//! Builds the real router over an in-memory doctor store so HTTP tests run
//! without a database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use clinic_kernel::AppState;
use clinic_kernel::models::doctor::doctor_schema;
use clinic_kernel::query::MemoryStore;
use clinic_kernel::routes;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

/// Live doctors in the fixture set.
pub const LIVE_DOCTORS: u64 = 24;

/// Test application wrapping the router.
pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::new(doctor_fixtures()).with_schema(doctor_schema());
        let state = AppState::with_doctor_store(Arc::new(store));
        Self {
            router: routes::router(state),
        }
    }

    /// GET `uri` and return the status with the parsed JSON body.
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or_else(|_| {
            let text = String::from_utf8_lossy(&body);
            panic!("Failed to parse JSON: {text}");
        });
        (status, json)
    }
}

/// Values of `field` across a listing's `data`.
pub fn column<'a>(body: &'a Value, field: &str) -> Vec<&'a Value> {
    body["data"]
        .as_array()
        .expect("data should be an array")
        .iter()
        .map(|row| &row[field])
        .collect()
}

struct Fixture {
    n: u32,
    name: &'static str,
    gender: &'static str,
    experience: i64,
    fee: f64,
    rating: Option<f64>,
    specialties: &'static [&'static str],
    status: &'static str,
    deleted: bool,
    created_at: String,
}

fn doctor(f: Fixture) -> Value {
    let id = format!("doc-{}", f.n);
    let user_id = format!("user-{}", f.n);
    let email = format!(
        "{}@clinic.test",
        f.name.to_lowercase().replace(' ', ".")
    );
    let specialties: Vec<Value> = f
        .specialties
        .iter()
        .enumerate()
        .map(|(i, title)| {
            let specialty_id = format!("spec-{}", title.to_lowercase().replace(' ', "-"));
            json!({
                "id": format!("{id}-s{i}"),
                "doctor_id": id,
                "specialty_id": specialty_id,
                "specialty": {"id": specialty_id, "title": title}
            })
        })
        .collect();

    json!({
        "id": id,
        "user_id": user_id,
        "name": f.name,
        "email": email,
        "contact_number": format!("+1555000{:04}", f.n),
        "registration_number": format!("REG-{:05}", f.n),
        "gender": f.gender,
        "experience": f.experience,
        "appointment_fee": f.fee,
        "average_rating": f.rating,
        "qualification": "MBBS",
        "designation": "Consultant",
        "current_workplace": "City Hospital",
        "is_deleted": f.deleted,
        "created_at": f.created_at,
        "user": {
            "id": user_id,
            "name": f.name,
            "email": email,
            "role": "DOCTOR",
            "status": f.status,
            "password_hash": "secret"
        },
        "specialties": specialties,
        "schedules": [],
        "reviews": [{"id": format!("{id}-r0"), "doctor_id": id, "rating": 5}],
        "appointments": []
    })
}

/// Four named doctors, one soft-deleted doctor and twenty generic ones.
pub fn doctor_fixtures() -> Vec<Value> {
    let named = [
        (1, "John Carter", "MALE", 12, 500.0, Some(4.8), &["Cardiology"][..], "ACTIVE"),
        (2, "Johnny Park", "MALE", 3, 300.0, Some(4.1), &["Neurology"][..], "ACTIVE"),
        (3, "Ann Lee", "FEMALE", 8, 450.5, Some(4.5), &["Cardiology", "Pediatrics"][..], "BLOCKED"),
        (4, "Maria Gomez", "FEMALE", 15, 800.0, Some(4.9), &["Dermatology"][..], "ACTIVE"),
    ];

    let mut out: Vec<Value> = named
        .into_iter()
        .map(|(n, name, gender, experience, fee, rating, specialties, status)| {
            doctor(Fixture {
                n,
                name,
                gender,
                experience,
                fee,
                rating,
                specialties,
                status,
                deleted: false,
                created_at: format!("2025-01-{n:02}T00:00:00Z"),
            })
        })
        .collect();

    out.push(doctor(Fixture {
        n: 5,
        name: "Retired Cardiologist",
        gender: "MALE",
        experience: 20,
        fee: 100.0,
        rating: Some(3.0),
        specialties: &["Cardiology"],
        status: "DELETED",
        deleted: true,
        created_at: "2025-01-05T00:00:00Z".to_string(),
    }));

    for n in 6..=25 {
        out.push(doctor(Fixture {
            n,
            name: GENERIC_NAMES[(n - 6) as usize],
            gender: "MALE",
            experience: i64::from(n),
            fee: 100.0 + f64::from(n) * 10.0,
            rating: if n % 2 == 0 { Some(4.0) } else { None },
            specialties: &["General Practice"],
            status: "ACTIVE",
            deleted: false,
            created_at: format!("2025-02-{n:02}T00:00:00Z"),
        }));
    }

    out
}

const GENERIC_NAMES: [&str; 20] = [
    "Alex Stone",
    "Beth Moore",
    "Carl Young",
    "Dana White",
    "Eli Brooks",
    "Fay Turner",
    "Gus Hill",
    "Hana Ito",
    "Ivan Petrov",
    "Jade Kim",
    "Karl Weiss",
    "Lena Fox",
    "Mark Bell",
    "Nora Diaz",
    "Omar Aziz",
    "Pia Berg",
    "Quinn Shaw",
    "Rosa Vega",
    "Sam Reed",
    "Tara Nash",
];
