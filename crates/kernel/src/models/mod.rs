//! Entity models.

pub mod doctor;
