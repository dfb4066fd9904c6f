//! Handwritten Diesel schema declarations for both stores.
//!
//! Migrations under `migrations/source` and `migrations/target` define the
//! actual tables and constraints. The two stores both name their fact table
//! `data`, so each lives in its own module.

/// Raw store: one row per sensor reading.
pub mod source {
    diesel::table! {
        data (id) {
            id -> Int4,
            timestamp -> Timestamptz,
            wind_speed -> Nullable<Float8>,
            power -> Nullable<Float8>,
            ambient_temperature -> Nullable<Float8>,
        }
    }
}

/// Target store: signal registry plus the narrow fact table.
pub mod target {
    diesel::table! {
        signal (id) {
            id -> Int4,
            name -> Text,
        }
    }

    // Primary key (timestamp, signal_id) backs the loader's upsert.
    diesel::table! {
        data (timestamp, signal_id) {
            timestamp -> Timestamptz,
            signal_id -> Int4,
            value -> Nullable<Float8>,
        }
    }

    diesel::joinable!(data -> signal (signal_id));

    diesel::allow_tables_to_appear_in_same_query!(data, signal);
}
