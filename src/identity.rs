//! Synthetic identities for simulated users.
//!
//! Every virtual user consumes one value from the process-wide
//! [`SequenceGenerator`] and one city from the [`CityCycle`]. All other
//! identity fields are derived from that number and the run id.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use chrono::Local;
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const CITIES: [&str; 7] = [
    "Tassin La Demi Lune",
    "Lyon",
    "Sydney",
    "Aubiere",
    "Clermont-Ferrand",
    "Nevers",
    "Garchizy",
];

const RUN_ID_FORMAT: &str = "%Y%m%d-%H-%M-%S";

/// Run id for a run starting now, e.g. `20240101-00-00-00`.
pub fn run_id_now() -> String {
    Local::now().format(RUN_ID_FORMAT).to_string()
}

/// Hands out 0, 1, 2, ... without ever repeating a value.
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    next: AtomicU64,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Endless rotation over [`CITIES`].
#[derive(Debug, Default)]
pub struct CityCycle {
    cursor: AtomicUsize,
}

impl CityCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> &'static str {
        let idx = self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some((c + 1) % CITIES.len())
            })
            .unwrap_or_else(|c| c);
        CITIES[idx]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub sequence: u64,
    pub username: String,
    pub password: String,
    pub email: String,
    pub device_id: String,
    pub city: &'static str,
    pub make_public: bool,
}

impl UserIdentity {
    pub fn derive(run_id: &str, sequence: u64, city: &'static str) -> Self {
        let username = format!("locust-user-{run_id}-{sequence}");
        let email = format!("{username}@mail.tld");
        Self {
            sequence,
            password: format!("abc_123!{sequence}"),
            email,
            device_id: format!("podometer-{sequence}-{}-{run_id}", sequence * 2),
            city,
            make_public: sequence % 2 == 0,
            username,
        }
    }

    /// Body of `POST /api/v1/register`.
    pub fn registration(&self) -> Value {
        json!({
            "username": self.username,
            "password": self.password,
            "email": self.email,
            "deviceId": self.device_id,
            "city": self.city,
            "makePublic": self.make_public,
        })
    }

    /// Body of `POST /api/v1/token`.
    pub fn credentials(&self) -> Value {
        json!({
            "username": self.username,
            "password": self.password,
        })
    }
}

/// Shared allocator for the identities of one run.
///
/// The sequence number and the city are drawn together, so user `n` always
/// lives in `CITIES[n % 7]` however many users start at once.
#[derive(Debug)]
pub struct Identities {
    run_id: String,
    sequence: SequenceGenerator,
    cities: CityCycle,
    draw: Mutex<()>,
}

impl Identities {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            sequence: SequenceGenerator::new(),
            cities: CityCycle::new(),
            draw: Mutex::new(()),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn allocate(&self) -> UserIdentity {
        let (sequence, city) = {
            let _draw = self.draw.lock();
            (self.sequence.next(), self.cities.next())
        };
        UserIdentity::derive(&self.run_id, sequence, city)
    }
}
