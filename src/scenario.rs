//! The `UserWithDevice` goose scenario.
//!
//! Every virtual user registers once, fetches a token, then loops over four
//! weighted transactions with a random wait in between.

use std::{sync::Arc, time::Duration};

use chrono::{Datelike, Local, NaiveDate};
use goose::{metrics::GooseRequestMetric, prelude::*};
use rand::Rng;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    identity::{Identities, UserIdentity},
    session::UserSession,
};

pub const SCENARIO: &str = "UserWithDevice";

pub const REGISTER: &str = "/api/v1/register";
pub const TOKEN: &str = "/api/v1/token";
pub const PROFILE: &str = "/api/v1/{username}";
pub const TOTAL: &str = "/api/v1/{username}/total";
pub const DAILY: &str = "/api/v1/{username}/{year}/{month}/{day}";
pub const INGEST: &str = "/ingest";

/// State shared by every user of one run.
#[derive(Debug)]
pub struct StepsRun {
    identities: Identities,
    ingest_url: String,
}

impl StepsRun {
    pub fn new(identities: Identities, ingest_url: impl Into<String>) -> Self {
        Self {
            identities,
            ingest_url: ingest_url.into(),
        }
    }

    pub fn identities(&self) -> &Identities {
        &self.identities
    }

    pub fn ingest_url(&self) -> &str {
        &self.ingest_url
    }
}

/// A registration the backend did not accept.
#[derive(Debug)]
pub struct Rejected {
    pub reason: String,
    request: GooseRequestMetric,
}

/// Wraps a `fn(&StepsRun, &mut GooseUser)` transaction into a goose closure.
macro_rules! with_run {
    ($run:expr, $func:ident) => {{
        let run = Arc::clone($run);
        let function: TransactionFunction = Arc::new(move |user| {
            let run = Arc::clone(&run);
            Box::pin(async move { $func(&run, user).await })
        });
        Transaction::new(function).set_name(stringify!($func))
    }};
}

pub fn user_with_device(
    run: Arc<StepsRun>,
    min_wait: Duration,
    max_wait: Duration,
) -> Result<Scenario, GooseError> {
    Ok(scenario!(SCENARIO)
        .set_wait_time(min_wait, max_wait)?
        .register_transaction(with_run!(&run, start).set_on_start())
        .register_transaction(with_run!(&run, send_steps).set_weight(4)?)
        .register_transaction(transaction!(my_profile).set_name("my_profile"))
        .register_transaction(transaction!(total_steps).set_name("total_steps"))
        .register_transaction(transaction!(steps_today).set_name("steps_today")))
}

/// On-start hook: registers a fresh identity and logs it in.
///
/// A user whose registration fails gets no session data, so none of the
/// weighted transactions issue a request for it.
pub async fn start(run: &StepsRun, user: &mut GooseUser) -> TransactionResult {
    let identity = run.identities().allocate();

    if let Some(mut rejected) = register(user, &identity).await? {
        warn!(user = %identity.username, reason = %rejected.reason, "registration failed");
        return user.set_failure(&rejected.reason, &mut rejected.request, None, None);
    }

    let token = fetch_token(user, &identity).await?;
    info!(
        user = %identity.username,
        city = identity.city,
        "user started"
    );
    user.set_session_data(UserSession::new(identity, token));
    Ok(())
}

/// Posts the registration payload. Only an exact 200 is a success.
///
/// Returns the rejection when the backend did not accept the user,
/// including when no response came back at all.
pub async fn register(
    user: &mut GooseUser,
    identity: &UserIdentity,
) -> Result<Option<Rejected>, Box<TransactionError>> {
    let data = identity.registration().to_string();
    let request_builder = user
        .get_request_builder(&GooseMethod::Post, REGISTER)?
        .header("Content-Type", "application/json")
        .body(data.clone());
    let goose_request = GooseRequest::builder()
        .method(GooseMethod::Post)
        .name(REGISTER)
        .set_request_builder(request_builder)
        .build();

    let goose = user.request(goose_request).await?;
    if goose.request.status_code == 200 && goose.response.is_ok() {
        return Ok(None);
    }
    Ok(Some(Rejected {
        reason: format!("Registration failed with data {data}"),
        request: goose.request,
    }))
}

/// Returns the raw response body, whatever the status.
pub async fn fetch_token(
    user: &mut GooseUser,
    identity: &UserIdentity,
) -> Result<String, Box<TransactionError>> {
    let request_builder = user
        .get_request_builder(&GooseMethod::Post, TOKEN)?
        .header("Content-Type", "application/json")
        .body(identity.credentials().to_string());
    let goose_request = GooseRequest::builder()
        .method(GooseMethod::Post)
        .name(TOKEN)
        .set_request_builder(request_builder)
        .build();

    let goose = user.request(goose_request).await?;
    let success = goose.request.success;
    let status = goose.request.status_code;
    let token = match goose.response {
        Ok(response) => response.text().await.unwrap_or_default(),
        Err(_) => String::new(),
    };
    if !success || token.is_empty() {
        warn!(
            user = %identity.username,
            status,
            "token request did not return a usable token"
        );
    }
    Ok(token)
}

pub async fn send_steps(run: &StepsRun, user: &mut GooseUser) -> TransactionResult {
    let Some(session) = user.get_session_data_mut::<UserSession>() else {
        return Ok(());
    };
    let device_sync = session.next_device_sync();
    let body = json!({
        "deviceId": session.identity().device_id,
        "deviceSync": device_sync,
        "stepsCount": rand::thread_rng().gen_range(0..=100),
    })
    .to_string();

    let url = format!("{}{INGEST}", run.ingest_url());
    let request_builder = user
        .get_request_builder(&GooseMethod::Post, &url)?
        .header("Content-Type", "application/json")
        .body(body);
    let goose_request = GooseRequest::builder()
        .method(GooseMethod::Post)
        .name(INGEST)
        .set_request_builder(request_builder)
        .build();

    user.request(goose_request).await?;
    Ok(())
}

pub async fn my_profile(user: &mut GooseUser) -> TransactionResult {
    let Some((username, token)) = credentials(user) else {
        return Ok(());
    };
    let path = format!("/api/v1/{username}");
    let request_builder = user
        .get_request_builder(&GooseMethod::Get, &path)?
        .bearer_auth(token);
    let goose_request = GooseRequest::builder()
        .name(PROFILE)
        .set_request_builder(request_builder)
        .build();

    user.request(goose_request).await?;
    Ok(())
}

/// 404 means no steps were recorded yet and counts as success.
pub async fn total_steps(user: &mut GooseUser) -> TransactionResult {
    let Some((username, token)) = credentials(user) else {
        return Ok(());
    };
    let path = format!("/api/v1/{username}/total");
    get_allowing_missing(user, &path, TOTAL, &token).await
}

/// Same status rules as [`total_steps`], for the local calendar day.
pub async fn steps_today(user: &mut GooseUser) -> TransactionResult {
    let Some((username, token)) = credentials(user) else {
        return Ok(());
    };
    let path = daily_path(&username, Local::now().date_naive());
    get_allowing_missing(user, &path, DAILY, &token).await
}

/// Month and day are not zero-padded: `/api/v1/alice/2024/3/7`.
pub fn daily_path(username: &str, date: NaiveDate) -> String {
    format!(
        "/api/v1/{username}/{}/{}/{}",
        date.year(),
        date.month(),
        date.day()
    )
}

fn credentials(user: &GooseUser) -> Option<(String, String)> {
    user.get_session_data::<UserSession>().map(|session| {
        (
            session.identity().username.clone(),
            session.auth_token().to_string(),
        )
    })
}

async fn get_allowing_missing(
    user: &mut GooseUser,
    path: &str,
    name: &str,
    token: &str,
) -> TransactionResult {
    let request_builder = user
        .get_request_builder(&GooseMethod::Get, path)?
        .bearer_auth(token);
    let goose_request = GooseRequest::builder()
        .name(name)
        .set_request_builder(request_builder)
        .build();

    let mut goose = user.request(goose_request).await?;
    match goose.request.status_code {
        200 | 404 => user.set_success(&mut goose.request),
        status => {
            debug!(request = name, status, "unexpected status");
            let tag = format!("unexpected status {status}");
            user.set_failure(&tag, &mut goose.request, None, None)
        }
    }
}
