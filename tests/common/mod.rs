#![allow(dead_code)]

use async_trait::async_trait;
use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::{json, Value};
use vspc_reports::{ArtifactSource, AuthArtifacts, Credentials, Result, VspcError};

pub const TOKEN: &str = "token-123";
pub const COOKIE: &str = "cookie-456";

pub const COMPANIES: &str = "/uiapi/Company/GetCompanyList";
pub const REPORTS: &str = "/uiapi/Report/GetReports";
pub const LOCATIONS: &str = "/uiapi/Location/GetLocations";
pub const SAVE: &str = "/uiapi/Report/Save";

/// Hands out fixed artifacts without a browser.
pub struct FixedArtifacts;

#[async_trait]
impl ArtifactSource for FixedArtifacts {
    async fn extract(&self, _base_url: &str, _credentials: &Credentials) -> Result<AuthArtifacts> {
        Ok(AuthArtifacts {
            bearer_token: TOKEN.to_string(),
            session_cookie: COOKIE.to_string(),
        })
    }
}

/// Login that never yields artifacts.
pub struct RejectedLogin;

#[async_trait]
impl ArtifactSource for RejectedLogin {
    async fn extract(&self, _base_url: &str, _credentials: &Credentials) -> Result<AuthArtifacts> {
        Err(VspcError::authentication("token not observed within 30s"))
    }
}

pub fn artifacts() -> AuthArtifacts {
    AuthArtifacts {
        bearer_token: TOKEN.to_string(),
        session_cookie: COOKIE.to_string(),
    }
}

pub fn mock_companies<'a>(server: &'a MockServer, companies: Value) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path(COMPANIES)
            .header("authorization", format!("Bearer {}", TOKEN))
            .header("cookie", format!("x-authorization={}", COOKIE));
        then.status(200).json_body(json!({ "data": companies }));
    })
}

pub fn mock_reports<'a>(server: &'a MockServer, reports: Value) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path(REPORTS)
            .header("authorization", format!("Bearer {}", TOKEN));
        then.status(200).json_body(json!({ "data": reports }));
    })
}

pub fn mock_locations<'a>(server: &'a MockServer, company_id: u64, locations: Value) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path(LOCATIONS)
            .json_body(json!({ "companyId": company_id }));
        then.status(200).json_body(json!({ "data": locations }));
    })
}

pub fn mock_save<'a>(server: &'a MockServer, company_id: u64, status: u16, body: Value) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path(SAVE)
            .body_contains(format!("\"companies\":[{}]", company_id));
        then.status(status).json_body(body);
    })
}

pub fn saved() -> Value {
    json!({ "data": { "status": "success" } })
}
