use crate::config::{ConsoleSettings, ReportTemplate};
use crate::domain::model::{AuthArtifacts, Entity, Location, ReportRecord, ResourceId};
use crate::utils::error::{Phase, Result, VspcError};
use chrono::{DateTime, Local};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE, ORIGIN};
use reqwest::Client;
use serde_json::{json, Value};

pub const SESSION_COOKIE: &str = "x-authorization";

const COMPANY_LIST_PATH: &str = "/uiapi/Company/GetCompanyList";
const REPORT_LIST_PATH: &str = "/uiapi/Report/GetReports";
const LOCATION_LIST_PATH: &str = "/uiapi/Location/GetLocations";
const REPORT_SAVE_PATH: &str = "/uiapi/Report/Save";

const WEEK_DAYS: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Client for the console's internal UI API, authenticated with captured artifacts.
pub struct ConsoleClient {
    base_url: String,
    accept_invalid_certs: bool,
    client: Client,
}

impl ConsoleClient {
    pub fn new(settings: &ConsoleSettings, artifacts: &AuthArtifacts) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", artifacts.bearer_token))?);
        headers.insert(
            COOKIE,
            header_value(&format!("{}={}", SESSION_COOKIE, artifacts.session_cookie))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-ui-request", HeaderValue::from_static("true"));
        headers.insert(ORIGIN, header_value(&settings.base_url)?);

        // Consoles are commonly deployed with self-signed certificates; verification is
        // relaxed only when the settings say so.
        let client = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            base_url: settings.base_url.clone(),
            accept_invalid_certs: settings.accept_invalid_certs,
            client,
        })
    }

    pub async fn list_entities(&self) -> Result<Vec<Entity>> {
        tracing::info!("🏢 Retrieving all companies...");
        let response = self.post(Phase::EntityListing, COMPANY_LIST_PATH, json!({})).await?;

        let companies = data_array(Phase::EntityListing, response)?
            .iter()
            .enumerate()
            .map(|(index, company)| parse_entity(index, company))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!("✅ Found {} companies", companies.len());
        Ok(companies)
    }

    pub async fn list_reports(&self) -> Result<Vec<ReportRecord>> {
        tracing::info!("📋 Retrieving existing reports...");
        let response = self.post(Phase::ReportListing, REPORT_LIST_PATH, json!({})).await?;

        let reports: Vec<ReportRecord> = data_array(Phase::ReportListing, response)?
            .iter()
            .map(parse_report)
            .collect();

        tracing::info!("✅ Found {} existing reports", reports.len());
        Ok(reports)
    }

    pub async fn list_locations(&self, entity_id: &ResourceId) -> Result<Vec<Location>> {
        let response = self
            .post(
                Phase::LocationListing,
                LOCATION_LIST_PATH,
                json!({ "companyId": entity_id }),
            )
            .await?;

        let mut locations = Vec::new();
        for raw in data_array(Phase::LocationListing, response)? {
            match first_id(&raw, &["locationId", "id"]) {
                Some(id) => locations.push(Location {
                    id,
                    name: raw.get("name").and_then(Value::as_str).map(str::to_string),
                }),
                None => tracing::warn!("⚠️ Skipping location without id for company {}", entity_id),
            }
        }
        Ok(locations)
    }

    /// Saves a report for `entity` and returns the report name on success.
    pub async fn create_report(&self, entity: &Entity, template: &ReportTemplate) -> Result<String> {
        let now = Local::now();
        let report_name = report_name(template, entity, &now);
        let payload = build_report_payload(entity, template, &report_name, &now);

        let response = self.post(Phase::ReportCreation, REPORT_SAVE_PATH, payload).await?;

        let status = response
            .get("data")
            .and_then(|data| data.get("status"))
            .and_then(Value::as_str);
        if status == Some("success") {
            Ok(report_name)
        } else {
            Err(VspcError::malformed(
                Phase::ReportCreation,
                format!("report save was not confirmed: {}", response),
            ))
        }
    }

    async fn post(&self, phase: Phase, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        let status = response.status();
        tracing::debug!("{} response status: {}", phase, status);

        let text = response.text().await?;
        if !status.is_success() {
            return Err(VspcError::Api {
                phase,
                status: Some(status.as_u16()),
                body: text,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| VspcError::malformed(phase, format!("invalid JSON: {}", e)))
    }

    fn transport_error(&self, url: &str, error: reqwest::Error) -> VspcError {
        if !self.accept_invalid_certs && is_certificate_failure(&error) {
            return VspcError::CertificateTrust {
                url: url.to_string(),
                details: error_chain(&error),
            };
        }
        VspcError::Http(error)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| VspcError::ConfigError {
        message: format!("Value cannot be sent as an HTTP header: {}", e),
    })
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}

fn is_certificate_failure(error: &reqwest::Error) -> bool {
    error.is_connect() && error_chain(error).to_lowercase().contains("certificate")
}

/// Returns the `data` array of a console response. A missing `data` is an empty collection.
fn data_array(phase: Phase, response: Value) -> Result<Vec<Value>> {
    match response {
        Value::Object(mut map) => match map.remove("data") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(VspcError::malformed(
                phase,
                format!("expected 'data' to be an array, got {}", other),
            )),
        },
        other => Err(VspcError::malformed(
            phase,
            format!("expected a JSON object, got {}", other),
        )),
    }
}

fn first_id(record: &Value, fields: &[&str]) -> Option<ResourceId> {
    fields
        .iter()
        .find_map(|field| record.get(*field).and_then(ResourceId::from_json))
}

fn parse_entity(index: usize, company: &Value) -> Result<Entity> {
    let id = first_id(company, &["companyId", "id", "instanceUid"]).ok_or_else(|| {
        VspcError::malformed(
            Phase::EntityListing,
            format!("company at position {} has no id", index),
        )
    })?;

    Ok(Entity {
        id,
        name: company
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string(),
        locations: Vec::new(),
    })
}

fn parse_report(report: &Value) -> ReportRecord {
    let text = |field: &str| report.get(field).and_then(Value::as_str).map(str::to_string);
    ReportRecord {
        entity_id: report.get("companyID").and_then(ResourceId::from_json),
        name: text("name"),
        entity_name: text("companyName"),
    }
}

pub fn report_name(template: &ReportTemplate, entity: &Entity, now: &DateTime<Local>) -> String {
    format!(
        "{} - {} - {}",
        template.name_prefix,
        entity.name,
        now.format("%Y%m%d")
    )
}

/// Save payload for one company. Every location the company has is included.
pub fn build_report_payload(
    entity: &Entity,
    template: &ReportTemplate,
    report_name: &str,
    now: &DateTime<Local>,
) -> Value {
    let location_ids: Vec<&ResourceId> = entity.locations.iter().map(|l| &l.id).collect();

    json!({
        "type": template.report_type,
        "name": report_name,
        "description": format!(
            "Auto-created for {} at {}",
            entity.name,
            now.format("%d/%m/%Y %H:%M")
        ),
        "parameters": {
            "accessMode": template.access_mode,
            "aggregationMode": template.aggregation_mode,
            "companies": [entity.id],
            "locations": location_ids,
            "rpoInterval": { "number": template.rpo_days, "period": "day" },
            "excludeMask": "",
            "groupBy": 1,
            "includeCompaniesDetails": false,
            "allCompaniesAndNewlyAdded": false,
            "includeResellerCompanies": false,
            "emailOptions": template.email_options,
            "operationModeFilter": [-1],
            "managementTypeFilter": [-1],
            "guestOsFilter": template.guest_os_filter
        },
        "schedule": {
            "type": "daily",
            "daily": {
                "time": template.schedule_time,
                "kind": "everyDay",
                "days": WEEK_DAYS
            },
            "monthly": {
                "time": template.monthly_time,
                "week": "first",
                "day": "sunday",
                "dayNumber": 1,
                "months": MONTHS
            },
            "timeZoneId": template.time_zone
        }
    })
}
