// FundsNet (B3 FNET) document search: most recent filing for a fund CNPJ

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use super::{build_http_client, fetch_json, json_text, FilingRegistry, ProviderError};
use crate::config::FundsNetConfig;
use crate::model::LookupResult;
use crate::normalizer::normalize;

pub struct FundsNetClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl FundsNetClient {
    pub fn new(config: &FundsNetConfig) -> anyhow::Result<Self> {
        Ok(FundsNetClient {
            http: build_http_client(config.timeout)?,
            base_url: config.base_url.clone(),
        })
    }

    /// Query the newest filing for `primary_id`.
    ///
    /// Asks for the 10 most recent documents ordered by delivery date; only the
    /// first one is used.
    fn fetch(&self, primary_id: &str) -> Result<LookupResult, ProviderError> {
        let request = self.http.get(&self.base_url).query(&[
            ("cnpj", primary_id),
            ("cnpjFundo", primary_id),
            ("idCategoria", "0"),
            ("idTipoDocumento", "0"),
            ("d", "2"),
            ("s", "0"),
            ("l", "10"),
            ("o[0][dataEntrega]", "desc"),
            ("idEspecieDocumento", "0"),
        ]);

        let body = fetch_json(request)?;
        let data = body
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| ProviderError::Payload("missing `data` array".to_string()))?;
        let latest = data.first().ok_or(ProviderError::NotFound)?;

        Ok(parse_filing(latest))
    }
}

impl FilingRegistry for FundsNetClient {
    fn lookup_by_primary_id(&self, primary_id: &str) -> LookupResult {
        if normalize(primary_id).is_empty() {
            debug!("FundsNet: blank CNPJ, skipping lookup");
            return LookupResult::absent();
        }

        match self.fetch(primary_id) {
            Ok(result) => result,
            Err(e) => {
                warn!(cnpj = primary_id, error = %e, "FundsNet lookup failed");
                LookupResult::absent()
            }
        }
    }
}

/// Extract description, filing date and document id from one `data[]` entry
pub fn parse_filing(entry: &serde_json::Value) -> LookupResult {
    // Kept verbatim: MZiQ is queried with the exact FundsNet spelling
    let description = entry
        .get("descricaoFundo")
        .and_then(|v| v.as_str())
        .filter(|d| !d.trim().is_empty())
        .map(String::from);

    let raw_date = entry.get("dataEntrega").and_then(|v| v.as_str());
    let last_filing_date = raw_date.and_then(parse_filing_date);
    if let (Some(raw), None) = (raw_date, last_filing_date) {
        warn!(date = raw, "FundsNet: unrecognised dataEntrega format");
    }

    LookupResult {
        description,
        last_filing_date,
        document_id: entry.get("id").and_then(json_text),
    }
}

/// Parse the delivery date formats FundsNet has been seen to return.
///
/// ISO (`2024-12-01`, `2024-12-01T00:00:00`, with or without fractional
/// seconds) and Brazilian (`01/12/2024`, `01/12/2024 18:21`).
pub fn parse_filing_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%d/%m/%Y %H:%M", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }

    // Timezone-suffixed ISO timestamps: keep the calendar date as written
    raw.split_once('T')
        .and_then(|(date, _)| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn client(server: &MockServer) -> FundsNetClient {
        FundsNetClient::new(&FundsNetConfig {
            base_url: server.url("/fnet/publico/pesquisarGerenciadorDocumentosDados"),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_parse_filing_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 12, 1);
        assert_eq!(parse_filing_date("2024-12-01"), expected);
        assert_eq!(parse_filing_date("2024-12-01T00:00:00"), expected);
        assert_eq!(parse_filing_date("2024-12-01T10:15:30.123"), expected);
        assert_eq!(parse_filing_date("2024-12-01T10:15:30-03:00"), expected);
        assert_eq!(parse_filing_date("01/12/2024"), expected);
        assert_eq!(parse_filing_date("01/12/2024 18:21"), expected);
        assert_eq!(parse_filing_date(""), None);
        assert_eq!(parse_filing_date("yesterday"), None);
    }

    #[test]
    fn test_parse_filing_fields() {
        let entry = json!({
            "id": 812345,
            "descricaoFundo": "Fund Alpha",
            "dataEntrega": "15/01/2024 10:30"
        });
        let result = parse_filing(&entry);

        assert_eq!(result.description.as_deref(), Some("Fund Alpha"));
        assert_eq!(result.last_filing_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(result.document_id.as_deref(), Some("812345"));
    }

    #[test]
    fn test_parse_filing_blank_description_is_absent() {
        let result = parse_filing(&json!({ "descricaoFundo": "  ", "dataEntrega": "garbage" }));
        assert_eq!(result.description, None);
        assert_eq!(result.last_filing_date, None);
    }

    #[test]
    fn test_parse_filing_keeps_description_verbatim() {
        let result = parse_filing(&json!({ "descricaoFundo": " Fund Alpha  FII " }));
        assert_eq!(result.description.as_deref(), Some(" Fund Alpha  FII "));
    }

    #[test]
    fn test_lookup_sends_query_and_takes_first_entry() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/fnet/publico/pesquisarGerenciadorDocumentosDados")
                .query_param("cnpj", "11.222.333/0001-44")
                .query_param("cnpjFundo", "11.222.333/0001-44")
                .query_param("l", "10")
                .query_param("o[0][dataEntrega]", "desc");
            then.status(200).json_body(json!({
                "data": [
                    { "id": 2, "descricaoFundo": "Fund Alpha", "dataEntrega": "2024-01-15T00:00:00" },
                    { "id": 1, "descricaoFundo": "Fund Alpha", "dataEntrega": "2023-06-30T00:00:00" }
                ],
                "recordsTotal": 2
            }));
        });

        let result = client(&server).lookup_by_primary_id("11.222.333/0001-44");

        mock.assert();
        assert_eq!(result.description.as_deref(), Some("Fund Alpha"));
        assert_eq!(result.last_filing_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(result.document_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_lookup_empty_data_is_absent() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(200).json_body(json!({ "data": [] }));
        });

        assert!(client(&server).lookup_by_primary_id("11222333000144").is_absent());
    }

    #[test]
    fn test_lookup_http_error_is_absent() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(500).body("internal error");
        });

        assert!(client(&server).lookup_by_primary_id("11222333000144").is_absent());
    }

    #[test]
    fn test_lookup_malformed_json_is_absent() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(200).body("<html>maintenance</html>");
        });

        assert!(client(&server).lookup_by_primary_id("11222333000144").is_absent());
    }

    #[test]
    fn test_lookup_blank_cnpj_makes_no_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET);
            then.status(200).json_body(json!({ "data": [] }));
        });

        assert!(client(&server).lookup_by_primary_id(" ./- ").is_absent());
        mock.assert_calls(0);
    }

    #[test]
    fn test_lookup_unreachable_host_is_absent() {
        let client = FundsNetClient::new(&FundsNetConfig {
            base_url: "http://127.0.0.1:9/unreachable".to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        assert!(client.lookup_by_primary_id("11222333000144").is_absent());
    }
}
