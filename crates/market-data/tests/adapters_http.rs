//! Adapters against a local HTTP server standing in for each provider.

use httpmock::MockServer;
use marketlens_market_data::{
    AdapterConfig, BlsAdapter, CensusAdapter, FredAdapter, LogicalQuery, MarketDataError, Outcome,
    ProviderAdapter, WorldBankAdapter,
};

fn config(server: &MockServer, key: Option<&str>) -> AdapterConfig {
    AdapterConfig::new(server.base_url()).with_api_key(key.map(str::to_string))
}

#[tokio::test]
async fn fred_latest_observation() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/series/observations")
                .query_param("series_id", "GDP")
                .query_param("api_key", "test-key")
                .query_param("sort_order", "desc")
                .query_param("limit", "1");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"units":"lin","observations":[{"date":"2024-01-01","value":"28269.174"}]}"#);
        })
        .await;

    let adapter = FredAdapter::new(config(&server, Some("test-key")));
    let result = adapter
        .fetch(&LogicalQuery::economic_series("gdp"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.value, 28269.174);
    assert_eq!(result.source, "FRED");
    assert_eq!(result.details["date"], "2024-01-01");
}

#[tokio::test]
async fn fred_missing_value_is_no_data() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/series/observations");
            then.status(200)
                .body(r#"{"observations":[{"date":"2024-01-01","value":"."}]}"#);
        })
        .await;

    let adapter = FredAdapter::new(config(&server, Some("k")));
    let err = adapter
        .fetch(&LogicalQuery::economic_series("GDP"))
        .await
        .unwrap_err();
    assert_eq!(err.outcome(), Outcome::ConfirmedNoData);
}

#[tokio::test]
async fn fred_unknown_series_envelope_is_no_data() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/series/observations");
            then.status(400).body(
                r#"{"error_code":400,"error_message":"Bad Request.  The series does not exist."}"#,
            );
        })
        .await;

    let adapter = FredAdapter::new(config(&server, Some("k")));
    let err = adapter
        .fetch(&LogicalQuery::economic_series("NOPE"))
        .await
        .unwrap_err();
    assert_eq!(err.outcome(), Outcome::ConfirmedNoData);
}

#[tokio::test]
async fn http_429_is_rate_limited() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET");
            then.status(429).body("Too Many Requests");
        })
        .await;

    let err = FredAdapter::new(config(&server, Some("k")))
        .fetch(&LogicalQuery::economic_series("GDP"))
        .await
        .unwrap_err();
    assert!(matches!(err, MarketDataError::RateLimited { .. }));

    let err = BlsAdapter::new(config(&server, None))
        .fetch(&LogicalQuery::industry_employment("CES0000000001"))
        .await
        .unwrap_err();
    assert_eq!(err.outcome(), Outcome::RateLimited);
}

#[tokio::test]
async fn http_500_is_transient() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET");
            then.status(500).body("oops");
        })
        .await;

    let err = WorldBankAdapter::new(config(&server, None))
        .fetch(&LogicalQuery::country_indicator("BR", "NY.GDP.MKTP.CD"))
        .await
        .unwrap_err();
    assert_eq!(err.outcome(), Outcome::TransientError);
}

#[tokio::test]
async fn unreachable_host_is_transient() {
    let adapter = BlsAdapter::new(AdapterConfig::new("http://127.0.0.1:9"));
    let err = adapter
        .fetch(&LogicalQuery::industry_employment("CES0000000001"))
        .await
        .unwrap_err();
    assert_eq!(err.outcome(), Outcome::TransientError);
    assert!(matches!(err, MarketDataError::Network(_)), "{:?}", err);
    assert!(!err.to_string().contains("127.0.0.1:9"));
}

#[tokio::test]
async fn census_payroll_in_usd() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/2021/cbp")
                .query_param("NAICS2017", "5132")
                .query_param("for", "state:06")
                .query_param("key", "census-key");
            then.status(200).body(
                r#"[["ESTAB","EMP","PAYANN","NAICS2017_LABEL","NAICS2017","state"],
                    ["4210","180000","45000000","Software publishers","5132","06"]]"#,
            );
        })
        .await;

    let adapter = CensusAdapter::new(config(&server, Some("census-key")));
    let result = adapter
        .fetch(&LogicalQuery::market_size("software", "06"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.value, 45_000_000_000.0);
    assert_eq!(result.details["label"], "Software publishers");
}

#[tokio::test]
async fn census_204_is_no_data() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/2021/cbp");
            then.status(204);
        })
        .await;

    let err = CensusAdapter::new(config(&server, Some("k")))
        .fetch(&LogicalQuery::market_size("541511", "us"))
        .await
        .unwrap_err();
    assert_eq!(err.outcome(), Outcome::ConfirmedNoData);
}

#[tokio::test]
async fn world_bank_takes_newest_reported_year() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/country/US/indicator/NV.IND.MANF.CD")
                .query_param("format", "json")
                .query_param("mrv", "5");
            then.status(200).body(
                r#"[{"page":1,"pages":1,"per_page":50,"total":2},
                    [{"indicator":{"id":"NV.IND.MANF.CD","value":"Manufacturing, value added (current US$)"},
                      "country":{"id":"US","value":"United States"},"countryiso3code":"USA",
                      "date":"2023","value":null,"unit":"","obs_status":"","decimal":0},
                     {"indicator":{"id":"NV.IND.MANF.CD","value":"Manufacturing, value added (current US$)"},
                      "country":{"id":"US","value":"United States"},"countryiso3code":"USA",
                      "date":"2022","value":2497131000000.0,"unit":"","obs_status":"","decimal":0}]]"#,
            );
        })
        .await;

    let adapter = WorldBankAdapter::new(config(&server, None));
    let result = adapter
        .fetch(&LogicalQuery::market_size("manufacturing", "us"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.value, 2_497_131_000_000.0);
    assert_eq!(result.details["year"], "2022");
}

#[tokio::test]
async fn bls_latest_value() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/timeseries/data/CES0000000001");
            then.status(200).body(
                r#"{"status":"REQUEST_SUCCEEDED","message":[],
                    "Results":{"series":[{"seriesID":"CES0000000001",
                      "data":[{"year":"2024","period":"M04","periodName":"April","value":"158,183","latest":"true"}]}]}}"#,
            );
        })
        .await;

    let result = BlsAdapter::new(config(&server, None))
        .fetch(&LogicalQuery::industry_employment("ces0000000001"))
        .await
        .unwrap();
    assert_eq!(result.value, 158_183.0);
    assert_eq!(result.source, "BLS");
}
